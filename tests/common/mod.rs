//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Path,
    http::{Request, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use branch_loans::config::AppConfig;
use branch_loans::error::ProbeError;
use branch_loans::health::{HealthProbe, LivenessTarget};
use branch_loans::http::{AppState, HttpServer};
use branch_loans::observability::{CorrelationContext, MetricsAggregator};

/// A dependency that can be switched off, counting open connections.
#[derive(Default)]
pub struct SwitchableDatabase {
    down: AtomicBool,
    open: Arc<AtomicUsize>,
    pub pings: AtomicUsize,
}

impl SwitchableDatabase {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

struct Connection(Arc<AtomicUsize>);

impl Drop for Connection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LivenessTarget for SwitchableDatabase {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(ProbeError::Connect("connection refused (os error 111)".into()));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        let _conn = Connection(self.open.clone());
        tokio::task::yield_now().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-postgres"
    }
}

/// Test harness: the layered router plus handles on its shared state.
pub struct TestApp {
    pub router: Router,
    pub metrics: Arc<MetricsAggregator>,
    pub database: Arc<SwitchableDatabase>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let metrics = Arc::new(MetricsAggregator::new(&[0.01, 0.1, 1.0]).unwrap());
        let database = Arc::new(SwitchableDatabase::default());
        let probe = HealthProbe::new(database.clone(), Duration::from_millis(200));
        let state = AppState::new(metrics.clone(), probe);
        let server = HttpServer::with_routes(config, state, loan_routes());

        Self {
            router: server.router(),
            metrics,
            database,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub fn samples(&self) -> Vec<Sample> {
        parse_exposition(&self.metrics.snapshot())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;
    config
}

/// Stand-ins for the loan/stat handlers.
pub fn loan_routes() -> Router {
    Router::new()
        .route("/api/loans", get(list_loans))
        .route("/api/loans/{id}", get(get_loan))
        .route("/api/stats", get(stats))
        .route("/api/panic", get(panics))
        .route("/api/slow", get(slow))
        .route("/api/hang", get(hang))
        .route("/api/whoami", get(whoami))
}

async fn list_loans() -> Json<Value> {
    tracing::info!(count = 2, "listing loans");
    Json(json!([{ "id": 1 }, { "id": 2 }]))
}

async fn get_loan(Path(id): Path<u32>) -> Result<Json<Value>, StatusCode> {
    if id == 0 {
        tracing::error!(id, "loan lookup failed");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if id > 100 {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "id": id, "amount": 1200 })))
}

async fn stats() -> Json<Value> {
    Json(json!({ "total_loans": 2 }))
}

async fn panics() -> &'static str {
    panic!("handler blew up")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn hang() -> &'static str {
    std::future::pending::<()>().await;
    "unreachable"
}

async fn whoami() -> Json<Value> {
    let ctx = CorrelationContext::current();
    Json(json!({
        "request_id": ctx.as_ref().map(|c| c.id().to_string()),
        "remote_address": ctx.and_then(|c| c.remote_addr()).map(|a| a.to_string()),
    }))
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One parsed exposition sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// Parse Prometheus text exposition into samples, skipping comments.
pub fn parse_exposition(text: &str) -> Vec<Sample> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let (series, value) = line.rsplit_once(' ').expect("sample without value");
            let (name, labels) = match series.find('{') {
                Some(open) => {
                    let close = series.rfind('}').expect("unterminated labels");
                    (&series[..open], parse_labels(&series[open + 1..close]))
                }
                None => (series, BTreeMap::new()),
            };
            Sample {
                name: name.to_string(),
                labels,
                value: value.parse().expect("non-numeric sample value"),
            }
        })
        .collect()
}

fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let mut chars = raw.chars().peekable();

    loop {
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.is_empty() {
            break;
        }
        assert_eq!(chars.next(), Some('"'));

        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(if escaped == 'n' { '\n' } else { escaped });
                    }
                }
                '"' => break,
                other => value.push(other),
            }
        }
        labels.insert(key.trim_start_matches(',').to_string(), value);

        if chars.peek() == Some(&',') {
            chars.next();
        }
    }

    labels
}

/// Sum the samples named `name` whose labels include every pair in `filter`.
pub fn total(samples: &[Sample], name: &str, filter: &[(&str, &str)]) -> f64 {
    samples
        .iter()
        .filter(|s| s.name == name)
        .filter(|s| {
            filter
                .iter()
                .all(|(k, v)| s.labels.get(*k).map(String::as_str) == Some(*v))
        })
        .map(|s| s.value)
        .sum()
}

/// In-memory log sink for the JSON layer.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Every captured line, unparsed.
    pub fn lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Every captured line, parsed as JSON.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
            .collect()
    }

    pub fn find(&self, message: &str) -> Option<Value> {
        self.records().into_iter().find(|r| r["message"] == message)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
