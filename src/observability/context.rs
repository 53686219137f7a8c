//! Request-scoped correlation context.
//!
//! # Responsibilities
//! - Assign each inbound request a fresh correlation token and start instant
//! - Make the context reachable from any code running inside the request's
//!   task, without threading it through call signatures
//!
//! # Design Decisions
//! - Storage is a tokio task-local, installed by the instrumentation
//!   middleware for the lifetime of the request future
//! - Absence of a context is a normal state (startup, background tasks), so
//!   lookups return `Option` instead of failing
//! - Work spawned onto other tasks does not inherit the context; wrap it with
//!   [`propagate`] to carry it along

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use uuid::Uuid;

tokio::task_local! {
    static CURRENT: Arc<CorrelationContext>;
}

/// Correlation data for one in-flight request.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    id: Uuid,
    started_at: Instant,
    method: String,
    path: String,
    remote_addr: Option<SocketAddr>,
}

impl CorrelationContext {
    /// Open a context for `request` with a fresh v4 token.
    pub fn begin(request: &Request) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            remote_addr,
        }
    }

    /// Build a context by hand, for work that does not originate from HTTP.
    pub fn detached(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Instant::now(),
            method: method.into(),
            path: path.into(),
            remote_addr: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Time since the context was opened.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run `fut` with `ctx` installed as the ambient context.
    pub async fn scope<F>(ctx: Arc<CorrelationContext>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(ctx, fut).await
    }

    /// The ambient context of the calling task, if any.
    pub fn current() -> Option<Arc<CorrelationContext>> {
        CURRENT.try_with(Arc::clone).ok()
    }

    /// Apply `f` to the ambient context without cloning it.
    pub fn with_current<R>(f: impl FnOnce(&CorrelationContext) -> R) -> Option<R> {
        CURRENT.try_with(|ctx| f(ctx)).ok()
    }
}

/// Carry the caller's ambient context (if any) into `fut`, typically before
/// handing it to `tokio::spawn`.
pub fn propagate<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let ctx = CorrelationContext::current();
    async move {
        match ctx {
            Some(ctx) => CURRENT.scope(ctx, fut).await,
            None => fut.await,
        }
    }
}
