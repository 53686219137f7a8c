use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "branchctl")]
#[command(about = "Operator CLI for the branch loan service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "BRANCH_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the service health endpoint
    Health,
    /// Dump the metrics exposition
    Metrics {
        /// Only print samples of this metric family
        #[arg(short, long)]
        family: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            let status = res.status();
            let body: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                eprintln!("service unhealthy (HTTP {status})");
                std::process::exit(1);
            }
        }
        Commands::Metrics { family } => {
            let res = client.get(format!("{base}/metrics")).send().await?;
            let text = res.error_for_status()?.text().await?;
            for line in text.lines() {
                if selected(line, family.as_deref()) {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}

/// Whether an exposition line belongs to `family` (all lines when `None`).
fn selected(line: &str, family: Option<&str>) -> bool {
    let Some(family) = family else {
        return true;
    };
    let name = line
        .strip_prefix("# HELP ")
        .or_else(|| line.strip_prefix("# TYPE "))
        .unwrap_or(line);
    name.strip_prefix(family).is_some_and(|rest| {
        rest.is_empty()
            || rest.starts_with(['{', ' '])
            || ["_bucket", "_sum", "_count"]
                .iter()
                .any(|suffix| rest.starts_with(suffix))
    })
}
