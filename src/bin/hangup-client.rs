use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hangup::client::{ClientConfig, Orchestrator};
use hangup::types::Mode;
use hangup::{init_logging, LogConfig, LogFormat, LogLevel, OperationOutcome};
use tracing::{info, warn};
use url::Url;

/// Drive the mock server and print every state transition.
#[derive(Debug, Parser)]
#[command(name = "hangup-client", version, about)]
struct Cli {
    /// Server root
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    url: Url,

    /// Response mode: signal, stream, heartbeat or chunked
    #[arg(long, default_value = "signal")]
    mode: Mode,

    /// Simulated work in milliseconds
    #[arg(long, default_value_t = 5000)]
    duration: u64,

    /// Cancel the operation after this many milliseconds
    #[arg(long)]
    cancel_after: Option<u64>,

    /// Start a second operation after this many milliseconds
    #[arg(long)]
    supersede_after: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: LogLevel,

    /// Log format: json, pretty or compact
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig {
        level: cli.log_level,
        format: cli.log_format,
        ..LogConfig::default()
    })?;

    let client = Orchestrator::new(ClientConfig::default().with_base_url(cli.url.clone()))
        .context("failed to build HTTP client")?;
    let duration = Duration::from_millis(cli.duration);

    let mut updates = client.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "failed to render snapshot"),
            }
        }
    });

    let first = tokio::spawn(client.begin(cli.mode, duration).run());

    if let Some(ms) = cli.cancel_after {
        let client = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            client.cancel();
        });
    }

    {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted");
                client.cancel();
            }
        });
    }

    let second = match cli.supersede_after {
        Some(ms) => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            info!("starting a superseding operation");
            Some(tokio::spawn(client.begin(cli.mode, duration).run()))
        },
        None => None,
    };

    let mut outcome = first.await.context("operation task panicked")?;
    if let Some(second) = second {
        outcome = second.await.context("operation task panicked")?;
    }
    drop(client);
    printer.abort();

    match outcome {
        OperationOutcome::Completed(completion) => println!("{}", completion.message),
        OperationOutcome::Cancelled => println!("cancelled"),
        OperationOutcome::Failed(kind) => anyhow::bail!("operation failed: {}", kind),
    }
    Ok(())
}
