use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hangup::server::{MockServer, ServerConfig};
use hangup::{init_logging, LogConfig, LogFormat, LogLevel};
use tracing::info;

/// Mock server for disconnection-aware long-running responses.
#[derive(Debug, Parser)]
#[command(name = "hangup-server", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Duration in milliseconds when the request names none
    #[arg(long, default_value_t = 5000)]
    default_duration: u64,

    /// Longest duration in milliseconds a request may ask for
    #[arg(long, default_value_t = 600_000)]
    max_duration: u64,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
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

    let config = ServerConfig::default()
        .with_bind_addr(cli.bind)
        .with_default_duration(Duration::from_millis(cli.default_duration))
        .with_max_duration(Duration::from_millis(cli.max_duration));
    let server = MockServer::new(config);
    let (addr, task) = server
        .start()
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!("try: curl -N 'http://{}/mock?mode=heartbeat&duration=5000'", addr);

    let stopper = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(active = stopper.active_operations(), "shutting down");
            stopper.shutdown();
        }
    });

    task.await.context("server task panicked")?;
    Ok(())
}
