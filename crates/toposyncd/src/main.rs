//! Topology Synchronization Daemon
//!
//! Main entry point for toposyncd. Consumes switch/ISL lifecycle events from
//! a newline-delimited JSON feed (a file or stdin, typically a pipe from a
//! broker bridge) and maintains the in-memory topology graph.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use toposyncd::{
    Dispatcher, LineTransport, LogOnlyBackend, MetricsCollector, PersistenceWorker, Result,
    TopoSync, TopoSyncConfig, TopologyStore, ToposyncError,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Topology synchronization daemon.
#[derive(Debug, Parser)]
#[command(name = "toposyncd", version, about)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event feed path (newline-delimited JSON). Overrides config; defaults
    /// to stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the final topology snapshot as JSON on shutdown.
    #[arg(long)]
    dump_snapshot: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TopoSyncConfig::from_file(path)?,
        None => TopoSyncConfig::default(),
    }
    .apply_env()?;
    if cli.input.is_some() {
        config.input = cli.input.clone();
    }

    init_logging(&config)?;
    info!("toposyncd: starting topology synchronization daemon");

    match run_daemon(config, cli.dump_snapshot).await {
        Ok(()) => {
            info!("toposyncd: daemon exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "toposyncd: daemon exiting with error");
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}

/// Initialize structured logging.
fn init_logging(config: &TopoSyncConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| ToposyncError::Config(format!("bad log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| ToposyncError::Config(format!("failed to set logger: {e}")))?;

    Ok(())
}

/// Main daemon wiring: store, dispatcher, persistence worker, consumer loop.
async fn run_daemon(config: TopoSyncConfig, dump_snapshot: bool) -> Result<()> {
    let shutdown = setup_signal_handler();

    let store = Arc::new(TopologyStore::new());
    let metrics = MetricsCollector::new()?;

    let (applied_tx, worker) = PersistenceWorker::new(
        config.persistence_queue_capacity,
        Box::new(LogOnlyBackend),
        metrics.clone(),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let dispatcher = Dispatcher::new(store.clone(), metrics.clone()).with_applied_queue(applied_tx);
    let consumer = TopoSync::new(dispatcher, metrics, shutdown.clone());

    let summary = match &config.input {
        Some(path) => {
            info!(input = %path.display(), "toposyncd: reading event feed from file");
            let file = tokio::fs::File::open(path).await?;
            let mut transport = LineTransport::new(file);
            consumer.run(&mut transport).await
        }
        None => {
            info!("toposyncd: reading event feed from stdin");
            let mut transport = LineTransport::new(tokio::io::stdin());
            consumer.run(&mut transport).await
        }
    };

    // The consumer is done; let the worker drain whatever is queued.
    shutdown.cancel();
    let _ = worker_handle.await;

    info!(
        received = summary.received,
        applied = summary.applied,
        "toposyncd: graceful shutdown complete"
    );

    if dump_snapshot {
        let snapshot = store.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ToposyncError::Config(format!("snapshot serialization: {e}")))?;
        println!("{json}");
    }

    Ok(())
}

/// Cancels the returned token on SIGINT/SIGTERM.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("toposyncd: received shutdown signal");
            signal_token.cancel();
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["toposyncd"]);
        assert!(cli.config.is_none());
        assert!(cli.input.is_none());
        assert!(!cli.dump_snapshot);
    }

    #[test]
    fn test_cli_parses_input_override() {
        let cli = Cli::parse_from(["toposyncd", "--input", "/tmp/feed.ndjson", "--dump-snapshot"]);
        assert_eq!(cli.input, Some(PathBuf::from("/tmp/feed.ndjson")));
        assert!(cli.dump_snapshot);
    }
}
