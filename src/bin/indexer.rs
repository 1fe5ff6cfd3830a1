//! retrochain-indexer: block ingestion worker.
//!
//! Polls CometBFT RPC and materializes blocks, transactions, and ABCI
//! events into the local SQLite database. Resumable and reindex-safe.

use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use retrochain_indexer::config::IndexerConfig;
use retrochain_indexer::indexer::Indexer;
use retrochain_indexer::telemetry::{init_tracing, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "retrochain-indexer", about = "CometBFT block ingestion indexer")]
struct Args {
    /// CometBFT RPC base URL
    #[arg(long, default_value = "http://localhost:26657")]
    rpc: String,

    /// Path to the SQLite database
    #[arg(long, default_value = "~/.retrochain/indexer.sqlite")]
    db: String,

    /// Tail poll interval in seconds (floored at 0.5)
    #[arg(long, default_value_t = 2.0)]
    poll_seconds: f64,

    /// First height to index, overriding the stored checkpoint
    #[arg(long)]
    start_height: Option<i64>,

    /// Per-request RPC timeout in seconds
    #[arg(long, default_value_t = 15.0)]
    timeout_seconds: f64,

    /// Log format: pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Optional log file (rotated daily)
    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let telemetry = TelemetryConfig {
        log_format: args.log_format.clone(),
        log_file: args.log_file.clone(),
        ..TelemetryConfig::default()
    };
    if let Err(e) = init_tracing(telemetry) {
        eprintln!("invalid logging configuration: {}", e);
        std::process::exit(2);
    }

    if let Some(h) = args.start_height {
        if h < 1 {
            eprintln!("--start-height must be >= 1");
            std::process::exit(2);
        }
    }
    if !args.poll_seconds.is_finite() || args.poll_seconds <= 0.0 {
        eprintln!("--poll-seconds must be a positive number");
        std::process::exit(2);
    }
    if !args.timeout_seconds.is_finite() || args.timeout_seconds <= 0.0 {
        eprintln!("--timeout-seconds must be a positive number");
        std::process::exit(2);
    }

    let cfg = IndexerConfig {
        rpc_url: args.rpc,
        db_path: shellexpand::tilde(&args.db).into_owned(),
        poll_interval: Duration::from_secs_f64(args.poll_seconds.max(0.5)),
        start_height: args.start_height,
        request_timeout: Duration::from_secs_f64(args.timeout_seconds),
    };

    info!(db = %cfg.db_path, rpc = %cfg.rpc_url, "starting retrochain-indexer");

    let indexer = match Indexer::connect(cfg).await {
        Ok(indexer) => indexer,
        Err(e) => {
            error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    if let Err(e) = indexer.run(cancel).await {
        error!("indexer stopped: {}", e);
        std::process::exit(1);
    }
}
