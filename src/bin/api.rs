//! retrochain-indexer-api: read-only HTTP API over the indexer database.
//!
//! Serves explorer-friendly JSON endpoints. Never mutates the database; the
//! indexer process owns all writes.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use retrochain_indexer::api::{self, ApiContext};
use retrochain_indexer::config::{ApiConfig, CorsConfig};
use retrochain_indexer::store::Store;
use retrochain_indexer::telemetry::{init_tracing, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "retrochain-indexer-api", about = "Read API for the retrochain indexer DB")]
struct Args {
    /// Path to the SQLite database produced by the indexer
    #[arg(long, default_value = "~/.retrochain/indexer.sqlite")]
    db: String,

    /// host:port to listen on
    #[arg(long, default_value = "127.0.0.1:8081")]
    listen: String,

    /// Comma-separated Origin allowlist for browser CORS (or '*');
    /// falls back to INDEXER_API_CORS_ORIGINS, default: disabled
    #[arg(long)]
    cors_origins: Option<String>,

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

    let db_path = shellexpand::tilde(&args.db).into_owned();
    if !std::path::Path::new(&db_path).is_file() {
        eprintln!("DB not found: {}", db_path);
        std::process::exit(2);
    }

    // host:port, port must be numeric; the host part may be a name
    let listen_valid = args
        .listen
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);
    if !listen_valid {
        eprintln!("invalid --listen address: {}", args.listen);
        std::process::exit(2);
    }

    let cors_spec = args
        .cors_origins
        .or_else(|| std::env::var("INDEXER_API_CORS_ORIGINS").ok())
        .unwrap_or_default();
    let cfg = ApiConfig {
        db_path,
        listen: args.listen,
        cors: CorsConfig::from_list(&cors_spec),
    };
    if cfg.cors.is_enabled() {
        info!("CORS allowlist enabled");
    }

    let store = match Store::open_read_only(&cfg.db_path).await {
        Ok(store) => store,
        Err(e) => {
            error!("failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&cfg.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind {}: {}", cfg.listen, e);
            std::process::exit(2);
        }
    };
    info!("Indexer API listening on http://{}", cfg.listen);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let ctx = ApiContext { store, db_path: cfg.db_path.clone() };
    let app = api::router(ctx, cfg.cors.clone());
    if let Err(e) = api::serve(listener, app, cancel).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
