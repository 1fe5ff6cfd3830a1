// Read API
//
// JSON over HTTP/1.1 backed by a read-only Store view. Handlers never
// mutate the database; every request runs on the shared read-only pool.
// Each endpoint domain lives in its own submodule.

pub mod blocks;
pub mod cors;
pub mod events;
pub mod helpers;
pub mod network;
pub mod transactions;
pub mod types;

#[cfg(test)]
mod api_tests;

use axum::{http::StatusCode, middleware, routing::get, Extension, Json, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::error::Result;
use crate::store::Store;
use self::types::ApiError;

/// Shared request context.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Store,
    pub db_path: String,
}

/// Build the router with all v1 routes, CORS, and request tracing.
pub fn router(ctx: ApiContext, cors: CorsConfig) -> Router {
    Router::new()
        .route("/", get(network::root))
        .route("/v1/health", get(network::health))
        .route("/v1/status", get(network::status))
        .route("/v1/blocks", get(blocks::list))
        .route("/v1/blocks/{height}", get(blocks::detail))
        .route("/v1/txs", get(transactions::list))
        .route("/v1/txs/{tx_hash}", get(transactions::detail))
        .route("/v1/events", get(events::list))
        .fallback(not_found_fallback)
        .layer(middleware::from_fn_with_state(cors, cors::apply))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(ctx))
}

/// Bind-and-serve until the token fires, then drain in-flight requests.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

// Unknown paths still answer with the stable JSON error shape.
async fn not_found_fallback() -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError::new("not found")))
}
