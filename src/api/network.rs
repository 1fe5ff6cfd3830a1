// Service-Level API Endpoints
//
// Identity, liveness, and indexer checkpoint status.

use axum::{Extension, Json};

use super::helpers::{internal_error, ApiResult};
use super::types::{Health, Identity, IndexerStatus};
use super::ApiContext;
use crate::store::META_CHAIN_ID;

/// GET /
/// Identity document for service discovery.
pub async fn root() -> Json<Identity> {
    Json(Identity { name: "retrochain-indexer-api", version: "v1" })
}

/// GET /v1/health
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /v1/status
/// Chain identity and checkpoint straight from the meta table.
pub async fn status(Extension(ctx): Extension<ApiContext>) -> ApiResult<IndexerStatus> {
    let chain_id = ctx
        .store
        .meta_get(META_CHAIN_ID)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    let last_indexed_height = ctx
        .store
        .last_indexed_height()
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(IndexerStatus {
        db_path: ctx.db_path.clone(),
        chain_id,
        last_indexed_height,
    }))
}
