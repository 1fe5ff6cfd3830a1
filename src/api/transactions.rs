// Transaction API Endpoints

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;

use super::helpers::{
    internal_error, not_found, parse_clamped, parse_height_filter, ApiResult, MAX_OFFSET,
};
use super::types::Paged;
use super::ApiContext;
use crate::store::{Order, TxSummary};

/// GET /v1/txs?limit=&offset=&order=&height=
/// Paginated transaction list; a numeric `height` restricts it to one block.
pub async fn list(
    Extension(ctx): Extension<ApiContext>,
    Query(q): Query<HashMap<String, String>>,
) -> ApiResult<Paged<TxSummary>> {
    let limit = parse_clamped(&q, "limit", 50, 1, 500);
    let offset = parse_clamped(&q, "offset", 0, 0, MAX_OFFSET);
    let order = Order::parse_or(q.get("order").map(String::as_str), Order::Desc);
    let height = parse_height_filter(&q, "height");

    let (total, items) = ctx
        .store
        .txs(limit, offset, order, height)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(Paged { total, limit, offset, items }))
}

/// GET /v1/txs/{tx_hash}
/// Single transaction joined with its block time. The stored `events_json`
/// is returned as a parsed `events` array.
pub async fn detail(
    Extension(ctx): Extension<ApiContext>,
    Path(tx_hash): Path<String>,
) -> ApiResult<Value> {
    let tx_hash = tx_hash.trim().to_uppercase();

    let row = ctx
        .store
        .tx(&tx_hash)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(not_found)?;

    let mut body = serde_json::to_value(&row).map_err(|e| internal_error(e.to_string()))?;
    if let Some(map) = body.as_object_mut() {
        let events = map
            .remove("events_json")
            .and_then(|v| v.as_str().and_then(|s| serde_json::from_str::<Value>(s).ok()))
            .unwrap_or_else(|| Value::Array(Vec::new()));
        map.insert("events".to_string(), events);
    }
    Ok(Json(body))
}
