// Block API Endpoints

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;

use super::helpers::{
    bad_request, internal_error, is_truthy, not_found, parse_clamped, ApiResult, MAX_OFFSET,
};
use super::types::Paged;
use super::ApiContext;
use crate::store::{BlockSummary, Order};

/// GET /v1/blocks?limit=&offset=&order=
/// Paginated block list, newest first by default. Metadata columns only;
/// raw payloads are behind the single-block endpoint.
pub async fn list(
    Extension(ctx): Extension<ApiContext>,
    Query(q): Query<HashMap<String, String>>,
) -> ApiResult<Paged<BlockSummary>> {
    let limit = parse_clamped(&q, "limit", 20, 1, 200);
    let offset = parse_clamped(&q, "offset", 0, 0, MAX_OFFSET);
    let order = Order::parse_or(q.get("order").map(String::as_str), Order::Desc);

    let (total, items) = ctx
        .store
        .blocks(limit, offset, order)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(Paged { total, limit, offset, items }))
}

/// GET /v1/blocks/{height}?include_raw=
/// Single block. The verbatim `block_json` / `results_json` payloads are
/// included (parsed) only when `include_raw` is truthy.
pub async fn detail(
    Extension(ctx): Extension<ApiContext>,
    Path(height): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    let height: i64 = height
        .trim()
        .parse()
        .map_err(|_| bad_request("height must be an integer"))?;

    let row = ctx
        .store
        .block(height)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(not_found)?;

    let mut body = serde_json::to_value(&row).map_err(|e| internal_error(e.to_string()))?;
    let include_raw = q.get("include_raw").map(|v| is_truthy(v)).unwrap_or(false);
    if let Some(map) = body.as_object_mut() {
        if include_raw {
            // Parse the stored payloads for convenience; keep the raw
            // string if parsing fails.
            for key in ["block_json", "results_json"] {
                let parsed = map
                    .get(key)
                    .and_then(Value::as_str)
                    .and_then(|s| serde_json::from_str::<Value>(s).ok());
                if let Some(parsed) = parsed {
                    map.insert(key.to_string(), parsed);
                }
            }
        } else {
            map.remove("block_json");
            map.remove("results_json");
        }
    }
    Ok(Json(body))
}
