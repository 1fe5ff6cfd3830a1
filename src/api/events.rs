// Event API Endpoints

use axum::{extract::Query, Extension, Json};
use std::collections::HashMap;

use super::helpers::{
    internal_error, parse_clamped, parse_height_filter, parse_str, ApiResult, MAX_OFFSET,
};
use super::types::Paged;
use super::ApiContext;
use crate::store::{EventFilter, Order, StoredEvent};

/// GET /v1/events?height=&tx_hash=&type=&source=&limit=&offset=&order=
/// Paginated events with AND-composed filters, in stored (intra-height)
/// order by default.
pub async fn list(
    Extension(ctx): Extension<ApiContext>,
    Query(q): Query<HashMap<String, String>>,
) -> ApiResult<Paged<StoredEvent>> {
    let limit = parse_clamped(&q, "limit", 50, 1, 500);
    let offset = parse_clamped(&q, "offset", 0, 0, MAX_OFFSET);
    let order = Order::parse_or(q.get("order").map(String::as_str), Order::Asc);

    let filter = EventFilter {
        height: parse_height_filter(&q, "height"),
        tx_hash: parse_str(&q, "tx_hash").map(|h| h.to_uppercase()),
        event_type: parse_str(&q, "type"),
        source: parse_str(&q, "source"),
    };

    let (total, items) = ctx
        .store
        .events(limit, offset, order, &filter)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(Paged { total, limit, offset, items }))
}
