// API Type Definitions
//
// Serializable envelopes shared by the endpoint handlers. Row shapes come
// straight from the store module.

use serde::Serialize;

/// Standard list envelope: `{ total, limit, offset, items }`.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub items: Vec<T>,
}

/// Stable error body: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// GET / identity document.
#[derive(Debug, Serialize)]
pub struct Identity {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /v1/health body.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// GET /v1/status body.
#[derive(Debug, Serialize)]
pub struct IndexerStatus {
    pub db_path: String,
    pub chain_id: Option<String>,
    pub last_indexed_height: Option<i64>,
}
