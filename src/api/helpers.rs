// API Helper Functions
//
// Query-param parsing with clamping, and the shared JSON error responses.

use axum::{http::StatusCode, Json};
use std::collections::HashMap;

use super::types::ApiError;

/// Standard result type for API handlers.
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Offsets beyond this are pointless against any realistic chain.
pub const MAX_OFFSET: i64 = 10_000_000;

/// Parse an integer query param clamped to `[min, max]`. Absent, blank, or
/// non-numeric values silently fall back to `default`.
pub fn parse_clamped(
    q: &HashMap<String, String>,
    key: &str,
    default: i64,
    min: i64,
    max: i64,
) -> i64 {
    match q.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<i64>().map(|v| v.clamp(min, max)).unwrap_or(default),
        None => default,
    }
}

/// Non-empty trimmed string param.
pub fn parse_str(q: &HashMap<String, String>, key: &str) -> Option<String> {
    q.get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Height filters accept only ASCII-digit values; anything else is ignored
/// rather than an error.
pub fn parse_height_filter(q: &HashMap<String, String>, key: &str) -> Option<i64> {
    parse_str(q, key)
        .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
}

/// `include_raw`-style boolean params.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes")
}

/// 400 Bad Request with a JSON error body.
pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(message)))
}

/// 404 Not Found; the body is always `{"error": "not found"}`.
pub fn not_found() -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError::new("not found")))
}

/// 500 Internal Server Error with a JSON error body.
pub fn internal_error(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::new(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn clamps_to_bounds() {
        assert_eq!(parse_clamped(&q(&[("limit", "10000")]), "limit", 20, 1, 200), 200);
        assert_eq!(parse_clamped(&q(&[("limit", "-5")]), "limit", 20, 1, 200), 1);
        assert_eq!(parse_clamped(&q(&[("limit", "50")]), "limit", 20, 1, 200), 50);
    }

    #[test]
    fn falls_back_silently() {
        assert_eq!(parse_clamped(&q(&[]), "limit", 20, 1, 200), 20);
        assert_eq!(parse_clamped(&q(&[("limit", "")]), "limit", 20, 1, 200), 20);
        assert_eq!(parse_clamped(&q(&[("limit", "abc")]), "limit", 20, 1, 200), 20);
    }

    #[test]
    fn height_filter_requires_digits() {
        assert_eq!(parse_height_filter(&q(&[("height", "12")]), "height"), Some(12));
        assert_eq!(parse_height_filter(&q(&[("height", "-12")]), "height"), None);
        assert_eq!(parse_height_filter(&q(&[("height", "12x")]), "height"), None);
        assert_eq!(parse_height_filter(&q(&[]), "height"), None);
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("TRUE"));
        assert!(!is_truthy(""));
    }
}
