// Browser CORS
//
// Disabled unless an origin allowlist is configured. Every OPTIONS request
// answers 204 No Content; CORS headers are attached only when the request
// origin is allowlisted (or the allowlist holds `*`).

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;

pub async fn apply(State(cfg): State<CorsConfig>, req: Request, next: Next) -> Response {
    let allow = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .and_then(|origin| cfg.allow_origin(origin))
        .map(str::to_string);

    if req.method() == Method::OPTIONS {
        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::NO_CONTENT;
        write_cors_headers(resp.headers_mut(), allow.as_deref());
        return resp;
    }

    let mut resp = next.run(req).await;
    write_cors_headers(resp.headers_mut(), allow.as_deref());
    resp
}

fn write_cors_headers(headers: &mut HeaderMap, allow: Option<&str>) {
    let Some(origin) = allow else { return };
    let Ok(value) = HeaderValue::from_str(origin) else { return };
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
