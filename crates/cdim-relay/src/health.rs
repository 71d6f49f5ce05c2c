//! Plain-HTTP responses for requests that are not WebSocket upgrades.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body served for `GET /`.
pub const HEALTH_BODY: &str = "CD IM chat server is running.\n";

/// `200 OK` with the liveness text.
pub fn ok() -> Response {
    HEALTH_BODY.into_response()
}

/// Empty `404 Not Found`.
pub fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
