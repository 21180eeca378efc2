//! HTTP routes for Atrium

pub mod content;
pub mod health;

pub use content::handle_content_request;
pub use health::{health_check, readiness_check, version_info};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::AtriumError;

/// Serialize a body as a JSON response with permissive CORS
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// `{"error": "..."}` with the status class of the error
pub(crate) fn error_response(error: &AtriumError) -> Response<Full<Bytes>> {
    json_response(
        error.status_code(),
        &serde_json::json!({ "error": error.to_string() }),
    )
}
