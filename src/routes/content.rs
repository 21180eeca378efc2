//! Collection CRUD endpoints
//!
//! ## Endpoints
//!
//! - `GET /api/{collection}` - Rows in display order (`?refresh=true` bypasses the cache)
//! - `POST /api/{collection}` - Create a row from the JSON body
//! - `PUT /api/{collection}` - Update the row named by `id` in the JSON body
//! - `DELETE /api/{collection}` - Delete the row named by `id` in the JSON body
//! - `PUT /api/{collection}/batch-update-order` - Persist `[{id, order}]` pairs
//!
//! One handler serves every collection in the catalog; the per-type editors
//! in the admin panel all speak this same surface. There is no
//! authentication on any endpoint.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::{error_response, json_response};
use crate::server::AppState;
use crate::types::AtriumError;

/// Main handler for /api/{collection} routes
pub async fn handle_content_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();

    let subpath = path.strip_prefix("/api/").unwrap_or("");
    let (collection, tail) = match subpath.split_once('/') {
        Some((collection, tail)) => (collection.to_string(), tail.trim_end_matches('/')),
        None => (subpath.trim_end_matches('/').to_string(), ""),
    };

    if collection.is_empty() {
        return error_response(&AtriumError::NotFound("Missing collection name".into()));
    }

    match (method, tail) {
        (Method::GET, "") => {
            let refresh = wants_refresh(req.uri().query());
            match state.content.list(&collection, refresh).await {
                Ok(rows) => json_response(StatusCode::OK, &rows),
                Err(e) => error_response(&e),
            }
        }

        (Method::POST, "") => match read_json(req).await {
            Ok(body) => match state.content.create(&collection, body).await {
                Ok(row) => json_response(StatusCode::CREATED, &row),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        (Method::PUT, "") => match read_json(req).await {
            Ok(body) => match state.content.update(&collection, body).await {
                Ok(row) => json_response(StatusCode::OK, &row),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        (Method::DELETE, "") => match read_json(req).await {
            Ok(body) => match state.content.delete(&collection, body).await {
                Ok(row) => json_response(StatusCode::OK, &delete_envelope(row)),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        (Method::PUT, "batch-update-order") => match read_json(req).await {
            Ok(body) => match state.content.resequence(&collection, body).await {
                Ok(updated) => json_response(StatusCode::OK, &resequence_envelope(updated)),
                Err(e) => error_response(&e),
            },
            Err(e) => error_response(&e),
        },

        _ => error_response(&AtriumError::NotFound(format!("No route for {}", path))),
    }
}

/// Delete acknowledgement carrying the removed row
fn delete_envelope(row: Value) -> Value {
    serde_json::json!({ "success": true, "row": row })
}

/// Batch order acknowledgement with the number of rows written
fn resequence_envelope(updated: usize) -> Value {
    serde_json::json!({ "success": true, "updated": updated })
}

/// Collect and parse the request body as JSON
async fn read_json(req: Request<Incoming>) -> crate::types::Result<Value> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| {
            warn!("Failed to read request body: {}", e);
            AtriumError::Validation("Invalid body".into())
        })?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|_| AtriumError::Validation("Invalid JSON".into()))
}

/// `?refresh=true` (or `refresh=1`) forces a store read
fn wants_refresh(query: Option<&str>) -> bool {
    let Some(query) = query else { return false };
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "refresh" {
                let value = urlencoding::decode(value).unwrap_or_default();
                return value == "true" || value == "1";
            }
        } else if pair == "refresh" {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_envelope_carries_row() {
        let envelope = delete_envelope(json!({"id": "a", "order": 1, "title": "x"}));
        assert_eq!(
            envelope,
            json!({"success": true, "row": {"id": "a", "order": 1, "title": "x"}})
        );
    }

    #[test]
    fn test_resequence_envelope_reports_count() {
        assert_eq!(
            resequence_envelope(3),
            json!({"success": true, "updated": 3})
        );
    }

    #[test]
    fn test_wants_refresh() {
        assert!(wants_refresh(Some("refresh=true")));
        assert!(wants_refresh(Some("refresh=1")));
        assert!(wants_refresh(Some("refresh")));
        assert!(wants_refresh(Some("a=b&refresh=true")));
        assert!(!wants_refresh(Some("refresh=false")));
        assert!(!wants_refresh(Some("a=b")));
        assert!(!wants_refresh(None));
    }
}
