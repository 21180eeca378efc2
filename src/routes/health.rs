//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - Liveness (is the service running?)
//! - /ready, /readyz - Readiness (can the store be reached?)
//! - /version - Build info for deployment verification
//!
//! Liveness always answers 200 while the process is up. Readiness pings the
//! store; in dev mode on the in-memory store that is always healthy.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::json_response;
use crate::server::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    /// Operating mode: "development" or "production"
    pub mode: String,
    pub node_id: String,
    pub collections: usize,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub store: StoreHealth,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
}

/// GET /health - liveness probe
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let body = HealthResponse {
        healthy: true,
        version: VERSION,
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        collections: crate::catalog::COLLECTIONS.len(),
    };
    json_response(StatusCode::OK, &body)
}

/// GET /ready - readiness probe; 503 when the store is unreachable
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.ping().await {
        Ok(()) => json_response(
            StatusCode::OK,
            &ReadyResponse {
                ready: true,
                store: StoreHealth {
                    connected: true,
                    error: None,
                },
            },
        ),
        Err(e) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &ReadyResponse {
                ready: false,
                store: StoreHealth {
                    connected: false,
                    error: Some(e.to_string()),
                },
            },
        ),
    }
}

/// GET /version - build info stamped by build.rs
pub fn version_info() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: VERSION,
            commit: env!("GIT_COMMIT_SHORT"),
            built_at: env!("BUILD_TIMESTAMP"),
        },
    )
}
