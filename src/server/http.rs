//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! flat `(method, path)` match: probes first, then the `/api/{collection}`
//! content surface.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cache::{self, CacheConfig, ContentCache};
use crate::config::Args;
use crate::routes;
use crate::services::ContentService;
use crate::store::ContentStore;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Storage backend; MongoDB in production, in-memory in dev mode
    pub store: Arc<dyn ContentStore>,
    /// List cache, reconciled in place on mutations
    pub cache: Arc<ContentCache>,
    /// Content operations over store + cache
    pub content: ContentService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn ContentStore>) -> Self {
        let cache = Arc::new(ContentCache::new(CacheConfig {
            ttl: std::time::Duration::from_secs(args.cache_ttl_secs),
            ..Default::default()
        }));
        let content = ContentService::new(Arc::clone(&store), Arc::clone(&cache));

        Self {
            args,
            store,
            cache,
            content,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Atrium listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    // Start cache cleanup task
    cache::spawn_cleanup_task(Arc::clone(&state.cache));
    info!(
        "Content cache enabled (ttl {}s)",
        state.cache.config().ttl.as_secs()
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if the service is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - returns 200 only if the store is reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Content collections
        (_, p) if p.starts_with("/api/") => {
            return Ok(routes::handle_content_request(req, Arc::clone(&state), &path).await);
        }

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "Content collections are served under /api/{collection}"
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
