//! Atrium - content API for the marketing site

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atrium::{
    config::Args,
    server,
    store::{ContentStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("atrium={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Atrium - Marketing Site Content API");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Cache TTL: {}s", args.cache_ttl_secs);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let store: Arc<dyn ContentStore> =
        match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                Arc::new(store)
            }
            Err(e) => {
                if args.dev_mode {
                    warn!(
                        "MongoDB connection failed (dev mode, using in-memory store): {}",
                        e
                    );
                    Arc::new(MemoryStore::new())
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    // Run the server
    let state = Arc::new(server::AppState::new(args, store));
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
