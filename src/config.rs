//! Configuration for Atrium
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Atrium - content API for the marketing site and its admin panel
#[derive(Parser, Debug, Clone)]
#[command(name = "atrium")]
#[command(about = "Content API for the Atrium marketing site")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "atrium")]
    pub mongodb_db: String,

    /// Enable development mode (falls back to the in-memory store when
    /// MongoDB is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds a cached collection list stays servable
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "30")]
    pub cache_ttl_secs: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.mongodb_uri.is_empty() {
            return Err("MONGODB_URI must not be empty".to_string());
        }
        if self.mongodb_db.is_empty() {
            return Err("MONGODB_DB must not be empty".to_string());
        }
        Ok(())
    }
}
