//! Atrium - content API for the marketing site
//!
//! Serves the site's content collections (projects, team members, blog
//! posts, and the rest of the catalog) over a uniform REST surface, with
//! an order-resequencing protocol so the admin panel can persist
//! user-arranged display order.
//!
//! ## Services
//!
//! - **Content**: collection CRUD plus batch order updates
//! - **Cache**: per-collection list cache, reconciled in place on mutations
//! - **Store**: MongoDB in production, in-memory in dev mode and tests

pub mod cache;
pub mod catalog;
pub mod config;
pub mod normalize;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AtriumError, Result};
