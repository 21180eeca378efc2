//! In-memory list caching for the content API

pub mod store;

pub use store::{spawn_cleanup_task, CacheConfig, ContentCache};
