//! Services layer for Atrium
//!
//! Business logic sits here, between the HTTP routes and the store, so it
//! can be exercised in tests without constructing hyper requests.

pub mod content;

pub use content::ContentService;
