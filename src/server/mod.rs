//! HTTP server for Atrium

pub mod http;

pub use http::{run, AppState};
