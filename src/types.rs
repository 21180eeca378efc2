//! Error types for Atrium
//!
//! The API surface reports errors in two broad classes: validation failures
//! (caller sent a bad or incomplete request) and store failures (the backing
//! data store rejected or failed the operation). Unknown-row lookups get
//! their own variant so routes can answer 404 instead of a misleading 500.

use hyper::StatusCode;
use thiserror::Error;

/// Errors produced by stores, services, and routes
#[derive(Error, Debug)]
pub enum AtriumError {
    /// Caller error: missing identifier, empty field set, malformed body
    #[error("{0}")]
    Validation(String),

    /// The referenced row or collection does not exist
    #[error("{0}")]
    NotFound(String),

    /// The backing store failed the operation
    #[error("{0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtriumError {
    /// HTTP status for this error class
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, AtriumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AtriumError::Validation("id is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AtriumError::NotFound("no such row".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AtriumError::Store("connection reset".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
