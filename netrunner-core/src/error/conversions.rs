//! Error conversion implementations for NetworkError
//!
//! `From` implementations for the external error types that cross the crate
//! boundary, so `?` works on them directly.

use super::types::NetworkError;

// Serialization error conversions
impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        NetworkError::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for NetworkError {
    fn from(err: serde_yaml::Error) -> Self {
        NetworkError::serialization("yaml", err)
    }
}

// Certificate generation
impl From<rcgen::RcgenError> for NetworkError {
    fn from(err: rcgen::RcgenError) -> Self {
        NetworkError::Internal {
            message: format!("Certificate generation failed: {}", err),
        }
    }
}

// Async/Task error conversions
impl From<tokio::task::JoinError> for NetworkError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            NetworkError::Internal {
                message: "Task was cancelled".to_string(),
            }
        } else if err.is_panic() {
            NetworkError::Internal {
                message: "Task panicked".to_string(),
            }
        } else {
            NetworkError::Internal {
                message: format!("Task failed: {}", err),
            }
        }
    }
}
