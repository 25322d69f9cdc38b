//! Core error type for netrunner

use std::time::Duration;
use thiserror::Error;

/// Error type for every network, node and backend operation
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Returned by every operation once the network has been stopped
    #[error("network stopped")]
    Stopped,

    // Configuration Errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error in {component}: {message}")]
    ConfigurationError { component: String, message: String },

    // Membership Errors
    #[error("Node not found: {name}")]
    NodeNotFound { name: String },

    // Runtime Errors
    #[error("Failed to start node '{name}'")]
    Startup {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Process operation '{operation}' failed for node '{name}': {details}")]
    Process {
        name: String,
        operation: String,
        details: String,
    },

    #[error("API call to {endpoint} failed: {details}")]
    Api { endpoint: String, details: String },

    #[error("Network not healthy after {timeout:?}, unhealthy nodes: {}", .unhealthy.join(", "))]
    HealthTimeout {
        timeout: Duration,
        unhealthy: Vec<String>,
    },

    #[error("Failed to stop {} node(s): {}", .failures.len(), format_failures(.failures))]
    ShutdownFailed { failures: Vec<(String, NetworkError)> },

    // Serialization & IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization operation '{operation}' failed")]
    Serialization {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Render `(node, error)` pairs as a single line
pub fn format_failures(failures: &[(String, NetworkError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;
