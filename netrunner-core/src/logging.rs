//! Tracing subscriber setup for binaries and examples

use tracing_subscriber::EnvFilter;

use crate::error::{NetworkError, NetworkResult};

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence; otherwise the netrunner crates log at `level`.
pub fn init_logging(level: &str) -> NetworkResult<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => {
            let directives = format!(
                "netrunner={level},netrunner_core={level},netrunner_process={level}",
                level = level.to_lowercase()
            );
            EnvFilter::try_new(&directives).map_err(|e| {
                NetworkError::configuration("log_level", format!("Invalid log level '{}': {}", level, e))
            })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| NetworkError::internal(format!("Failed to install tracing subscriber: {}", e)))
}
