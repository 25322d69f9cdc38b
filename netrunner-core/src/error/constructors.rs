//! Constructor methods and predicates for NetworkError

use super::types::NetworkError;

impl NetworkError {
    /// Create a validation error for a configuration field
    ///
    /// # Examples
    /// ```rust
    /// use netrunner_core::error::NetworkError;
    ///
    /// let err = NetworkError::validation("genesis", "must not be empty");
    /// assert!(err.is_validation());
    /// ```
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NetworkError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error for a component
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        NetworkError::ConfigurationError {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn node_not_found(name: impl Into<String>) -> Self {
        NetworkError::NodeNotFound { name: name.into() }
    }

    /// Wrap the error that prevented a node from starting
    pub fn startup<E: std::error::Error + Send + Sync + 'static>(
        name: impl Into<String>,
        source: E,
    ) -> Self {
        NetworkError::Startup {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Create a process error with node name and operation
    pub fn process(
        name: impl Into<String>,
        operation: impl Into<String>,
        details: impl std::fmt::Display,
    ) -> Self {
        NetworkError::Process {
            name: name.into(),
            operation: operation.into(),
            details: details.to_string(),
        }
    }

    /// Create an API error for an endpoint
    pub fn api(endpoint: impl Into<String>, details: impl std::fmt::Display) -> Self {
        NetworkError::Api {
            endpoint: endpoint.into(),
            details: details.to_string(),
        }
    }

    /// Create a Serialization error with a boxed source
    pub fn serialization<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        NetworkError::Serialization {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        NetworkError::Internal {
            message: message.into(),
        }
    }

    /// True for the stopped-network sentinel
    pub fn is_stopped(&self) -> bool {
        matches!(self, NetworkError::Stopped)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::NodeNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, NetworkError::Validation { .. })
    }
}
