//! Node API client abstraction

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::NetworkResult;

/// Client bound to one node's API endpoint
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Whether the node reports itself healthy
    async fn health(&self) -> NetworkResult<bool>;

    /// Release any persistent connection held by the client
    async fn close(&self);
}

/// Builds an API client for `host:port`
pub trait ApiClientFactory: Send + Sync {
    fn new_client(&self, host: &str, port: u16, request_timeout: Duration) -> Arc<dyn ApiClient>;
}

impl<F> ApiClientFactory for F
where
    F: Fn(&str, u16, Duration) -> Arc<dyn ApiClient> + Send + Sync,
{
    fn new_client(&self, host: &str, port: u16, request_timeout: Duration) -> Arc<dyn ApiClient> {
        self(host, port, request_timeout)
    }
}
