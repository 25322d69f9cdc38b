//! JSON-RPC client for a node's health endpoint

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use netrunner_core::error::{NetworkError, NetworkResult};
use netrunner_core::{ApiClient, ApiClientFactory};

const HEALTH_PATH: &str = "/ext/health";
const HEALTH_METHOD: &str = "health.health";

#[derive(Debug, Deserialize)]
struct RpcReply {
    result: Option<HealthResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct HealthResult {
    healthy: bool,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Extract the `healthy` flag from a health JSON-RPC reply body
pub fn parse_health_reply(body: &[u8]) -> NetworkResult<bool> {
    let reply: RpcReply = serde_json::from_slice(body)?;
    match (reply.result, reply.error) {
        (_, Some(err)) => Err(NetworkError::api(
            HEALTH_METHOD,
            format!("RPC error {}: {}", err.code, err.message),
        )),
        (Some(result), None) => Ok(result.healthy),
        (None, None) => Err(NetworkError::api(HEALTH_METHOD, "reply has neither result nor error")),
    }
}

/// Health client for one node's HTTP API
pub struct HttpApiClient {
    endpoint: String,
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpApiClient {
    pub fn new(host: &str, port: u16, request_timeout: Duration) -> NetworkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| NetworkError::api(host, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("http://{}:{}{}", host, port, HEALTH_PATH),
            client,
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn health(&self) -> NetworkResult<bool> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetworkError::api(&self.endpoint, "client is closed"));
        }

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": HEALTH_METHOD,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| NetworkError::api(&self.endpoint, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::api(&self.endpoint, e))?;

        // The endpoint answers 503 with a well-formed body while unhealthy
        if !status.is_success() && status != reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(NetworkError::api(&self.endpoint, format!("HTTP {}", status)));
        }

        let healthy = parse_health_reply(&body)?;
        debug!("{} reports healthy={}", self.endpoint, healthy);
        Ok(healthy)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Builds [`HttpApiClient`]s
#[derive(Debug, Clone, Default)]
pub struct HttpApiClientFactory;

impl ApiClientFactory for HttpApiClientFactory {
    fn new_client(&self, host: &str, port: u16, request_timeout: Duration) -> Arc<dyn ApiClient> {
        match HttpApiClient::new(host, port, request_timeout) {
            Ok(client) => Arc::new(client),
            Err(err) => Arc::new(UnavailableClient::new(host, port, &err)),
        }
    }
}

/// Stands in for a client whose construction failed; every call errors
struct UnavailableClient {
    endpoint: String,
    reason: String,
}

impl UnavailableClient {
    fn new(host: &str, port: u16, err: &NetworkError) -> Self {
        let endpoint = format!("http://{}:{}{}", host, port, HEALTH_PATH);
        warn!(
            "No HTTP client for {}, health checks will fail: {}",
            endpoint, err
        );
        Self {
            endpoint,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl ApiClient for UnavailableClient {
    async fn health(&self) -> NetworkResult<bool> {
        Err(NetworkError::api(
            &self.endpoint,
            format!("client unavailable: {}", self.reason),
        ))
    }

    async fn close(&self) {}
}
