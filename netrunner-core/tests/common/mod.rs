//! Mocks and fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use netrunner_core::staking::new_cert_and_key;
use netrunner_core::{
    ApiClient, ApiClientFactory, ImplSpecificConfig, LocalNodeConfig, NetworkConfig,
    NetworkError, NetworkResult, NodeConfig, NodeProcess, NodeProcessFactory,
};

/// Call counts shared by every process a factory creates
#[derive(Debug, Default)]
pub struct ProcessCounters {
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub killed: AtomicUsize,
}

impl ProcessCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn killed(&self) -> usize {
        self.killed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessBehavior {
    /// Starts, and exits when stopped
    Successful,
    /// Start returns an error
    FailedStart,
    /// Starts, ignores stop and only exits when killed
    IgnoresStop,
}

pub struct MockProcess {
    behavior: ProcessBehavior,
    counters: Arc<ProcessCounters>,
    exited: watch::Sender<bool>,
}

impl MockProcess {
    pub fn new(behavior: ProcessBehavior, counters: Arc<ProcessCounters>) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        let (exited, _) = watch::channel(false);
        Self {
            behavior,
            counters,
            exited,
        }
    }
}

#[async_trait]
impl NodeProcess for MockProcess {
    async fn start(&self) -> NetworkResult<()> {
        if self.behavior == ProcessBehavior::FailedStart {
            return Err(NetworkError::process("mock", "start", "Start failed"));
        }
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait(&self) -> NetworkResult<()> {
        let mut rx = self.exited.subscribe();
        let _ = rx.wait_for(|exited| *exited).await;
        Ok(())
    }

    async fn stop(&self) -> NetworkResult<()> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        if self.behavior != ProcessBehavior::IgnoresStop {
            self.exited.send_replace(true);
        }
        Ok(())
    }

    async fn kill(&self) -> NetworkResult<()> {
        self.counters.killed.fetch_add(1, Ordering::SeqCst);
        self.exited.send_replace(true);
        Ok(())
    }
}

/// Creates mock processes; optionally the `fail_at`-th process (0-based)
/// fails to start
pub struct MockProcessFactory {
    pub behavior: ProcessBehavior,
    pub fail_at: Option<usize>,
    pub counters: Arc<ProcessCounters>,
}

impl MockProcessFactory {
    pub fn new(behavior: ProcessBehavior) -> Self {
        Self {
            behavior,
            fail_at: None,
            counters: Arc::new(ProcessCounters::default()),
        }
    }

    pub fn successful() -> Self {
        Self::new(ProcessBehavior::Successful)
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::successful()
        }
    }

    pub fn counters(&self) -> Arc<ProcessCounters> {
        Arc::clone(&self.counters)
    }
}

impl NodeProcessFactory for MockProcessFactory {
    fn new_process(
        &self,
        _config: &NodeConfig,
        _args: &[String],
    ) -> NetworkResult<Arc<dyn NodeProcess>> {
        let behavior = match self.fail_at {
            Some(index) if index == self.counters.created() => ProcessBehavior::FailedStart,
            _ => self.behavior,
        };
        Ok(Arc::new(MockProcess::new(behavior, Arc::clone(&self.counters))))
    }
}

/// API client whose health answers are scripted
pub struct MockApiClient {
    healthy: bool,
    failures_before_answer: AtomicUsize,
    closed: AtomicBool,
    pub health_calls: AtomicUsize,
}

impl MockApiClient {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy,
            failures_before_answer: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            health_calls: AtomicUsize::new(0),
        }
    }

    /// Fails the first `failures` health calls, then answers `healthy`
    pub fn flaky(healthy: bool, failures: usize) -> Self {
        let client = Self::new(healthy);
        client.failures_before_answer.store(failures, Ordering::SeqCst);
        client
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn health(&self) -> NetworkResult<bool> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(NetworkError::api("mock", "client closed"));
        }
        let remaining = self.failures_before_answer.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_answer.store(remaining - 1, Ordering::SeqCst);
            return Err(NetworkError::api("mock", "connection refused"));
        }
        Ok(self.healthy)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// API client whose health call never answers
pub struct HangingApiClient;

#[async_trait]
impl ApiClient for HangingApiClient {
    async fn health(&self) -> NetworkResult<bool> {
        futures::future::pending::<()>().await;
        Ok(false)
    }

    async fn close(&self) {}
}

/// Every client hangs on health calls
pub fn hanging_api() -> impl ApiClientFactory {
    |_host: &str, _port: u16, _timeout: Duration| -> Arc<dyn ApiClient> { Arc::new(HangingApiClient) }
}

/// Every client reports healthy
pub fn healthy_api() -> impl ApiClientFactory {
    |_host: &str, _port: u16, _timeout: Duration| -> Arc<dyn ApiClient> {
        Arc::new(MockApiClient::new(true))
    }
}

/// Every client reports unhealthy
pub fn unhealthy_api() -> impl ApiClientFactory {
    |_host: &str, _port: u16, _timeout: Duration| -> Arc<dyn ApiClient> {
        Arc::new(MockApiClient::new(false))
    }
}

/// Every client fails its first `failures` calls, then reports healthy
pub fn flaky_api(failures: usize) -> impl ApiClientFactory {
    move |_host: &str, _port: u16, _timeout: Duration| -> Arc<dyn ApiClient> {
        Arc::new(MockApiClient::flaky(true, failures))
    }
}

/// A valid network config without nodes
pub fn empty_network_config() -> NetworkConfig {
    NetworkConfig {
        genesis: br#"{"networkID":1337}"#.to_vec(),
        log_level: "DEBUG".to_string(),
        name: "My Network".to_string(),
        node_configs: Vec::new(),
    }
}

/// A three node network with fresh staking material; `node0` is the beacon
pub fn default_network_config() -> NetworkConfig {
    let mut config = empty_network_config();
    for i in 0..3 {
        let material = new_cert_and_key().expect("staking material");
        config.node_configs.push(NodeConfig {
            name: format!("node{}", i),
            is_beacon: i == 0,
            staking_key: material.key_pem,
            staking_cert: material.cert_pem,
            impl_specific: Some(ImplSpecificConfig::Local(LocalNodeConfig {
                binary_path: "pepito".into(),
                ..Default::default()
            })),
        });
    }
    config
}
