//! Node process abstraction
//!
//! A [`NodeProcess`] wraps one invocation of a node binary. The orchestrator
//! only ever talks to processes through this trait, so the OS backend in
//! `netrunner-process` and the mocks used in tests are interchangeable.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NodeConfig;
use crate::error::NetworkResult;

/// Lifecycle of one external node process
///
/// Implementations use interior mutability: `wait` runs on its own task
/// while `stop` and `kill` may be called concurrently from the orchestrator.
#[async_trait]
pub trait NodeProcess: Send + Sync {
    /// Launch the process
    async fn start(&self) -> NetworkResult<()>;

    /// Suspend until the process exits
    ///
    /// Returns `Ok` for a clean exit or an exit requested through `stop` or
    /// `kill`, and an error for any other termination.
    async fn wait(&self) -> NetworkResult<()>;

    /// Ask the process to terminate
    ///
    /// Stopping a process that never started or already exited succeeds.
    async fn stop(&self) -> NetworkResult<()>;

    /// Terminate the process without giving it a chance to clean up
    async fn kill(&self) -> NetworkResult<()> {
        self.stop().await
    }
}

/// Creates the process for a node from its config and generated arguments
pub trait NodeProcessFactory: Send + Sync {
    fn new_process(&self, config: &NodeConfig, args: &[String])
        -> NetworkResult<Arc<dyn NodeProcess>>;
}

impl<F> NodeProcessFactory for F
where
    F: Fn(&NodeConfig, &[String]) -> NetworkResult<Arc<dyn NodeProcess>> + Send + Sync,
{
    fn new_process(
        &self,
        config: &NodeConfig,
        args: &[String],
    ) -> NetworkResult<Arc<dyn NodeProcess>> {
        self(config, args)
    }
}
