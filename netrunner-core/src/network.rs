//! The network capability set

use async_trait::async_trait;
use std::time::Duration;

use crate::config::NodeConfig;
use crate::error::NetworkResult;
use crate::node::Node;

/// Grace period used when a caller has no opinion on how long nodes may take
/// to exit after being asked to stop
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Operations on a running network of nodes
///
/// Every operation fails with [`NetworkError::Stopped`](crate::error::NetworkError::Stopped)
/// once [`Network::stop`] has completed.
#[async_trait]
pub trait Network: Send + Sync {
    /// Start a new node and add it to the network
    async fn add_node(&self, config: NodeConfig) -> NetworkResult<Node>;

    /// Stop the node with this name and remove it
    async fn remove_node(&self, name: &str) -> NetworkResult<()>;

    /// Return the node with this name
    async fn get_node(&self, name: &str) -> NetworkResult<Node>;

    /// Names of all nodes currently in the network
    async fn get_nodes_names(&self) -> NetworkResult<Vec<String>>;

    /// Stop every node; processes still alive after `grace` are killed
    async fn stop(&self, grace: Duration) -> NetworkResult<()>;

    /// Resolve once the network has been stopped
    async fn stopped(&self);
}
