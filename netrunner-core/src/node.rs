//! Node handles handed out by a network

use std::fmt;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::staking::NodeId;

/// A node of a running network
///
/// This is a cheap, cloneable view. The process behind it stays owned by the
/// network; once the node is removed the API client is closed and the handle
/// should be dropped.
#[derive(Clone)]
pub struct Node {
    name: String,
    node_id: NodeId,
    is_beacon: bool,
    api_host: String,
    api_port: u16,
    staking_port: u16,
    api: Arc<dyn ApiClient>,
}

impl Node {
    pub(crate) fn new(
        name: String,
        node_id: NodeId,
        is_beacon: bool,
        api_host: String,
        api_port: u16,
        staking_port: u16,
        api: Arc<dyn ApiClient>,
    ) -> Self {
        Self {
            name,
            node_id,
            is_beacon,
            api_host,
            api_port,
            staking_port,
            api,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn is_beacon(&self) -> bool {
        self.is_beacon
    }

    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    pub fn staking_port(&self) -> u16 {
        self.staking_port
    }

    /// Base URI of the node's HTTP API
    pub fn api_uri(&self) -> String {
        format!("http://{}:{}", self.api_host, self.api_port)
    }

    /// Address other nodes use to bootstrap from this one
    pub fn staking_address(&self) -> String {
        format!("{}:{}", self.api_host, self.staking_port)
    }

    pub fn api(&self) -> &Arc<dyn ApiClient> {
        &self.api
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("node_id", &self.node_id.to_string())
            .field("is_beacon", &self.is_beacon)
            .field("api_uri", &self.api_uri())
            .field("staking_port", &self.staking_port)
            .finish()
    }
}
