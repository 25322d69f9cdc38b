//! Orchestration of local validator-node test networks
//!
//! A [`LocalNetwork`] is built from a [`NetworkConfig`]: the configuration is
//! validated, unnamed nodes get generated names, and every node binary is
//! started through a [`NodeProcessFactory`]. Health is gated separately with
//! [`await_network_healthy`], and nodes can be added and removed while the
//! network runs.

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod local;
pub mod logging;
pub mod naming;
pub mod network;
pub mod node;
pub mod process;
pub mod staking;
pub mod validation;

pub use api::{ApiClient, ApiClientFactory};
pub use config::{ImplSpecificConfig, LocalNodeConfig, NetworkConfig, NodeConfig};
pub use error::{NetworkError, NetworkResult};
pub use health::{await_network_healthy, await_network_healthy_with_interval};
pub use local::{LocalNetwork, LocalNetworkOptions, NetworkStatus};
pub use network::{Network, DEFAULT_STOP_GRACE};
pub use node::Node;
pub use process::{NodeProcess, NodeProcessFactory};
pub use staking::NodeId;
