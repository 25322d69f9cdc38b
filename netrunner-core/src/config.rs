//! Network and node configuration
//!
//! These are plain in-memory inputs built by the caller (or by the CLI from a
//! YAML file). They are consumed once, at network construction or when a
//! node is added, and are never mutated by the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Declares a whole network
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkConfig {
    /// Opaque initial state handed to every node
    pub genesis: Vec<u8>,
    /// Log level passed to every node binary
    pub log_level: String,
    /// Display name
    pub name: String,
    /// Nodes started when the network is constructed, in order
    pub node_configs: Vec<NodeConfig>,
}

/// Declares one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeConfig {
    /// Unique node name; empty means "generate one"
    pub name: String,
    /// Whether other nodes bootstrap from this one
    pub is_beacon: bool,
    /// PEM private key; must be set together with `staking_cert`
    pub staking_key: Vec<u8>,
    /// PEM (or DER) certificate the node ID is derived from
    pub staking_cert: Vec<u8>,
    /// Backend-specific settings
    pub impl_specific: Option<ImplSpecificConfig>,
}

/// Backend-specific node settings
///
/// The local orchestrator only understands [`ImplSpecificConfig::Local`];
/// anything else is rejected during validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ImplSpecificConfig {
    Local(LocalNodeConfig),
    /// Settings addressed to a different backend
    Other {
        backend: String,
        payload: serde_json::Value,
    },
}

/// Settings for a node run as a local OS process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalNodeConfig {
    /// Path to the node binary
    pub binary_path: PathBuf,
    /// HTTP API port; a free loopback port is picked when unset
    pub api_port: Option<u16>,
    /// Staking (p2p) port; a free loopback port is picked when unset
    pub staking_port: Option<u16>,
    /// Appended verbatim to the generated command line
    pub extra_args: Vec<String>,
}

impl NodeConfig {
    /// A node run from `binary_path` with no name and fresh staking material
    pub fn local(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            impl_specific: Some(ImplSpecificConfig::Local(LocalNodeConfig {
                binary_path: binary_path.into(),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn beacon(mut self) -> Self {
        self.is_beacon = true;
        self
    }

    pub fn with_staking(mut self, key: Vec<u8>, cert: Vec<u8>) -> Self {
        self.staking_key = key;
        self.staking_cert = cert;
        self
    }

    /// The local payload, if this config carries one
    pub fn local_config(&self) -> Option<&LocalNodeConfig> {
        match &self.impl_specific {
            Some(ImplSpecificConfig::Local(local)) => Some(local),
            _ => None,
        }
    }

    pub fn has_staking(&self) -> bool {
        !self.staking_key.is_empty() && !self.staking_cert.is_empty()
    }
}

impl ImplSpecificConfig {
    /// Short label used in logs and validation messages
    pub fn backend(&self) -> &str {
        match self {
            ImplSpecificConfig::Local(_) => "local",
            ImplSpecificConfig::Other { backend, .. } => backend,
        }
    }
}
