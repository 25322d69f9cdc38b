//! YAML network description consumed by the CLI
//!
//! ```yaml
//! name: local
//! log_level: INFO
//! genesis_file: genesis.json
//! health_timeout: 2m
//! stop_grace: 10s
//! nodes:
//!   - name: node1
//!     is_beacon: true
//!     binary_path: ./bin/node
//!     staking_key_file: keys/node1.key
//!     staking_cert_file: keys/node1.crt
//!   - binary_path: ./bin/node
//!     extra_args: ["--network-peer-list-gossip-frequency=250ms"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.
//! A bare `binary_path` without any directory component is left for the
//! OS to look up in `PATH`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use netrunner_core::error::{NetworkError, NetworkResult};
use netrunner_core::{ImplSpecificConfig, LocalNodeConfig, NetworkConfig, NodeConfig};

fn default_name() -> String {
    "netrunner".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_stop_grace() -> Duration {
    netrunner_core::DEFAULT_STOP_GRACE
}

/// A network as written in a YAML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkFile {
    #[serde(default = "default_name")]
    pub name: String,
    /// Log level handed to every node binary
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub genesis_file: PathBuf,
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_timeout: Duration,
    #[serde(default = "default_stop_grace", with = "humantime_serde")]
    pub stop_grace: Duration,
    /// Where network files are written; a temporary directory when unset
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
    /// Generated when empty
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_beacon: bool,
    pub binary_path: PathBuf,
    #[serde(default)]
    pub staking_key_file: Option<PathBuf>,
    #[serde(default)]
    pub staking_cert_file: Option<PathBuf>,
    #[serde(default)]
    pub api_port: Option<u16>,
    #[serde(default)]
    pub staking_port: Option<u16>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl NetworkFile {
    /// Parse a network description; paths are left as written
    pub fn from_yaml(source: &str) -> NetworkResult<Self> {
        serde_yaml::from_str(source)
            .map_err(|e| NetworkError::configuration("network file", format!("Invalid YAML: {}", e)))
    }

    /// Read and parse `path`, resolving relative paths against its directory
    pub fn load(path: &Path) -> NetworkResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            NetworkError::configuration(
                path.display().to_string(),
                format!("Failed to read network file: {}", e),
            )
        })?;
        let mut file = Self::from_yaml(&source)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.resolve_paths(base);
        Ok(file)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.genesis_file = resolve(base, &self.genesis_file);
        self.root_dir = self.root_dir.as_ref().map(|dir| resolve(base, dir));
        for node in &mut self.nodes {
            if node.binary_path.components().count() > 1 {
                node.binary_path = resolve(base, &node.binary_path);
            }
            node.staking_key_file = node.staking_key_file.as_ref().map(|p| resolve(base, p));
            node.staking_cert_file = node.staking_cert_file.as_ref().map(|p| resolve(base, p));
        }
    }

    /// Read the referenced genesis and staking files into a [`NetworkConfig`]
    pub fn to_network_config(&self) -> NetworkResult<NetworkConfig> {
        let genesis = read_file("genesis_file", &self.genesis_file)?;

        let node_configs = self
            .nodes
            .iter()
            .map(NodeEntry::to_node_config)
            .collect::<NetworkResult<Vec<_>>>()?;

        Ok(NetworkConfig {
            genesis,
            log_level: self.log_level.clone(),
            name: self.name.clone(),
            node_configs,
        })
    }
}

impl NodeEntry {
    fn to_node_config(&self) -> NetworkResult<NodeConfig> {
        let staking_key = match &self.staking_key_file {
            Some(path) => read_file("staking_key_file", path)?,
            None => Vec::new(),
        };
        let staking_cert = match &self.staking_cert_file {
            Some(path) => read_file("staking_cert_file", path)?,
            None => Vec::new(),
        };

        Ok(NodeConfig {
            name: self.name.clone(),
            is_beacon: self.is_beacon,
            staking_key,
            staking_cert,
            impl_specific: Some(ImplSpecificConfig::Local(LocalNodeConfig {
                binary_path: self.binary_path.clone(),
                api_port: self.api_port,
                staking_port: self.staking_port,
                extra_args: self.extra_args.clone(),
            })),
        })
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn read_file(field: &str, path: &Path) -> NetworkResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        NetworkError::configuration(field, format!("Failed to read {}: {}", path.display(), e))
    })
}
