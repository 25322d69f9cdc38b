//! Structural validation of network and node configuration
//!
//! Validation is a pure check and always runs to completion before any node
//! process is created.

use std::collections::HashSet;
use std::path::Path;

use crate::config::{ImplSpecificConfig, NetworkConfig, NodeConfig};
use crate::error::{NetworkError, NetworkResult};

/// Validate a whole network configuration
///
/// Applies [`validate_node_config`] to every node and additionally requires a
/// non-empty genesis, at least one beacon when any node is configured,
/// pairwise distinct explicit names and pairwise distinct explicit ports.
pub fn validate_network_config(config: &NetworkConfig) -> NetworkResult<()> {
    if config.genesis.is_empty() {
        return Err(NetworkError::validation("genesis", "genesis must not be empty"));
    }

    let mut seen = HashSet::new();
    let mut ports = HashSet::new();
    for (index, node) in config.node_configs.iter().enumerate() {
        validate_node_config(node).map_err(|err| match err {
            NetworkError::Validation { field, message } => NetworkError::Validation {
                field: format!("node_configs[{}].{}", index, field),
                message,
            },
            other => other,
        })?;

        if !node.name.is_empty() && !seen.insert(node.name.as_str()) {
            return Err(NetworkError::validation(
                format!("node_configs[{}].name", index),
                format!("repeated node name '{}'", node.name),
            ));
        }

        if let Some(local) = node.local_config() {
            for (field, port) in [("api_port", local.api_port), ("staking_port", local.staking_port)] {
                if let Some(port) = port {
                    if !ports.insert(port) {
                        return Err(NetworkError::validation(
                            format!("node_configs[{}].impl_specific.{}", index, field),
                            format!("port {} is used more than once", port),
                        ));
                    }
                }
            }
        }
    }

    if !config.node_configs.is_empty() && !config.node_configs.iter().any(|n| n.is_beacon) {
        return Err(NetworkError::validation(
            "node_configs",
            "at least one node must be a beacon",
        ));
    }

    Ok(())
}

/// Validate the rules that apply to a single node
pub fn validate_node_config(config: &NodeConfig) -> NetworkResult<()> {
    validate_node_name(&config.name)?;

    match &config.impl_specific {
        None => {
            return Err(NetworkError::validation(
                "impl_specific",
                "implementation-specific config is missing",
            ))
        }
        Some(ImplSpecificConfig::Other { backend, .. }) => {
            return Err(NetworkError::validation(
                "impl_specific",
                format!("expected local node config, got config for backend '{}'", backend),
            ))
        }
        Some(ImplSpecificConfig::Local(local)) => {
            if local.binary_path.as_os_str().is_empty() {
                return Err(NetworkError::validation(
                    "impl_specific.binary_path",
                    "binary path must not be empty",
                ));
            }
        }
    }

    match (config.staking_key.is_empty(), config.staking_cert.is_empty()) {
        (false, true) => Err(NetworkError::validation(
            "staking_cert",
            "staking key given without staking cert",
        )),
        (true, false) => Err(NetworkError::validation(
            "staking_key",
            "staking cert given without staking key",
        )),
        _ => Ok(()),
    }
}

/// Node names become directory names under the network root, so an
/// explicit name must be a single plain path component
fn validate_node_name(name: &str) -> NetworkResult<()> {
    if name.is_empty() {
        return Ok(());
    }

    let problem = if name.trim().is_empty() {
        Some("name must not be blank")
    } else if name == "." || name == ".." {
        Some("name must not be '.' or '..'")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name must not contain path separators")
    } else if Path::new(name).is_absolute() {
        Some("name must not be an absolute path")
    } else {
        None
    };

    match problem {
        Some(message) => Err(NetworkError::validation(
            "name",
            format!("invalid node name '{}': {}", name.escape_default(), message),
        )),
        None => Ok(()),
    }
}
