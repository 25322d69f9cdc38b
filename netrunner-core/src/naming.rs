//! Node name resolution
//!
//! Names are the primary external identifier of a node. Generated names are
//! never handed out twice over the lifetime of a network, even after the
//! node that carried them was removed. Explicit names only have to be unique
//! among the nodes currently present or being started.

use std::collections::HashSet;

use crate::config::NodeConfig;
use crate::error::{NetworkError, NetworkResult};

const GENERATED_NAME_PREFIX: &str = "node-";

/// Tracks which node names are in use and which were ever used
#[derive(Debug, Default)]
pub struct NameRegistry {
    /// Names of present nodes and nodes currently being started
    in_use: HashSet<String>,
    /// Every name this network has ever seen
    known: HashSet<String>,
    next_index: u64,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `requested`, or a fresh generated name when it is empty
    pub fn claim(&mut self, requested: &str) -> NetworkResult<String> {
        if requested.is_empty() {
            return Ok(self.claim_generated());
        }
        if self.in_use.contains(requested) {
            return Err(NetworkError::validation(
                "name",
                format!("a node named '{}' already exists", requested),
            ));
        }
        self.in_use.insert(requested.to_string());
        self.known.insert(requested.to_string());
        Ok(requested.to_string())
    }

    /// Resolve a name for every config of a batch, preserving order
    ///
    /// Explicit names are claimed first so that no generated name can take a
    /// name that appears later in the batch. On error nothing stays claimed.
    pub fn resolve_batch(&mut self, configs: &[NodeConfig]) -> NetworkResult<Vec<String>> {
        let mut claimed = Vec::new();
        for config in configs.iter().filter(|c| !c.name.is_empty()) {
            match self.claim(&config.name) {
                Ok(name) => claimed.push(name),
                Err(err) => {
                    for name in &claimed {
                        self.release(name);
                    }
                    return Err(err);
                }
            }
        }

        Ok(configs
            .iter()
            .map(|config| {
                if config.name.is_empty() {
                    self.claim_generated()
                } else {
                    config.name.clone()
                }
            })
            .collect())
    }

    /// Mark a name as no longer in use; it stays known
    pub fn release(&mut self, name: &str) {
        self.in_use.remove(name);
    }

    pub fn is_in_use(&self, name: &str) -> bool {
        self.in_use.contains(name)
    }

    fn claim_generated(&mut self) -> String {
        loop {
            self.next_index += 1;
            let candidate = format!("{}{}", GENERATED_NAME_PREFIX, self.next_index);
            if !self.known.contains(&candidate) {
                self.in_use.insert(candidate.clone());
                self.known.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(name: &str) -> NodeConfig {
        NodeConfig {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generated_names_are_distinct() {
        let mut registry = NameRegistry::new();
        let configs = vec![named(""), named(""), named(""), named("")];

        let names = registry.resolve_batch(&configs).unwrap();

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), 4);
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_generated_names_skip_later_explicit_names() {
        let mut registry = NameRegistry::new();
        let configs = vec![named(""), named("node-1"), named("")];

        let names = registry.resolve_batch(&configs).unwrap();

        assert_eq!(names, vec!["node-2", "node-1", "node-3"]);
    }

    #[test]
    fn test_explicit_duplicate_rejected_while_in_use() {
        let mut registry = NameRegistry::new();
        registry.claim("node0").unwrap();

        let err = registry.claim("node0").unwrap_err();
        assert!(err.is_validation());

        registry.release("node0");
        assert_eq!(registry.claim("node0").unwrap(), "node0");
    }

    #[test]
    fn test_generated_names_never_reused() {
        let mut registry = NameRegistry::new();
        let first = registry.claim("").unwrap();
        registry.release(&first);

        let second = registry.claim("").unwrap();
        assert_ne!(first, second);
        assert!(!registry.is_in_use(&first));
    }

    #[test]
    fn test_failed_batch_releases_claims() {
        let mut registry = NameRegistry::new();
        registry.claim("node1").unwrap();

        let err = registry
            .resolve_batch(&[named("node0"), named("node1")])
            .unwrap_err();

        assert!(err.is_validation());
        assert!(!registry.is_in_use("node0"));
        assert!(registry.is_in_use("node1"));
    }
}
