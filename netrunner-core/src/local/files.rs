//! On-disk layout of a local network
//!
//! ```text
//! <root>/
//!   genesis.json
//!   <node name>/
//!     staking.key
//!     staking.crt
//!     db/
//!     logs/
//! ```

use std::net::TcpListener;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};

const GENESIS_FILE: &str = "genesis.json";
const STAKING_KEY_FILE: &str = "staking.key";
const STAKING_CERT_FILE: &str = "staking.crt";

/// Root directory holding every file of a network
#[derive(Debug)]
pub struct NetworkDir {
    root: PathBuf,
    // Removes the directory when the network is dropped
    _temp: Option<TempDir>,
}

/// Files written for one node
#[derive(Debug, Clone)]
pub struct NodeFiles {
    pub staking_key: PathBuf,
    pub staking_cert: PathBuf,
    pub db_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl NetworkDir {
    /// Use `root` if given, otherwise a fresh temporary directory
    pub fn create(root: Option<&Path>) -> NetworkResult<Self> {
        match root {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                Ok(Self {
                    root: path.to_path_buf(),
                    _temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new().prefix("netrunner-").tempdir()?;
                Ok(Self {
                    root: temp.path().to_path_buf(),
                    _temp: Some(temp),
                })
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_genesis(&self, genesis: &[u8]) -> NetworkResult<PathBuf> {
        let path = self.root.join(GENESIS_FILE);
        std::fs::write(&path, genesis)?;
        Ok(path)
    }

    /// Create the node's directories and write its staking material
    pub fn write_node_files(
        &self,
        name: &str,
        staking_key: &[u8],
        staking_cert: &[u8],
    ) -> NetworkResult<NodeFiles> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(NetworkError::validation(
                    "name",
                    format!("node name '{}' is not a plain directory name", name),
                ))
            }
        }

        let node_dir = self.root.join(name);
        let files = NodeFiles {
            staking_key: node_dir.join(STAKING_KEY_FILE),
            staking_cert: node_dir.join(STAKING_CERT_FILE),
            db_dir: node_dir.join("db"),
            log_dir: node_dir.join("logs"),
        };

        std::fs::create_dir_all(&files.db_dir)?;
        std::fs::create_dir_all(&files.log_dir)?;
        std::fs::write(&files.staking_key, staking_key)?;
        std::fs::write(&files.staking_cert, staking_cert)?;

        debug!("Wrote files for node '{}' under {}", name, node_dir.display());
        Ok(files)
    }
}

/// Ask the OS for `count` distinct, currently free loopback ports, none of
/// them in `exclude`
///
/// Every listener stays bound until all ports are known, so one call never
/// returns a port twice. Callers pass the ports other nodes already use as
/// `exclude`.
pub fn free_ports(count: usize, exclude: &HashSet<u16>) -> NetworkResult<Vec<u16>> {
    let mut held = Vec::new();
    let mut ports = Vec::with_capacity(count);

    // The OS hands out each excluded port at most once while it is held
    let max_binds = count + exclude.len();
    while ports.len() < count {
        if held.len() >= max_binds {
            return Err(NetworkError::internal(format!(
                "Could not find {} free loopback port(s)",
                count
            )));
        }

        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let port = listener.local_addr()?.port();
        if port == 0 {
            return Err(NetworkError::internal("OS returned port 0 for an ephemeral bind"));
        }
        if !exclude.contains(&port) {
            ports.push(port);
        }
        held.push(listener);
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let dir = NetworkDir::create(None).unwrap();
        let root = dir.root().to_path_buf();
        assert!(root.exists());

        drop(dir);
        assert!(!root.exists());
    }

    #[test]
    fn test_node_files_layout() {
        let parent = TempDir::new().unwrap();
        let dir = NetworkDir::create(Some(&parent.path().join("net"))).unwrap();

        let genesis = dir.write_genesis(b"{}").unwrap();
        let files = dir.write_node_files("node0", b"key", b"cert").unwrap();

        assert_eq!(std::fs::read(genesis).unwrap(), b"{}");
        assert_eq!(std::fs::read(&files.staking_key).unwrap(), b"key");
        assert_eq!(std::fs::read(&files.staking_cert).unwrap(), b"cert");
        assert!(files.db_dir.is_dir());
        assert!(files.log_dir.ends_with("node0/logs"));
    }

    #[test]
    fn test_free_ports_are_distinct() {
        let ports = free_ports(4, &HashSet::new()).unwrap();

        let unique: HashSet<_> = ports.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(ports.iter().all(|p| *p != 0));
    }

    #[test]
    fn test_free_ports_skip_excluded() {
        let exclude: HashSet<u16> = free_ports(16, &HashSet::new()).unwrap().into_iter().collect();

        let ports = free_ports(16, &exclude).unwrap();

        assert_eq!(ports.len(), 16);
        assert!(ports.iter().all(|p| !exclude.contains(p)));
    }

    #[test]
    fn test_node_files_reject_path_like_names() {
        let parent = TempDir::new().unwrap();
        let dir = NetworkDir::create(Some(&parent.path().join("net"))).unwrap();
        let outside = parent.path().join("outside");

        for name in ["./node0", "a/b", "..", outside.to_str().unwrap(), ""] {
            let err = dir.write_node_files(name, b"key", b"cert").unwrap_err();
            assert!(err.is_validation(), "{}: {:?}", name, err);
        }
        assert!(!outside.exists());
    }
}
