//! Command line construction for node binaries

use std::path::{Path, PathBuf};

use crate::staking::NodeId;

/// A beacon other nodes bootstrap from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    pub name: String,
    pub node_id: NodeId,
    pub address: String,
}

/// Flags passed to a node binary
#[derive(Debug, Clone, Default)]
pub struct NodeArgs {
    pub log_level: String,
    pub genesis_path: PathBuf,
    pub staking_key_path: PathBuf,
    pub staking_cert_path: PathBuf,
    pub http_port: u16,
    pub staking_port: u16,
    pub db_dir: PathBuf,
    pub log_dir: PathBuf,
    pub bootstrap: Vec<BootstrapPeer>,
    pub extra_args: Vec<String>,
}

impl NodeArgs {
    /// Render the flags in the order the node binary documents them
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.log_level.is_empty() {
            args.push(flag("log-level", &self.log_level));
        }
        args.push(path_flag("genesis", &self.genesis_path));
        args.push(path_flag("staking-tls-key-file", &self.staking_key_path));
        args.push(path_flag("staking-tls-cert-file", &self.staking_cert_path));
        args.push(flag("http-port", self.http_port));
        args.push(flag("staking-port", self.staking_port));
        args.push(path_flag("db-dir", &self.db_dir));
        args.push(path_flag("log-dir", &self.log_dir));

        if !self.bootstrap.is_empty() {
            let ips: Vec<_> = self.bootstrap.iter().map(|p| p.address.as_str()).collect();
            let ids: Vec<_> = self.bootstrap.iter().map(|p| p.node_id.to_string()).collect();
            args.push(flag("bootstrap-ips", ips.join(",")));
            args.push(flag("bootstrap-ids", ids.join(",")));
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

fn flag(name: &str, value: impl std::fmt::Display) -> String {
    format!("--{}={}", name, value)
}

fn path_flag(name: &str, path: &Path) -> String {
    flag(name, path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::{new_cert_and_key, node_id_from_cert};
    use pretty_assertions::assert_eq;

    fn base_args() -> NodeArgs {
        NodeArgs {
            log_level: "DEBUG".to_string(),
            genesis_path: "/net/genesis.json".into(),
            staking_key_path: "/net/node0/staking.key".into(),
            staking_cert_path: "/net/node0/staking.crt".into(),
            http_port: 9650,
            staking_port: 9651,
            db_dir: "/net/node0/db".into(),
            log_dir: "/net/node0/logs".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_args_without_bootstrap() {
        let args = base_args().to_args();

        assert_eq!(
            args,
            vec![
                "--log-level=DEBUG",
                "--genesis=/net/genesis.json",
                "--staking-tls-key-file=/net/node0/staking.key",
                "--staking-tls-cert-file=/net/node0/staking.crt",
                "--http-port=9650",
                "--staking-port=9651",
                "--db-dir=/net/node0/db",
                "--log-dir=/net/node0/logs",
            ]
        );
    }

    #[test]
    fn test_args_with_bootstrap_and_extra() {
        let material = new_cert_and_key().unwrap();
        let node_id = node_id_from_cert(&material.cert_pem).unwrap();
        let mut node_args = base_args();
        node_args.bootstrap = vec![BootstrapPeer {
            name: "node0".to_string(),
            node_id,
            address: "127.0.0.1:9651".to_string(),
        }];
        node_args.extra_args = vec!["--api-admin-enabled=true".to_string()];

        let args = node_args.to_args();

        assert!(args.contains(&"--bootstrap-ips=127.0.0.1:9651".to_string()));
        assert!(args.contains(&format!("--bootstrap-ids={}", node_id)));
        assert_eq!(args.last().map(String::as_str), Some("--api-admin-enabled=true"));
    }
}
