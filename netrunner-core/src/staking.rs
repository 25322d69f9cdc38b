//! Staking material and node identity
//!
//! A node's identity is derived from its staking certificate: the first 20
//! bytes of the SHA-256 digest of the certificate's DER encoding. Nodes that
//! are configured without staking material get a freshly generated
//! self-signed certificate.

use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};

const NODE_ID_LEN: usize = 20;
const NODE_ID_PREFIX: &str = "NodeID-";

/// Stable identifier of a node, derived from its staking certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, hex::encode(self.0))
    }
}

/// A PEM encoded key/certificate pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingMaterial {
    pub key_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
}

/// Generate a self-signed ECDSA P-256 staking certificate and key
pub fn new_cert_and_key() -> NetworkResult<StakingMaterial> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
    let cert_pem = cert.serialize_pem()?;
    let key_pem = cert.serialize_private_key_pem();

    Ok(StakingMaterial {
        key_pem: key_pem.into_bytes(),
        cert_pem: cert_pem.into_bytes(),
    })
}

/// Derive the node ID from a PEM or DER encoded X.509 certificate
pub fn node_id_from_cert(cert: &[u8]) -> NetworkResult<NodeId> {
    let der = certificate_der(cert)?;

    x509_parser::parse_x509_certificate(&der).map_err(|e| {
        NetworkError::validation("staking_cert", format!("invalid X.509 certificate: {}", e))
    })?;

    let digest = Sha256::digest(&der);
    let mut id = [0u8; NODE_ID_LEN];
    id.copy_from_slice(&digest[..NODE_ID_LEN]);

    let node_id = NodeId(id);
    debug!("Derived {} from staking certificate", node_id);
    Ok(node_id)
}

fn certificate_der(cert: &[u8]) -> NetworkResult<Vec<u8>> {
    if cert.is_empty() {
        return Err(NetworkError::validation("staking_cert", "certificate is empty"));
    }

    if !cert.starts_with(b"-----BEGIN") {
        return Ok(cert.to_vec());
    }

    let parsed = pem::parse(cert).map_err(|e| {
        NetworkError::validation("staking_cert", format!("invalid PEM: {}", e))
    })?;
    if parsed.tag() != "CERTIFICATE" {
        return Err(NetworkError::validation(
            "staking_cert",
            format!("expected a CERTIFICATE block, found '{}'", parsed.tag()),
        ));
    }
    Ok(parsed.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_cert_yields_node_id() {
        let material = new_cert_and_key().unwrap();

        let id = node_id_from_cert(&material.cert_pem).unwrap();

        assert!(id.to_string().starts_with("NodeID-"));
        assert_eq!(id.to_string().len(), NODE_ID_PREFIX.len() + 2 * NODE_ID_LEN);
        assert!(String::from_utf8_lossy(&material.key_pem).contains("PRIVATE KEY"));
    }

    #[test]
    fn test_node_id_is_stable() {
        let material = new_cert_and_key().unwrap();

        assert_eq!(
            node_id_from_cert(&material.cert_pem).unwrap(),
            node_id_from_cert(&material.cert_pem).unwrap()
        );
    }

    #[test]
    fn test_pem_and_der_give_same_id() {
        let material = new_cert_and_key().unwrap();
        let der = pem::parse(&material.cert_pem).unwrap().contents().to_vec();

        assert_eq!(
            node_id_from_cert(&material.cert_pem).unwrap(),
            node_id_from_cert(&der).unwrap()
        );
    }

    #[test]
    fn test_distinct_certs_distinct_ids() {
        let a = new_cert_and_key().unwrap();
        let b = new_cert_and_key().unwrap();

        assert_ne!(
            node_id_from_cert(&a.cert_pem).unwrap(),
            node_id_from_cert(&b.cert_pem).unwrap()
        );
    }

    #[test]
    fn test_garbage_cert_rejected() {
        let err = node_id_from_cert(b"nonempty").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_key_block_is_not_a_certificate() {
        let material = new_cert_and_key().unwrap();

        let err = node_id_from_cert(&material.key_pem).unwrap_err();
        assert!(err.to_string().contains("CERTIFICATE"));
    }
}
