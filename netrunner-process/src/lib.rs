//! Backends that run netrunner nodes for real
//!
//! [`OsProcessFactory`] launches node binaries as child processes and
//! [`HttpApiClientFactory`] talks to their HTTP health endpoint. Together they
//! turn a `netrunner_core::LocalNetwork` into a network of actual nodes.

pub mod http_client;
pub mod process_manager;

pub use http_client::{parse_health_reply, HttpApiClient, HttpApiClientFactory};
pub use process_manager::{OsNodeProcess, OsProcessFactory, ProcessExit};
