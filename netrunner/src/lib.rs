//! Command-line front end for netrunner networks

pub mod config_file;

pub use config_file::{NetworkFile, NodeEntry};
