//! Error handling for netrunner
//!
//! Every fallible operation in the workspace returns [`NetworkResult`]. The
//! variants map onto the failure classes a network operator has to tell apart:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   NetworkError taxonomy                       │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Configuration         │  Membership        │  Runtime        │
//! │  • Validation          │  • NodeNotFound    │  • Startup      │
//! │  • ConfigurationError  │  • Stopped         │  • Process      │
//! │                        │                    │  • Api          │
//! │                        │                    │  • HealthTimeout│
//! │                        │                    │  • ShutdownFailed│
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Stopped` is a sentinel: once a network is stopped every operation returns
//! exactly this variant, so callers match on it (or use
//! [`NetworkError::is_stopped`]) rather than on message text.

pub mod constructors;
pub mod conversions;
pub mod types;


pub use types::{format_failures, NetworkError, NetworkResult};
