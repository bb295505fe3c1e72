//! Jumpgate Terminal Registry Library
//!
//! Tracks the gateway nodes ("terminals") that broker remote sessions:
//! - SQLite storage for terminals, service accounts, sessions and backends
//! - Builtin protocol catalog with per-terminal-type defaults
//! - Heartbeat liveness over an expiring cache (in-process or Redis)
//! - Storage backend resolution with configured fallbacks
//! - Runtime configuration and status labels for each terminal
//! - The one-shot SFTP protocol backfill

pub mod backfill;
pub mod error;
pub mod liveness;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod storage;

pub use error::{RegistryError, Result};
pub use registry::TerminalRegistry;
