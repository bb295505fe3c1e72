//! SQLite storage for the Jumpgate terminal registry.
//!
//! Provides persistence for terminals, the protocol catalog, service
//! accounts, sessions, storage backends, domains, and the platform/asset
//! protocol records touched by the SFTP backfill.

mod db;
mod models;
mod queries;
mod queries_accounts;
mod queries_assets;
mod queries_backends;

#[cfg(test)]
mod tests;

pub use db::{DatabaseError, TerminalDatabase};
pub use models::*;
pub use queries::NewTerminal;
pub use queries_accounts::SessionScope;
pub use queries_assets::{NewPlatformProtocol, PlatformSshProtocol};
pub use queries_backends::BackendKind;
