//! Error types for the terminal registry.

use crate::liveness::CacheError;
use crate::protocol::TerminalType;
use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The terminal type has no protocol mapping.
    #[error("Unsupported terminal type: {0}")]
    UnsupportedType(TerminalType),

    /// Deleting the terminal's account failed; nothing was changed.
    #[error("Deletion of terminal {terminal_id} aborted: {source}")]
    DeletionAborted {
        terminal_id: String,
        source: DatabaseError,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Liveness cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<DatabaseError> for RegistryError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
