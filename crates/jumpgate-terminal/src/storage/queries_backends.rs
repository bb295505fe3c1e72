//! Command and replay storage backend queries.

use jumpgate_core::db::unix_timestamp;

use super::db::{DatabaseError, TerminalDatabase};
use super::models::StorageBackend;

/// Which backend table a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Command,
    Replay,
}

impl BackendKind {
    const fn table(self) -> &'static str {
        match self {
            Self::Command => "command_storages",
            Self::Replay => "replay_storages",
        }
    }
}

impl TerminalDatabase {
    /// Register a storage backend. `meta` must be a JSON object.
    pub async fn create_storage_backend(
        &self,
        kind: BackendKind,
        id: &str,
        name: &str,
        storage_type: &str,
        meta: &str,
    ) -> Result<StorageBackend, DatabaseError> {
        let table = kind.table();
        sqlx::query(&format!(
            "INSERT INTO {table} (id, name, storage_type, meta, created_at) VALUES (?, ?, ?, ?, ?)"
        ))
        .bind(id)
        .bind(name)
        .bind(storage_type)
        .bind(meta)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.find_storage_backend(kind, name)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Storage backend {name}")))
    }

    /// Look a backend up by name. Absence is not an error.
    pub async fn find_storage_backend(
        &self,
        kind: BackendKind,
        name: &str,
    ) -> Result<Option<StorageBackend>, DatabaseError> {
        let table = kind.table();
        let backend =
            sqlx::query_as::<_, StorageBackend>(&format!("SELECT * FROM {table} WHERE name = ?"))
                .bind(name)
                .fetch_optional(self.pool())
                .await?;

        Ok(backend)
    }
}
