//! Resolves a terminal's storage backend names to their configuration.
//!
//! A name that matches no backend falls back to the configured default, so a
//! gateway can always start with some storage target.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use jumpgate_core::config::StorageDefaults;

use crate::error::Result;
use crate::storage::{BackendKind, Terminal, TerminalDatabase};

pub const COMMAND_STORAGE_KEY: &str = "TERMINAL_COMMAND_STORAGE";
pub const REPLAY_STORAGE_KEY: &str = "TERMINAL_REPLAY_STORAGE";

#[derive(Clone)]
pub struct StorageResolver {
    db: TerminalDatabase,
    defaults: StorageDefaults,
}

impl StorageResolver {
    pub const fn new(db: TerminalDatabase, defaults: StorageDefaults) -> Self {
        Self { db, defaults }
    }

    pub async fn command_storage_config(&self, terminal: &Terminal) -> Result<Value> {
        self.resolve(BackendKind::Command, &terminal.command_storage)
            .await
    }

    pub async fn replay_storage_config(&self, terminal: &Terminal) -> Result<Value> {
        self.resolve(BackendKind::Replay, &terminal.replay_storage)
            .await
    }

    /// `{"TERMINAL_COMMAND_STORAGE": config}`
    pub async fn command_storage_setting(&self, terminal: &Terminal) -> Result<Map<String, Value>> {
        let config = self.command_storage_config(terminal).await?;
        Ok(Map::from_iter([(COMMAND_STORAGE_KEY.to_string(), config)]))
    }

    /// `{"TERMINAL_REPLAY_STORAGE": config}`
    pub async fn replay_storage_setting(&self, terminal: &Terminal) -> Result<Map<String, Value>> {
        let config = self.replay_storage_config(terminal).await?;
        Ok(Map::from_iter([(REPLAY_STORAGE_KEY.to_string(), config)]))
    }

    async fn resolve(&self, kind: BackendKind, name: &str) -> Result<Value> {
        let default = match kind {
            BackendKind::Command => &self.defaults.command,
            BackendKind::Replay => &self.defaults.replay,
        };

        let Some(backend) = self.db.find_storage_backend(kind, name).await? else {
            debug!(?kind, name, "Storage backend not found, using default");
            return Ok(default.clone());
        };

        match backend.config() {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(?kind, name, error = %e, "Storage backend has unreadable meta, using default");
                Ok(default.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::TerminalType;
    use crate::storage::NewTerminal;

    async fn setup(command: &str, replay: &str) -> (StorageResolver, Terminal) {
        let db = TerminalDatabase::open_in_memory().await.unwrap();
        let mut params = NewTerminal::new("koko-1", TerminalType::Koko);
        params.command_storage = command.to_string();
        params.replay_storage = replay.to_string();
        let terminal = db.create_terminal("t1", &params, None).await.unwrap();
        (StorageResolver::new(db, StorageDefaults::default()), terminal)
    }

    #[tokio::test]
    async fn unknown_command_storage_falls_back_to_default() {
        let (resolver, terminal) = setup("does-not-exist", "default").await;

        let config = resolver.command_storage_config(&terminal).await.unwrap();
        assert_eq!(config, StorageDefaults::default().command);
    }

    #[tokio::test]
    async fn named_backend_config_includes_type() {
        let (resolver, terminal) = setup("es-prod", "s3-archive").await;
        resolver
            .db
            .create_storage_backend(
                BackendKind::Command,
                "c1",
                "es-prod",
                "es",
                r#"{"HOSTS": ["http://es:9200"], "INDEX": "jumpgate"}"#,
            )
            .await
            .unwrap();

        let config = resolver.command_storage_config(&terminal).await.unwrap();
        assert_eq!(
            config,
            json!({"TYPE": "es", "HOSTS": ["http://es:9200"], "INDEX": "jumpgate"})
        );

        // No replay backend named s3-archive exists yet.
        let replay = resolver.replay_storage_setting(&terminal).await.unwrap();
        assert_eq!(replay[REPLAY_STORAGE_KEY], json!({"TYPE": "server"}));
    }

    #[tokio::test]
    async fn backend_tables_are_separate() {
        let (resolver, terminal) = setup("shared", "shared").await;
        resolver
            .db
            .create_storage_backend(BackendKind::Replay, "r1", "shared", "s3", "{}")
            .await
            .unwrap();

        let command = resolver.command_storage_setting(&terminal).await.unwrap();
        assert_eq!(command[COMMAND_STORAGE_KEY], json!({"TYPE": "server"}));
        let replay = resolver.replay_storage_config(&terminal).await.unwrap();
        assert_eq!(replay, json!({"TYPE": "s3"}));
    }

    #[tokio::test]
    async fn unreadable_meta_falls_back() {
        let (resolver, terminal) = setup("broken", "default").await;
        resolver
            .db
            .create_storage_backend(BackendKind::Command, "c1", "broken", "es", "not json")
            .await
            .unwrap();

        let config = resolver.command_storage_config(&terminal).await.unwrap();
        assert_eq!(config, json!({"TYPE": "server"}));
    }
}
