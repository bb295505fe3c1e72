//! The terminal registry: lifecycle, protocols, runtime config and status of
//! registered gateway nodes.
//!
//! `TerminalRegistry` composes the protocol catalog, the liveness tracker and
//! the storage resolver around the registry database.

mod status;


use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use jumpgate_core::Config;

use crate::error::{RegistryError, Result};
use crate::liveness::LivenessTracker;
use crate::protocol::ProtocolCatalog;
use crate::resolver::StorageResolver;
use crate::storage::{
    DatabaseError, Domain, NewTerminal, Protocol, SessionScope, Terminal, TerminalDatabase,
};

pub use status::{StatusFlags, StatusLabel};

#[derive(Clone)]
pub struct TerminalRegistry {
    db: TerminalDatabase,
    catalog: ProtocolCatalog,
    liveness: LivenessTracker,
    resolver: StorageResolver,
    config: Arc<Config>,
}

impl TerminalRegistry {
    pub fn new(db: TerminalDatabase, liveness: LivenessTracker, config: Arc<Config>) -> Self {
        Self {
            catalog: ProtocolCatalog::new(db.clone()),
            resolver: StorageResolver::new(db.clone(), config.storage.clone()),
            db,
            liveness,
            config,
        }
    }

    pub const fn catalog(&self) -> &ProtocolCatalog {
        &self.catalog
    }

    pub const fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    pub const fn resolver(&self) -> &StorageResolver {
        &self.resolver
    }

    pub const fn database(&self) -> &TerminalDatabase {
        &self.db
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register a terminal without a service account. Its protocol set
    /// stays empty until [`Self::reset_protocols_to_default`].
    #[instrument(skip(self, params), fields(name = %params.name, terminal_type = %params.terminal_type))]
    pub async fn register(&self, params: &NewTerminal) -> Result<Terminal> {
        let id = uuid::Uuid::new_v4().to_string();
        let terminal = self.db.create_terminal(&id, params, None).await?;
        info!(terminal_id = %terminal.id, "Terminal registered");
        Ok(terminal)
    }

    /// Register a terminal together with the service account it will
    /// authenticate as.
    #[instrument(skip(self, params), fields(name = %params.name, terminal_type = %params.terminal_type))]
    pub async fn register_with_account(
        &self,
        params: &NewTerminal,
        username: &str,
    ) -> Result<Terminal> {
        let id = uuid::Uuid::new_v4().to_string();
        let account_id = uuid::Uuid::new_v4().to_string();
        let terminal = self
            .db
            .create_terminal(&id, params, Some((&account_id, username)))
            .await?;
        info!(terminal_id = %terminal.id, account_id, username, "Terminal registered with account");
        Ok(terminal)
    }

    pub async fn get(&self, terminal_id: &str) -> Result<Terminal> {
        Ok(self.db.get_terminal(terminal_id).await?)
    }

    /// Let the terminal serve connections.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn accept(&self, terminal: &mut Terminal) -> Result<()> {
        self.db.set_terminal_accepted(&terminal.id, true).await?;
        terminal.is_accepted = true;
        info!("Terminal accepted");
        Ok(())
    }

    /// Soft-delete the terminal and delete its service account atomically.
    ///
    /// On failure nothing is persisted and `terminal` is left untouched.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn delete(&self, terminal: &mut Terminal) -> Result<()> {
        match self.db.soft_delete_terminal(&terminal.id).await {
            Ok(account_id) => {
                terminal.account_id = None;
                terminal.is_deleted = true;
                info!(deleted_account = ?account_id, "Terminal deleted");
                Ok(())
            }
            Err(DatabaseError::NotFound(what)) => Err(RegistryError::NotFound(what)),
            Err(source) => {
                warn!(error = %source, "Terminal deletion rolled back");
                Err(RegistryError::DeletionAborted {
                    terminal_id: terminal.id.clone(),
                    source,
                })
            }
        }
    }

    /// Whether the terminal's service account exists and is enabled.
    ///
    /// A terminal value read before its account was removed is not active.
    pub async fn is_active(&self, terminal: &Terminal) -> Result<bool> {
        let Some(account_id) = &terminal.account_id else {
            return Ok(false);
        };
        match self.db.get_account(account_id).await {
            Ok(account) => Ok(account.is_active),
            Err(DatabaseError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Enable or disable the terminal's service account. No-op without one.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn set_active(&self, terminal: &Terminal, active: bool) -> Result<()> {
        if let Some(account_id) = &terminal.account_id {
            self.db.set_account_active(account_id, active).await?;
            info!(account_id, active, "Terminal account toggled");
        }
        Ok(())
    }

    /// Point the terminal at other storage backends.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn set_storage(
        &self,
        terminal: &mut Terminal,
        command_storage: &str,
        replay_storage: &str,
    ) -> Result<()> {
        self.db
            .update_terminal_storage(&terminal.id, command_storage, replay_storage)
            .await?;
        command_storage.clone_into(&mut terminal.command_storage);
        replay_storage.clone_into(&mut terminal.replay_storage);
        info!("Terminal storage updated");
        Ok(())
    }

    // =========================================================================
    // Protocols and domains
    // =========================================================================

    /// Replace the protocol set with the terminal type's defaults. Protocols
    /// added by hand beyond the defaults are dropped.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn reset_protocols_to_default(&self, terminal: &Terminal) -> Result<Vec<Protocol>> {
        let protocols = self
            .catalog
            .default_protocols(terminal.terminal_type)
            .await?;
        let ids: Vec<i64> = protocols.iter().map(|p| p.id).collect();
        self.db.replace_terminal_protocols(&terminal.id, &ids).await?;
        info!(count = ids.len(), "Terminal protocols reset to defaults");
        Ok(protocols)
    }

    pub async fn protocols(&self, terminal: &Terminal) -> Result<Vec<Protocol>> {
        Ok(self.db.terminal_protocols(&terminal.id).await?)
    }

    pub async fn set_domains(&self, terminal: &Terminal, domain_ids: &[String]) -> Result<()> {
        self.db
            .replace_terminal_domains(&terminal.id, domain_ids)
            .await?;
        Ok(())
    }

    pub async fn domains(&self, terminal: &Terminal) -> Result<Vec<Domain>> {
        Ok(self.db.terminal_domains(&terminal.id).await?)
    }

    // =========================================================================
    // Sessions and liveness
    // =========================================================================

    /// Unfinished sessions on this terminal, across every organization.
    pub async fn online_session_count(&self, terminal: &Terminal) -> Result<i64> {
        Ok(self
            .db
            .count_open_sessions(&terminal.id, &SessionScope::Root)
            .await?)
    }

    /// Record a heartbeat for the configured TTL.
    pub async fn heartbeat(&self, terminal: &Terminal) -> Result<()> {
        self.liveness.set_alive(&terminal.id).await?;
        Ok(())
    }

    pub async fn is_alive(&self, terminal: &Terminal) -> Result<bool> {
        Ok(self.liveness.is_alive(&terminal.id).await?)
    }

    // =========================================================================
    // Runtime config and status
    // =========================================================================

    /// The configuration payload handed to a connecting gateway.
    ///
    /// Later entries override earlier ones: `TERMINAL_*` settings, command
    /// storage, replay storage, login title, security settings.
    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id))]
    pub async fn config(&self, terminal: &Terminal) -> Result<Map<String, Value>> {
        let mut configs = self.config.terminal.to_entries();
        configs.extend(self.resolver.command_storage_setting(terminal).await?);
        configs.extend(self.resolver.replay_storage_setting(terminal).await?);
        configs.insert(
            "TERMINAL_HEADER_TITLE".into(),
            json!(self.config.login_title),
        );
        configs.insert(
            "SECURITY_MAX_IDLE_TIME".into(),
            json!(self.config.security.max_idle_time),
        );
        configs.insert(
            "SECURITY_SESSION_SHARE".into(),
            json!(self.config.security.session_share),
        );
        Ok(configs)
    }

    /// Account and liveness lookups only happen when an earlier rule has
    /// not already decided the label.
    pub async fn status_label(&self, terminal: &Terminal) -> Result<StatusLabel> {
        let accepted = terminal.is_accepted;
        let deleted = terminal.is_deleted;
        let active = accepted && !deleted && self.is_active(terminal).await?;
        let alive = active && self.is_alive(terminal).await?;

        Ok(StatusLabel::from_flags(StatusFlags {
            accepted,
            deleted,
            active,
            alive,
        }))
    }

    /// `"{name}: {status}"`
    pub async fn status_line(&self, terminal: &Terminal) -> Result<String> {
        let label = self.status_label(terminal).await?;
        Ok(format!("{}: {label}", terminal.name))
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub async fn undeleted(&self) -> Result<Vec<Terminal>> {
        Ok(self.db.list_undeleted_terminals().await?)
    }

    /// Undeleted terminals with an enabled service account.
    pub async fn active(&self) -> Result<Vec<Terminal>> {
        Ok(self.db.list_active_terminals().await?)
    }

    /// Active terminals with a live heartbeat.
    pub async fn alive(&self) -> Result<Vec<Terminal>> {
        let active = self.active().await?;
        let ids: Vec<String> = active.iter().map(|t| t.id.clone()).collect();
        let alive = self.liveness.alive_among(&ids).await?;
        Ok(active
            .into_iter()
            .filter(|t| alive.contains(&t.id))
            .collect())
    }
}
