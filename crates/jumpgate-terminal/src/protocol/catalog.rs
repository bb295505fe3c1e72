//! Builtin protocol seeding and per-terminal-type defaults.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::names::{ProtocolName, TerminalType};
use crate::error::{RegistryError, Result};
use crate::storage::{Protocol, TerminalDatabase};

/// A requested catalog entry. Name and port are optional so loosely-typed
/// input can be passed through; incomplete entries are skipped on seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEntry {
    pub name: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "builtin_default")]
    pub builtin: bool,
}

const fn builtin_default() -> bool {
    true
}

impl ProtocolEntry {
    /// A builtin entry on the protocol's canonical port.
    pub fn builtin(name: ProtocolName) -> Self {
        Self {
            name: Some(name.as_str().to_string()),
            port: Some(name.default_port()),
            builtin: true,
        }
    }

    /// `(name, port)` if both are present and valid.
    fn resolve(&self) -> Option<(ProtocolName, u16)> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let port = self.port.filter(|p| *p != 0)?;
        name.parse().ok().map(|name| (name, port))
    }
}

/// Get-or-create access to the shared protocol catalog.
#[derive(Clone)]
pub struct ProtocolCatalog {
    db: TerminalDatabase,
}

impl ProtocolCatalog {
    pub const fn new(db: TerminalDatabase) -> Self {
        Self { db }
    }

    /// Builtin entries for every protocol a terminal type serves.
    pub fn default_protocols_data(terminal_type: TerminalType) -> Result<Vec<ProtocolEntry>> {
        let supported = terminal_type
            .supported_protocols()
            .ok_or(RegistryError::UnsupportedType(terminal_type))?;

        Ok(supported.iter().copied().map(ProtocolEntry::builtin).collect())
    }

    /// One builtin entry per known protocol.
    pub fn initial_data() -> Vec<ProtocolEntry> {
        ProtocolName::ALL
            .into_iter()
            .map(ProtocolEntry::builtin)
            .collect()
    }

    /// Fetch or create the builtin protocol for every well-formed entry.
    ///
    /// Entries missing a name or port (or naming an unknown protocol) are
    /// skipped. The result holds each `(name, port)` once.
    pub async fn get_or_create_protocols(&self, entries: &[ProtocolEntry]) -> Result<Vec<Protocol>> {
        let mut protocols: Vec<Protocol> = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some((name, port)) = entry.resolve() else {
                debug!(?entry, "Skipping malformed protocol entry");
                continue;
            };
            let protocol = self.db.get_or_create_protocol(name, port).await?;
            if !protocols.iter().any(|p| p.id == protocol.id) {
                protocols.push(protocol);
            }
        }

        Ok(protocols)
    }

    /// Catalog rows for a terminal type's default protocol set.
    pub async fn default_protocols(&self, terminal_type: TerminalType) -> Result<Vec<Protocol>> {
        let data = Self::default_protocols_data(terminal_type)?;
        self.get_or_create_protocols(&data).await
    }

    /// Seed the catalog with every builtin protocol. Safe to run repeatedly
    /// and from several processes at once.
    pub async fn initialize(&self) -> Result<Vec<Protocol>> {
        let protocols = self.get_or_create_protocols(&Self::initial_data()).await?;
        info!(count = protocols.len(), "Protocol catalog initialized");
        Ok(protocols)
    }
}
