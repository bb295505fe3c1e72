//! Data models for terminal registry storage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::{ProtocolName, TerminalType};

/// A registered gateway node.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Terminal {
    pub id: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub terminal_type: TerminalType,
    pub remote_addr: String,
    #[sqlx(try_from = "i64")]
    pub ssh_port: u16,
    #[sqlx(try_from = "i64")]
    pub http_port: u16,
    pub command_storage: String,
    pub replay_storage: String,
    /// Service account the gateway authenticates as.
    pub account_id: Option<String>,
    pub is_accepted: bool,
    pub is_deleted: bool,
    pub comment: String,
    pub created_at: i64,
}

/// Catalog entry for a protocol variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Protocol {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub name: ProtocolName,
    #[sqlx(try_from = "i64")]
    pub port: u16,
    pub builtin: bool,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.port)?;
        if self.builtin {
            f.write_str(" [built-in]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub terminal_id: String,
    pub org_id: String,
    pub is_finished: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// A named command-log or session-replay storage target.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StorageBackend {
    pub id: String,
    pub name: String,
    pub storage_type: String,
    /// JSON object with backend-specific options.
    pub meta: String,
    pub created_at: i64,
}

impl StorageBackend {
    /// Configuration handed to gateways: `meta` plus a `TYPE` entry.
    pub fn config(&self) -> Result<Value, serde_json::Error> {
        let mut config: Map<String, Value> = serde_json::from_str(&self.meta)?;
        config.insert("TYPE".into(), Value::String(self.storage_type.clone()));
        Ok(Value::Object(config))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Platform {
    pub id: i64,
    pub name: String,
    pub platform_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformProtocol {
    pub id: i64,
    pub platform_id: i64,
    pub name: String,
    pub port: i64,
    pub is_primary: bool,
    pub required: bool,
    pub is_default: bool,
    pub public: bool,
    /// JSON object of per-protocol options.
    pub setting: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetProtocol {
    pub id: i64,
    pub asset_id: String,
    pub name: String,
    pub port: i64,
}
