//! One-shot SFTP backfill.
//!
//! Every linux platform whose `ssh` protocol has `sftp_enabled` set gains a
//! companion `sftp` protocol, and every asset on such a platform gains an
//! `sftp` entry on its ssh port. Both passes only ever insert with
//! conflict-ignore, so rerunning the job is harmless.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::storage::{DatabaseError, NewPlatformProtocol, PlatformSshProtocol, TerminalDatabase};

/// Asset IDs handled per insert transaction.
pub const ASSET_BATCH_SIZE: usize = 1000;

const DEFAULT_SFTP_HOME: &str = "/tmp";

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// What a backfill run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Names of platforms that gained an `sftp` protocol.
    pub platforms: Vec<String>,
    /// Number of asset `sftp` protocols inserted.
    pub assets_added: u64,
}

/// Run the platform pass, then the asset pass.
pub async fn run(db: &TerminalDatabase) -> Result<BackfillReport, BackfillError> {
    let platforms = backfill_platform_sftp(db).await?;
    let assets_added = backfill_asset_sftp(db).await?;
    Ok(BackfillReport {
        platforms,
        assets_added,
    })
}

/// Add `sftp` to eligible platforms. Returns the names of the platforms that
/// were changed.
pub async fn backfill_platform_sftp(db: &TerminalDatabase) -> Result<Vec<String>, BackfillError> {
    let candidates = db.linux_ssh_protocols_without_sftp().await?;

    // One sftp entry per platform.
    let mut planned: BTreeMap<i64, (String, NewPlatformProtocol)> = BTreeMap::new();
    for ssh in candidates {
        let Some(setting) = sftp_enabled_setting(&ssh) else {
            continue;
        };
        planned
            .entry(ssh.platform_id)
            .or_insert_with(|| (ssh.platform_name.clone(), sftp_for(&ssh, &setting)));
    }

    if planned.is_empty() {
        debug!("No platforms need an sftp protocol");
        return Ok(Vec::new());
    }

    let (names, protocols): (Vec<String>, Vec<NewPlatformProtocol>) =
        planned.into_values().unzip();
    let inserted = db.insert_platform_protocols(&protocols).await?;

    for name in &names {
        info!(platform = %name, "Platform gained sftp protocol");
    }
    info!(inserted, "Platform sftp backfill complete");
    Ok(names)
}

/// Add `sftp` to assets on sftp-capable platforms, reusing each asset's ssh
/// port. Assets without ssh are left alone. Returns how many entries were
/// inserted.
pub async fn backfill_asset_sftp(db: &TerminalDatabase) -> Result<u64, BackfillError> {
    // Materialized once so inserts made by earlier batches cannot shift
    // later ones.
    let asset_ids = db.asset_ids_missing_sftp().await?;
    let mut added = 0;

    for batch in asset_ids.chunks(ASSET_BATCH_SIZE) {
        let ssh = db.asset_ssh_protocols(batch).await?;

        let mut ports: BTreeMap<String, i64> = BTreeMap::new();
        for protocol in ssh {
            ports.insert(protocol.asset_id, protocol.port);
        }

        let rows: Vec<(String, String, i64)> = ports
            .into_iter()
            .map(|(asset_id, port)| (asset_id, "sftp".to_string(), port))
            .collect();
        let inserted = db.insert_asset_protocols(&rows).await?;
        debug!(batch = batch.len(), inserted, "Asset sftp batch done");
        added += inserted;
    }

    info!(added, "Asset sftp backfill complete");
    Ok(added)
}

/// The ssh protocol's setting object, if it enables sftp. An unparseable
/// setting counts as not enabled.
fn sftp_enabled_setting(ssh: &PlatformSshProtocol) -> Option<Map<String, Value>> {
    let setting: Map<String, Value> = match serde_json::from_str(&ssh.setting) {
        Ok(setting) => setting,
        Err(e) => {
            debug!(platform = %ssh.platform_name, error = %e, "Skipping ssh protocol with unreadable setting");
            return None;
        }
    };

    setting
        .get("sftp_enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        .then_some(setting)
}

fn sftp_for(ssh: &PlatformSshProtocol, ssh_setting: &Map<String, Value>) -> NewPlatformProtocol {
    let sftp_home = ssh_setting
        .get("sftp_home")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SFTP_HOME);

    NewPlatformProtocol {
        platform_id: ssh.platform_id,
        name: "sftp".to_string(),
        port: ssh.port,
        is_primary: false,
        required: false,
        is_default: true,
        public: true,
        setting: json!({ "sftp_home": sftp_home }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> TerminalDatabase {
        TerminalDatabase::open_in_memory().await.unwrap()
    }

    async fn platform(db: &TerminalDatabase, name: &str, kind: &str, setting: &str) -> i64 {
        let platform = db.create_platform(name, kind).await.unwrap();
        db.insert_platform_protocols(&[NewPlatformProtocol {
            platform_id: platform.id,
            name: "ssh".to_string(),
            port: 22,
            is_primary: true,
            required: true,
            is_default: true,
            public: true,
            setting: setting.to_string(),
        }])
        .await
        .unwrap();
        platform.id
    }

    #[tokio::test]
    async fn platform_pass_copies_port_and_home() {
        let db = test_db().await;
        let id = platform(
            &db,
            "Linux",
            "linux",
            r#"{"sftp_enabled": true, "sftp_home": "/data"}"#,
        )
        .await;

        let names = backfill_platform_sftp(&db).await.unwrap();
        assert_eq!(names, vec!["Linux".to_string()]);

        let protocols = db.platform_protocols(id).await.unwrap();
        let sftp = protocols.iter().find(|p| p.name == "sftp").unwrap();
        assert_eq!(sftp.port, 22);
        assert!(!sftp.is_primary);
        assert!(!sftp.required);
        assert!(sftp.is_default);
        assert!(sftp.public);
        let setting: Value = serde_json::from_str(&sftp.setting).unwrap();
        assert_eq!(setting, json!({"sftp_home": "/data"}));
    }

    #[tokio::test]
    async fn sftp_home_defaults_to_tmp() {
        let db = test_db().await;
        let id = platform(&db, "Debian", "linux", r#"{"sftp_enabled": true}"#).await;

        backfill_platform_sftp(&db).await.unwrap();

        let protocols = db.platform_protocols(id).await.unwrap();
        let sftp = protocols.iter().find(|p| p.name == "sftp").unwrap();
        assert_eq!(sftp.setting, r#"{"sftp_home":"/tmp"}"#);
    }

    #[tokio::test]
    async fn ineligible_platforms_are_untouched() {
        let db = test_db().await;
        platform(&db, "NoSftp", "linux", r#"{"sftp_enabled": false}"#).await;
        platform(&db, "Broken", "linux", "not json").await;
        platform(&db, "Gateway", "linux", r#"{"sftp_enabled": true}"#).await;
        platform(&db, "RemoteAppHost", "linux", r#"{"sftp_enabled": true}"#).await;
        platform(&db, "Windows", "windows", r#"{"sftp_enabled": true}"#).await;

        assert!(backfill_platform_sftp(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rerun_is_a_no_op() {
        let db = test_db().await;
        let linux = platform(&db, "Linux", "linux", r#"{"sftp_enabled": true}"#).await;
        db.create_asset("a1", "web-1", linux).await.unwrap();
        db.add_asset_protocol("a1", "ssh", 2201).await.unwrap();

        let first = run(&db).await.unwrap();
        assert_eq!(first.platforms, vec!["Linux".to_string()]);
        assert_eq!(first.assets_added, 1);

        let second = run(&db).await.unwrap();
        assert_eq!(second, BackfillReport::default());
    }

    #[tokio::test]
    async fn asset_pass_uses_asset_ssh_port_and_skips_assets_without_ssh() {
        let db = test_db().await;
        let linux = platform(&db, "Linux", "linux", r#"{"sftp_enabled": true}"#).await;
        backfill_platform_sftp(&db).await.unwrap();

        db.create_asset("a1", "web-1", linux).await.unwrap();
        db.create_asset("a2", "web-2", linux).await.unwrap();
        db.add_asset_protocol("a1", "ssh", 2201).await.unwrap();
        db.add_asset_protocol("a2", "rdp", 3389).await.unwrap();

        assert_eq!(backfill_asset_sftp(&db).await.unwrap(), 1);

        let a1 = db.asset_protocols("a1").await.unwrap();
        let sftp = a1.iter().find(|p| p.name == "sftp").unwrap();
        assert_eq!(sftp.port, 2201);
        assert!(db.asset_protocols("a2").await.unwrap().iter().all(|p| p.name != "sftp"));
    }

    #[tokio::test]
    async fn asset_pass_covers_every_batch() {
        let db = test_db().await;
        let linux = platform(&db, "Linux", "linux", r#"{"sftp_enabled": true}"#).await;
        backfill_platform_sftp(&db).await.unwrap();

        let total = ASSET_BATCH_SIZE + 5;
        for i in 0..total {
            let id = format!("a{i:05}");
            db.create_asset(&id, &id, linux).await.unwrap();
            db.add_asset_protocol(&id, "ssh", 22).await.unwrap();
        }

        assert_eq!(
            backfill_asset_sftp(&db).await.unwrap(),
            u64::try_from(total).unwrap()
        );
        assert!(db.asset_ids_missing_sftp().await.unwrap().is_empty());
    }
}
