//! Storage layer tests for the terminal registry.

use super::db::TerminalDatabase;
use super::queries::NewTerminal;
use super::queries_accounts::SessionScope;
use super::queries_assets::NewPlatformProtocol;
use crate::protocol::{ProtocolName, TerminalType};

async fn test_db() -> TerminalDatabase {
    TerminalDatabase::open_in_memory().await.unwrap()
}

fn ssh_protocol(platform_id: i64, port: i64, setting: &str) -> NewPlatformProtocol {
    NewPlatformProtocol {
        platform_id,
        name: "ssh".to_string(),
        port,
        is_primary: true,
        required: true,
        is_default: true,
        public: true,
        setting: setting.to_string(),
    }
}

// === Terminal tests ===

#[tokio::test]
async fn create_and_get_terminal() {
    let db = test_db().await;
    let mut params = NewTerminal::new("lion-1", TerminalType::Lion);
    params.remote_addr = "10.0.0.5".to_string();
    params.comment = "rack 4".to_string();

    let terminal = db.create_terminal("t1", &params, None).await.unwrap();

    assert_eq!(terminal.id, "t1");
    assert_eq!(terminal.terminal_type, TerminalType::Lion);
    assert_eq!(terminal.remote_addr, "10.0.0.5");
    assert_eq!(terminal.comment, "rack 4");
    assert!(terminal.account_id.is_none());
}

#[tokio::test]
async fn create_terminal_with_account_links_it() {
    let db = test_db().await;
    let terminal = db
        .create_terminal(
            "t1",
            &NewTerminal::new("koko-1", TerminalType::Koko),
            Some(("a1", "koko-1-svc")),
        )
        .await
        .unwrap();

    assert_eq!(terminal.account_id.as_deref(), Some("a1"));
    let account = db.get_account("a1").await.unwrap();
    assert_eq!(account.username, "koko-1-svc");
    assert!(account.is_active);
}

#[tokio::test]
async fn duplicate_username_rolls_back_terminal() {
    let db = test_db().await;
    db.create_account("a0", "taken").await.unwrap();

    let result = db
        .create_terminal(
            "t1",
            &NewTerminal::new("koko-1", TerminalType::Koko),
            Some(("a1", "taken")),
        )
        .await;

    assert!(result.is_err());
    assert!(db.get_terminal("t1").await.is_err());
}

#[tokio::test]
async fn get_missing_terminal_is_not_found() {
    let db = test_db().await;
    assert!(matches!(
        db.get_terminal("nope").await,
        Err(super::DatabaseError::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_puts_unaccepted_first() {
    let db = test_db().await;
    db.create_terminal("t1", &NewTerminal::new("a", TerminalType::Koko), None)
        .await
        .unwrap();
    db.create_terminal("t2", &NewTerminal::new("b", TerminalType::Koko), None)
        .await
        .unwrap();
    db.set_terminal_accepted("t1", true).await.unwrap();

    let all = db.list_terminals().await.unwrap();
    assert_eq!(all[0].id, "t2");
    assert_eq!(all[1].id, "t1");
}

#[tokio::test]
async fn updates_on_missing_terminal_fail() {
    let db = test_db().await;
    assert!(db.set_terminal_accepted("nope", true).await.is_err());
    assert!(db.update_terminal_storage("nope", "a", "b").await.is_err());
    assert!(db.set_account_active("nope", false).await.is_err());
}

#[tokio::test]
async fn soft_delete_returns_removed_account() {
    let db = test_db().await;
    db.create_terminal(
        "t1",
        &NewTerminal::new("koko-1", TerminalType::Koko),
        Some(("a1", "svc")),
    )
    .await
    .unwrap();

    let removed = db.soft_delete_terminal("t1").await.unwrap();
    assert_eq!(removed.as_deref(), Some("a1"));
    assert!(db.list_undeleted_terminals().await.unwrap().is_empty());
    // The row itself stays.
    assert_eq!(db.list_terminals().await.unwrap().len(), 1);
}

// === Protocol catalog tests ===

#[tokio::test]
async fn get_or_create_protocol_returns_existing_row() {
    let db = test_db().await;
    let first = db.get_or_create_protocol(ProtocolName::Ssh, 22).await.unwrap();
    let second = db.get_or_create_protocol(ProtocolName::Ssh, 22).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.builtin);
}

#[tokio::test]
async fn existing_custom_protocol_is_reused() {
    let db = test_db().await;
    sqlx::query("INSERT INTO protocols (name, port, builtin) VALUES ('ssh', 22, 0)")
        .execute(db.pool())
        .await
        .unwrap();

    let protocol = db.get_or_create_protocol(ProtocolName::Ssh, 22).await.unwrap();
    assert!(!protocol.builtin);
    assert_eq!(protocol.to_string(), "ssh/22");
    assert_eq!(db.list_protocols().await.unwrap().len(), 1);
}

#[tokio::test]
async fn port_out_of_range_is_rejected_by_schema() {
    let db = test_db().await;
    let result = sqlx::query("INSERT INTO protocols (name, port) VALUES ('ssh', 70000)")
        .execute(db.pool())
        .await;
    assert!(result.is_err());
}

// === Session tests ===

#[tokio::test]
async fn session_count_respects_scope() {
    let db = test_db().await;
    db.create_terminal("t1", &NewTerminal::new("koko-1", TerminalType::Koko), None)
        .await
        .unwrap();
    db.create_session("s1", "t1", "org-a").await.unwrap();
    db.create_session("s2", "t1", "org-b").await.unwrap();

    let org_a = SessionScope::Org("org-a".to_string());
    assert_eq!(db.count_open_sessions("t1", &org_a).await.unwrap(), 1);
    assert_eq!(db.count_open_sessions("t1", &SessionScope::Root).await.unwrap(), 2);

    assert!(db.finish_session("s1").await.unwrap());
    assert!(!db.finish_session("missing").await.unwrap());
    assert_eq!(db.count_open_sessions("t1", &org_a).await.unwrap(), 0);
}

// === Platform and asset tests ===

#[tokio::test]
async fn platform_protocol_conflicts_are_ignored() {
    let db = test_db().await;
    let linux = db.create_platform("Linux", "linux").await.unwrap();

    let inserted = db
        .insert_platform_protocols(&[ssh_protocol(linux.id, 22, "{}"), ssh_protocol(linux.id, 2022, "{}")])
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    let protocols = db.platform_protocols(linux.id).await.unwrap();
    assert_eq!(protocols.len(), 1);
    assert_eq!(protocols[0].port, 22);
}

#[tokio::test]
async fn sftp_candidates_skip_gateways_and_non_linux() {
    let db = test_db().await;
    let linux = db.create_platform("Linux", "linux").await.unwrap();
    let gateway = db.create_platform("Gateway", "linux").await.unwrap();
    let windows = db.create_platform("Windows", "windows").await.unwrap();
    db.insert_platform_protocols(&[
        ssh_protocol(linux.id, 22, r#"{"sftp_enabled": true}"#),
        ssh_protocol(gateway.id, 22, r#"{"sftp_enabled": true}"#),
        ssh_protocol(windows.id, 22, r#"{"sftp_enabled": true}"#),
    ])
    .await
    .unwrap();

    let candidates = db.linux_ssh_protocols_without_sftp().await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].platform_name, "Linux");
}

#[tokio::test]
async fn assets_missing_sftp_and_their_ssh_ports() {
    let db = test_db().await;
    let linux = db.create_platform("Linux", "linux").await.unwrap();
    let mut sftp = ssh_protocol(linux.id, 22, "{}");
    sftp.name = "sftp".to_string();
    db.insert_platform_protocols(&[sftp]).await.unwrap();

    db.create_asset("a1", "web-1", linux.id).await.unwrap();
    db.create_asset("a2", "web-2", linux.id).await.unwrap();
    db.add_asset_protocol("a1", "ssh", 2201).await.unwrap();
    db.add_asset_protocol("a2", "ssh", 22).await.unwrap();
    db.add_asset_protocol("a2", "sftp", 22).await.unwrap();

    let missing = db.asset_ids_missing_sftp().await.unwrap();
    assert_eq!(missing, vec!["a1".to_string()]);

    let ssh = db.asset_ssh_protocols(&missing).await.unwrap();
    assert_eq!(ssh.len(), 1);
    assert_eq!(ssh[0].port, 2201);

    assert!(!db.add_asset_protocol("a2", "sftp", 22).await.unwrap());
    assert!(db.asset_ssh_protocols(&[]).await.unwrap().is_empty());
}
