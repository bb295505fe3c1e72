//! Configuration resolution for Jumpgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/jumpgate/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Files are deep-merged as JSON before deserialization, so a file only needs
//! to carry the keys it overrides.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Jumpgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    #[serde(default)]
    pub terminal: TerminalSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub storage: StorageDefaults,
    /// Title shown by gateways on their login banner.
    #[serde(default = "default_login_title")]
    pub login_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            liveness: LivenessConfig::default(),
            terminal: TerminalSettings::default(),
            security: SecuritySettings::default(),
            storage: StorageDefaults::default(),
            login_title: default_login_title(),
        }
    }
}

fn default_login_title() -> String {
    "Jumpgate Open Source Bastion".to_string()
}

/// Registry database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

/// Heartbeat presence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// How long a heartbeat keeps a terminal alive (seconds).
    pub ttl_secs: u64,
    /// Shared Redis instance; the in-process cache is used when unset.
    pub redis_url: Option<String>,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            redis_url: None,
        }
    }
}

/// Settings pushed to every connecting gateway under `TERMINAL_*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    pub password_auth: bool,
    pub public_key_auth: bool,
    /// Seconds between gateway heartbeats.
    pub heartbeat_interval: u64,
    pub asset_list_sort_by: String,
    pub asset_list_page_size: String,
    /// Days to keep finished sessions.
    pub session_keep_duration: u32,
    pub host_key: String,
    pub telnet_regex: String,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            password_auth: true,
            public_key_auth: true,
            heartbeat_interval: 20,
            asset_list_sort_by: "name".to_string(),
            asset_list_page_size: "auto".to_string(),
            session_keep_duration: 200,
            host_key: String::new(),
            telnet_regex: String::new(),
        }
    }
}

impl TerminalSettings {
    /// The recognized settings as `TERMINAL_*` keyed entries.
    pub fn to_entries(&self) -> Map<String, Value> {
        let mut entries = Map::new();
        entries.insert("TERMINAL_PASSWORD_AUTH".into(), json!(self.password_auth));
        entries.insert("TERMINAL_PUBLIC_KEY_AUTH".into(), json!(self.public_key_auth));
        entries.insert(
            "TERMINAL_HEARTBEAT_INTERVAL".into(),
            json!(self.heartbeat_interval),
        );
        entries.insert(
            "TERMINAL_ASSET_LIST_SORT_BY".into(),
            json!(self.asset_list_sort_by),
        );
        entries.insert(
            "TERMINAL_ASSET_LIST_PAGE_SIZE".into(),
            json!(self.asset_list_page_size),
        );
        entries.insert(
            "TERMINAL_SESSION_KEEP_DURATION".into(),
            json!(self.session_keep_duration),
        );
        entries.insert("TERMINAL_HOST_KEY".into(), json!(self.host_key));
        entries.insert("TERMINAL_TELNET_REGEX".into(), json!(self.telnet_regex));
        entries
    }
}

/// Session security settings shared with gateways.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Minutes of inactivity before a gateway closes a session.
    pub max_idle_time: u32,
    pub session_share: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_idle_time: 30,
            session_share: true,
        }
    }
}

/// Storage configurations used when a terminal names an unknown backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageDefaults {
    pub command: Value,
    pub replay: Value,
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            command: json!({ "TYPE": "server" }),
            replay: json!({ "TYPE": "server" }),
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    load_config_from(global_config_path().as_deref(), explicit, |key| {
        std::env::var(key).ok()
    })
}

/// Resolve configuration from explicit sources.
///
/// A missing `global` file is skipped; a missing `explicit` file is an
/// error. `lookup` supplies environment overrides.
pub fn load_config_from(
    global: Option<&Path>,
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global.filter(|p| p.exists()) {
        merge_json(&mut merged, read_config_file(global_path)?);
    }

    if let Some(path) = explicit {
        merge_json(&mut merged, read_config_file(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

    apply_env_overrides(&mut config, lookup);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".jumpgate").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/jumpgate/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("jumpgate").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn read_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Values replaced as a whole even when both sides are objects. A storage
/// config is one backend's settings, never a blend of two.
const WHOLE_VALUE_PATHS: &[&[&str]] = &[&["storage", "command"], &["storage", "replay"]];

/// Recursively overlay `overlay` onto `base`. Objects merge key by key,
/// except at [`WHOLE_VALUE_PATHS`]; any other value replaces the base value.
fn merge_json(base: &mut Value, overlay: Value) {
    merge_at(base, overlay, &mut Vec::new());
}

fn merge_at(base: &mut Value, overlay: Value, path: &mut Vec<String>) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                path.push(key.clone());
                let nested = !is_whole_value(path)
                    && value.is_object()
                    && base.get(&key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = base.get_mut(&key) {
                        merge_at(existing, value, path);
                    }
                } else {
                    base.insert(key, value);
                }
                path.pop();
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn is_whole_value(path: &[String]) -> bool {
    WHOLE_VALUE_PATHS.iter().any(|whole| {
        whole.len() == path.len() && whole.iter().zip(path).all(|(a, b)| *a == b.as_str())
    })
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("JUMPGATE_DB_PATH") {
        config.database.path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("JUMPGATE_LIVENESS_TTL") {
        if let Ok(n) = val.parse() {
            config.liveness.ttl_secs = n;
        }
    }
    if let Some(val) = lookup("JUMPGATE_REDIS_URL") {
        config.liveness.redis_url = Some(val);
    }
    if let Some(val) = lookup("JUMPGATE_LOGIN_TITLE") {
        config.login_title = val;
    }
    if let Some(val) = lookup("JUMPGATE_MAX_IDLE_TIME") {
        if let Ok(n) = val.parse() {
            config.security.max_idle_time = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_liveness_ttl_is_two_minutes() {
        let config = Config::default();
        assert_eq!(config.liveness.ttl_secs, 120);
    }

    #[test]
    fn terminal_entries_are_all_prefixed() {
        let entries = TerminalSettings::default().to_entries();
        assert_eq!(entries.len(), 8);
        assert!(entries.keys().all(|k| k.starts_with("TERMINAL_")));
        assert_eq!(entries["TERMINAL_HEARTBEAT_INTERVAL"], json!(20));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"security": {"session_share": false}, "terminal": {"host_key": "abc"}}"#,
        )
        .unwrap();

        let config = load_config_from(None, Some(&path), |_| None).unwrap();
        assert!(!config.security.session_share);
        assert_eq!(config.security.max_idle_time, 30);
        assert_eq!(config.terminal.host_key, "abc");
        assert!(config.terminal.password_auth);
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_config_from(None, Some(&path), |_| None).unwrap_err();
        assert!(matches!(&err, Error::Config(msg) if msg.contains("missing.json")));
    }

    #[test]
    fn missing_global_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("absent.json");
        let config = load_config_from(Some(&global), None, |_| None).unwrap();
        assert_eq!(config.login_title, Config::default().login_title);
    }

    #[test]
    fn explicit_file_and_env_layer_over_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("settings.json");
        std::fs::write(
            &global,
            r#"{"login_title": "Global", "security": {"max_idle_time": 5, "session_share": false}}"#,
        )
        .unwrap();
        std::fs::write(&explicit, r#"{"security": {"max_idle_time": 15}}"#).unwrap();

        let config = load_config_from(Some(&global), Some(&explicit), |key| {
            (key == "JUMPGATE_LOGIN_TITLE").then(|| "Env".to_string())
        })
        .unwrap();

        assert_eq!(config.login_title, "Env");
        assert_eq!(config.security.max_idle_time, 15);
        assert!(!config.security.session_share);
    }

    #[test]
    fn layered_storage_config_replaces_whole_backend() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("settings.json");
        std::fs::write(
            &global,
            r#"{"storage": {"command": {"TYPE": "es", "HOSTS": ["http://es:9200"], "INDEX": "jumpgate"}}}"#,
        )
        .unwrap();
        std::fs::write(
            &explicit,
            r#"{"storage": {"command": {"TYPE": "s3", "BUCKET": "cmds"}}}"#,
        )
        .unwrap();

        let config = load_config_from(Some(&global), Some(&explicit), |_| None).unwrap();

        assert_eq!(config.storage.command, json!({"TYPE": "s3", "BUCKET": "cmds"}));
    }

    #[test]
    fn storage_file_without_type_drops_default_type() {
        let mut base = json!({"storage": {"replay": {"TYPE": "server"}}});
        merge_json(&mut base, json!({"storage": {"replay": {"BUCKET": "r"}}}));
        assert_eq!(base["storage"]["replay"], json!({"BUCKET": "r"}));
    }

    #[test]
    fn merge_replaces_non_object_values() {
        let mut base = json!({"security": {"max_idle_time": 30, "session_share": true}, "login_title": "a"});
        merge_json(
            &mut base,
            json!({"security": {"max_idle_time": 10}, "login_title": "b"}),
        );
        assert_eq!(base["security"]["max_idle_time"], 10);
        assert_eq!(base["security"]["session_share"], true);
        assert_eq!(base["login_title"], "b");
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("JUMPGATE_LIVENESS_TTL", "30"),
            ("JUMPGATE_LOGIN_TITLE", "Ops"),
            ("JUMPGATE_MAX_IDLE_TIME", "not-a-number"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(config.liveness.ttl_secs, 30);
        assert_eq!(config.login_title, "Ops");
        assert_eq!(config.security.max_idle_time, 30);
    }
}
