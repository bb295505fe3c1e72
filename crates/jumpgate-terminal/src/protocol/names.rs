//! Closed sets of protocol identifiers and gateway kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a stored or user-supplied identifier is not in a closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Connection protocols a terminal may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolName {
    Ssh,
    Sftp,
    Telnet,
    Vnc,
    Rdp,
    Mysql,
    Mariadb,
    Postgresql,
    Oracle,
    Sqlserver,
    Redis,
    Mongodb,
    Clickhouse,
    K8s,
    Http,
}

impl ProtocolName {
    pub const ALL: [Self; 15] = [
        Self::Ssh,
        Self::Sftp,
        Self::Telnet,
        Self::Vnc,
        Self::Rdp,
        Self::Mysql,
        Self::Mariadb,
        Self::Postgresql,
        Self::Oracle,
        Self::Sqlserver,
        Self::Redis,
        Self::Mongodb,
        Self::Clickhouse,
        Self::K8s,
        Self::Http,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Sftp => "sftp",
            Self::Telnet => "telnet",
            Self::Vnc => "vnc",
            Self::Rdp => "rdp",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Postgresql => "postgresql",
            Self::Oracle => "oracle",
            Self::Sqlserver => "sqlserver",
            Self::Redis => "redis",
            Self::Mongodb => "mongodb",
            Self::Clickhouse => "clickhouse",
            Self::K8s => "k8s",
            Self::Http => "http",
        }
    }

    /// Canonical port the catalog seeds for this protocol.
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Ssh | Self::Sftp => 22,
            Self::Telnet => 23,
            Self::Vnc => 5900,
            Self::Rdp => 3389,
            Self::Mysql | Self::Mariadb => 3306,
            Self::Postgresql => 5432,
            Self::Oracle => 1521,
            Self::Sqlserver => 1433,
            Self::Redis => 6379,
            Self::Mongodb => 27017,
            Self::Clickhouse => 9000,
            Self::K8s => 443,
            Self::Http => 80,
        }
    }
}

impl fmt::Display for ProtocolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolName {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "protocol",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for ProtocolName {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Kinds of gateway process that register as terminals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalType {
    #[default]
    Koko,
    Guacamole,
    Omnidb,
    Xrdp,
    Lion,
    Core,
    Celery,
    Magnus,
    Razor,
    Tinker,
    VideoWorker,
    Chen,
    Kael,
}

impl TerminalType {
    pub const ALL: [Self; 13] = [
        Self::Koko,
        Self::Guacamole,
        Self::Omnidb,
        Self::Xrdp,
        Self::Lion,
        Self::Core,
        Self::Celery,
        Self::Magnus,
        Self::Razor,
        Self::Tinker,
        Self::VideoWorker,
        Self::Chen,
        Self::Kael,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Koko => "koko",
            Self::Guacamole => "guacamole",
            Self::Omnidb => "omnidb",
            Self::Xrdp => "xrdp",
            Self::Lion => "lion",
            Self::Core => "core",
            Self::Celery => "celery",
            Self::Magnus => "magnus",
            Self::Razor => "razor",
            Self::Tinker => "tinker",
            Self::VideoWorker => "video_worker",
            Self::Chen => "chen",
            Self::Kael => "kael",
        }
    }

    /// Protocols this kind of gateway serves, or `None` for kinds that do
    /// not proxy connections at all.
    pub const fn supported_protocols(&self) -> Option<&'static [ProtocolName]> {
        use ProtocolName::{
            Clickhouse, Http, Mariadb, Mongodb, Mysql, Oracle, Postgresql, Rdp, Redis, Sqlserver,
            Ssh, Vnc,
        };

        match self {
            Self::Koko => Some(&[Ssh]),
            Self::Lion | Self::Guacamole => Some(&[Rdp, Vnc]),
            Self::Xrdp | Self::Razor => Some(&[Rdp]),
            Self::Magnus => Some(&[
                Mysql, Mariadb, Postgresql, Oracle, Sqlserver, Clickhouse, Redis, Mongodb,
            ]),
            Self::Omnidb | Self::Chen => Some(&[Mysql, Mariadb, Postgresql, Oracle, Sqlserver]),
            Self::Kael => Some(&[Http]),
            Self::Core | Self::Celery | Self::Tinker | Self::VideoWorker => None,
        }
    }
}

impl fmt::Display for TerminalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "terminal type",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for TerminalType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
