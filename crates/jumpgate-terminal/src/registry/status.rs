//! Human-readable terminal status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exactly one label applies to a terminal; see [`StatusLabel::from_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    NotAccepted,
    Deleted,
    Disabled,
    Offline,
    Active,
}

/// Inputs to the status decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusFlags {
    pub accepted: bool,
    pub deleted: bool,
    /// Service account linked and enabled.
    pub active: bool,
    pub alive: bool,
}

impl StatusLabel {
    /// First matching rule wins: not accepted, deleted, disabled, offline,
    /// otherwise active.
    pub const fn from_flags(flags: StatusFlags) -> Self {
        if !flags.accepted {
            Self::NotAccepted
        } else if flags.deleted {
            Self::Deleted
        } else if !flags.active {
            Self::Disabled
        } else if !flags.alive {
            Self::Offline
        } else {
            Self::Active
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotAccepted => "NotAccepted",
            Self::Deleted => "Deleted",
            Self::Disabled => "Disabled",
            Self::Offline => "Offline",
            Self::Active => "Active",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn flags(accepted: bool, deleted: bool, active: bool, alive: bool) -> StatusFlags {
        StatusFlags {
            accepted,
            deleted,
            active,
            alive,
        }
    }

    #[test]
    fn not_accepted_outranks_everything() {
        let label = StatusLabel::from_flags(flags(false, true, false, false));
        assert_eq!(label, StatusLabel::NotAccepted);
        assert_eq!(
            StatusLabel::from_flags(flags(false, false, true, true)),
            StatusLabel::NotAccepted
        );
    }

    #[test]
    fn deleted_outranks_offline() {
        assert_eq!(
            StatusLabel::from_flags(flags(true, true, false, false)),
            StatusLabel::Deleted
        );
    }

    #[test]
    fn disabled_outranks_offline() {
        assert_eq!(
            StatusLabel::from_flags(flags(true, false, false, false)),
            StatusLabel::Disabled
        );
    }

    #[test]
    fn only_all_clear_is_active() {
        assert_eq!(
            StatusLabel::from_flags(flags(true, false, true, true)),
            StatusLabel::Active
        );
        assert_eq!(
            StatusLabel::from_flags(flags(true, false, true, false)),
            StatusLabel::Offline
        );
    }
}
