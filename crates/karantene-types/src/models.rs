use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line in the activity log ("x ankom hybelen!", "x skålet!", ...).
/// Append-only; never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub time: DateTime<Utc>,
    pub text: String,
    pub user: String,
}

/// The household status board. Only the most recent row is live;
/// superseded rows stay in the log but are no longer addressable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub time: DateTime<Utc>,
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub time: DateTime<Utc>,
    pub user: String,
    pub text: String,
}

/// A capability a route can require. `bdfl` is not a capability; it
/// is an override that satisfies every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Kvissmaster,
    Status,
    Tilganger,
}

/// Per-user permission flags, keyed by the normalized display name.
/// A user without a row has every flag false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub user: String,
    pub kvissmaster: bool,
    pub status: bool,
    pub tilganger: bool,
    pub bdfl: bool,
}

impl PermissionRecord {
    /// The all-false record used when no row exists for a user.
    pub fn none(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            kvissmaster: false,
            status: false,
            tilganger: false,
            bdfl: false,
        }
    }

    /// Capability check: `bdfl` satisfies everything; otherwise every
    /// required flag must be set. An empty requirement always passes.
    pub fn allows(&self, required: &[Capability]) -> bool {
        if self.bdfl {
            return true;
        }
        required.iter().all(|cap| match cap {
            Capability::Kvissmaster => self.kvissmaster,
            Capability::Status => self.status,
            Capability::Tilganger => self.tilganger,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveQuizRecord {
    pub id: i64,
    pub creator: String,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub winner: Option<String>,
    pub question: Option<String>,
    pub time: DateTime<Utc>,
}
