use serde::Serialize;
use serde_json::Value;

use karantene_types::models::{MessageRecord, PermissionRecord, StatusRecord};

use crate::auth::{APP_NAME, AppState};
use crate::error::ApiError;

/// How many recent messages every page's view-model carries.
pub const RECENT_MESSAGES: u32 = 20;

/// Sentinels the views show when the store has nothing yet.
pub const NO_ACTIVITY: &str = "<ingen aktivitet>";
pub const NO_STATUS: &str = "<ingen status>";

/// The uniform view-model every authenticated page is rendered with.
/// Handler-specific data goes in `extra`, merged on top of the base.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub app_name: &'static str,
    pub error: Option<String>,
    pub user: Option<String>,
    pub path: String,
    /// Text of the most recent activity record
    pub latest: Option<String>,
    /// The current status, if anyone has set one
    pub status: Option<StatusRecord>,
    /// Most recent messages, newest first
    pub messages: Vec<MessageRecord>,
    pub perms: PermissionRecord,
    pub extra: Option<Value>,
}

impl PageContext {
    /// Degraded context for pages rendered without a session (the
    /// login page, themed error pages).
    pub fn anonymous(path: &str) -> Self {
        Self {
            app_name: APP_NAME,
            error: None,
            user: None,
            path: path.to_string(),
            latest: None,
            status: None,
            messages: Vec::new(),
            perms: PermissionRecord::none(""),
            extra: None,
        }
    }

    /// The per-request builder: one combined store read plus the
    /// caller's permission row.
    pub async fn build(state: &AppState, navn: &str, path: &str) -> Result<Self, ApiError> {
        let db = state.db.clone();
        let user = navn.to_string();
        let (snapshot, perms) =
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let snapshot = db.read_all(RECENT_MESSAGES)?;
                let perms = db.get_permissions(&user)?;
                Ok((snapshot, perms))
            })
            .await??;

        Ok(Self {
            app_name: APP_NAME,
            error: None,
            user: Some(navn.to_string()),
            path: path.to_string(),
            latest: snapshot.latest_activity.map(|row| row.text),
            status: snapshot.latest_status.map(Into::into),
            messages: snapshot.messages.into_iter().map(Into::into).collect(),
            perms,
            extra: None,
        })
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}
