//! Database row types, mapping directly to SQLite rows. Distinct
//! from the karantene-types records so the wire/view layer never sees
//! raw TEXT timestamps or row ids.

use chrono::{DateTime, NaiveDateTime, Utc};
use karantene_types::models::{ActivityRecord, LiveQuizRecord, MessageRecord, StatusRecord};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub time: String,
    pub text: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct StatusRow {
    pub id: i64,
    pub time: String,
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub time: String,
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct QuizRow {
    pub id: i64,
    pub time: String,
    pub creator: String,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub winner: Option<String>,
    pub question: Option<String>,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without a
/// timezone; datetime('now') is UTC.
pub(crate) fn parse_db_time(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' in store: {}", raw, e);
            DateTime::default()
        })
}

impl From<ActivityRow> for ActivityRecord {
    fn from(row: ActivityRow) -> Self {
        ActivityRecord {
            time: parse_db_time(&row.time),
            text: row.text,
            user: row.user,
        }
    }
}

impl From<StatusRow> for StatusRecord {
    fn from(row: StatusRow) -> Self {
        StatusRecord {
            time: parse_db_time(&row.time),
            user: row.user,
            text: row.text,
        }
    }
}

impl From<MessageRow> for MessageRecord {
    fn from(row: MessageRow) -> Self {
        MessageRecord {
            time: parse_db_time(&row.time),
            user: row.user,
            text: row.text,
        }
    }
}

impl From<QuizRow> for LiveQuizRecord {
    fn from(row: QuizRow) -> Self {
        LiveQuizRecord {
            id: row.id,
            creator: row.creator,
            name: row.name,
            description: row.description,
            active: row.active,
            winner: row.winner,
            question: row.question,
            time: parse_db_time(&row.time),
        }
    }
}
