use crate::Database;
use crate::models::{ActivityRow, MessageRow, QuizRow, StatusRow};
use anyhow::Result;
use karantene_types::models::{Capability, PermissionRecord};
use rusqlite::{Connection, OptionalExtension};

/// The combined read backing the per-request view-model. The three
/// sub-reads run in sequence on one acquired connection; this is not
/// a transaction, so a write from another handler may land between
/// them. That race is accepted; the next page load sees it.
#[derive(Debug)]
pub struct Snapshot {
    pub latest_activity: Option<ActivityRow>,
    pub latest_status: Option<StatusRow>,
    pub messages: Vec<MessageRow>,
}

impl Database {
    // -- Aktiviteter --

    pub fn add_activity(&self, text: &str, user: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Aktiviteter (text, user) VALUES (?1, ?2)",
                (text, user),
            )?;
            Ok(())
        })
    }

    pub fn latest_activity(&self) -> Result<Option<ActivityRow>> {
        self.with_conn(query_latest_activity)
    }

    /// Full activity log, oldest first.
    pub fn all_activity(&self) -> Result<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, time, text, user FROM Aktiviteter ORDER BY id")?;
            let rows = stmt
                .query_map([], activity_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Meldinger --

    pub fn add_message(&self, text: &str, user: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Meldinger (user, text) VALUES (?1, ?2)",
                (user, text),
            )?;
            Ok(())
        })
    }

    /// The `n` most recent messages, newest first.
    pub fn latest_messages(&self, n: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_latest_messages(conn, n))
    }

    pub fn all_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, time, user, text FROM Meldinger ORDER BY id")?;
            let rows = stmt
                .query_map([], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Append a message and hand back the stored row, so the caller
    /// can broadcast exactly what was committed.
    pub fn add_message_returning(&self, text: &str, user: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Meldinger (user, text) VALUES (?1, ?2)",
                (user, text),
            )?;
            let rows = query_latest_messages(conn, 1)?;
            Ok(rows.into_iter().next())
        })
    }

    // -- Statuser --

    pub fn add_status(&self, text: &str, user: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Statuser (user, text) VALUES (?1, ?2)",
                (user, text),
            )?;
            Ok(())
        })
    }

    /// Rewrite the text of the most recent status. No-op when the log
    /// is empty.
    pub fn edit_latest_status(&self, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE Statuser SET text = ?1 WHERE id = (SELECT max(id) FROM Statuser)",
                [text],
            )?;
            Ok(())
        })
    }

    /// Drop the most recent status, exposing the one before it. No-op
    /// when the log is empty.
    pub fn delete_latest_status(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM Statuser WHERE id = (SELECT max(id) FROM Statuser)",
                [],
            )?;
            Ok(())
        })
    }

    pub fn latest_status(&self, n: u32) -> Result<Vec<StatusRow>> {
        self.with_conn(|conn| query_latest_status(conn, n))
    }

    pub fn all_status(&self) -> Result<Vec<StatusRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, time, user, text FROM Statuser ORDER BY id")?;
            let rows = stmt
                .query_map([], status_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Combined read --

    pub fn read_all(&self, n_messages: u32) -> Result<Snapshot> {
        self.with_conn(|conn| {
            Ok(Snapshot {
                latest_activity: query_latest_activity(conn)?,
                latest_status: query_latest_status(conn, 1)?.into_iter().next(),
                messages: query_latest_messages(conn, n_messages)?,
            })
        })
    }

    // -- Tilganger --

    /// Never fails with "no such user": an absent row reads as the
    /// all-false record.
    pub fn get_permissions(&self, user: &str) -> Result<PermissionRecord> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user, kvissmaster, status, tilganger, bdfl
                     FROM Tilganger WHERE user = ?1",
                    [user],
                    permissions_from_row,
                )
                .optional()?;
            Ok(row.unwrap_or_else(|| PermissionRecord::none(user)))
        })
    }

    pub fn all_permissions(&self) -> Result<Vec<PermissionRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user, kvissmaster, status, tilganger, bdfl
                 FROM Tilganger ORDER BY user",
            )?;
            let rows = stmt
                .query_map([], permissions_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Whole-row upsert.
    pub fn set_permissions(&self, record: &PermissionRecord) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO Tilganger (user, kvissmaster, status, tilganger, bdfl)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &record.user,
                    record.kvissmaster,
                    record.status,
                    record.tilganger,
                    record.bdfl,
                ),
            )?;
            Ok(())
        })
    }

    pub fn check_permission(&self, user: &str, required: &[Capability]) -> Result<bool> {
        Ok(self.get_permissions(user)?.allows(required))
    }

    // -- Kviss --

    pub fn add_quiz(
        &self,
        creator: &str,
        name: &str,
        description: &str,
        question: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Kviss (creator, name, description, question) VALUES (?1, ?2, ?3, ?4)",
                (creator, name, description, question),
            )?;
            Ok(())
        })
    }

    pub fn quiz_by_id(&self, id: i64) -> Result<Option<QuizRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, time, creator, name, description, active, winner, question
                     FROM Kviss WHERE id = ?1",
                    [id],
                    quiz_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn quiz_by_name(&self, name: &str) -> Result<Option<QuizRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, time, creator, name, description, active, winner, question
                     FROM Kviss WHERE name = ?1 ORDER BY id DESC LIMIT 1",
                    [name],
                    quiz_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn latest_quiz(&self) -> Result<Option<QuizRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, time, creator, name, description, active, winner, question
                     FROM Kviss ORDER BY id DESC LIMIT 1",
                    [],
                    quiz_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }
}

// "Latest" always means highest id: the autoincrement column is the
// strict tie-break the TEXT timestamps cannot provide.

fn query_latest_activity(conn: &Connection) -> Result<Option<ActivityRow>> {
    let row = conn
        .query_row(
            "SELECT id, time, text, user FROM Aktiviteter ORDER BY id DESC LIMIT 1",
            [],
            activity_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_latest_status(conn: &Connection, n: u32) -> Result<Vec<StatusRow>> {
    let mut stmt =
        conn.prepare("SELECT id, time, user, text FROM Statuser ORDER BY id DESC LIMIT ?1")?;
    let rows = stmt
        .query_map([n], status_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_latest_messages(conn: &Connection, n: u32) -> Result<Vec<MessageRow>> {
    let mut stmt =
        conn.prepare("SELECT id, time, user, text FROM Meldinger ORDER BY id DESC LIMIT ?1")?;
    let rows = stmt
        .query_map([n], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn activity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        time: row.get(1)?,
        text: row.get(2)?,
        user: row.get(3)?,
    })
}

fn status_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StatusRow> {
    Ok(StatusRow {
        id: row.get(0)?,
        time: row.get(1)?,
        user: row.get(2)?,
        text: row.get(3)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        time: row.get(1)?,
        user: row.get(2)?,
        text: row.get(3)?,
    })
}

fn permissions_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionRecord> {
    Ok(PermissionRecord {
        user: row.get(0)?,
        kvissmaster: row.get(1)?,
        status: row.get(2)?,
        tilganger: row.get(3)?,
        bdfl: row.get(4)?,
    })
}

fn quiz_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuizRow> {
    Ok(QuizRow {
        id: row.get(0)?,
        time: row.get(1)?,
        creator: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        active: row.get(5)?,
        winner: row.get(6)?,
        question: row.get(7)?,
    })
}
