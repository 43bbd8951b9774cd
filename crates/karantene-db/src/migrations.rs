use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS Aktiviteter (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            time    TEXT NOT NULL DEFAULT (datetime('now')),
            text    TEXT NOT NULL,
            user    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Statuser (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            time    TEXT NOT NULL DEFAULT (datetime('now')),
            user    TEXT NOT NULL,
            text    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Meldinger (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            time    TEXT NOT NULL DEFAULT (datetime('now')),
            user    TEXT NOT NULL,
            text    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Tilganger (
            user        TEXT PRIMARY KEY,
            kvissmaster INTEGER NOT NULL DEFAULT 0,
            status      INTEGER NOT NULL DEFAULT 0,
            tilganger   INTEGER NOT NULL DEFAULT 0,
            bdfl        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS Kviss (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            time        TEXT NOT NULL DEFAULT (datetime('now')),
            creator     TEXT NOT NULL,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            active      INTEGER NOT NULL DEFAULT 1,
            winner      TEXT,
            question    TEXT
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
