// src/database.rs

use log::{debug, info};
use rusqlite::{Connection, Result};
use std::path::Path;

/// Opens (or creates) the practice store at `path`.
pub fn open(path: &Path) -> Result<Connection> {
    info!("Database path: {:?}", path);
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    debug!("init_db: Checking database schema...");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY,
            concept_key TEXT NOT NULL,
            kind TEXT NOT NULL,
            correct INTEGER NOT NULL,
            response_ms INTEGER NOT NULL,
            timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_answers_concept ON answers (concept_key);
        ",
    )?;

    Ok(())
}
