//! `SQLite`-backed key/value settings store.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use crate::error::PersistenceError;
use crate::migrations;

/// How long a write waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_millis(500);

/// Database connection wrapper
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) the settings database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, connection opening, or schema initialization fails
    pub fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database connection")?;
        let db = Self::from_connection(conn)?;

        log::info!("Settings database initialized at: {}", path.display());
        Ok(db)
    }

    /// Open a throwaway database that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to configure busy timeout")?;
        migrations::init_schema(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Key/Value Methods ====================

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn get_value(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO settings_kv (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }
}
