// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use tidewire_config::model::StorageConfig;
use tidewire_core::TidewireError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the shared SQLite connection. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` with WAL mode,
    /// runs pending migrations, and returns a ready-to-use handle.
    pub async fn open(path: &str) -> Result<Self, TidewireError> {
        Self::open_with(path, true).await
    }

    /// Opens the database described by a storage config section.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, TidewireError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TidewireError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| TidewireError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| TidewireError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            conn.pragma_update(None, "journal_mode", if wal_mode { "WAL" } else { "DELETE" })?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let migration_result = conn
            .call(|conn| Ok(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)?;
        migration_result?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the background connection, flushing pending writes.
    pub async fn close(self) -> Result<(), TidewireError> {
        self.conn
            .close()
            .await
            .map_err(|e| TidewireError::Storage {
                source: Box::new(e),
            })
    }
}

/// Maps a tokio-rusqlite error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> TidewireError {
    TidewireError::Storage {
        source: Box::new(e),
    }
}
