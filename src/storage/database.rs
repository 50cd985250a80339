//! SQLite-backed entry store.
//!
//! Rows go into a single `sha3sum` table keyed by an integer id; the same
//! path may appear in several rows across runs, each stamped with the time
//! it was inserted.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{EntrySink, SinkError, StorageError};
use crate::scanner::Entry;

/// Name of the table entries are written to.
pub const TABLE_NAME: &str = "sha3sum";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sha3sum (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL,
    size INTEGER NOT NULL,
    sum TEXT NOT NULL,
    time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const INSERT_ENTRY: &str = "INSERT INTO sha3sum (path, sum, size) VALUES (?1, ?2, ?3)";

/// WAL lets readers query the table while a scan is writing.
const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
"#;

/// Entry sink writing one row per entry in autocommit mode.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSink {
    /// Open (or create) the database at `path` and make sure the table exists.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file cannot be opened, does not
    /// answer a trivial query, or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        log::debug!("Opening database {}", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, path.to_path_buf())
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self, StorageError> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|source| StorageError::Open {
                path: path.clone(),
                source,
            })?;

        conn.execute_batch(PRAGMAS).map_err(StorageError::Schema)?;
        conn.execute(CREATE_TABLE, []).map_err(StorageError::Schema)?;
        log::debug!("Table {} ready", TABLE_NAME);

        Ok(Self { conn, path })
    }

    /// Location of the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying connection, for queries outside the insert path.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of rows currently in the table.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error if the count query fails.
    pub fn row_count(&self) -> rusqlite::Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM sha3sum", [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
    }
}

impl EntrySink for SqliteSink {
    fn store(&mut self, entry: &Entry) -> Result<(), SinkError> {
        let path = entry.path_string();
        let size = i64::try_from(entry.size).map_err(|_| SinkError::SizeOutOfRange {
            path: path.clone(),
            size: entry.size,
        })?;

        let mut stmt = self
            .conn
            .prepare_cached(INSERT_ENTRY)
            .map_err(|source| SinkError::Database {
                path: path.clone(),
                source,
            })?;
        stmt.execute(params![path, entry.hex_digest(), size])
            .map_err(|source| SinkError::Database { path, source })?;
        Ok(())
    }
}
