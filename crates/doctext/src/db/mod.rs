//! SQLite persistence shared by the result and correlation stores.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod error;
pub mod migrations;

pub use error::DatabaseError;

/// Shared handle to one SQLite connection.
///
/// Clones refer to the same connection. The file is opened in WAL mode
/// so a listener process can read while a dispatcher process writes.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the database file, creating it and its directory when absent,
    /// and upgrades the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|source| DatabaseError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?
            }
            _ => {}
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self::prepare(conn)?;
        tracing::debug!(path = %path.display(), "Opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(mut conn: Connection) -> Result<Self, DatabaseError> {
        migrations::upgrade(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let guard = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        f(&guard)
    }
}
