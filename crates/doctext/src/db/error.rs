use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema step failed; the schema stays at the previous version.
    #[error("Schema upgrade to version {version} failed: {source}")]
    Upgrade {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database connection mutex poisoned")]
    Poisoned,
}
