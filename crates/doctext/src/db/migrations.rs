//! Schema versioning through SQLite's `user_version` pragma.
//!
//! Each entry in [`SCHEMA`] moves the database one version forward.
//! A step and its version bump commit together, so a crash mid-upgrade
//! leaves the database at the last complete version.

use rusqlite::Connection;

use super::error::DatabaseError;

/// Ordered schema steps. Version `n` is `SCHEMA[n - 1]`.
const SCHEMA: &[(&str, &str)] = &[
    ("documents", include_str!("sql/001_create_documents.sql")),
    (
        "job_correlations",
        include_str!("sql/002_create_job_correlations.sql"),
    ),
];

pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the schema up to the latest version. Returns the number of
/// steps applied.
pub fn upgrade(conn: &mut Connection) -> Result<usize, DatabaseError> {
    let current = schema_version(conn)? as usize;
    let pending = SCHEMA.iter().enumerate().skip(current);
    let mut applied = 0;

    for (index, (name, sql)) in pending {
        let version = (index + 1) as u32;
        tracing::debug!(version, name, "Applying schema step");

        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .and_then(|_| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DatabaseError::Upgrade { version, source })?;
        tx.commit()?;
        applied += 1;
    }

    if applied > 0 {
        tracing::info!(applied, version = SCHEMA.len(), "Database schema upgraded");
    }
    Ok(applied)
}

#[cfg(test)]
fn has_table(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .is_ok()
}
