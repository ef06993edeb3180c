//! SQLite-backed key-value store, one instance per table.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::KeyValueStore;
use crate::db::{Database, DatabaseError};
use crate::error::StoreError;

/// The tables a key-value store can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvTable {
    /// `documents(document_id, text, updated_at)`
    Documents,
    /// `job_correlations(job_id, document_id, created_at)`
    JobCorrelations,
}

impl KvTable {
    fn upsert_sql(&self) -> &'static str {
        match self {
            Self::Documents => {
                "INSERT INTO documents (document_id, text, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(document_id) DO UPDATE SET text = excluded.text, updated_at = excluded.updated_at"
            }
            Self::JobCorrelations => {
                "INSERT INTO job_correlations (job_id, document_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(job_id) DO UPDATE SET document_id = excluded.document_id"
            }
        }
    }

    fn select_sql(&self) -> &'static str {
        match self {
            Self::Documents => "SELECT text FROM documents WHERE document_id = ?1",
            Self::JobCorrelations => "SELECT document_id FROM job_correlations WHERE job_id = ?1",
        }
    }
}

#[derive(Clone)]
pub struct SqliteKvStore {
    db: Database,
    table: KvTable,
}

impl SqliteKvStore {
    pub fn new(db: Database, table: KvTable) -> Self {
        Self { db, table }
    }

    pub fn table(&self) -> KvTable {
        self.table
    }

    /// Runs a statement on the blocking pool so the connection lock is never
    /// held on a runtime worker.
    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database, KvTable) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let table = self.table;
        let value = tokio::task::spawn_blocking(move || f(&db, table))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(value)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.blocking(move |db, table| {
            db.with_conn(|conn| {
                conn.execute(table.upsert_sql(), params![key, value, now])?;
                Ok(())
            })
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.blocking(move |db, table| {
            db.with_conn(|conn| {
                conn.query_row(table.select_sql(), params![key], |r| r.get(0))
                    .optional()
                    .map_err(DatabaseError::from)
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = SqliteKvStore::new(test_db(), KvTable::Documents);
        store.put("D1", "Hello\nWorld").await.unwrap();
        assert_eq!(store.get("D1").await.unwrap().as_deref(), Some("Hello\nWorld"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = SqliteKvStore::new(test_db(), KvTable::JobCorrelations);
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_single_row() {
        let db = test_db();
        let store = SqliteKvStore::new(db.clone(), KvTable::Documents);
        store.put("D1", "old").await.unwrap();
        store.put("D1", "new").await.unwrap();

        assert_eq!(store.get("D1").await.unwrap().as_deref(), Some("new"));
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_tables_are_isolated() {
        let db = test_db();
        let results = SqliteKvStore::new(db.clone(), KvTable::Documents);
        let correlations = SqliteKvStore::new(db, KvTable::JobCorrelations);

        correlations.put("K", "D1").await.unwrap();
        assert!(results.get("K").await.unwrap().is_none());
        assert_eq!(correlations.get("K").await.unwrap().as_deref(), Some("D1"));
    }

    #[tokio::test]
    async fn test_visible_to_separate_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        let writer = SqliteKvStore::new(Database::open(&path).unwrap(), KvTable::JobCorrelations);
        writer.put("J1", "D1").await.unwrap();
        drop(writer);

        let reader = SqliteKvStore::new(Database::open(&path).unwrap(), KvTable::JobCorrelations);
        assert_eq!(reader.get("J1").await.unwrap().as_deref(), Some("D1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_share_connection() {
        let db = test_db();
        let store = SqliteKvStore::new(db.clone(), KvTable::Documents);

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.put(&format!("D{}", i), &format!("text {}", i)).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        assert_eq!(store.get("D7").await.unwrap().as_deref(), Some("text 7"));
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
            assert_eq!(count, 16);
            Ok(())
        })
        .unwrap();
    }
}
