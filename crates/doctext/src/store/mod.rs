//! Durable key-value stores for extraction results and job correlations.
//!
//! Every write in this crate touches exactly one key, so the only
//! requirement on a backend is an atomic last-writer-wins `put` and a
//! point `get`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{CorrelationRecord, DocumentId, DocumentRecord, JobId};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::{KvTable, SqliteKvStore};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically replaces the value stored under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Document identifier → extracted text.
#[derive(Clone)]
pub struct ResultStore {
    inner: Arc<dyn KeyValueStore>,
}

impl ResultStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub async fn put(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        self.inner
            .put(record.document_id.as_str(), &record.text)
            .await
    }

    pub async fn get(&self, document_id: &DocumentId) -> Result<Option<String>, StoreError> {
        self.inner.get(document_id.as_str()).await
    }
}

/// Job identifier → document identifier.
#[derive(Clone)]
pub struct JobCorrelationStore {
    inner: Arc<dyn KeyValueStore>,
}

impl JobCorrelationStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub async fn put(&self, record: &CorrelationRecord) -> Result<(), StoreError> {
        self.inner
            .put(record.job_id.as_str(), record.document_id.as_str())
            .await
    }

    pub async fn get(&self, job_id: &JobId) -> Result<Option<DocumentId>, StoreError> {
        match self.inner.get(job_id.as_str()).await? {
            Some(raw) => DocumentId::parse(&raw)
                .map(Some)
                .ok_or_else(|| StoreError::InvalidValue {
                    key: job_id.to_string(),
                    reason: "empty document id".to_string(),
                }),
            None => Ok(None),
        }
    }
}
