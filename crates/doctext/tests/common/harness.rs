//! Test harness for isolated test execution.
//!
//! Every `pipeline()` call opens fresh SQLite connections on the same
//! database file, so two pipelines built from one harness behave like two
//! independent invocations (or a process restart) sharing only the stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use doctext::config::{Config, CorrelationMode, RoutingStrategy};
use doctext::db::Database;
use doctext::objects::{FsObjectStore, ObjectStore};
use doctext::ocr::{NotificationChannel, OcrService, StubOcrService};
use doctext::processor::{LocalExtractor, ProcessorRegistry};
use doctext::store::{KeyValueStore, KvTable, SqliteKvStore};
use doctext::{Backends, DocumentId, JobId, ObjectRef, Pipeline, PipelineConfig};

pub const BUCKET: &str = "uploads";

pub struct TestHarness {
    temp_dir: TempDir,
    pub objects_dir: PathBuf,
    pub database_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub config_dir: PathBuf,
    /// Shared across every pipeline built by this harness, like the
    /// external service would be.
    pub ocr: Arc<StubOcrService>,
    routing: RoutingStrategy,
    correlation: CorrelationMode,
    max_pages: usize,
    ocr_enabled: bool,
    extractor: Option<Arc<dyn LocalExtractor>>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let objects_dir = base.join("objects");
        let scratch_dir = base.join("scratch");
        let config_dir = base.join("config");
        std::fs::create_dir_all(&objects_dir).expect("Failed to create objects dir");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            database_path: base.join("data").join("doctext.db"),
            temp_dir,
            objects_dir,
            scratch_dir,
            config_dir,
            ocr: Arc::new(StubOcrService::new()),
            routing: RoutingStrategy::Auto,
            correlation: CorrelationMode::LookupTable,
            max_pages: 100,
            ocr_enabled: true,
            extractor: None,
        }
    }

    pub fn with_routing(mut self, routing: RoutingStrategy) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = mode;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn without_ocr(mut self) -> Self {
        self.ocr_enabled = false;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LocalExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn object_store(&self) -> Arc<FsObjectStore> {
        Arc::new(FsObjectStore::new(&self.objects_dir))
    }

    pub fn database(&self) -> Database {
        Database::open(&self.database_path).expect("Failed to open database")
    }

    pub fn result_kv(&self) -> Arc<SqliteKvStore> {
        Arc::new(SqliteKvStore::new(self.database(), KvTable::Documents))
    }

    pub fn correlation_kv(&self) -> Arc<SqliteKvStore> {
        Arc::new(SqliteKvStore::new(self.database(), KvTable::JobCorrelations))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            metadata_key: "document-id".to_string(),
            routing: self.routing,
            correlation: self.correlation,
            channel: NotificationChannel::new("ocr-completions", "ocr-publisher"),
            max_pages: self.max_pages,
            scratch_dir: self.scratch_dir.clone(),
        }
    }

    /// A pipeline over the harness's SQLite file and object directory.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with_stores(self.result_kv(), self.correlation_kv())
    }

    /// A pipeline with substituted stores, for failure injection.
    pub fn pipeline_with_stores(
        &self,
        results: Arc<dyn KeyValueStore>,
        correlations: Arc<dyn KeyValueStore>,
    ) -> Pipeline {
        let ocr: Option<Arc<dyn OcrService>> = if self.ocr_enabled {
            Some(self.ocr.clone())
        } else {
            None
        };
        let extractor = self
            .extractor
            .clone()
            .unwrap_or_else(|| Arc::new(ProcessorRegistry::new()) as Arc<dyn LocalExtractor>);

        Pipeline::new(
            self.pipeline_config(),
            Backends {
                objects: self.object_store(),
                results,
                correlations,
                ocr,
                extractor,
            },
        )
    }

    /// Stores an object, attaching `document_id` as metadata when given.
    pub async fn upload(&self, key: &str, content: &[u8], document_id: Option<&str>) -> ObjectRef {
        let object = ObjectRef::new(BUCKET, key);
        let mut metadata = HashMap::new();
        if let Some(id) = document_id {
            metadata.insert("document-id".to_string(), id.to_string());
        }
        self.object_store()
            .put(&object, content, &metadata)
            .await
            .expect("Failed to upload object");
        object
    }

    /// Reads `ResultStore[document_id]` through a fresh connection.
    pub async fn stored_text(&self, document_id: &str) -> Option<String> {
        self.pipeline()
            .results()
            .get(&DocumentId::parse(document_id).expect("empty document id"))
            .await
            .expect("Failed to read result store")
    }

    /// Reads `JobCorrelationStore[job_id]` through a fresh connection.
    pub async fn correlation(&self, job_id: &str) -> Option<String> {
        self.pipeline()
            .correlations()
            .get(&JobId::parse(job_id).expect("empty job id"))
            .await
            .expect("Failed to read correlation store")
            .map(|id| id.as_str().to_string())
    }

    pub fn write_config(&self, filename: &str, config: &Config) -> PathBuf {
        let path = self.config_dir.join(filename);
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }

    pub fn write_raw_config(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write config file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
