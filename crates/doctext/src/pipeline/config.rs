use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, CorrelationMode, RoutingStrategy};
use crate::db::Database;
use crate::error::DoctextError;
use crate::objects::{FsObjectStore, ObjectStore};
use crate::ocr::{HttpOcrService, NotificationChannel, OcrService};
use crate::processor::{LocalExtractor, ProcessorRegistry};
use crate::secrets::resolve_secret_optional;
use crate::store::{KeyValueStore, KvTable, SqliteKvStore};

/// Settings the pipeline components are constructed with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub metadata_key: String,
    pub routing: RoutingStrategy,
    pub correlation: CorrelationMode,
    pub channel: NotificationChannel,
    pub max_pages: usize,
    pub scratch_dir: PathBuf,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            metadata_key: config.metadata_key.clone(),
            routing: config.routing.default_strategy,
            correlation: config.listener.correlation,
            channel: NotificationChannel::new(
                &config.notification_channel.topic,
                &config.notification_channel.role,
            ),
            max_pages: config.ocr.max_pages,
            scratch_dir: config.extraction.scratch_path(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// External collaborators of the pipeline.
#[derive(Clone)]
pub struct Backends {
    pub objects: Arc<dyn ObjectStore>,
    pub results: Arc<dyn KeyValueStore>,
    pub correlations: Arc<dyn KeyValueStore>,
    /// `None` disables the OCR path.
    pub ocr: Option<Arc<dyn OcrService>>,
    pub extractor: Arc<dyn LocalExtractor>,
}

impl Backends {
    /// Filesystem object store, SQLite stores and, when an endpoint is
    /// configured, the HTTP OCR client.
    pub fn from_config(config: &Config) -> Result<Self, DoctextError> {
        let objects: Arc<dyn ObjectStore> =
            Arc::new(FsObjectStore::new(config.object_store.root_path()));

        let result_path = config.stores.result_database_path();
        let correlation_path = config.stores.correlation_database_path();
        let result_db = Database::open(&result_path)?;
        let correlation_db = if correlation_path == result_path {
            result_db.clone()
        } else {
            Database::open(&correlation_path)?
        };

        let ocr = match config.ocr.endpoint.as_deref() {
            Some(endpoint) => {
                let token = resolve_secret_optional(
                    config.ocr.api_token.as_deref(),
                    config.ocr.api_token_file.as_deref(),
                    config.ocr.api_token_env.as_deref(),
                )?;
                let client = HttpOcrService::new(endpoint, token, config.ocr.timeout())?;
                Some(Arc::new(client) as Arc<dyn OcrService>)
            }
            None => None,
        };

        Ok(Self {
            objects,
            results: Arc::new(SqliteKvStore::new(result_db, KvTable::Documents)),
            correlations: Arc::new(SqliteKvStore::new(
                correlation_db,
                KvTable::JobCorrelations,
            )),
            ocr,
            extractor: Arc::new(ProcessorRegistry::new()),
        })
    }
}
