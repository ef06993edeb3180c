use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::secrets::expand_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Object-metadata key carrying the document identifier.
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub notification_channel: NotificationChannelConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            metadata_key: default_metadata_key(),
            object_store: ObjectStoreConfig::default(),
            stores: StoresConfig::default(),
            ocr: OcrConfig::default(),
            notification_channel: NotificationChannelConfig::default(),
            listener: ListenerConfig::default(),
            routing: RoutingConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

fn default_metadata_key() -> String {
    "document-id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_object_root")]
    pub root: String,
}

impl ObjectStoreConfig {
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

fn default_object_root() -> String {
    "~/.doctext/objects".to_string()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            root: default_object_root(),
        }
    }
}

/// SQLite files backing the two durable stores. They may point at the
/// same file; each store only touches its own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default = "default_database")]
    pub result_database: String,
    #[serde(default = "default_database")]
    pub correlation_database: String,
}

impl StoresConfig {
    pub fn result_database_path(&self) -> PathBuf {
        expand_home(&self.result_database)
    }

    pub fn correlation_database_path(&self) -> PathBuf {
        expand_home(&self.correlation_database)
    }
}

fn default_database() -> String {
    "~/.doctext/data/doctext.db".to_string()
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            result_database: default_database(),
            correlation_database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the OCR service. `None` disables the OCR path.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub api_token_file: Option<String>,
    #[serde(default)]
    pub api_token_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> usize {
    10_000
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            api_token_file: None,
            api_token_env: None,
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationChannelConfig {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub role: String,
}

/// How the completion listener recovers the document identifier for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Read the Job Correlation Store written at dispatch time.
    #[default]
    LookupTable,
    /// Take the identifier the OCR service echoes back as the job tag.
    EchoToken,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub correlation: CorrelationMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStrategy {
    Local,
    Ocr,
    /// Local first; fall back to OCR when the document has no usable text.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub default_strategy: RoutingStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

impl ExtractionConfig {
    pub fn scratch_path(&self) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => expand_home(dir),
            None => std::env::temp_dir(),
        }
    }
}
