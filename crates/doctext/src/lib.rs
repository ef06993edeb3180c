pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod local;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod notification;
pub mod objects;
pub mod ocr;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod store;
pub mod trigger;

pub use config::{load_config, Config, CorrelationMode, RoutingStrategy};
pub use dispatch::AsyncJobDispatcher;
pub use error::{
    ConfigError, DoctextError, ObjectStoreError, OcrError, PipelineError, ProcessError, Result,
    StoreError,
};
pub use listener::{BatchReport, CompletionListener, NotificationOutcome};
pub use local::LocalExtractionAdapter;
pub use metadata::MetadataResolver;
pub use model::{
    CorrelationRecord, DocumentFormat, DocumentId, DocumentRecord, JobId, JobStatus, ObjectRef,
    ResultPage,
};
pub use notification::{parse_batch, CompletionNotification, NotificationError};
pub use pipeline::{Backends, IngestOutcome, Pipeline, PipelineConfig};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use trigger::{parse_upload_event, TriggerError};
