use std::path::PathBuf;
use thiserror::Error;

use crate::model::{DocumentId, JobId, ObjectRef};

#[derive(Error, Debug)]
pub enum DoctextError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("OCR service error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Trigger error: {0}")]
    Trigger(#[from] crate::trigger::TriggerError),

    #[error("Notification error: {0}")]
    Notification(#[from] crate::notification::NotificationError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Format '{0}' has no embedded text and requires OCR")]
    RequiresOcr(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to process DOCX: {0}")]
    DocxProcessing(String),

    #[error("Document has no usable embedded text")]
    NoEmbeddedText,

    #[error("Extractor task failed: {0}")]
    Task(String),
}

impl ProcessError {
    /// Whether the document should be sent to the OCR path instead.
    pub fn needs_ocr(&self) -> bool {
        matches!(self, Self::NoEmbeddedText | Self::RequiresOcr(_))
    }
}

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object '{0}' not found")]
    NotFound(ObjectRef),

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt metadata for '{object}': {source}")]
    Metadata {
        object: ObjectRef,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value for key '{key}' is invalid: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("OCR service response is invalid: {0}")]
    InvalidResponse(String),

    #[error("Job '{0}' is unknown to the OCR service")]
    UnknownJob(JobId),

    #[error("Result set for job '{job_id}' exceeded {limit} pages")]
    PageLimitExceeded { job_id: JobId, limit: usize },
}

/// Failures surfaced by the dispatch, extraction and notification entry points.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Object '{object}' has no '{metadata_key}' metadata")]
    MissingIdentifier {
        object: ObjectRef,
        metadata_key: String,
    },

    #[error("Unsupported document format for '{0}'")]
    UnsupportedFormat(ObjectRef),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Local extraction failed for document '{document_id}': {source}")]
    Extraction {
        document_id: DocumentId,
        #[source]
        source: ProcessError,
    },

    #[error("Failed to store result for document '{document_id}': {source}")]
    ResultWrite {
        document_id: DocumentId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to submit OCR job for document '{document_id}': {source}")]
    JobSubmission {
        document_id: DocumentId,
        #[source]
        source: OcrError,
    },

    #[error("Job '{job_id}' was submitted but its correlation to '{document_id}' was not recorded: {source}")]
    CorrelationWrite {
        job_id: JobId,
        document_id: DocumentId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to look up correlation for job '{job_id}': {source}")]
    CorrelationRead {
        job_id: JobId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch results for job '{job_id}': {source}")]
    ResultFetch {
        job_id: JobId,
        #[source]
        source: OcrError,
    },

    #[error("Malformed notification: {0}")]
    MalformedNotification(#[from] crate::notification::NotificationError),

    #[error("No OCR service is configured")]
    OcrNotConfigured,
}

impl PipelineError {
    /// Whether re-delivering the triggering event could succeed.
    ///
    /// Caller-data problems never recover. A failed correlation write is
    /// also terminal: the job already exists and re-running the dispatch
    /// would only hit the idempotency token again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MissingIdentifier { .. }
            | Self::UnsupportedFormat(_)
            | Self::MalformedNotification(_)
            | Self::OcrNotConfigured
            | Self::CorrelationWrite { .. } => false,
            Self::Extraction { source, .. } => matches!(source, ProcessError::Task(_)),
            Self::ObjectStore(e) => !matches!(
                e,
                ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidKey { .. }
            ),
            Self::ResultWrite { .. }
            | Self::JobSubmission { .. }
            | Self::CorrelationRead { .. }
            | Self::ResultFetch { .. } => true,
        }
    }

    /// Whether this failure leaves a submitted job without a correlation.
    pub fn is_orphaned_job(&self) -> bool {
        matches!(self, Self::CorrelationWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, DoctextError>;
