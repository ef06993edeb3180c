//! Decoding of OCR job-completion notifications.
//!
//! Notifications arrive wrapped in a pub/sub envelope:
//!
//! ```json
//! {"Records":[{"Sns":{"Message":"{\"JobId\":\"J1\",\"Status\":\"SUCCEEDED\"}"}}]}
//! ```
//!
//! A bare message object is accepted as a batch of one.

use serde::Deserialize;
use thiserror::Error;

use crate::model::{JobId, JobStatus};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification batch is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Record {index} has no message")]
    MissingMessage { index: usize },

    #[error("Record {index} message is not valid JSON: {source}")]
    InvalidMessage {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },
}

/// One `(jobId, status)` completion message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotification {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Caller value echoed back by the service, if any.
    pub job_tag: Option<String>,
}

impl CompletionNotification {
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            job_tag: None,
        }
    }

    pub fn with_job_tag(mut self, tag: impl Into<String>) -> Self {
        self.job_tag = Some(tag.into());
        self
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Records")]
    records: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMessage {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "ClientRequestToken")]
    job_tag: Option<String>,
}

/// Parses a notification batch into one result per record.
///
/// Only an undecodable batch fails as a whole; a malformed record yields
/// an error in its own slot without affecting the others.
pub fn parse_batch(
    input: &str,
) -> Result<Vec<Result<CompletionNotification, NotificationError>>, NotificationError> {
    let value: serde_json::Value =
        serde_json::from_str(input).map_err(NotificationError::InvalidJson)?;

    if value.get("Records").is_none() {
        return Ok(vec![parse_message(0, value)]);
    }

    let envelope: Envelope = serde_json::from_value(value).map_err(NotificationError::InvalidJson)?;
    Ok(envelope
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, &record))
        .collect())
}

fn parse_record(
    index: usize,
    record: &serde_json::Value,
) -> Result<CompletionNotification, NotificationError> {
    let message = record
        .get("Sns")
        .and_then(|sns| sns.get("Message"))
        .ok_or(NotificationError::MissingMessage { index })?;

    // The message is normally a JSON document serialized as a string.
    let message = match message {
        serde_json::Value::String(raw) => serde_json::from_str(raw)
            .map_err(|source| NotificationError::InvalidMessage { index, source })?,
        other => other.clone(),
    };

    parse_message(index, message)
}

fn parse_message(
    index: usize,
    message: serde_json::Value,
) -> Result<CompletionNotification, NotificationError> {
    let raw: RawMessage = serde_json::from_value(message)
        .map_err(|source| NotificationError::InvalidMessage { index, source })?;

    let job_id = raw
        .job_id
        .as_deref()
        .and_then(JobId::parse)
        .ok_or(NotificationError::MissingField {
            index,
            field: "JobId",
        })?;
    let status = raw
        .status
        .as_deref()
        .map(JobStatus::from)
        .ok_or(NotificationError::MissingField {
            index,
            field: "Status",
        })?;

    Ok(CompletionNotification {
        job_id,
        status,
        job_tag: raw.job_tag.filter(|t| !t.trim().is_empty()),
    })
}
