//! Decoding of object-created upload events.

use serde::Deserialize;
use thiserror::Error;

use crate::model::ObjectRef;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Upload event is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Upload event record {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("Upload event record {index} key is not valid percent-encoding: {reason}")]
    InvalidKey { index: usize, reason: String },
}

#[derive(Deserialize)]
struct UploadEvent {
    #[serde(rename = "Records", default)]
    records: Vec<UploadRecord>,
}

#[derive(Deserialize)]
struct UploadRecord {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Returns the object of every record in an upload event, in order.
///
/// Keys arrive form-URL-encoded (`+` for space, `%XX` escapes) and are
/// decoded here.
pub fn parse_upload_event(input: &str) -> Result<Vec<ObjectRef>, TriggerError> {
    let event: UploadEvent = serde_json::from_str(input)?;

    event
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let bucket = record.s3.bucket.name;
            if bucket.is_empty() {
                return Err(TriggerError::EmptyField {
                    index,
                    field: "bucket name",
                });
            }
            let key = decode_key(&record.s3.object.key).map_err(|reason| {
                TriggerError::InvalidKey { index, reason }
            })?;
            if key.is_empty() {
                return Err(TriggerError::EmptyField {
                    index,
                    field: "object key",
                });
            }
            Ok(ObjectRef::new(bucket, key))
        })
        .collect()
}

fn decode_key(raw: &str) -> Result<String, String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| e.to_string())
}
