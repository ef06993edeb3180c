//! Resolves the caller-supplied document identifier from object metadata.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::model::{DocumentFormat, DocumentId, ObjectRef};
use crate::objects::{ObjectStore, CONTENT_TYPE_KEY};

/// Identifier and format hint for one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    pub document_id: DocumentId,
    pub format: Option<DocumentFormat>,
}

#[derive(Clone)]
pub struct MetadataResolver {
    objects: Arc<dyn ObjectStore>,
    metadata_key: String,
}

impl MetadataResolver {
    pub fn new(objects: Arc<dyn ObjectStore>, metadata_key: impl Into<String>) -> Self {
        Self {
            objects,
            metadata_key: metadata_key.into().to_lowercase(),
        }
    }

    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// Returns the document identifier attached to `object`.
    ///
    /// An absent or blank identifier is a terminal `MissingIdentifier` error.
    pub async fn resolve(&self, object: &ObjectRef) -> Result<DocumentId, PipelineError> {
        Ok(self.resolve_object(object).await?.document_id)
    }

    /// Like [`resolve`](Self::resolve), also deriving the document format from
    /// the key extension or the stored content type.
    pub async fn resolve_object(&self, object: &ObjectRef) -> Result<ResolvedObject, PipelineError> {
        let metadata = self.objects.head_metadata(object).await?;

        let document_id = lookup(&metadata, &self.metadata_key)
            .and_then(DocumentId::parse)
            .ok_or_else(|| PipelineError::MissingIdentifier {
                object: object.clone(),
                metadata_key: self.metadata_key.clone(),
            })?;

        let format = object
            .extension()
            .and_then(|ext| DocumentFormat::from_extension(&ext))
            .or_else(|| lookup(&metadata, CONTENT_TYPE_KEY).and_then(DocumentFormat::from_mime));

        Ok(ResolvedObject {
            document_id,
            format,
        })
    }
}

/// Case-insensitive metadata key lookup.
pub(crate) fn lookup<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}
