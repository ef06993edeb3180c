//! Synchronous extraction path for documents with embedded text.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::error::{PipelineError, ProcessError};
use crate::metadata::{lookup, MetadataResolver};
use crate::model::{DocumentFormat, DocumentId, DocumentRecord, ObjectRef};
use crate::objects::{ObjectStore, CONTENT_TYPE_KEY};
use crate::processor::LocalExtractor;
use crate::sanitize::{fingerprint, preview, redact_key, PREVIEW_CHARS};
use crate::store::ResultStore;

/// Downloads an object, converts it in-process and commits the text.
#[derive(Clone)]
pub struct LocalExtractionAdapter {
    objects: Arc<dyn ObjectStore>,
    resolver: MetadataResolver,
    extractor: Arc<dyn LocalExtractor>,
    results: ResultStore,
    scratch_dir: PathBuf,
}

impl LocalExtractionAdapter {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        resolver: MetadataResolver,
        extractor: Arc<dyn LocalExtractor>,
        results: ResultStore,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            objects,
            resolver,
            extractor,
            results,
            scratch_dir,
        }
    }

    /// Resolves the document identifier, then extracts locally.
    pub async fn extract(&self, object: &ObjectRef) -> Result<DocumentRecord, PipelineError> {
        let resolved = self.resolver.resolve_object(object).await?;
        let format = resolved
            .format
            .ok_or_else(|| PipelineError::UnsupportedFormat(object.clone()))?;
        self.run(object, resolved.document_id, format).await
    }

    /// Extracts `object` for an already-resolved `document_id` and writes
    /// `ResultStore[document_id]` once, only on success.
    pub async fn extract_locally(
        &self,
        object: &ObjectRef,
        document_id: &DocumentId,
    ) -> Result<DocumentRecord, PipelineError> {
        let format = self.format_hint(object).await?;
        self.run(object, document_id.clone(), format).await
    }

    pub(crate) async fn run(
        &self,
        object: &ObjectRef,
        document_id: DocumentId,
        format: DocumentFormat,
    ) -> Result<DocumentRecord, PipelineError> {
        let span = tracing::info_span!(
            "extract_local",
            document_id = %document_id,
            key = %redact_key(&object.key),
            format = %format,
        );

        async {
            let text = self.convert(object, format).await.map_err(|e| match e {
                ConvertError::Download(e) => PipelineError::ObjectStore(e),
                ConvertError::Process(source) => PipelineError::Extraction {
                    document_id: document_id.clone(),
                    source,
                },
            })?;

            let record = DocumentRecord { document_id, text };
            self.results
                .put(&record)
                .await
                .map_err(|source| PipelineError::ResultWrite {
                    document_id: record.document_id.clone(),
                    source,
                })?;

            tracing::info!(
                chars = record.text.chars().count(),
                text_fingerprint = %fingerprint(&record.text),
                "Stored locally extracted text"
            );
            tracing::debug!(text = %preview(&record.text, PREVIEW_CHARS), "Extracted text");
            Ok(record)
        }
        .instrument(span)
        .await
    }

    async fn format_hint(&self, object: &ObjectRef) -> Result<DocumentFormat, PipelineError> {
        if let Some(format) = object
            .extension()
            .and_then(|ext| DocumentFormat::from_extension(&ext))
        {
            return Ok(format);
        }

        let metadata = self.objects.head_metadata(object).await?;
        lookup(&metadata, CONTENT_TYPE_KEY)
            .and_then(DocumentFormat::from_mime)
            .ok_or_else(|| PipelineError::UnsupportedFormat(object.clone()))
    }

    async fn convert(&self, object: &ObjectRef, format: DocumentFormat) -> Result<String, ConvertError> {
        let bytes = self.objects.download(object).await.map_err(ConvertError::Download)?;

        let suffix = object
            .extension()
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let scratch = scratch_file(&self.scratch_dir, &suffix, &bytes)?;

        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.convert(scratch.path(), format))
            .await
            .map_err(|e| ConvertError::Process(ProcessError::Task(e.to_string())))?
            .map_err(ConvertError::Process)
    }
}

enum ConvertError {
    Download(crate::error::ObjectStoreError),
    Process(ProcessError),
}

/// Writes `bytes` to a temp file that is removed when dropped.
fn scratch_file(
    dir: &std::path::Path,
    suffix: &str,
    bytes: &[u8],
) -> Result<tempfile::NamedTempFile, ConvertError> {
    use std::io::Write;

    let io_err = |e: std::io::Error| {
        ConvertError::Process(ProcessError::ReadDocument {
            path: dir.to_path_buf(),
            source: e,
        })
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut file = tempfile::Builder::new()
        .prefix("doctext-")
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}
