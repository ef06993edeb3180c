//! Starts asynchronous OCR jobs and records which document each belongs to.

use std::sync::Arc;

use tracing::Instrument;

use crate::config::CorrelationMode;
use crate::error::PipelineError;
use crate::metadata::MetadataResolver;
use crate::model::{CorrelationRecord, DocumentId, JobId, ObjectRef};
use crate::ocr::{NotificationChannel, OcrService, StartJobOptions};
use crate::sanitize::redact_key;
use crate::store::JobCorrelationStore;

#[derive(Clone)]
pub struct AsyncJobDispatcher {
    resolver: MetadataResolver,
    ocr: Arc<dyn OcrService>,
    correlations: JobCorrelationStore,
    channel: NotificationChannel,
    mode: CorrelationMode,
}

impl AsyncJobDispatcher {
    pub fn new(
        resolver: MetadataResolver,
        ocr: Arc<dyn OcrService>,
        correlations: JobCorrelationStore,
        channel: NotificationChannel,
        mode: CorrelationMode,
    ) -> Self {
        Self {
            resolver,
            ocr,
            correlations,
            channel,
            mode,
        }
    }

    /// Resolves the document identifier and submits the object for OCR.
    pub async fn dispatch(&self, object: &ObjectRef) -> Result<JobId, PipelineError> {
        let document_id = self.resolver.resolve(object).await?;
        self.dispatch_for(object, &document_id).await
    }

    /// Submits `object` for OCR on behalf of `document_id`.
    ///
    /// The document identifier is the idempotency token, so redelivered
    /// upload events map to the same job. `JobCorrelationStore[job_id]` is
    /// durably written before this returns `Ok`.
    pub async fn dispatch_for(
        &self,
        object: &ObjectRef,
        document_id: &DocumentId,
    ) -> Result<JobId, PipelineError> {
        let span = tracing::info_span!(
            "dispatch",
            document_id = %document_id,
            key = %redact_key(&object.key),
            job_id = tracing::field::Empty,
        );

        async {
            let options = StartJobOptions {
                idempotency_token: document_id.as_str().to_string(),
                job_tag: match self.mode {
                    CorrelationMode::EchoToken => Some(document_id.as_str().to_string()),
                    CorrelationMode::LookupTable => None,
                },
            };

            let job_id = self
                .ocr
                .start_job(object, &self.channel, &options)
                .await
                .map_err(|source| PipelineError::JobSubmission {
                    document_id: document_id.clone(),
                    source,
                })?;
            tracing::Span::current().record("job_id", tracing::field::display(&job_id));

            let record = CorrelationRecord {
                job_id: job_id.clone(),
                document_id: document_id.clone(),
            };
            if let Err(source) = self.correlations.put(&record).await {
                tracing::error!(
                    orphaned_job = true,
                    job_id = %job_id,
                    document_id = %document_id,
                    error = %source,
                    "OCR job submitted but correlation not recorded"
                );
                return Err(PipelineError::CorrelationWrite {
                    job_id,
                    document_id: document_id.clone(),
                    source,
                });
            }

            tracing::info!("OCR job dispatched");
            Ok(job_id)
        }
        .instrument(span)
        .await
    }
}
