use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, RoutingStrategy};
use crate::dispatch::AsyncJobDispatcher;
use crate::error::{DoctextError, PipelineError};
use crate::listener::{BatchReport, CompletionListener, NotificationOutcome};
use crate::local::LocalExtractionAdapter;
use crate::metadata::MetadataResolver;
use crate::model::{DocumentFormat, DocumentId, DocumentRecord, JobId, ObjectRef};
use crate::notification::{parse_batch, CompletionNotification};
use crate::objects::ObjectStore;
use crate::sanitize::redact_key;
use crate::store::{JobCorrelationStore, ResultStore};

use super::config::{Backends, PipelineConfig};

/// Which path an uploaded document took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Text was extracted locally and stored.
    Extracted(DocumentRecord),
    /// An OCR job was started; its notification will store the text.
    Dispatched {
        job_id: JobId,
        document_id: DocumentId,
    },
}

/// The two entry points (upload events and completion notifications),
/// wired to shared stores.
pub struct Pipeline {
    config: PipelineConfig,
    objects: Arc<dyn ObjectStore>,
    resolver: MetadataResolver,
    local: LocalExtractionAdapter,
    dispatcher: Option<AsyncJobDispatcher>,
    listener: Option<CompletionListener>,
    results: ResultStore,
    correlations: JobCorrelationStore,
}

impl Pipeline {
    /// Production constructor: opens every backend named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, DoctextError> {
        let backends = Backends::from_config(config)?;
        Ok(Self::new(PipelineConfig::from_config(config), backends))
    }

    pub fn new(config: PipelineConfig, backends: Backends) -> Self {
        let resolver = MetadataResolver::new(backends.objects.clone(), config.metadata_key.as_str());
        let results = ResultStore::new(backends.results);
        let correlations = JobCorrelationStore::new(backends.correlations);

        let local = LocalExtractionAdapter::new(
            backends.objects.clone(),
            resolver.clone(),
            backends.extractor,
            results.clone(),
            config.scratch_dir.clone(),
        );

        let dispatcher = backends.ocr.clone().map(|ocr| {
            AsyncJobDispatcher::new(
                resolver.clone(),
                ocr,
                correlations.clone(),
                config.channel.clone(),
                config.correlation,
            )
        });
        let listener = backends.ocr.map(|ocr| {
            CompletionListener::new(
                ocr,
                correlations.clone(),
                results.clone(),
                config.correlation,
                config.max_pages,
            )
        });

        Self {
            config,
            objects: backends.objects,
            resolver,
            local,
            dispatcher,
            listener,
            results,
            correlations,
        }
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn correlations(&self) -> &JobCorrelationStore {
        &self.correlations
    }

    pub fn metadata_key(&self) -> &str {
        self.resolver.metadata_key()
    }

    /// Local extraction only.
    pub async fn extract(&self, object: &ObjectRef) -> Result<DocumentRecord, PipelineError> {
        self.local.extract(object).await
    }

    /// OCR job submission only.
    pub async fn dispatch(&self, object: &ObjectRef) -> Result<JobId, PipelineError> {
        self.dispatcher()?.dispatch(object).await
    }

    /// Routes an uploaded object to local extraction or OCR.
    ///
    /// Images always go to OCR. Otherwise the configured strategy decides;
    /// `auto` extracts locally and starts an OCR job only when a PDF turns
    /// out to have no usable embedded text.
    pub async fn ingest(&self, object: &ObjectRef) -> Result<IngestOutcome, PipelineError> {
        let resolved = self.resolver.resolve_object(object).await?;
        let format = resolved
            .format
            .ok_or_else(|| PipelineError::UnsupportedFormat(object.clone()))?;
        let document_id = resolved.document_id;

        let strategy = if format.requires_ocr() {
            RoutingStrategy::Ocr
        } else {
            self.config.routing
        };

        match strategy {
            RoutingStrategy::Local => self.extract_as(object, document_id, format).await,
            RoutingStrategy::Ocr => self.dispatch_as(object, &document_id).await,
            RoutingStrategy::Auto => {
                match self.local.run(object, document_id.clone(), format).await {
                    Ok(record) => Ok(IngestOutcome::Extracted(record)),
                    Err(PipelineError::Extraction { source, .. })
                        if source.needs_ocr()
                            && ocr_accepts(format)
                            && self.dispatcher.is_some() =>
                    {
                        info!(
                            document_id = %document_id,
                            key = %redact_key(&object.key),
                            reason = %source,
                            "No usable embedded text, falling back to OCR"
                        );
                        self.dispatch_as(object, &document_id).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Handles every upload in `objects` independently.
    pub async fn ingest_all(
        &self,
        objects: &[ObjectRef],
    ) -> Vec<Result<IngestOutcome, PipelineError>> {
        let mut outcomes = Vec::with_capacity(objects.len());
        for object in objects {
            let outcome = self.ingest(object).await;
            if let Err(e) = &outcome {
                warn!(
                    key = %redact_key(&object.key),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Ingest failed"
                );
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Handles one completion notification.
    pub async fn on_notification(
        &self,
        notification: &CompletionNotification,
    ) -> Result<NotificationOutcome, PipelineError> {
        self.listener()?.handle(notification).await
    }

    /// Decodes and handles a raw notification batch.
    pub async fn handle_notifications(&self, input: &str) -> Result<BatchReport, PipelineError> {
        let listener = self.listener()?;
        let records = parse_batch(input)?;
        Ok(listener.handle_batch(records).await)
    }

    async fn extract_as(
        &self,
        object: &ObjectRef,
        document_id: DocumentId,
        format: DocumentFormat,
    ) -> Result<IngestOutcome, PipelineError> {
        self.local
            .run(object, document_id, format)
            .await
            .map(IngestOutcome::Extracted)
    }

    async fn dispatch_as(
        &self,
        object: &ObjectRef,
        document_id: &DocumentId,
    ) -> Result<IngestOutcome, PipelineError> {
        let job_id = self.dispatcher()?.dispatch_for(object, document_id).await?;
        Ok(IngestOutcome::Dispatched {
            job_id,
            document_id: document_id.clone(),
        })
    }

    fn dispatcher(&self) -> Result<&AsyncJobDispatcher, PipelineError> {
        self.dispatcher.as_ref().ok_or(PipelineError::OcrNotConfigured)
    }

    fn listener(&self) -> Result<&CompletionListener, PipelineError> {
        self.listener.as_ref().ok_or(PipelineError::OcrNotConfigured)
    }
}

/// Formats the OCR service can read.
fn ocr_accepts(format: DocumentFormat) -> bool {
    matches!(format, DocumentFormat::Pdf | DocumentFormat::Image)
}
