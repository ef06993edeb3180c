//! Completion listener: turns a job-completion notification into a stored
//! extraction result.
//!
//! Each notification goes through the same steps:
//!
//! 1. a non-success status is logged and discarded;
//! 2. the job is mapped to its document identifier (lookup table or echoed
//!    job tag, depending on [`CorrelationMode`]); an unknown job is a
//!    dangling notification and is discarded without error;
//! 3. every result page is fetched in order and the line blocks are joined
//!    with `\n`;
//! 4. the text is committed with a single overwrite-put.
//!
//! Redelivery re-runs all four steps and rewrites the same value.

pub mod pages;

use std::sync::Arc;

use tracing::Instrument;

pub use crate::config::CorrelationMode;
use crate::error::PipelineError;
use crate::model::{DocumentId, DocumentRecord, JobId, JobStatus};
use crate::notification::{CompletionNotification, NotificationError};
use crate::ocr::OcrService;
use crate::sanitize::{fingerprint, preview, PREVIEW_CHARS};
use crate::store::{JobCorrelationStore, ResultStore};

pub use pages::{assemble_text, result_pages, AssembledText};

/// What handling one notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Committed {
        job_id: JobId,
        document_id: DocumentId,
        lines: usize,
        pages: usize,
    },
    /// The job did not succeed; nothing was written.
    Skipped { job_id: JobId, status: JobStatus },
    /// No document is known for the job; nothing was written.
    Dangling { job_id: JobId },
}

/// Per-record results of one notification batch, in batch order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<Result<NotificationOutcome, PipelineError>>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    pub fn committed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(NotificationOutcome::Committed { .. })))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

#[derive(Clone)]
pub struct CompletionListener {
    ocr: Arc<dyn OcrService>,
    correlations: JobCorrelationStore,
    results: ResultStore,
    mode: CorrelationMode,
    max_pages: usize,
}

impl CompletionListener {
    pub fn new(
        ocr: Arc<dyn OcrService>,
        correlations: JobCorrelationStore,
        results: ResultStore,
        mode: CorrelationMode,
        max_pages: usize,
    ) -> Self {
        Self {
            ocr,
            correlations,
            results,
            mode,
            max_pages,
        }
    }

    /// Handles one completion notification.
    pub async fn handle(
        &self,
        notification: &CompletionNotification,
    ) -> Result<NotificationOutcome, PipelineError> {
        let job_id = &notification.job_id;
        let span = tracing::info_span!(
            "notification",
            job_id = %job_id,
            status = %notification.status,
        );

        async {
            if !notification.status.is_success() {
                tracing::info!("Job did not succeed, discarding notification");
                return Ok(NotificationOutcome::Skipped {
                    job_id: job_id.clone(),
                    status: notification.status.clone(),
                });
            }

            let Some(document_id) = self.correlate(notification).await? else {
                tracing::warn!(dangling = true, "No document known for job, discarding notification");
                return Ok(NotificationOutcome::Dangling {
                    job_id: job_id.clone(),
                });
            };

            let assembled = assemble_text(result_pages(self.ocr.as_ref(), job_id, self.max_pages))
                .await
                .map_err(|source| PipelineError::ResultFetch {
                    job_id: job_id.clone(),
                    source,
                })?;

            let record = DocumentRecord {
                document_id: document_id.clone(),
                text: assembled.text,
            };
            self.results
                .put(&record)
                .await
                .map_err(|source| PipelineError::ResultWrite {
                    document_id: document_id.clone(),
                    source,
                })?;

            tracing::info!(
                document_id = %document_id,
                pages = assembled.pages,
                lines = assembled.lines,
                text_fingerprint = %fingerprint(&record.text),
                "Committed OCR result"
            );
            tracing::debug!(text = %preview(&record.text, PREVIEW_CHARS), "Result preview");

            Ok(NotificationOutcome::Committed {
                job_id: job_id.clone(),
                document_id,
                lines: assembled.lines,
                pages: assembled.pages,
            })
        }
        .instrument(span)
        .await
    }

    /// Handles every record of a batch independently and in order.
    pub async fn handle_batch(
        &self,
        records: Vec<Result<CompletionNotification, NotificationError>>,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, record) in records.into_iter().enumerate() {
            let result = match record {
                Ok(notification) => self.handle(&notification).await,
                Err(e) => Err(PipelineError::MalformedNotification(e)),
            };
            if let Err(e) = &result {
                tracing::error!(index, error = %e, retryable = e.is_retryable(), "Notification failed");
            }
            report.results.push(result);
        }

        tracing::info!(
            records = report.results.len(),
            committed = report.committed_count(),
            failed = report.failed_count(),
            "Notification batch handled"
        );
        report
    }

    async fn correlate(
        &self,
        notification: &CompletionNotification,
    ) -> Result<Option<DocumentId>, PipelineError> {
        match self.mode {
            CorrelationMode::LookupTable => self
                .correlations
                .get(&notification.job_id)
                .await
                .map_err(|source| PipelineError::CorrelationRead {
                    job_id: notification.job_id.clone(),
                    source,
                }),
            CorrelationMode::EchoToken => Ok(notification
                .job_tag
                .as_deref()
                .and_then(DocumentId::parse)),
        }
    }
}
