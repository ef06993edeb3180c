//! Asynchronous OCR service collaborator.
//!
//! Jobs are started against a stored object and report completion out of
//! band on a notification channel. Results are read back page by page.
//!
//! ## Backends
//!
//! - **HTTP**: JSON protocol compatible with document text-detection services
//! - **Stub**: scripted in-process service for tests and dry runs

mod http;
mod stub;

pub use http::HttpOcrService;
pub use stub::{StubOcrService, Submission};

use async_trait::async_trait;

use crate::error::OcrError;
use crate::model::{JobId, ObjectRef, ResultPage};

/// Where the service publishes job-completion notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationChannel {
    pub topic: String,
    pub role: String,
}

impl NotificationChannel {
    pub fn new(topic: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartJobOptions {
    /// Repeated submissions with the same token return the same job.
    pub idempotency_token: String,
    /// Opaque value the service echoes back in the completion notification.
    pub job_tag: Option<String>,
}

#[async_trait]
pub trait OcrService: Send + Sync {
    async fn start_job(
        &self,
        object: &ObjectRef,
        channel: &NotificationChannel,
        options: &StartJobOptions,
    ) -> Result<JobId, OcrError>;

    /// Fetches one page of results. `next_token` is `None` for the first page.
    async fn get_result_page(
        &self,
        job_id: &JobId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, OcrError>;
}
