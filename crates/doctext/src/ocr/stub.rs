use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{NotificationChannel, OcrService, StartJobOptions};
use crate::error::OcrError;
use crate::model::{JobId, ObjectRef, ResultPage};

/// A job submission recorded by [`StubOcrService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub job_id: JobId,
    pub object: ObjectRef,
    pub channel: NotificationChannel,
    pub options: StartJobOptions,
}

type PageKey = (JobId, Option<String>);

#[derive(Default)]
struct StubState {
    submissions: Vec<Submission>,
    jobs_by_token: HashMap<String, JobId>,
    queued_job_ids: VecDeque<JobId>,
    pages: HashMap<PageKey, Result<ResultPage, String>>,
    fetches: Vec<PageKey>,
    next_job: u64,
    reject_submissions: Option<String>,
}

/// In-process OCR service with scripted result pages.
///
/// Submissions are deduplicated by idempotency token, as a real service
/// does. Pages are served by `(job, continuation token)`.
#[derive(Default)]
pub struct StubOcrService {
    state: Mutex<StubState>,
}

impl StubOcrService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StubState>, OcrError> {
        self.state
            .lock()
            .map_err(|_| OcrError::InvalidResponse("stub state lock poisoned".to_string()))
    }

    /// The identifier the next new submission receives.
    pub fn queue_job_id(&self, job_id: &str) {
        if let (Ok(mut state), Some(job_id)) = (self.state.lock(), JobId::parse(job_id)) {
            state.queued_job_ids.push_back(job_id);
        }
    }

    /// Scripts the full result set of `job_id`. Page `n + 1` is served for
    /// the continuation token carried by page `n`.
    pub fn script_pages(&self, job_id: &str, pages: Vec<ResultPage>) {
        let (Ok(mut state), Some(job_id)) = (self.state.lock(), JobId::parse(job_id)) else {
            return;
        };
        let mut token: Option<String> = None;
        for page in pages {
            let next = page.continuation().map(str::to_string);
            state.pages.insert((job_id.clone(), token), Ok(page));
            token = next;
        }
    }

    /// Makes the fetch for `(job_id, token)` fail.
    pub fn script_failure(&self, job_id: &str, token: Option<&str>, message: &str) {
        if let (Ok(mut state), Some(job_id)) = (self.state.lock(), JobId::parse(job_id)) {
            state.pages.insert(
                (job_id, token.map(str::to_string)),
                Err(message.to_string()),
            );
        }
    }

    /// Makes every following `start_job` call fail.
    pub fn reject_submissions(&self, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_submissions = Some(message.to_string());
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state
            .lock()
            .map(|s| s.submissions.clone())
            .unwrap_or_default()
    }

    /// `(job, token)` pairs requested so far, in order.
    pub fn fetches(&self) -> Vec<(JobId, Option<String>)> {
        self.state
            .lock()
            .map(|s| s.fetches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OcrService for StubOcrService {
    async fn start_job(
        &self,
        object: &ObjectRef,
        channel: &NotificationChannel,
        options: &StartJobOptions,
    ) -> Result<JobId, OcrError> {
        let mut state = self.state()?;

        if let Some(message) = &state.reject_submissions {
            return Err(OcrError::Service {
                status: 500,
                body: message.clone(),
            });
        }

        if let Some(existing) = state.jobs_by_token.get(&options.idempotency_token) {
            return Ok(existing.clone());
        }

        let job_id = match state.queued_job_ids.pop_front() {
            Some(job_id) => job_id,
            None => {
                state.next_job += 1;
                JobId::parse(&format!("stub-job-{}", state.next_job))
                    .ok_or_else(|| OcrError::InvalidResponse("empty job id".to_string()))?
            }
        };

        state
            .jobs_by_token
            .insert(options.idempotency_token.clone(), job_id.clone());
        state.submissions.push(Submission {
            job_id: job_id.clone(),
            object: object.clone(),
            channel: channel.clone(),
            options: options.clone(),
        });

        Ok(job_id)
    }

    async fn get_result_page(
        &self,
        job_id: &JobId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, OcrError> {
        let mut state = self.state()?;
        let key = (job_id.clone(), next_token.map(str::to_string));
        state.fetches.push(key.clone());

        match state.pages.get(&key) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(OcrError::Service {
                status: 500,
                body: message.clone(),
            }),
            None if next_token.is_none() => Err(OcrError::UnknownJob(job_id.clone())),
            None => Err(OcrError::InvalidResponse(format!(
                "unknown continuation token for job '{}'",
                job_id
            ))),
        }
    }
}
