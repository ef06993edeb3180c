use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{NotificationChannel, OcrService, StartJobOptions};
use crate::error::OcrError;
use crate::model::{BlockType, JobId, ObjectRef, ResultPage, TextBlock};

const START_TARGET: &str = "Textract.StartDocumentTextDetection";
const GET_TARGET: &str = "Textract.GetDocumentTextDetection";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const INVALID_JOB_ID: &str = "InvalidJobIdException";
const MAX_RESULTS: u32 = 1000;

/// OCR service client speaking the text-detection JSON protocol.
pub struct HttpOcrService {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<SecretString>,
}

impl HttpOcrService {
    pub fn new(
        endpoint: impl Into<String>,
        api_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("doctext/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token,
        })
    }

    async fn call<Req, Resp>(&self, target: &str, body: &Req) -> Result<Resp, OcrError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| OcrError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", target)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(OcrError::Service {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| OcrError::InvalidResponse(e.to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartRequest<'a> {
    document_location: DocumentLocation<'a>,
    notification_channel: ChannelSpec<'a>,
    client_request_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_tag: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentLocation<'a> {
    s3_object: S3Object<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3Object<'a> {
    bucket: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct ChannelSpec<'a> {
    #[serde(rename = "SNSTopicArn")]
    topic: &'a str,
    #[serde(rename = "RoleArn")]
    role: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartResponse {
    job_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetRequest<'a> {
    job_id: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetResponse {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Block {
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<Block> for TextBlock {
    fn from(block: Block) -> Self {
        TextBlock {
            block_type: BlockType::from(block.block_type.as_str()),
            text: block.text.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl OcrService for HttpOcrService {
    async fn start_job(
        &self,
        object: &ObjectRef,
        channel: &NotificationChannel,
        options: &StartJobOptions,
    ) -> Result<JobId, OcrError> {
        let request = StartRequest {
            document_location: DocumentLocation {
                s3_object: S3Object {
                    bucket: &object.bucket,
                    name: &object.key,
                },
            },
            notification_channel: ChannelSpec {
                topic: &channel.topic,
                role: &channel.role,
            },
            client_request_token: &options.idempotency_token,
            job_tag: options.job_tag.as_deref(),
        };

        let response: StartResponse = self.call(START_TARGET, &request).await?;
        let job_id = JobId::parse(&response.job_id)
            .ok_or_else(|| OcrError::InvalidResponse("empty JobId in response".to_string()))?;

        debug!(job_id = %job_id, "OCR job started");
        Ok(job_id)
    }

    async fn get_result_page(
        &self,
        job_id: &JobId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, OcrError> {
        let request = GetRequest {
            job_id: job_id.as_str(),
            max_results: MAX_RESULTS,
            next_token,
        };

        let response: GetResponse = match self.call(GET_TARGET, &request).await {
            Ok(response) => response,
            Err(OcrError::Service { body, .. }) if body.contains(INVALID_JOB_ID) => {
                return Err(OcrError::UnknownJob(job_id.clone()))
            }
            Err(e) => return Err(e),
        };

        let blocks: Vec<TextBlock> = response.blocks.into_iter().map(TextBlock::from).collect();
        let lines = blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Line)
            .count();
        debug!(job_id = %job_id, blocks = blocks.len(), lines, "Fetched result page");

        Ok(ResultPage {
            blocks,
            next_token: response.next_token,
        })
    }
}
