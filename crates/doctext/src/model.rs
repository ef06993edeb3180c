//! Domain types shared by every extraction component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-supplied identifier correlating an uploaded object with its text.
///
/// Guaranteed non-empty; construct through [`DocumentId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Rejects blank identifiers. Anything else is kept verbatim.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "document id must not be empty".to_string())
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the OCR service to one asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JobId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "job id must not be empty".to_string())
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Lower-cased extension of the key's final path component, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.key.rsplit('/').next().unwrap_or(&self.key);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Status reported for an OCR job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    InProgress,
    Succeeded,
    PartialSuccess,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::PartialSuccess => "PARTIAL_SUCCESS",
            Self::Failed => "FAILED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SUBMITTED" => Self::Submitted,
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "PARTIAL_SUCCESS" => Self::PartialSuccess,
            "FAILED" | "ERROR" => Self::Failed,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl FromStr for JobStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity of a text block in an OCR result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Page,
    Line,
    Word,
    Other(String),
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PAGE" => Self::Page,
            "LINE" => Self::Line,
            "WORD" => Self::Word,
            _ => Self::Other(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub block_type: BlockType,
    pub text: String,
}

impl TextBlock {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Line,
            text: text.into(),
        }
    }

    pub fn word(text: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Word,
            text: text.into(),
        }
    }
}

/// One page of a paginated job-results query.
///
/// `next_token` is `None` on the final page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultPage {
    pub blocks: Vec<TextBlock>,
    pub next_token: Option<String>,
}

impl ResultPage {
    /// A page made only of line blocks.
    pub fn from_lines<I, S>(lines: I, next_token: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocks: lines.into_iter().map(TextBlock::line).collect(),
            next_token: next_token.map(str::to_string),
        }
    }

    /// Text of the line-level blocks, in service order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Line)
            .map(|b| b.text.as_str())
    }

    /// The continuation token, treating an empty token as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Persisted extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: DocumentId,
    pub text: String,
}

/// Persisted job correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub job_id: JobId,
    pub document_id: DocumentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
    Image,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" => Some(Self::Text),
            "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp" | "gif" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Maps a MIME type such as `application/pdf` to a format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim().to_lowercase();
        if essence.starts_with("image/") {
            return Some(Self::Image);
        }
        mime_guess::get_mime_extensions_str(&essence)?
            .iter()
            .find_map(|ext| Self::from_extension(ext))
    }

    /// Formats the local extractor cannot read without OCR.
    pub fn requires_ocr(&self) -> bool {
        matches!(self, Self::Image)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
