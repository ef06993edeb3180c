//! In-process document-to-text conversion.
//!
//! This is the local path only: OCR is never attempted here. Images fail with
//! [`ProcessError::RequiresOcr`] and PDFs without a readable text layer with
//! [`ProcessError::NoEmbeddedText`]; both belong on the asynchronous OCR path.

pub mod docx;
pub mod pdf;
pub mod text;

use std::path::Path;

use crate::error::ProcessError;
use crate::model::DocumentFormat;

/// The capability the local extraction adapter depends on.
pub trait LocalExtractor: Send + Sync {
    /// Converts the file at `path` to text. Pure over the file contents.
    fn convert(&self, path: &Path, format: DocumentFormat) -> Result<String, ProcessError>;
}

/// Extraction settings shared by a family of formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionProfile {
    /// Structured documents carrying a text layer (PDF, DOCX). Whatever
    /// text the layer holds is the result, even when empty.
    EmbeddedText,
    /// Plain text, passed through as-is.
    PlainText,
}

impl ExtractionProfile {
    pub fn for_format(format: DocumentFormat) -> Result<Self, ProcessError> {
        match format {
            DocumentFormat::Pdf | DocumentFormat::Docx => Ok(Self::EmbeddedText),
            DocumentFormat::Text => Ok(Self::PlainText),
            DocumentFormat::Image => Err(ProcessError::RequiresOcr(format.to_string())),
        }
    }
}

pub(crate) fn read_document(path: &Path) -> Result<Vec<u8>, ProcessError> {
    std::fs::read(path).map_err(|source| ProcessError::ReadDocument {
        path: path.to_path_buf(),
        source,
    })
}

pub trait DocumentProcessor: Send + Sync {
    fn process(&self, path: &Path) -> Result<String, ProcessError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

pub struct ProcessorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: vec![
                Box::new(text::TextProcessor),
                Box::new(pdf::PdfProcessor),
                Box::new(docx::DocxProcessor),
            ],
        }
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalExtractor for ProcessorRegistry {
    fn convert(&self, path: &Path, format: DocumentFormat) -> Result<String, ProcessError> {
        let profile = ExtractionProfile::for_format(format)?;
        let _span = tracing::info_span!("processor.convert", format = %format, profile = ?profile)
            .entered();

        let processor = self
            .processors
            .iter()
            .find(|p| p.supports(format))
            .ok_or_else(|| ProcessError::UnsupportedFormat(format.to_string()))?;

        processor.process(path)
    }
}

/// Marker lopdf emits for CID fonts it cannot decode.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Below this many characters the alphanumeric ratio is not checked.
const MIN_TOTAL_CHARS: usize = 50;

/// Minimum share of alphanumeric characters for text to count as readable.
const MIN_ALPHANUMERIC_PERCENT: usize = 10;

/// Whether a PDF text layer is empty or garbled: whitespace only, only
/// undecodable-font markers, or a long run with almost no alphanumerics.
pub(crate) fn lacks_usable_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    let cleaned = trimmed
        .replace(IDENTITY_H_PATTERN, "")
        .replace(char::is_whitespace, "");
    if cleaned.is_empty() {
        return true;
    }

    let total_chars = trimmed.chars().count();
    let alphanumeric_chars = trimmed.chars().filter(|c| c.is_alphanumeric()).count();

    total_chars > MIN_TOTAL_CHARS
        && alphanumeric_chars * 100 < total_chars * MIN_ALPHANUMERIC_PERCENT
}
