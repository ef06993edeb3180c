use std::path::Path;

use crate::error::ProcessError;
use crate::model::DocumentFormat;
use crate::processor::{read_document, DocumentProcessor};

/// Passes plain text and Markdown through. Invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextProcessor;

impl DocumentProcessor for TextProcessor {
    fn process(&self, path: &Path) -> Result<String, ProcessError> {
        let bytes = read_document(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Text)
    }
}
