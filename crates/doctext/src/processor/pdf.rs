use std::path::Path;

use crate::error::ProcessError;
use crate::model::DocumentFormat;
use crate::processor::{lacks_usable_text, read_document, DocumentProcessor};

/// Reads the embedded text layer of a PDF with lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfProcessor;

impl DocumentProcessor for PdfProcessor {
    fn process(&self, path: &Path) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.pdf").entered();

        let doc = lopdf::Document::load_mem(&read_document(path)?)
            .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))?;
        let text = page_texts(&doc).join("\n\n");
        if lacks_usable_text(&text) {
            return Err(ProcessError::NoEmbeddedText);
        }
        Ok(text)
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

/// Non-blank text of each page in page order. Pages lopdf cannot decode
/// are skipped.
fn page_texts(doc: &lopdf::Document) -> Vec<String> {
    doc.get_pages()
        .into_keys()
        .filter_map(|number| match doc.extract_text(&[number]) {
            Ok(text) => Some(text.trim_end().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::debug!(page = number, error = %e, "Skipping undecodable page");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{LocalExtractor, ProcessorRegistry};
    use lopdf::{dictionary, Document, Object, Stream};
    use tempfile::NamedTempFile;

    /// Builds a PDF with one page per entry; `None` gives a page without content.
    fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
            };
            if let Some(text) = text {
                let content = format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text);
                let content_id =
                    doc.add_object(Object::Stream(Stream::new(dictionary! {}, content.into_bytes())));
                page.set("Contents", content_id);
            }
            let page_id = doc.add_object(page);
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();
        pdf_bytes
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let temp_file = NamedTempFile::with_suffix(".pdf").unwrap();
        std::fs::write(temp_file.path(), bytes).unwrap();
        temp_file
    }

    #[test]
    fn test_supports_pdf_format() {
        let processor = PdfProcessor;
        assert!(processor.supports(DocumentFormat::Pdf));
        assert!(!processor.supports(DocumentFormat::Docx));
        assert!(!processor.supports(DocumentFormat::Image));
    }

    #[test]
    fn test_process_pdf_with_embedded_text() {
        let temp_file = write_temp(&build_pdf(&[Some("Test PDF Content")]));

        let text = PdfProcessor.process(temp_file.path()).unwrap();
        assert!(text.contains("Test PDF Content"), "got {:?}", text);
    }

    #[test]
    fn test_pages_separated_by_blank_line() {
        let temp_file = write_temp(&build_pdf(&[Some("First page"), Some("Second page")]));

        let text = PdfProcessor.process(temp_file.path()).unwrap();
        let first = text.find("First page").unwrap();
        let second = text.find("Second page").unwrap();
        assert!(first < second);
        assert!(text[first..second].contains("\n\n"));
    }

    #[test]
    fn test_corrupted_pdf_error() {
        let temp_file = write_temp(b"not a valid pdf content");

        match PdfProcessor.process(temp_file.path()) {
            Err(ProcessError::PdfProcessing(msg)) => assert!(msg.contains("Failed to load PDF")),
            other => panic!("Expected PdfProcessing error, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_file_not_found_error() {
        match PdfProcessor.process(Path::new("/nonexistent/file.pdf")) {
            Err(ProcessError::ReadDocument { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/file.pdf"))
            }
            other => panic!("Expected ReadDocument error, got {:?}", other),
        }
    }

    #[test]
    fn test_scanned_pdf_needs_ocr() {
        let temp_file = write_temp(&build_pdf(&[None]));

        let err = ProcessorRegistry::new()
            .convert(temp_file.path(), DocumentFormat::Pdf)
            .unwrap_err();
        assert!(matches!(err, ProcessError::NoEmbeddedText));
        assert!(err.needs_ocr());
    }
}
