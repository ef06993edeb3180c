use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ProcessError;
use crate::model::DocumentFormat;
use crate::processor::{read_document, DocumentProcessor};

/// Reads `word/document.xml` paragraphs, rendering heading styles as Markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxProcessor;

impl DocumentProcessor for DocxProcessor {
    fn process(&self, path: &Path) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.docx").entered();

        let bytes = read_document(path)?;
        parse_docx_xml(&document_xml(std::io::Cursor::new(bytes))?)
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Docx)
    }
}

fn docx_error(what: &str, e: impl std::fmt::Display) -> ProcessError {
    ProcessError::DocxProcessing(format!("{}: {}", what, e))
}

/// The main document part of a DOCX package.
fn document_xml<R: Read + std::io::Seek>(reader: R) -> Result<String, ProcessError> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| docx_error("Not a DOCX package", e))?;
    let mut part = archive
        .by_name("word/document.xml")
        .map_err(|e| docx_error("Missing word/document.xml", e))?;

    let mut xml = String::with_capacity(part.size() as usize);
    part.read_to_string(&mut xml)
        .map_err(|e| docx_error("Unreadable word/document.xml", e))?;
    Ok(xml)
}

/// Markdown heading level for a paragraph style id, if it is a heading.
fn heading_level(style: &str) -> Option<usize> {
    if style.eq_ignore_ascii_case("Title") {
        return Some(1);
    }
    let level = style
        .strip_prefix("Heading")
        .or_else(|| style.strip_prefix("heading"))?
        .trim()
        .parse::<usize>()
        .ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn style_value(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"val")
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

#[derive(Default)]
struct Paragraph {
    text: String,
    heading: Option<usize>,
}

impl Paragraph {
    fn render(self) -> String {
        match self.heading {
            Some(level) if !self.text.trim().is_empty() => {
                format!("{} {}", "#".repeat(level), self.text.trim())
            }
            _ => self.text,
        }
    }
}

fn parse_docx_xml(xml: &str) -> Result<String, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_text_element = false;
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => current = Some(Paragraph::default()),
                b"r" => in_run = true,
                b"t" => in_text_element = true,
                b"pStyle" => {
                    if let Some(p) = current.as_mut() {
                        p.heading = style_value(e).as_deref().and_then(heading_level);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"pStyle" => {
                    if let Some(p) = current.as_mut() {
                        p.heading = style_value(e).as_deref().and_then(heading_level);
                    }
                }
                // Tab stops in paragraph properties are also `w:tab`; only runs count.
                b"tab" if in_run => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\t');
                    }
                }
                b"br" | b"cr" if in_run => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\n');
                    }
                }
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"r" => in_run = false,
                b"p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p.render());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Some(p) = current.as_mut() {
                        p.text.push_str(&e.unescape().unwrap_or_default());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProcessError::DocxProcessing(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(paragraphs.join("\n").trim_end().to_string())
}
