//! Builder helpers for creating test inputs programmatically.

#![allow(dead_code)]

use std::io::Write;

use doctext::config::{Config, CorrelationMode, RoutingStrategy};
use doctext::model::ResultPage;

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn metadata_key(mut self, key: &str) -> Self {
        self.config.metadata_key = key.to_string();
        self
    }

    pub fn object_root(mut self, root: &str) -> Self {
        self.config.object_store.root = root.to_string();
        self
    }

    pub fn database(mut self, path: &str) -> Self {
        self.config.stores.result_database = path.to_string();
        self.config.stores.correlation_database = path.to_string();
        self
    }

    pub fn ocr_endpoint(mut self, endpoint: &str) -> Self {
        self.config.ocr.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.ocr.max_pages = max_pages;
        self
    }

    pub fn channel(mut self, topic: &str, role: &str) -> Self {
        self.config.notification_channel.topic = topic.to_string();
        self.config.notification_channel.role = role.to_string();
        self
    }

    pub fn correlation(mut self, mode: CorrelationMode) -> Self {
        self.config.listener.correlation = mode;
        self
    }

    pub fn routing(mut self, strategy: RoutingStrategy) -> Self {
        self.config.routing.default_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A pub/sub notification envelope carrying one message per `(job, status)`.
pub fn notification_batch(messages: &[(&str, &str)]) -> String {
    let records: Vec<serde_json::Value> = messages
        .iter()
        .map(|(job, status)| {
            let message = serde_json::json!({
                "JobId": job,
                "Status": status,
                "API": "StartDocumentTextDetection",
            });
            serde_json::json!({
                "EventSource": "aws:sns",
                "Sns": { "Message": message.to_string() }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

/// Like [`notification_batch`] with a job tag echoed in every message.
pub fn tagged_notification(job: &str, status: &str, tag: &str) -> String {
    let message = serde_json::json!({ "JobId": job, "Status": status, "JobTag": tag });
    serde_json::json!({ "Records": [{ "Sns": { "Message": message.to_string() } }] }).to_string()
}

/// An object-created event with one record per `(bucket, key)`.
pub fn upload_event(objects: &[(&str, &str)]) -> String {
    let records: Vec<serde_json::Value> = objects
        .iter()
        .map(|(bucket, key)| {
            serde_json::json!({
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": bucket }, "object": { "key": key } }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

/// Splits `lines` into result pages chained by generated continuation tokens.
pub fn paged(pages: &[&[&str]]) -> Vec<ResultPage> {
    let last = pages.len().saturating_sub(1);
    pages
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let token = (i < last).then(|| format!("tok{}", i + 1));
            ResultPage::from_lines(lines.iter().copied(), token.as_deref())
        })
        .collect()
}

/// A minimal DOCX archive with the given body XML.
pub fn docx_bytes(body_xml: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body_xml
    );

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .expect("Failed to start docx entry");
        writer
            .write_all(document.as_bytes())
            .expect("Failed to write docx entry");
        writer.finish().expect("Failed to finish docx");
    }
    buffer.into_inner()
}

/// A one-page PDF; `None` gives a page with no content stream.
pub fn pdf_bytes(text: Option<&str>) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

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

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save PDF");
    bytes
}
