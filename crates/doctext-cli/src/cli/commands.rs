//! Command handlers.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};

use doctext::objects::{ObjectStore, CONTENT_TYPE_KEY};
use doctext::{
    load_config, parse_upload_event, Config, DocumentId, IngestOutcome, JobId,
    NotificationOutcome, ObjectRef, Pipeline, PipelineError,
};

use super::Targets;

pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn open(config: &Config) -> anyhow::Result<Pipeline> {
    Pipeline::from_config(config).context("Failed to initialize pipeline")
}

/// Reads a file, or stdin for `None` / `-`.
fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn targets(targets: &Targets) -> anyhow::Result<Vec<ObjectRef>> {
    let objects = match &targets.event {
        Some(path) => parse_upload_event(&read_input(Some(path))?)?,
        None => targets
            .keys
            .iter()
            .map(|key| ObjectRef::new(targets.bucket.as_str(), key.as_str()))
            .collect(),
    };
    if objects.is_empty() {
        bail!("No objects given: pass object keys or --event");
    }
    Ok(objects)
}

fn report_failure(object: &ObjectRef, error: &PipelineError) {
    let kind = if error.is_orphaned_job() {
        "orphaned"
    } else if error.is_retryable() {
        "retryable"
    } else {
        "failed"
    };
    eprintln!("{}\t{}\t{}", kind, object, error);
}

pub async fn upload(
    config: &Config,
    file: &Path,
    document_id: &str,
    key: Option<String>,
    bucket: &str,
    content_type: Option<String>,
) -> anyhow::Result<bool> {
    let document_id = DocumentId::parse(document_id).context("Document identifier is empty")?;
    let key = match key {
        Some(key) => key,
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("Cannot derive an object key from the file path")?,
    };
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut metadata = HashMap::new();
    let pipeline = open(config)?;
    metadata.insert(pipeline.metadata_key().to_string(), document_id.to_string());
    if let Some(content_type) = content_type {
        metadata.insert(CONTENT_TYPE_KEY.to_string(), content_type);
    }

    let object = ObjectRef::new(bucket, key);
    pipeline.objects().put(&object, &content, &metadata).await?;
    println!("{}", object);
    Ok(true)
}

pub async fn extract(config: &Config, targets_arg: &Targets) -> anyhow::Result<bool> {
    let pipeline = open(config)?;
    let mut failures = 0;

    for object in targets(targets_arg)? {
        match pipeline.extract(&object).await {
            Ok(record) => println!(
                "extracted\t{}\t{}\t{} chars",
                object,
                record.document_id,
                record.text.chars().count()
            ),
            Err(e) => {
                failures += 1;
                report_failure(&object, &e);
            }
        }
    }
    Ok(failures == 0)
}

pub async fn dispatch(config: &Config, targets_arg: &Targets) -> anyhow::Result<bool> {
    let pipeline = open(config)?;
    let mut failures = 0;

    for object in targets(targets_arg)? {
        match pipeline.dispatch(&object).await {
            Ok(job_id) => println!("dispatched\t{}\t{}", object, job_id),
            Err(e) => {
                failures += 1;
                report_failure(&object, &e);
            }
        }
    }
    Ok(failures == 0)
}

pub async fn ingest(config: &Config, targets_arg: &Targets) -> anyhow::Result<bool> {
    let pipeline = open(config)?;
    let objects = targets(targets_arg)?;
    let mut failures = 0;

    for (object, outcome) in objects.iter().zip(pipeline.ingest_all(&objects).await) {
        match outcome {
            Ok(IngestOutcome::Extracted(record)) => {
                println!("extracted\t{}\t{}", object, record.document_id)
            }
            Ok(IngestOutcome::Dispatched {
                job_id,
                document_id,
            }) => println!("dispatched\t{}\t{}\t{}", object, document_id, job_id),
            Err(e) => {
                failures += 1;
                report_failure(object, &e);
            }
        }
    }
    Ok(failures == 0)
}

pub async fn notify(config: &Config, input: Option<&Path>) -> anyhow::Result<bool> {
    let pipeline = open(config)?;
    let batch = read_input(input)?;
    let report = pipeline.handle_notifications(&batch).await?;

    for (index, result) in report.results.iter().enumerate() {
        match result {
            Ok(NotificationOutcome::Committed {
                job_id,
                document_id,
                lines,
                pages,
            }) => println!(
                "committed\t{}\t{}\t{} lines\t{} pages",
                job_id, document_id, lines, pages
            ),
            Ok(NotificationOutcome::Skipped { job_id, status }) => {
                println!("skipped\t{}\t{}", job_id, status)
            }
            Ok(NotificationOutcome::Dangling { job_id }) => println!("dangling\t{}", job_id),
            Err(e) => eprintln!("failed\trecord {}\t{}", index, e),
        }
    }
    Ok(report.failed_count() == 0)
}

pub async fn show(config: &Config, document_id: &str) -> anyhow::Result<bool> {
    let document_id = DocumentId::parse(document_id).context("Document identifier is empty")?;
    let pipeline = open(config)?;

    match pipeline.results().get(&document_id).await? {
        Some(text) => {
            println!("{}", text);
            Ok(true)
        }
        None => {
            eprintln!("No text stored for document '{}'", document_id);
            Ok(false)
        }
    }
}

pub async fn job(config: &Config, job_id: &str) -> anyhow::Result<bool> {
    let job_id = JobId::parse(job_id).context("Job identifier is empty")?;
    let pipeline = open(config)?;

    match pipeline.correlations().get(&job_id).await? {
        Some(document_id) => {
            println!("{}", document_id);
            Ok(true)
        }
        None => {
            eprintln!("No document recorded for job '{}'", job_id);
            Ok(false)
        }
    }
}
