//! Dispatch and completion-notification behaviour across separate
//! invocations that share only the durable stores.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use common::{notification_batch, paged, pdf_bytes, tagged_notification, TestHarness};
use doctext::config::{CorrelationMode, RoutingStrategy};
use doctext::error::{OcrError, StoreError};
use doctext::model::ResultPage;
use doctext::store::{KeyValueStore, MemoryKvStore};
use doctext::{IngestOutcome, NotificationOutcome, PipelineError};

struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("provisioned throughput exceeded".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("provisioned throughput exceeded".to_string()))
    }
}

#[tokio::test]
async fn test_dispatch_and_notification_assemble_pages() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    harness.ocr.queue_job_id("J1");
    harness.ocr.script_pages(
        "J1",
        vec![
            ResultPage::from_lines(["Hello", "World"], Some("tok1")),
            ResultPage::from_lines(["Goodbye"], None),
        ],
    );
    let object = harness.upload("scan.pdf", b"%PDF-1.5", Some("D1")).await;

    let job_id = harness.pipeline().dispatch(&object).await.unwrap();
    assert_eq!(job_id.as_str(), "J1");
    assert_eq!(harness.correlation("J1").await.as_deref(), Some("D1"));

    let report = harness
        .pipeline()
        .handle_notifications(&notification_batch(&[("J1", "SUCCEEDED")]))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        harness.stored_text("D1").await.as_deref(),
        Some("Hello\nWorld\nGoodbye")
    );

    let fetches: Vec<Option<String>> = harness.ocr.fetches().into_iter().map(|(_, t)| t).collect();
    assert_eq!(fetches, vec![None, Some("tok1".to_string())]);
}

#[tokio::test]
async fn test_duplicate_notification_is_idempotent() {
    let harness = TestHarness::new();
    harness.ocr.queue_job_id("J1");
    harness
        .ocr
        .script_pages("J1", paged(&[&["alpha", "beta"], &["gamma"]]));
    let object = harness.upload("scan.png", b"\x89PNG", Some("D1")).await;
    harness.pipeline().ingest(&object).await.unwrap();

    let batch = notification_batch(&[("J1", "SUCCEEDED")]);
    let first = harness.pipeline().handle_notifications(&batch).await.unwrap();
    let after_first = harness.stored_text("D1").await;
    let second = harness.pipeline().handle_notifications(&batch).await.unwrap();
    let after_second = harness.stored_text("D1").await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(after_first.as_deref(), Some("alpha\nbeta\ngamma"));
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_correlation_survives_restart() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    harness.ocr.queue_job_id("J7");
    let object = harness.upload("contract.pdf", b"%PDF", Some("D7")).await;

    {
        let dispatcher_process = harness.pipeline();
        dispatcher_process.dispatch(&object).await.unwrap();
    }

    // A completely new set of connections reads what the first one wrote.
    harness
        .ocr
        .script_pages("J7", vec![ResultPage::from_lines(["restored"], None)]);
    let listener_process = harness.pipeline();
    let report = listener_process
        .handle_notifications(&notification_batch(&[("J7", "SUCCEEDED")]))
        .await
        .unwrap();

    assert_eq!(report.committed_count(), 1);
    assert_eq!(harness.stored_text("D7").await.as_deref(), Some("restored"));
}

#[tokio::test]
async fn test_dangling_notification_mutates_nothing() {
    let harness = TestHarness::new();
    let results = Arc::new(MemoryKvStore::new());
    let correlations = Arc::new(MemoryKvStore::new());
    let pipeline = harness.pipeline_with_stores(results.clone(), correlations.clone());

    let report = pipeline
        .handle_notifications(&notification_batch(&[("J-unknown", "SUCCEEDED")]))
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(matches!(
        report.results[0],
        Ok(NotificationOutcome::Dangling { .. })
    ));
    assert!(results.is_empty());
    assert!(correlations.is_empty());
    assert!(harness.ocr.fetches().is_empty());
}

#[tokio::test]
async fn test_failed_job_produces_no_result() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    harness.ocr.queue_job_id("J2");
    let object = harness.upload("scan.pdf", b"%PDF", Some("D2")).await;
    harness.pipeline().dispatch(&object).await.unwrap();

    let report = harness
        .pipeline()
        .handle_notifications(&notification_batch(&[("J2", "FAILED")]))
        .await
        .unwrap();

    assert!(matches!(
        report.results[0],
        Ok(NotificationOutcome::Skipped { .. })
    ));
    assert!(harness.stored_text("D2").await.is_none());
}

#[tokio::test]
async fn test_missing_identifier_aborts_without_writes() {
    let harness = TestHarness::new();
    let results = Arc::new(MemoryKvStore::new());
    let correlations = Arc::new(MemoryKvStore::new());
    let pipeline = harness.pipeline_with_stores(results.clone(), correlations.clone());

    for key in ["anonymous.pdf", "anonymous.png", "anonymous.txt"] {
        let object = harness.upload(key, b"body", None).await;
        let err = pipeline.ingest(&object).await.unwrap_err();
        assert!(
            matches!(err, PipelineError::MissingIdentifier { .. }),
            "{}: {:?}",
            key,
            err
        );
        assert!(!err.is_retryable());
    }

    assert!(results.is_empty());
    assert!(correlations.is_empty());
    assert!(harness.ocr.submissions().is_empty());
}

#[tokio::test]
async fn test_empty_intermediate_page_does_not_end_pagination() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    harness.ocr.queue_job_id("J3");
    harness.ocr.script_pages(
        "J3",
        vec![
            ResultPage::from_lines(["first"], Some("a")),
            ResultPage::from_lines(Vec::<String>::new(), Some("b")),
            ResultPage::from_lines(Vec::<String>::new(), Some("c")),
            ResultPage::from_lines(["last"], None),
        ],
    );
    let object = harness.upload("scan.pdf", b"%PDF", Some("D3")).await;
    harness.pipeline().dispatch(&object).await.unwrap();

    harness
        .pipeline()
        .handle_notifications(&notification_batch(&[("J3", "SUCCEEDED")]))
        .await
        .unwrap();

    assert_eq!(harness.stored_text("D3").await.as_deref(), Some("first\nlast"));
    assert_eq!(harness.ocr.fetches().len(), 4);
}

#[tokio::test]
async fn test_page_limit_aborts_without_write() {
    let harness = TestHarness::new()
        .with_routing(RoutingStrategy::Ocr)
        .with_max_pages(2);
    harness.ocr.queue_job_id("J4");
    harness
        .ocr
        .script_pages("J4", paged(&[&["1"], &["2"], &["3"]]));
    let object = harness.upload("long.pdf", b"%PDF", Some("D4")).await;
    harness.pipeline().dispatch(&object).await.unwrap();

    let report = harness
        .pipeline()
        .handle_notifications(&notification_batch(&[("J4", "SUCCEEDED")]))
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 1);
    assert!(matches!(
        report.results[0],
        Err(PipelineError::ResultFetch {
            source: OcrError::PageLimitExceeded { limit: 2, .. },
            ..
        })
    ));
    assert!(harness.stored_text("D4").await.is_none());
}

#[tokio::test]
async fn test_correlation_write_failure_is_reported_as_orphan() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    harness.ocr.queue_job_id("J5");
    let object = harness.upload("scan.pdf", b"%PDF", Some("D5")).await;
    let pipeline = harness.pipeline_with_stores(harness.result_kv(), Arc::new(UnavailableStore));

    let err = pipeline.dispatch(&object).await.unwrap_err();

    assert!(err.is_orphaned_job());
    assert_eq!(harness.ocr.submissions().len(), 1);

    // Its completion notification is later discarded as dangling.
    harness
        .ocr
        .script_pages("J5", vec![ResultPage::from_lines(["lost"], None)]);
    let report = harness
        .pipeline()
        .handle_notifications(&notification_batch(&[("J5", "SUCCEEDED")]))
        .await
        .unwrap();
    assert!(matches!(
        report.results[0],
        Ok(NotificationOutcome::Dangling { .. })
    ));
    assert!(harness.stored_text("D5").await.is_none());
}

#[tokio::test]
async fn test_batch_records_are_independent() {
    let harness = TestHarness::new().with_routing(RoutingStrategy::Ocr);
    for (job, doc, key) in [("JA", "DA", "a.pdf"), ("JB", "DB", "b.pdf")] {
        harness.ocr.queue_job_id(job);
        let object = harness.upload(key, b"%PDF", Some(doc)).await;
        harness.pipeline().dispatch(&object).await.unwrap();
    }
    harness.ocr.script_failure("JA", None, "internal error");
    harness
        .ocr
        .script_pages("JB", vec![ResultPage::from_lines(["bravo"], None)]);

    // Reordered relative to submission, with a dangling record in between.
    let report = harness
        .pipeline()
        .handle_notifications(&notification_batch(&[
            ("JB", "SUCCEEDED"),
            ("JX", "SUCCEEDED"),
            ("JA", "SUCCEEDED"),
        ]))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.committed_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert!(report.results[2].as_ref().unwrap_err().is_retryable());
    assert_eq!(harness.stored_text("DB").await.as_deref(), Some("bravo"));
    assert!(harness.stored_text("DA").await.is_none());
}

#[tokio::test]
async fn test_echo_token_mode() {
    let harness = TestHarness::new()
        .with_routing(RoutingStrategy::Ocr)
        .with_correlation(CorrelationMode::EchoToken);
    harness.ocr.queue_job_id("J6");
    harness
        .ocr
        .script_pages("J6", vec![ResultPage::from_lines(["echo"], None)]);
    let object = harness.upload("scan.pdf", b"%PDF", Some("D6")).await;

    harness.pipeline().dispatch(&object).await.unwrap();
    assert_eq!(
        harness.ocr.submissions()[0].options.job_tag.as_deref(),
        Some("D6")
    );

    let report = harness
        .pipeline()
        .handle_notifications(&tagged_notification("J6", "SUCCEEDED", "D6"))
        .await
        .unwrap();

    assert_eq!(report.committed_count(), 1);
    assert_eq!(harness.stored_text("D6").await.as_deref(), Some("echo"));
}

#[tokio::test]
async fn test_scanned_pdf_falls_back_to_ocr() {
    let harness = TestHarness::new();
    harness.ocr.queue_job_id("J8");
    let object = harness
        .upload("scanned.pdf", &pdf_bytes(None), Some("D8"))
        .await;

    let outcome = harness.pipeline().ingest(&object).await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Dispatched { .. }));
    assert_eq!(harness.correlation("J8").await.as_deref(), Some("D8"));
    assert!(harness.stored_text("D8").await.is_none());
}
