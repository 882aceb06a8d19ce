//! tests/watcher_tests.rs
//! Directory watcher wired to the real services on in-memory SQLite.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::db::Database;
use crate::models::ingest_model::FileOutcome;
use crate::models::payment_model::{PaymentFilter, PaymentStatus};
use crate::services::ingest_log_service::{IngestLogService, STATUS_FAILED, STATUS_PROCESSED};
use crate::services::parser_service::ParserService;
use crate::services::payment_service::PaymentService;
use crate::services::reporter_service::{ReportSink, ReporterService};
use crate::services::watcher_service::{DirectoryWatcher, MAX_ATTEMPTS};
use crate::tests::support::{valid_line, SlowReporter, VALID_FILE_NAME};

struct Harness {
    dir: TempDir,
    input: PathBuf,
    payments: PaymentService,
    ingest_log: IngestLogService,
    watcher: DirectoryWatcher,
}

impl Harness {
    async fn new() -> Self {
        Self::with_reporter(2, None).await
    }

    /// `reporter` replaces the file-writing reporter when given.
    async fn with_reporter(workers: usize, reporter: Option<Arc<dyn ReportSink>>) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        std::fs::create_dir_all(&input).unwrap();

        let db = Database::in_memory().await.unwrap();
        let payments = PaymentService::new(db.pool().clone());
        let ingest_log = IngestLogService::new(db.pool().clone());
        let reporter: Arc<dyn ReportSink> = match reporter {
            Some(reporter) => reporter,
            None => Arc::new(ReporterService::new(
                dir.path().join("success"),
                dir.path().join("error"),
            )),
        };
        let parser = ParserService::new(&input, Arc::new(payments.clone()), reporter);
        let watcher = DirectoryWatcher::new(parser, ingest_log.clone(), workers);

        Harness {
            dir,
            input,
            payments,
            ingest_log,
            watcher,
        }
    }

    fn write(&self, name: &str, content: &[u8]) {
        std::fs::write(self.input.join(name), content).unwrap();
    }

    async fn payment_count(&self) -> u64 {
        self.count_with(PaymentFilter::default()).await
    }

    async fn count_with(&self, filter: PaymentFilter) -> u64 {
        self.payments
            .list_payments(&filter, 1, 100)
            .await
            .unwrap()
            .total
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[actix_rt::test]
async fn pending_files_are_ingested_once() {
    let h = Harness::new().await;
    h.write(VALID_FILE_NAME, format!("{}\n{}", valid_line(1), valid_line(2)).as_bytes());

    let results = h.watcher.process_pending().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].1, Ok(FileOutcome::Processed(_))));
    assert_eq!(h.payment_count().await, 2);
    assert!(h.watcher.is_processed(VALID_FILE_NAME).await);
    assert!(h
        .dir
        .path()
        .join("success")
        .join(format!("Report {VALID_FILE_NAME}"))
        .exists());

    let log = h.ingest_log.list(1, 10).await.unwrap();
    assert_eq!(log.total, 1);
    assert_eq!(log.items[0].status, STATUS_PROCESSED);
    assert_eq!(log.items[0].saved, 2);

    // Second pass finds nothing new.
    assert!(h.watcher.process_pending().await.unwrap().is_empty());
    assert_eq!(h.payment_count().await, 2);
}

#[actix_rt::test]
async fn several_files_in_one_pass() {
    let h = Harness::new().await;
    for (i, name) in ["BCP_20230101_120000_0001", "BCP_20230101_120000_0002", "BCP_20230101_120000_0003"]
        .iter()
        .enumerate()
    {
        h.write(name, valid_line(i as u64 + 1).as_bytes());
    }

    let results = h.watcher.process_pending().await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(h.payment_count().await, 3);
}

#[actix_rt::test]
async fn unrelated_files_are_skipped_without_logging() {
    let h = Harness::new().await;
    h.write("notes.txt", b"hello");

    let results = h.watcher.process_pending().await.unwrap();
    assert!(matches!(results[0].1, Ok(FileOutcome::Skipped { .. })));
    assert!(h.watcher.is_processed("notes.txt").await);
    assert_eq!(h.ingest_log.list(1, 10).await.unwrap().total, 0);

    assert!(h.watcher.process_pending().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn files_from_previous_runs_are_not_reingested() {
    let h = Harness::new().await;
    h.write(VALID_FILE_NAME, valid_line(1).as_bytes());
    h.watcher.process_pending().await.unwrap();

    // A fresh watcher over the same database, as after a restart.
    let parser = ParserService::new(
        &h.input,
        Arc::new(h.payments.clone()),
        Arc::new(ReporterService::new(h.dir.path().join("s"), h.dir.path().join("e"))),
    );
    let restarted = DirectoryWatcher::new(parser, h.ingest_log.clone(), 1);
    assert_eq!(restarted.preload_processed().await.unwrap(), 1);

    assert!(restarted.process_pending().await.unwrap().is_empty());
    assert_eq!(h.payment_count().await, 1);
}

#[actix_rt::test]
async fn unreadable_file_is_retried_then_given_up() {
    let h = Harness::new().await;
    h.write(VALID_FILE_NAME, &[0xff, 0xfe, 0x00, 0xc3]);

    for attempt in 1..=MAX_ATTEMPTS {
        let results = h.watcher.process_pending().await.unwrap();
        assert_eq!(results.len(), 1, "attempt {attempt}");
        assert!(results[0].1.is_err());
    }

    assert!(h.watcher.is_processed(VALID_FILE_NAME).await);
    assert!(h.watcher.process_pending().await.unwrap().is_empty());

    let log = h.ingest_log.list(1, 10).await.unwrap();
    assert_eq!(log.total, 1);
    assert_eq!(log.items[0].status, STATUS_FAILED);
    assert!(log.items[0].error_message.is_some());
}

#[actix_rt::test]
async fn background_loop_picks_up_new_files() {
    let h = Harness::new().await;
    h.watcher.start(Duration::from_millis(50)).await.unwrap();

    h.write(VALID_FILE_NAME, valid_line(9).as_bytes());

    let mut ingested = false;
    for _ in 0..100 {
        if h.watcher.is_processed(VALID_FILE_NAME).await {
            ingested = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    h.watcher.shutdown().await;

    assert!(ingested, "file was not picked up by the background loop");
    assert_eq!(h.payment_count().await, 1);
}

#[actix_rt::test]
async fn missing_input_directory_is_an_error() {
    let h = Harness::new().await;
    std::fs::remove_dir_all(&h.input).unwrap();

    assert!(h.watcher.process_pending().await.is_err());
}

#[actix_rt::test]
async fn same_payment_id_in_concurrent_files_is_duplicate_once() {
    let h = Harness::with_reporter(5, None).await;
    // The broken line keeps DUPLICATE from being folded into FULL_SAVED.
    let content = format!("{}\nbroken line", valid_line(5));
    h.write("BCP_20230101_120000_0001", content.as_bytes());
    h.write("BCP_20230101_120000_0002", content.as_bytes());

    let results = h.watcher.process_pending().await.unwrap();
    assert_eq!(results.len(), 2);

    let duplicates: Vec<u64> = results
        .iter()
        .map(|(_, r)| match r {
            Ok(FileOutcome::Processed(summary)) => summary.duplicates,
            other => panic!("unexpected result {:?}", other),
        })
        .collect();
    assert_eq!(duplicates.iter().sum::<u64>(), 1);

    let with_status = |status| PaymentFilter {
        status: Some(status),
        file_name: None,
    };
    assert_eq!(h.count_with(with_status(PaymentStatus::Duplicate)).await, 1);
    assert_eq!(h.count_with(with_status(PaymentStatus::PartialOk)).await, 1);
}

#[actix_rt::test]
async fn no_more_than_worker_count_files_run_at_once() {
    let reporter = Arc::new(SlowReporter::new(Duration::from_millis(100)));
    let h = Harness::with_reporter(2, Some(reporter.clone() as Arc<dyn ReportSink>)).await;
    for i in 1..=5u64 {
        h.write(&format!("BCP_20230101_120000_000{i}"), valid_line(i).as_bytes());
    }

    let results = h.watcher.process_pending().await.unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(reporter.finished(), 5);
    assert_eq!(reporter.peak(), 2);
}

#[actix_rt::test]
async fn shutdown_lets_the_running_pass_finish() {
    let reporter = Arc::new(SlowReporter::new(Duration::from_millis(300)));
    let h = Harness::with_reporter(2, Some(reporter.clone() as Arc<dyn ReportSink>)).await;
    h.write(VALID_FILE_NAME, valid_line(1).as_bytes());

    h.watcher.start(Duration::from_secs(60)).await.unwrap();
    assert!(wait_for(|| reporter.active() > 0).await, "pass never started");

    h.watcher.shutdown().await;

    assert_eq!(reporter.finished(), 1);
    assert!(h.watcher.is_processed(VALID_FILE_NAME).await);
    assert_eq!(h.ingest_log.list(1, 10).await.unwrap().total, 1);
}

#[actix_rt::test]
async fn shutdown_aborts_a_pass_that_outlives_the_grace_period() {
    let reporter = Arc::new(SlowReporter::new(Duration::from_secs(30)));
    let h = Harness::with_reporter(2, Some(reporter.clone() as Arc<dyn ReportSink>)).await;
    let watcher = h
        .watcher
        .clone()
        .with_shutdown_grace(Duration::from_millis(100));
    h.write(VALID_FILE_NAME, valid_line(1).as_bytes());

    watcher.start(Duration::from_secs(60)).await.unwrap();
    assert!(wait_for(|| reporter.active() > 0).await, "pass never started");

    let started = Instant::now();
    watcher.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(reporter.finished(), 0);
    assert!(!watcher.is_processed(VALID_FILE_NAME).await);
    assert_eq!(h.ingest_log.list(1, 10).await.unwrap().total, 0);
}
