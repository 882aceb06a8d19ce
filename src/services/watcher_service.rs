use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};

use crate::errors::FileProcessingError;
use crate::models::ingest_model::FileOutcome;
use crate::services::ingest_log_service::IngestLogService;
use crate::services::parser_service::ParserService;

/// A file that keeps failing is given up on after this many passes.
pub const MAX_ATTEMPTS: u32 = 3;
/// How long shutdown waits for in-flight files unless configured otherwise.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub type ProcessResult = (PathBuf, Result<FileOutcome, FileProcessingError>);

#[derive(Default)]
struct WatchState {
    processed: HashSet<String>,
    in_flight: HashSet<String>,
    attempts: HashMap<String, u32>,
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Polls the input directory and feeds new files to the parser.
#[derive(Clone)]
pub struct DirectoryWatcher {
    input_directory: PathBuf,
    parser: ParserService,
    ingest_log: IngestLogService,
    semaphore: Arc<Semaphore>,
    shutdown_grace: Duration,
    state: Arc<Mutex<WatchState>>,
    running: Arc<Mutex<Option<Running>>>,
}

impl DirectoryWatcher {
    pub fn new(parser: ParserService, ingest_log: IngestLogService, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        DirectoryWatcher {
            input_directory: parser.input_directory().to_path_buf(),
            parser,
            ingest_log,
            semaphore: Arc::new(Semaphore::new(worker_count)),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            state: Arc::new(Mutex::new(WatchState::default())),
            running: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Loads names of files already ingested by earlier runs.
    pub async fn preload_processed(&self) -> Result<usize> {
        let names = self.ingest_log.processed_names().await?;
        let count = names.len();
        self.state.lock().await.processed.extend(names);
        Ok(count)
    }

    pub async fn is_processed(&self, file_name: &str) -> bool {
        self.state.lock().await.processed.contains(file_name)
    }

    /// One pass over the directory: every new regular file is parsed, at most
    /// `worker_count` at a time. Returns per-file results for this pass.
    pub async fn process_pending(&self) -> Result<Vec<ProcessResult>> {
        let candidates = self.claim_new_files().await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        log::info!(
            "Found {} new file(s) in {:?}",
            candidates.len(),
            self.input_directory
        );

        let tasks = candidates.into_iter().map(|path| self.process_file(path));
        Ok(futures::future::join_all(tasks).await)
    }

    async fn claim_new_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.input_directory)
            .await
            .with_context(|| format!("Failed to access directory {:?}", self.input_directory))?;

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                found.push(entry.path());
            }
        }
        found.sort();

        let mut state = self.state.lock().await;
        let mut claimed = Vec::new();
        for path in found {
            let name = file_name_of(&path);
            if state.processed.contains(&name) || state.in_flight.contains(&name) {
                continue;
            }
            state.in_flight.insert(name);
            claimed.push(path);
        }
        Ok(claimed)
    }

    async fn process_file(&self, path: PathBuf) -> ProcessResult {
        let name = file_name_of(&path);
        let result = match self.semaphore.acquire().await {
            Ok(_permit) => {
                log::info!("Processing file: {:?}", path);
                self.parser.parse_file(&path).await
            }
            // Only happens if the semaphore is closed, which we never do.
            Err(e) => {
                log::error!("Worker pool unavailable: {}", e);
                self.state.lock().await.in_flight.remove(&name);
                return (path, Ok(FileOutcome::Skipped { file_name: name }));
            }
        };

        match &result {
            Ok(outcome) => {
                if let Err(e) = self.ingest_log.record(outcome).await {
                    log::error!("Could not record outcome for {}: {:#}", name, e);
                }
                self.finish(&name, true).await;
            }
            Err(e) => {
                log::error!("Error processing file {:?}: {}", path, e);
                let attempts = self.bump_attempts(&name).await;
                if attempts >= MAX_ATTEMPTS {
                    log::warn!("Giving up on {} after {} attempts", name, attempts);
                    if let Err(log_err) =
                        self.ingest_log.record_failure(&name, &e.to_string()).await
                    {
                        log::error!("Could not record failure for {}: {:#}", name, log_err);
                    }
                    self.finish(&name, true).await;
                } else {
                    self.finish(&name, false).await;
                }
            }
        }

        (path, result)
    }

    async fn bump_attempts(&self, name: &str) -> u32 {
        let mut state = self.state.lock().await;
        let attempts = state.attempts.entry(name.to_string()).or_insert(0);
        *attempts += 1;
        *attempts
    }

    async fn finish(&self, name: &str, done: bool) {
        let mut state = self.state.lock().await;
        state.in_flight.remove(name);
        if done {
            state.attempts.remove(name);
            state.processed.insert(name.to_string());
        }
    }

    /// Starts the polling loop. The first pass runs right away and picks up
    /// files that were already in the directory.
    pub async fn start(&self, interval: Duration) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            log::warn!("Directory watcher already running");
            return Ok(());
        }

        let preloaded = self.preload_processed().await?;
        log::info!(
            "Watching {:?} every {:?} ({} file(s) already ingested)",
            self.input_directory,
            interval,
            preloaded
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let watcher = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = watcher.process_pending().await {
                            log::error!("Directory scan failed: {:#}", e);
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            log::info!("Directory watcher stopped");
        });

        *running = Some(Running { stop_tx, handle });
        Ok(())
    }

    /// Stops the loop, letting the current pass finish within the grace period.
    pub async fn shutdown(&self) {
        let Some(Running { stop_tx, handle }) = self.running.lock().await.take() else {
            return;
        };
        log::info!("Shutting down directory watcher...");
        let _ = stop_tx.send(true);

        let abort = handle.abort_handle();
        match timeout(self.shutdown_grace, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Directory watcher task failed: {}", e),
            Err(_) => {
                log::warn!("Forcing directory watcher shutdown");
                abort.abort();
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
