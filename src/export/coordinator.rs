//! Export orchestration
//!
//! Drives the scroll source, feeds each raw document through the flattener
//! into the rotating writer, tracks progress, and guarantees the scroll
//! context is released on every exit path.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;

use super::flatten::{flatten, FlattenOptions};
use super::progress::ProgressTracker;
use super::scroll::{RawDocument, ScrollSource};
use super::writer::RotatingCsvWriter;

/// Orchestrator state.
///
/// `Failed` is reachable from `Scanning` and `Draining` on unrecoverable
/// cursor errors; write failures never leave the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Not started
    Idle,
    /// First page opened, processing it
    Scanning,
    /// Pulling continuation pages until one comes back empty
    Draining,
    /// Run completed and cursor released
    Done,
    /// Aborted on a fatal cursor error (cursor still released)
    Failed,
}

/// Result of an export run
#[derive(Debug)]
pub struct ExportSummary {
    /// Documents pulled from the store (written plus dropped)
    pub documents_processed: u64,
    /// Output files produced
    pub files_written: u32,
    /// Records lost to write failures
    pub documents_dropped: u64,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

/// Coordinator for one export run
///
/// Single sequential flow: one cursor, one writer, one thread of control.
/// The coordinator exclusively owns both for the duration of the run.
pub struct ExportCoordinator {
    /// Document source
    source: Box<dyn ScrollSource>,
    /// Rotating CSV sink
    writer: RotatingCsvWriter,
    /// Flattening rules
    flatten_options: FlattenOptions,
    /// Emit a progress log line every this many documents
    progress_every: u64,
    /// Display an interactive progress bar
    progress_bar: bool,
    /// Current state
    state: ExportState,
}

impl ExportCoordinator {
    /// Create a coordinator.
    pub fn new(
        source: Box<dyn ScrollSource>,
        writer: RotatingCsvWriter,
        flatten_options: FlattenOptions,
    ) -> Self {
        Self {
            source,
            writer,
            flatten_options,
            progress_every: 10_000,
            progress_bar: false,
            state: ExportState::Idle,
        }
    }

    /// Configure progress reporting.
    pub fn with_progress(mut self, every: u64, bar: bool) -> Self {
        self.progress_every = every.max(1);
        self.progress_bar = bar;
        self
    }

    /// Current orchestrator state.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Execute the export run to completion.
    ///
    /// The scroll context is released exactly once on every path out of
    /// this function: normal exhaustion, empty first page, and fatal-error
    /// abort. Already-written files are preserved on abort.
    pub async fn run(&mut self) -> Result<ExportSummary> {
        let started = Instant::now();

        info!("Starting export");
        let opened = match self.source.open().await {
            Ok(opened) => opened,
            Err(e) => {
                self.state = ExportState::Failed;
                self.source.close().await;
                return Err(e);
            }
        };
        self.state = ExportState::Scanning;

        if opened.first_batch.is_empty() && opened.total_hits == 0 {
            info!("Store reported zero documents, nothing to export");
            self.source.close().await;
            self.state = ExportState::Done;
            return Ok(self.summary(0, started));
        }

        info!("Store estimates {} documents", opened.total_hits);
        let tracker = ProgressTracker::new(Some(opened.total_hits), self.progress_bar);

        let mut processed = 0u64;
        let mut last_tick = 0u64;
        self.process_batch(&opened.first_batch, &tracker, &mut processed, &mut last_tick)
            .await;

        // Keep pulling until a page comes back empty. The open-time
        // estimate is advisory only and never terminates the loop.
        self.state = ExportState::Draining;
        loop {
            let batch = match self.source.next_page().await {
                Ok(batch) => batch,
                Err(e) => {
                    tracker.finish();
                    self.state = ExportState::Failed;
                    self.source.close().await;
                    return Err(e);
                }
            };
            if batch.is_empty() {
                debug!("No more pages available");
                break;
            }
            self.process_batch(&batch, &tracker, &mut processed, &mut last_tick)
                .await;
        }

        tracker.finish();
        self.source.close().await;
        self.state = ExportState::Done;

        let summary = self.summary(processed, started);
        info!(
            "Export completed: {} documents in {} files, {} dropped, {} ms",
            summary.documents_processed,
            summary.files_written,
            summary.documents_dropped,
            summary.elapsed_ms
        );
        Ok(summary)
    }

    async fn process_batch(
        &mut self,
        batch: &[RawDocument],
        tracker: &ProgressTracker,
        processed: &mut u64,
        last_tick: &mut u64,
    ) {
        for doc in batch {
            let record = flatten(doc, &self.flatten_options);
            self.writer.write(&record).await;
        }
        *processed += batch.len() as u64;
        tracker.update(*processed);

        let tick = *processed / self.progress_every;
        if tick > *last_tick {
            *last_tick = tick;
            info!(
                "{} documents processed, {:.2}s elapsed",
                *processed,
                tracker.elapsed().as_secs_f64()
            );
        }
    }

    fn summary(&self, processed: u64, started: Instant) -> ExportSummary {
        ExportSummary {
            documents_processed: processed,
            files_written: self.writer.files_written(),
            documents_dropped: self.writer.documents_dropped(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EsdumpError, ExportError};
    use crate::export::scroll::ScrollOpen;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value) -> RawDocument {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    /// Scroll source serving canned pages; pages[0] is the open() batch.
    struct MockScrollSource {
        pages: Vec<Vec<RawDocument>>,
        total: u64,
        next: usize,
        fail_on_page: Option<usize>,
        closes: Arc<AtomicUsize>,
    }

    impl MockScrollSource {
        fn new(pages: Vec<Vec<RawDocument>>, total: u64) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    pages,
                    total,
                    next: 0,
                    fail_on_page: None,
                    closes: closes.clone(),
                },
                closes,
            )
        }

        fn failing_on(mut self, page: usize) -> Self {
            self.fail_on_page = Some(page);
            self
        }
    }

    #[async_trait]
    impl ScrollSource for MockScrollSource {
        async fn open(&mut self) -> Result<ScrollOpen> {
            let first_batch = self.pages.first().cloned().unwrap_or_default();
            self.next = 1;
            Ok(ScrollOpen {
                first_batch,
                total_hits: self.total,
            })
        }

        async fn next_page(&mut self) -> Result<Vec<RawDocument>> {
            if self.fail_on_page == Some(self.next) {
                return Err(EsdumpError::Export(ExportError::CursorExpired(
                    "window lapsed".to_string(),
                )));
            }
            let batch = self.pages.get(self.next).cloned().unwrap_or_default();
            self.next += 1;
            Ok(batch)
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn writer_in(dir: &TempDir, columns: &[&str]) -> RotatingCsvWriter {
        RotatingCsvWriter::new(
            dir.path().join("out"),
            columns.iter().map(|c| c.to_string()).collect(),
            1024 * 1024,
        )
    }

    #[tokio::test]
    async fn test_run_writes_every_document_across_pages() {
        let dir = TempDir::new().unwrap();
        let pages = vec![
            vec![doc(json!({ "id": 1 })), doc(json!({ "id": 2 }))],
            vec![doc(json!({ "id": 3 }))],
        ];
        let (source, closes) = MockScrollSource::new(pages, 3);

        let mut coordinator = ExportCoordinator::new(
            Box::new(source),
            writer_in(&dir, &["id"]),
            FlattenOptions::default(),
        );
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.documents_processed, 3);
        assert_eq!(summary.documents_dropped, 0);
        assert_eq!(summary.files_written, 1);
        assert_eq!(coordinator.state(), ExportState::Done);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let content = tokio::fs::read_to_string(dir.path().join("out-1.csv"))
            .await
            .unwrap();
        assert_eq!(content, "id\n1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_empty_index_creates_no_files() {
        let dir = TempDir::new().unwrap();
        let (source, closes) = MockScrollSource::new(vec![], 0);

        let mut coordinator = ExportCoordinator::new(
            Box::new(source),
            writer_in(&dir, &["id"]),
            FlattenOptions::default(),
        );
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.documents_processed, 0);
        assert_eq!(summary.files_written, 0);
        assert_eq!(coordinator.state(), ExportState::Done);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("out-1.csv").exists());
    }

    #[tokio::test]
    async fn test_cursor_expiry_aborts_but_keeps_output_and_closes() {
        let dir = TempDir::new().unwrap();
        let pages = vec![vec![doc(json!({ "id": 1 }))]];
        let (source, closes) = MockScrollSource::new(pages, 100);
        let source = source.failing_on(1);

        let mut coordinator = ExportCoordinator::new(
            Box::new(source),
            writer_in(&dir, &["id"]),
            FlattenOptions::default(),
        );
        let err = coordinator.run().await.unwrap_err();

        assert!(matches!(
            err,
            EsdumpError::Export(ExportError::CursorExpired(_))
        ));
        assert_eq!(coordinator.state(), ExportState::Failed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // The page written before the abort survives on disk.
        let content = tokio::fs::read_to_string(dir.path().join("out-1.csv"))
            .await
            .unwrap();
        assert_eq!(content, "id\n1\n");
    }

    #[tokio::test]
    async fn test_total_estimate_does_not_terminate_the_loop() {
        let dir = TempDir::new().unwrap();
        // Store undercounts: estimate says 1, pages carry 3 documents.
        let pages = vec![
            vec![doc(json!({ "id": 1 }))],
            vec![doc(json!({ "id": 2 })), doc(json!({ "id": 3 }))],
        ];
        let (source, _) = MockScrollSource::new(pages, 1);

        let mut coordinator = ExportCoordinator::new(
            Box::new(source),
            writer_in(&dir, &["id"]),
            FlattenOptions::default(),
        );
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.documents_processed, 3);
    }

    #[tokio::test]
    async fn test_flattened_and_missing_fields_in_output() {
        let dir = TempDir::new().unwrap();
        let pages = vec![vec![
            doc(json!({ "a": 1, "b": 2, "c": { "x": 9 } })),
            doc(json!({ "a": 3, "c": { "x": 8 } })),
        ]];
        let (source, _) = MockScrollSource::new(pages, 2);

        let mut coordinator = ExportCoordinator::new(
            Box::new(source),
            writer_in(&dir, &["a", "b", "c.x"]),
            FlattenOptions::default(),
        );
        coordinator.run().await.unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("out-1.csv"))
            .await
            .unwrap();
        assert_eq!(content, "a,b,c.x\n1,2,9\n3,,8\n");
    }
}
