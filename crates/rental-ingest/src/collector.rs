//! Sequential, paced collection over the full offset range.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PacingConfig;
use crate::error::{IngestError, Result};
use crate::fetch::BatchFetcher;
use crate::filter::RecordFilter;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::record::Record;
use crate::window::{window_count, windows, PageRange};

/// A window skipped after its fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFailure {
    pub range: PageRange,
    pub error: IngestError,
}

/// Outcome of one collection pass.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Matching records in upstream offset order
    pub records: Vec<Record>,
    pub failed_windows: Vec<WindowFailure>,
    pub windows_visited: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Collection {
    pub fn is_partial(&self) -> bool {
        !self.failed_windows.is_empty()
    }
}

/// Walks every window of `[1, total]` once, in increasing offset order.
pub struct SequentialCollector {
    fetcher: BatchFetcher,
    pacing: PacingConfig,
}

impl SequentialCollector {
    pub fn new(fetcher: BatchFetcher, pacing: PacingConfig) -> Self {
        Self { fetcher, pacing }
    }

    /// Collect all records matching `filter`.
    ///
    /// A failed window is reported through `progress`, recorded in the
    /// result and skipped; it never aborts the pass. Cancellation is checked
    /// before each window and interrupts the pacing sleep.
    #[instrument(skip(self, filter, progress, cancel))]
    pub async fn collect(
        &self,
        total_count: u64,
        filter: &RecordFilter,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Collection> {
        let started_at = Utc::now();
        let page_size = self.pacing.page_size;
        let mut records = Vec::new();
        let mut failed_windows = Vec::new();
        let mut windows_visited = 0u64;

        info!(
            windows = window_count(total_count, page_size),
            page_size = page_size,
            filtered = !filter.is_unconstrained(),
            "Starting collection"
        );

        for range in windows(total_count, page_size) {
            if cancel.is_cancelled() {
                info!(window = %range, collected = records.len(), "Collection cancelled");
                return Err(IngestError::Cancelled);
            }

            progress.on_progress(&ProgressEvent::window(range, total_count, records.len()));
            windows_visited += 1;

            match self.fetcher.fetch_page(range, cancel).await {
                Ok(page) => {
                    let fetched = page.len();
                    let matched = filter.apply(page);
                    debug!(
                        window = %range,
                        fetched = fetched,
                        matched = matched.len(),
                        "Window collected"
                    );
                    records.extend(matched);
                    pause(self.pacing.success_delay, cancel).await;
                }
                Err(IngestError::Cancelled) => {
                    info!(window = %range, collected = records.len(), "Collection cancelled");
                    return Err(IngestError::Cancelled);
                }
                Err(error) => {
                    warn!(window = %range, error = %error, "Window failed, skipping");
                    progress.on_progress(&ProgressEvent::window_failed(
                        range,
                        total_count,
                        records.len(),
                        format!("window {} failed: {}", range, error),
                    ));
                    failed_windows.push(WindowFailure { range, error });
                    pause(self.pacing.failure_delay, cancel).await;
                }
            }
        }

        info!(
            collected = records.len(),
            windows = windows_visited,
            failed = failed_windows.len(),
            "Collection complete"
        );

        Ok(Collection {
            records,
            failed_windows,
            windows_visited,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

async fn pause(delay: Duration, cancel: &CancellationToken) {
    if delay.is_zero() {
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}
