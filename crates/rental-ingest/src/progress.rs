//! Progress reporting to an external observer.
//!
//! Sinks are invoked synchronously on the pipeline's own flow, so they gate
//! its pacing and must return promptly. Events never affect control flow.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::window::PageRange;

/// Collection progress for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub window_start: u64,
    pub window_end: u64,
    pub total_count: u64,
    pub collected_so_far: usize,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl ProgressEvent {
    /// Announces a window about to be fetched.
    pub fn window(range: PageRange, total_count: u64, collected_so_far: usize) -> Self {
        Self {
            window_start: range.start,
            window_end: range.end,
            total_count,
            collected_so_far,
            status: None,
            error: None,
        }
    }

    /// Warning for a window that failed after its retries.
    pub fn window_failed(
        range: PageRange,
        total_count: u64,
        collected_so_far: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::window(range, total_count, collected_so_far)
        }
    }

    /// Status-only event outside any window.
    pub fn status(total_count: u64, status: impl Into<String>) -> Self {
        Self {
            window_start: 0,
            window_end: 0,
            total_count,
            collected_so_far: 0,
            status: Some(status.into()),
            error: None,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.error.is_some()
    }
}

/// Enrichment progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentProgress {
    pub processed: usize,
    pub total: usize,
}

/// Observer of pipeline progress.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    fn on_enrichment(&self, _progress: EnrichmentProgress) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(error) = &event.error {
            warn!(
                window_start = event.window_start,
                window_end = event.window_end,
                total = event.total_count,
                collected = event.collected_so_far,
                error = %error,
                "Window skipped"
            );
        } else if let Some(status) = &event.status {
            info!(total = event.total_count, status = %status, "Pipeline status");
        } else {
            info!(
                window_start = event.window_start,
                window_end = event.window_end,
                total = event.total_count,
                collected = event.collected_so_far,
                "Fetching window"
            );
        }
    }

    fn on_enrichment(&self, progress: EnrichmentProgress) {
        info!(
            processed = progress.processed,
            total = progress.total,
            "Geocoding progress"
        );
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
    enrichment: Mutex<Vec<EnrichmentProgress>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(ProgressEvent::is_warning)
            .collect()
    }

    pub fn enrichment(&self) -> Vec<EnrichmentProgress> {
        self.enrichment.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for ProgressLog {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn on_enrichment(&self, progress: EnrichmentProgress) {
        if let Ok(mut enrichment) = self.enrichment.lock() {
            enrichment.push(progress);
        }
    }
}
