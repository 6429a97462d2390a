//! Single entry point combining count probe and collection.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::collector::{Collection, SequentialCollector};
use crate::config::PipelineConfig;
use crate::error::{IngestError, Result};
use crate::fetch::{BatchFetcher, CountProbe};
use crate::filter::RecordFilter;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::source::{OpenApiSource, RecordSource};

/// Probe, then collect. Holds no state between runs.
pub struct Pipeline {
    probe: CountProbe,
    collector: SequentialCollector,
}

impl Pipeline {
    /// Pipeline against the configured HTTP endpoint.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(OpenApiSource::new(config.source.clone())?);
        Ok(Self::with_source(source, config))
    }

    /// Pipeline against any [`RecordSource`].
    pub fn with_source(source: Arc<dyn RecordSource>, config: &PipelineConfig) -> Self {
        let probe = CountProbe::new(
            source.clone(),
            config.retry.clone(),
            config.pacing.probe_window,
        );
        let collector = SequentialCollector::new(
            BatchFetcher::new(source, config.retry.clone()),
            config.pacing.clone(),
        );
        Self { probe, collector }
    }

    /// Run one complete collection.
    ///
    /// Returns [`IngestError::NoData`] without collecting when the probe finds
    /// nothing, and [`IngestError::NothingCollected`] when every window was
    /// visited but no record matched. Records and an error are never returned
    /// together.
    #[instrument(skip_all, fields(district = ?filter.district_code, sub_district = ?filter.sub_district_code))]
    pub async fn run(
        &self,
        filter: &RecordFilter,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Collection> {
        progress.on_progress(&ProgressEvent::status(0, "probing total record count"));

        let total = self.probe.probe_total_count(cancel).await?;

        progress.on_progress(&ProgressEvent::status(
            total,
            format!("collecting {} records", total),
        ));

        let collection = self.collector.collect(total, filter, progress, cancel).await?;

        if collection.records.is_empty() {
            info!(
                windows = collection.windows_visited,
                failed = collection.failed_windows.len(),
                "No records collected"
            );
            return Err(IngestError::NothingCollected);
        }

        Ok(collection)
    }

    /// Blocking form of [`Pipeline::run`] for synchronous callers.
    ///
    /// Drives the run on a fresh current-thread runtime, so it must not be
    /// called from inside an async context. HTTP connections belong to that
    /// runtime; use a new `Pipeline` for each blocking run.
    pub fn run_blocking(
        &self,
        filter: &RecordFilter,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Collection> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| IngestError::Runtime(e.to_string()))?;
        runtime.block_on(self.run(filter, progress, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PacingConfig, SourceConfig};
    use crate::envelope::PageEnvelope;
    use crate::mock::{DatasetSource, ScriptedSource, SourceReply};
    use crate::progress::{NoProgress, ProgressLog};
    use crate::record::Record;
    use crate::retry::RetryPolicy;
    use crate::window::PageRange;
    use serde_json::json;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::new(SourceConfig::new("TEST"));
        config.retry = RetryPolicy::immediate(3);
        config.pacing = PacingConfig::unpaced();
        config
    }

    fn dataset(n: u64) -> Vec<Record> {
        (1..=n)
            .map(|i| serde_json::from_value(json!({"SEQ": i, "CGG_CD": "11110"})).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_zero_count_skips_collection() {
        let source = Arc::new(ScriptedSource::new());
        source.push(SourceReply::envelope(PageEnvelope::Rows {
            total_count: Some(0),
            rows: vec![],
        }));
        let pipeline = Pipeline::with_source(source.clone(), &config());

        let result = pipeline
            .run(&RecordFilter::default(), &NoProgress, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(IngestError::NoData)));
        assert_eq!(source.calls(), vec![PageRange::new(1, 1000)]);
    }

    #[tokio::test]
    async fn test_probe_failure_is_terminal() {
        let source = Arc::new(ScriptedSource::new());
        source.push(SourceReply::envelope(PageEnvelope::Malformed("html".into())));
        let pipeline = Pipeline::with_source(source.clone(), &config());

        let result = pipeline
            .run(&RecordFilter::default(), &NoProgress, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(IngestError::Probe(_))));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_nothing_matching_is_distinct_from_no_data() {
        let source = Arc::new(DatasetSource::new(dataset(120)));
        let pipeline = Pipeline::with_source(source, &config());

        let result = pipeline
            .run(&RecordFilter::district("99999"), &NoProgress, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(IngestError::NothingCollected)));
    }

    #[tokio::test]
    async fn test_run_reports_status_then_windows() {
        let source = Arc::new(DatasetSource::new(dataset(120)));
        let pipeline = Pipeline::with_source(source, &config());
        let log = ProgressLog::new();

        let collection = pipeline
            .run(&RecordFilter::district("11110"), &log, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(collection.records.len(), 120);
        let events = log.events();
        assert_eq!(events.len(), 4);
        assert!(events[0].status.is_some());
        assert_eq!(events[1].status.as_deref(), Some("collecting 120 records"));
        assert_eq!(events[1].total_count, 120);
        assert_eq!((events[2].window_start, events[2].window_end), (1, 100));
        assert_eq!((events[3].window_start, events[3].window_end), (101, 120));
    }

    #[test]
    fn test_run_blocking() {
        let source = Arc::new(DatasetSource::new(dataset(5)));
        let pipeline = Pipeline::with_source(source, &config());

        let collection = pipeline
            .run_blocking(&RecordFilter::default(), &NoProgress, &CancellationToken::new())
            .unwrap();
        assert_eq!(collection.records.len(), 5);
    }

    #[test]
    fn test_new_validates_config() {
        let config = PipelineConfig::new(SourceConfig::new(""));
        assert!(matches!(
            Pipeline::new(&config),
            Err(IngestError::InvalidConfig(_))
        ));
    }
}
