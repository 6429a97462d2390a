//! Total-count probe and single-window fetch, both with bounded retry.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::envelope::PageEnvelope;
use crate::error::{IngestError, Result, TransportError};
use crate::record::Record;
use crate::retry::RetryPolicy;
use crate::source::RecordSource;
use crate::window::PageRange;

/// Why [`with_retry`] stopped without a value.
enum GaveUp {
    /// Attempts made and the last cause.
    Failed(u32, TransportError),
    Cancelled,
}

/// Run `op` until it succeeds, fails non-retryably, the policy's attempts
/// are exhausted, or `cancel` fires. Cancellation interrupts both an
/// in-flight attempt and the backoff sleep.
async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    range: PageRange,
    cancel: &CancellationToken,
    mut op: F,
) -> std::result::Result<T, GaveUp>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    let mut attempt = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GaveUp::Cancelled),
            outcome = op() => outcome,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(cause) => {
                if !cause.is_retryable() {
                    warn!(window = %range, error = %cause, "Unexpected response shape, not retrying");
                    return Err(GaveUp::Failed(attempt + 1, cause));
                }
                if !policy.has_attempt_after(attempt) {
                    return Err(GaveUp::Failed(attempt + 1, cause));
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    window = %range,
                    error = %cause,
                    retry = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(GaveUp::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

/// Determines how many records the unfiltered dataset holds.
pub struct CountProbe {
    source: Arc<dyn RecordSource>,
    retry: RetryPolicy,
    window: PageRange,
}

impl CountProbe {
    pub fn new(source: Arc<dyn RecordSource>, retry: RetryPolicy, window: PageRange) -> Self {
        Self {
            source,
            retry,
            window,
        }
    }

    /// Probe the total record count.
    ///
    /// A zero count or the provider's "no data" code yields
    /// [`IngestError::NoData`]; anything else that fails yields
    /// [`IngestError::Probe`].
    #[instrument(skip(self, cancel), fields(window = %self.window))]
    pub async fn probe_total_count(&self, cancel: &CancellationToken) -> Result<u64> {
        let window = self.window;
        let envelope = with_retry(&self.retry, window, cancel, || async move {
            match self.source.fetch_window(window).await? {
                PageEnvelope::ApiError { code, message } => {
                    Err(TransportError::Api { code, message })
                }
                PageEnvelope::Malformed(detail) => Err(TransportError::Malformed(detail)),
                envelope => Ok(envelope),
            }
        })
        .await
        .map_err(|gave_up| match gave_up {
            GaveUp::Failed(_, cause) => IngestError::Probe(cause),
            GaveUp::Cancelled => IngestError::Cancelled,
        })?;

        match envelope {
            PageEnvelope::Rows {
                total_count: Some(0),
                ..
            }
            | PageEnvelope::NoData => {
                info!("Source reports no data");
                Err(IngestError::NoData)
            }
            PageEnvelope::Rows {
                total_count: Some(total),
                rows,
            } => {
                if let Some(sample) = rows.first() {
                    debug!(
                        fields = ?sample.fields().keys().collect::<Vec<_>>(),
                        "Sample record fields"
                    );
                }
                info!(total = total, "Probed total count");
                Ok(total)
            }
            PageEnvelope::Rows {
                total_count: None, ..
            } => Err(IngestError::Probe(TransportError::Malformed(
                "missing list_total_count".into(),
            ))),
            PageEnvelope::ApiError { code, message } => {
                Err(IngestError::Probe(TransportError::Api { code, message }))
            }
            PageEnvelope::Malformed(detail) => {
                Err(IngestError::Probe(TransportError::Malformed(detail)))
            }
        }
    }
}

/// Retrieves one window of raw records.
pub struct BatchFetcher {
    source: Arc<dyn RecordSource>,
    retry: RetryPolicy,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn RecordSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch the inclusive window `[start, end]` verbatim, without filtering.
    ///
    /// The provider's "no data" code yields an empty page. Transient failures
    /// are retried per the policy and then reported as
    /// [`IngestError::Window`]; a malformed envelope is reported at once.
    /// Firing `cancel` abandons the window with [`IngestError::Cancelled`].
    #[instrument(skip_all, fields(window = %range))]
    pub async fn fetch_page(
        &self,
        range: PageRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        let rows = with_retry(&self.retry, range, cancel, || async move {
            let envelope = self.source.fetch_window(range).await?;
            envelope.into_rows().map(|(_, rows)| rows)
        })
        .await
        .map_err(|gave_up| match gave_up {
            GaveUp::Failed(attempts, cause) => IngestError::Window {
                range,
                attempts,
                cause,
            },
            GaveUp::Cancelled => IngestError::Cancelled,
        })?;

        debug!(count = rows.len(), "Fetched window");
        Ok(rows)
    }
}
