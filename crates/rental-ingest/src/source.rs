//! Upstream paginated data source.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::SourceConfig;
use crate::envelope::PageEnvelope;
use crate::error::{IngestError, Result, TransportError};
use crate::window::PageRange;

/// Anything that can serve one offset window of the unfiltered dataset.
///
/// Implementations perform exactly one request per call; retrying is the
/// caller's concern.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the inclusive window `range` and decode its envelope.
    async fn fetch_window(&self, range: PageRange) -> std::result::Result<PageEnvelope, TransportError>;
}

/// HTTP client for the open-data REST endpoint.
pub struct OpenApiSource {
    client: Client,
    config: SourceConfig,
}

impl OpenApiSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| IngestError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait]
impl RecordSource for OpenApiSource {
    #[instrument(skip_all, fields(dataset = %self.config.dataset, window = %range))]
    async fn fetch_window(&self, range: PageRange) -> std::result::Result<PageEnvelope, TransportError> {
        let url = self.config.window_url(range);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(TransportError::Timeout),
            Err(e) => return Ok(PageEnvelope::Malformed(format!("invalid JSON body: {}", e))),
        };

        let envelope = PageEnvelope::parse(&body, &self.config.dataset);
        debug!(envelope = envelope_kind(&envelope), "Received window");
        Ok(envelope)
    }
}

fn envelope_kind(envelope: &PageEnvelope) -> &'static str {
    match envelope {
        PageEnvelope::Rows { .. } => "rows",
        PageEnvelope::NoData => "no_data",
        PageEnvelope::ApiError { .. } => "api_error",
        PageEnvelope::Malformed(_) => "malformed",
    }
}
