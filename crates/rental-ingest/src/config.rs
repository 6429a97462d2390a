//! Pipeline configuration.
//!
//! Secrets come from the environment; tunables may be overridden by a YAML
//! file whose fields are all optional.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::retry::RetryPolicy;
use crate::window::{PageRange, DEFAULT_PAGE_SIZE};

/// Environment variable holding the upstream open-data API key.
pub const SOURCE_API_KEY_ENV: &str = "SEOUL_LANDMARK_API";
/// Environment variable holding the geocoder REST API key.
pub const GEOCODER_API_KEY_ENV: &str = "REST_API";
pub const SOURCE_BASE_URL_ENV: &str = "RENTAL_API_BASE_URL";
pub const SOURCE_DATASET_ENV: &str = "RENTAL_DATASET";
pub const GEOCODER_URL_ENV: &str = "GEOCODER_URL";

const DEFAULT_BASE_URL: &str = "http://openapi.seoul.go.kr:8088";
const DEFAULT_DATASET: &str = "tbLnOpendataRentV";
const DEFAULT_GEOCODER_URL: &str = "https://dapi.kakao.com/v2/local/search/address.json";
const DEFAULT_AUTH_SCHEME: &str = "KakaoAK";

/// Upstream paginated source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: String,
    /// Dataset name; also the envelope key
    pub dataset: String,
    /// Per-request timeout for count and page fetches
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl SourceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            dataset: DEFAULT_DATASET.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// `{base_url}/{api_key}/json/{dataset}/{start}/{end}`
    pub fn window_url(&self, range: PageRange) -> String {
        format!(
            "{}/{}/json/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_key,
            self.dataset,
            range.start,
            range.end
        )
    }
}

/// Request pacing for the sequential collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    pub page_size: u64,
    /// Pause after a window that succeeded
    pub success_delay: Duration,
    /// Cooldown after a window that failed
    pub failure_delay: Duration,
    /// Window requested by the total-count probe
    pub probe_window: PageRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            success_delay: Duration::from_millis(200),
            failure_delay: Duration::from_secs(1),
            probe_window: PageRange::new(1, 1000),
        }
    }
}

impl PacingConfig {
    /// No sleeping between windows. Used by tests and dry runs.
    pub fn unpaced() -> Self {
        Self {
            success_delay: Duration::ZERO,
            failure_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Geocoding service.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Authorization scheme, sent as `<scheme> <api_key>`
    pub auth_scheme: String,
    pub request_timeout: Duration,
    /// Emit enrichment progress every N records
    pub progress_every: usize,
}

impl GeocoderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEOCODER_URL.to_string(),
            api_key: api_key.into(),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            request_timeout: Duration::from_secs(10),
            progress_every: 50,
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(required_env(GEOCODER_API_KEY_ENV)?);
        if let Ok(url) = std::env::var(GEOCODER_URL_ENV) {
            config.endpoint = url;
        }
        Ok(config)
    }

    pub fn authorization(&self) -> String {
        format!("{} {}", self.auth_scheme, self.api_key)
    }
}

/// Everything the collection pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub retry: RetryPolicy,
    pub pacing: PacingConfig,
}

impl PipelineConfig {
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source,
            retry: RetryPolicy::default(),
            pacing: PacingConfig::default(),
        }
    }

    /// Build from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let mut source = SourceConfig::new(required_env(SOURCE_API_KEY_ENV)?);
        if let Ok(url) = std::env::var(SOURCE_BASE_URL_ENV) {
            source.base_url = url;
        }
        if let Ok(dataset) = std::env::var(SOURCE_DATASET_ENV) {
            source.dataset = dataset;
        }
        Ok(Self::new(source))
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.api_key.trim().is_empty() {
            return Err(IngestError::InvalidConfig(format!(
                "{} is empty",
                SOURCE_API_KEY_ENV
            )));
        }
        if self.source.dataset.trim().is_empty() {
            return Err(IngestError::InvalidConfig("dataset name is empty".into()));
        }
        if self.pacing.page_size == 0 {
            return Err(IngestError::InvalidConfig("page_size must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(IngestError::InvalidConfig(
                "max_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(IngestError::InvalidConfig(format!(
            "environment variable {} is not set",
            name
        ))),
    }
}

/// Optional overrides loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub source: SourceOverrides,
    #[serde(default)]
    pub retry: RetryOverrides,
    #[serde(default)]
    pub pacing: PacingOverrides,
    #[serde(default)]
    pub geocoder: GeocoderOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOverrides {
    pub base_url: Option<String>,
    pub dataset: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingOverrides {
    pub page_size: Option<u64>,
    pub success_delay_ms: Option<u64>,
    pub failure_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeocoderOverrides {
    pub endpoint: Option<String>,
    pub auth_scheme: Option<String>,
    pub timeout_secs: Option<u64>,
    pub progress_every: Option<usize>,
}

impl ConfigFile {
    /// Load overrides from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file = Self::parse(&content).map_err(|e| match e {
            IngestError::InvalidConfig(msg) => {
                IngestError::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "Loaded config overrides");
        Ok(file)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| IngestError::InvalidConfig(e.to_string()))
    }

    pub fn apply_to_pipeline(&self, config: &mut PipelineConfig) {
        if let Some(url) = &self.source.base_url {
            config.source.base_url = url.clone();
        }
        if let Some(dataset) = &self.source.dataset {
            config.source.dataset = dataset.clone();
        }
        if let Some(secs) = self.source.request_timeout_secs {
            config.source.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.retry.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = self.retry.base_delay_ms {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry.max_delay_ms {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(size) = self.pacing.page_size {
            config.pacing.page_size = size;
        }
        if let Some(ms) = self.pacing.success_delay_ms {
            config.pacing.success_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.pacing.failure_delay_ms {
            config.pacing.failure_delay = Duration::from_millis(ms);
        }
    }

    pub fn apply_to_geocoder(&self, config: &mut GeocoderConfig) {
        if let Some(endpoint) = &self.geocoder.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(scheme) = &self.geocoder.auth_scheme {
            config.auth_scheme = scheme.clone();
        }
        if let Some(secs) = self.geocoder.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(every) = self.geocoder.progress_every {
            config.progress_every = every;
        }
    }
}
