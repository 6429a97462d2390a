//! Rental contract ingestion library.
//!
//! Pulls a paginated open-data dataset that only supports offset/limit
//! paging, narrows it client-side by district codes, and enriches each
//! record with coordinates from an address geocoder.
//!
//! # Architecture
//!
//! - [`CountProbe`] asks the unfiltered endpoint for the total record count
//! - [`BatchFetcher`] retrieves one window with bounded exponential backoff
//! - [`RecordFilter`] applies the district predicates to each page
//! - [`SequentialCollector`] walks every window once, paced, reporting progress
//! - [`Pipeline`] combines the above into one call
//! - [`Enricher`] geocodes the collected records one at a time
//!
//! All network calls are issued strictly one after another. The upstream has
//! an undocumented rate limit, so there is no parallel fan-out.

pub mod address;
pub mod collector;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod geocode;
pub mod mock;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod retry;
pub mod source;
pub mod window;

// Re-exports
pub use address::lot_address;
pub use collector::{Collection, SequentialCollector, WindowFailure};
pub use config::{ConfigFile, GeocoderConfig, PacingConfig, PipelineConfig, SourceConfig};
pub use envelope::PageEnvelope;
pub use error::{GeocodeError, IngestError, Result, TransportError};
pub use fetch::{BatchFetcher, CountProbe};
pub use filter::{apply_filter, RecordFilter};
pub use geocode::{AddressGeocoder, Coordinate, EnrichedRecord, Enricher, Geocoder};
pub use pipeline::Pipeline;
pub use progress::{
    EnrichmentProgress, NoProgress, ProgressEvent, ProgressLog, ProgressSink, TracingProgress,
};
pub use record::{normalize_numeric, Record};
pub use retry::RetryPolicy;
pub use source::{OpenApiSource, RecordSource};
pub use tokio_util::sync::CancellationToken;
pub use window::{windows, PageRange};
