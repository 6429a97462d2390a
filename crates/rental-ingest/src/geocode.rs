//! Address geocoding and record enrichment.
//!
//! Enrichment is strictly sequential, one lookup per record, and a failed
//! lookup only blanks that record's coordinate.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::GeocoderConfig;
use crate::error::{GeocodeError, IngestError, Result, TransportError};
use crate::progress::{EnrichmentProgress, ProgressSink};
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Resolves one free-text address per call.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> std::result::Result<Coordinate, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct AddressSearchResponse {
    #[serde(default)]
    documents: Vec<AddressDocument>,
}

/// `x` is longitude and `y` latitude, both string-encoded.
#[derive(Debug, Deserialize)]
struct AddressDocument {
    x: String,
    y: String,
}

impl AddressSearchResponse {
    fn first_coordinate(self) -> std::result::Result<Coordinate, GeocodeError> {
        let doc = self.documents.into_iter().next().ok_or(GeocodeError::NoMatch)?;
        let longitude = parse_axis(&doc.x)?;
        let latitude = parse_axis(&doc.y)?;
        Ok(Coordinate::new(latitude, longitude))
    }
}

fn parse_axis(value: &str) -> std::result::Result<f64, GeocodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::InvalidCoordinate(value.to_string()))
}

/// HTTP client for the address-search geocoding API.
pub struct AddressGeocoder {
    client: Client,
    config: GeocoderConfig,
}

impl AddressGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IngestError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Geocoder for AddressGeocoder {
    async fn geocode(&self, address: &str) -> std::result::Result<Coordinate, GeocodeError> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .header(header::AUTHORIZATION, self.config.authorization())
            .query(&[("query", address)])
            .send()
            .await
            .map_err(TransportError::from)?;

        if response.status() != StatusCode::OK {
            return Err(TransportError::Status(response.status().as_u16()).into());
        }

        let body: AddressSearchResponse = response.json().await.map_err(TransportError::from)?;
        body.first_coordinate()
    }
}

/// A record with its resolved coordinate, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: Record,
    pub coordinate: Option<Coordinate>,
}

impl EnrichedRecord {
    pub fn latitude(&self) -> Option<f64> {
        self.coordinate.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinate.map(|c| c.longitude)
    }
}

/// Serialises as the record's own fields plus `latitude` and `longitude`.
impl Serialize for EnrichedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.record.fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 2))?;
        for (key, value) in fields {
            if key != "latitude" && key != "longitude" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("latitude", &self.latitude())?;
        map.serialize_entry("longitude", &self.longitude())?;
        map.end()
    }
}

/// Attaches coordinates to records.
pub struct Enricher {
    geocoder: Arc<dyn Geocoder>,
    progress_every: usize,
}

impl Enricher {
    pub fn new(geocoder: Arc<dyn Geocoder>, progress_every: usize) -> Self {
        Self {
            geocoder,
            progress_every,
        }
    }

    /// Geocode every record in order.
    ///
    /// `address_of` builds the lookup text; a record without one keeps an
    /// absent coordinate and costs no request. Progress is reported after
    /// every `progress_every`-th record. Only cancellation aborts the batch.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn enrich<F>(
        &self,
        records: Vec<Record>,
        address_of: F,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedRecord>>
    where
        F: Fn(&Record) -> Option<String>,
    {
        let total = records.len();
        let mut enriched = Vec::with_capacity(total);
        let mut resolved = 0usize;

        for (index, record) in records.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = index, total = total, "Enrichment cancelled");
                return Err(IngestError::Cancelled);
            }

            let coordinate = match address_of(&record) {
                Some(address) => match self.geocoder.geocode(&address).await {
                    Ok(coordinate) => Some(coordinate),
                    Err(e) => {
                        debug!(index = index, address = %address, error = %e, "Geocoding failed");
                        None
                    }
                },
                None => None,
            };
            resolved += usize::from(coordinate.is_some());
            enriched.push(EnrichedRecord { record, coordinate });

            let processed = index + 1;
            if self.progress_every > 0 && processed % self.progress_every == 0 {
                progress.on_enrichment(EnrichmentProgress { processed, total });
            }
        }

        info!(
            total = total,
            resolved = resolved,
            unresolved = total - resolved,
            "Enrichment complete"
        );
        Ok(enriched)
    }
}
