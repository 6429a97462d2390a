//! In-memory stand-ins for the upstream source and the geocoder.
//!
//! Scripted replies let tests force transport failures, envelope codes and
//! geocoding misses without any network access.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::envelope::PageEnvelope;
use crate::error::{GeocodeError, TransportError};
use crate::geocode::{Coordinate, Geocoder};
use crate::record::Record;
use crate::source::RecordSource;
use crate::window::PageRange;

/// One scripted reply from [`ScriptedSource`].
#[derive(Debug, Clone)]
pub enum SourceReply {
    Envelope(PageEnvelope),
    Error(TransportError),
}

impl SourceReply {
    pub fn rows(rows: Vec<Record>) -> Self {
        let total_count = Some(rows.len() as u64);
        SourceReply::Envelope(PageEnvelope::Rows { total_count, rows })
    }

    pub fn envelope(envelope: PageEnvelope) -> Self {
        SourceReply::Envelope(envelope)
    }

    pub fn error(error: TransportError) -> Self {
        SourceReply::Error(error)
    }
}

/// Replays queued replies in order, one per call.
///
/// Once the queue is empty every call fails with a connection error.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    replies: Mutex<VecDeque<SourceReply>>,
    calls: Mutex<Vec<PageRange>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: SourceReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Windows requested so far, in order.
    pub fn calls(&self) -> Vec<PageRange> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_window(&self, range: PageRange) -> Result<PageEnvelope, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(range);
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match reply {
            Some(SourceReply::Envelope(envelope)) => Ok(envelope),
            Some(SourceReply::Error(error)) => Err(error),
            None => Err(TransportError::Connection("script exhausted".into())),
        }
    }
}

/// Serves slices of a fixed dataset by offset, like the real endpoint.
///
/// Windows registered with [`DatasetSource::fail_window`] always fail with
/// HTTP 500.
#[derive(Debug, Default)]
pub struct DatasetSource {
    rows: Vec<Record>,
    failing: HashSet<PageRange>,
    calls: Mutex<Vec<PageRange>>,
}

impl DatasetSource {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn fail_window(mut self, range: PageRange) -> Self {
        self.failing.insert(range);
        self
    }

    pub fn calls(&self) -> Vec<PageRange> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RecordSource for DatasetSource {
    async fn fetch_window(&self, range: PageRange) -> Result<PageEnvelope, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(range);
        }
        if self.failing.contains(&range) {
            return Err(TransportError::Status(500));
        }

        let total = self.rows.len() as u64;
        if range.start == 0 || range.start > total {
            return Ok(PageEnvelope::NoData);
        }
        let start = (range.start - 1) as usize;
        let end = range.end.min(total) as usize;
        Ok(PageEnvelope::Rows {
            total_count: Some(total),
            rows: self.rows[start..end].to_vec(),
        })
    }
}

/// Resolves addresses from a fixed table; unknown addresses have no match.
#[derive(Debug, Default)]
pub struct MockGeocoder {
    known: HashMap<String, Coordinate>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: impl Into<String>, coordinate: Coordinate) -> Self {
        self.known.insert(address.into(), coordinate);
        self
    }

    /// Make lookups of `address` fail at the transport level.
    pub fn failing(mut self, address: impl Into<String>) -> Self {
        self.failing.insert(address.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(address.to_string());
        }
        if self.failing.contains(address) {
            return Err(GeocodeError::Transport(TransportError::Status(500)));
        }
        self.known
            .get(address)
            .copied()
            .ok_or(GeocodeError::NoMatch)
    }
}
