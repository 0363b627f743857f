//! Media buffer and per-buffer metadata.
//!
//! Headwater sits above the decode layer, so a buffer here is just an opaque
//! payload plus the metadata the orchestration layer cares about: a sequence
//! number for ordering and an optional presentation timestamp. The
//! application-fed source queues these (with byte accounting for its
//! high-water mark) and the network source's data path reports their arrival
//! to the stream watchdog.

use bytes::Bytes;
use std::time::Duration;

/// Per-buffer metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Monotonic sequence number assigned by the producer.
    pub sequence: u64,
    /// Presentation timestamp, if known.
    pub pts: Option<Duration>,
}

impl Metadata {
    /// Create metadata with just a sequence number.
    pub fn from_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            pts: None,
        }
    }

    /// Create metadata with a sequence number and presentation timestamp.
    pub fn with_pts(sequence: u64, pts: Duration) -> Self {
        Self {
            sequence,
            pts: Some(pts),
        }
    }
}

/// A media buffer flowing through the graph boundary.
#[derive(Debug, Clone)]
pub struct Buffer {
    payload: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a buffer from a payload and metadata.
    pub fn new(payload: impl Into<Bytes>, metadata: Metadata) -> Self {
        Self {
            payload: payload.into(),
            metadata,
        }
    }

    /// Create a buffer from raw bytes with default metadata.
    pub fn from_bytes(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, Metadata::default())
    }

    /// The payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The buffer's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The producer-assigned sequence number.
    pub fn sequence(&self) -> u64 {
        self.metadata.sequence
    }
}
