use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::bitmap::Bitmap;
use crate::error::DecodeError;

/// Content dimension of a chunk, selecting how entries are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Dimension {
    /// Frame images, decoded into RGBA bitmaps.
    #[serde(rename = "2d")]
    #[value(name = "2d")]
    TwoD,
    /// Point clouds and other binary frames, passed through as bytes.
    #[serde(rename = "3d")]
    #[value(name = "3d")]
    ThreeD,
}

/// One chunk to decode.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    /// Index given to the first entry visited.
    pub start_index: u64,
    /// Inclusive upper bound; entries numbered past it are dropped.
    pub end_index: u64,
    /// The compressed chunk. Shared, never modified.
    pub archive: Bytes,
    pub dimension: Dimension,
}

impl ChunkRequest {
    pub fn new(
        archive: impl Into<Bytes>,
        start_index: u64,
        end_index: u64,
        dimension: Dimension,
    ) -> Self {
        Self {
            start_index,
            end_index,
            archive: archive.into(),
            dimension,
        }
    }
}

/// Decoded content of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bitmap(Bitmap),
    Blob(Bytes),
}

impl Payload {
    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            Payload::Bitmap(bitmap) => Some(bitmap),
            Payload::Blob(_) => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            Payload::Blob(blob) => Some(blob),
            Payload::Bitmap(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    /// Path of the entry inside the archive.
    pub name: String,
    pub index: u64,
    pub payload: Payload,
}

/// An entry that could not be decoded. The rest of the chunk is unaffected.
#[derive(Debug, thiserror::Error)]
#[error("entry {index} ({name}): {error}")]
pub struct EntryFailure {
    pub name: String,
    pub index: u64,
    pub error: DecodeError,
}

/// The whole request failed; no entries were emitted.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DecodeFailure {
    pub error: DecodeError,
}

/// Tally sent as the last event of a request that opened successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Entries that were assigned an index.
    pub visited: u64,
    pub decoded: u64,
    pub failed: u64,
    /// Entries numbered past `end_index`, or left over once the index
    /// range ran out.
    pub skipped: u64,
    /// Scheduling stopped early because the request was aborted.
    pub cancelled: bool,
}

/// Events delivered for a request, in completion order.
///
/// A request produces either a single `Failed`, or any number of
/// `Entry`/`EntryFailed` events followed by exactly one `Finished`.
#[derive(Debug)]
pub enum DecodeEvent {
    Entry(DecodedEntry),
    EntryFailed(EntryFailure),
    Failed(DecodeFailure),
    Finished(ChunkSummary),
}

/// A fully collected chunk, entries and failures sorted by index.
#[derive(Debug)]
pub struct DecodedChunk {
    pub entries: Vec<DecodedEntry>,
    pub failures: Vec<EntryFailure>,
    pub summary: ChunkSummary,
}
