//! # chunkzip
//!
//! Decode ZIP-compressed frame chunks off the calling task.
//!
//! An annotation client receives video and image frames from its server in
//! *chunks*: ZIP archives holding a run of consecutive frames. This crate
//! opens such a chunk, numbers its entries from a caller-supplied start
//! index, drops entries past a caller-supplied end index, and decodes the
//! rest concurrently, into RGBA bitmaps for 2D tasks or raw blobs for 3D
//! tasks. Results stream back as they complete.
//!
//! ## Features
//!
//! - Central Directory parsing with ZIP64 support
//! - STORED and DEFLATE entries, with size limits and CRC-32 checks
//! - PNG frames out of the box, JPEG and WebP behind the `jpeg` and `webp` features
//! - Per-entry failures reported without failing the chunk
//! - Cancellation, and a caller-side resequencer for index order
//!
//! ## Example
//!
//! ```no_run
//! use chunkzip::{ChunkDecoder, ChunkRequest, DecoderConfig, Dimension};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = tokio::fs::read("chunk_0.zip").await?;
//!     let decoder = ChunkDecoder::new(DecoderConfig::default());
//!
//!     let chunk = decoder
//!         .decode(ChunkRequest::new(archive, 0, 35, Dimension::TwoD))
//!         .collect()
//!         .await?;
//!     for entry in &chunk.entries {
//!         println!("{} {}", entry.index, entry.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use config::{Config, DecoderConfig, HttpConfig};
pub use decoder::{
    AbortHandle, Bitmap, ChunkDecoder, ChunkRequest, ChunkStream, ChunkSummary, DecodeEvent,
    DecodeFailure, DecodeWorker, DecodedChunk, DecodedEntry, Dimension, EntryFailure, Payload,
    Resequencer, WorkerHandle,
};
pub use error::DecodeError;
pub use io::{HttpChunkFetcher, MemoryReader, ReadAt};
pub use zip::{ZipExtractor, ZipFileEntry};
