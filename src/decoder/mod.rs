//! Chunk decoding.
//!
//! A [`ChunkRequest`] names a ZIP chunk, the index of its first frame, the
//! last index wanted, and whether frames are 2D images or 3D blobs.
//! [`ChunkDecoder`] numbers the entries in directory order, drops those
//! past the last index, and decodes the rest concurrently, streaming a
//! [`DecodeEvent`] per entry as soon as it is ready. Completion order is
//! not index order; [`Resequencer`] restores it on the receiving side.

mod bitmap;
mod chunk;
mod reorder;
mod types;
mod worker;

pub use bitmap::{Bitmap, ImageFormat};
pub use chunk::{AbortHandle, ChunkDecoder, ChunkStream};
pub use reorder::Resequencer;
pub use types::*;
pub use worker::{DecodeWorker, WorkerHandle};
