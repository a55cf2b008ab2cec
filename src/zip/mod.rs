//! ZIP container parsing and entry inflation.
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 records, entry metadata)
//! - [`parser`]: locating and reading the Central Directory
//! - [`extractor`]: reading entry data and inflating it
//!
//! The Central Directory is read from the archive's tail, so listing a
//! chunk never touches entry data. Entries come back in directory order,
//! which is the order frames are numbered in.
//!
//! Supported: STORED and DEFLATE entries, ZIP64 sizes and offsets.
//! Not supported: encryption, multi-disk archives, other methods.

mod extractor;
mod parser;
mod structures;

pub use extractor::{InflateLimits, ZipExtractor, inflate};
pub use parser::ZipParser;
pub use structures::*;
