use bytes::Bytes;
use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::io::ReadAt;
use anyhow::Result;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Limits applied while inflating a single entry.
#[derive(Debug, Clone, Copy)]
pub struct InflateLimits {
    /// Largest decompressed size accepted, in bytes.
    pub max_bytes: u64,
    pub verify_crc: bool,
}

/// ZIP entry reader
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in Central Directory order
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Read an entry's still-compressed data
    pub async fn read_compressed(&self, entry: &ZipFileEntry) -> Result<Bytes, DecodeError> {
        self.read_raw(entry).await.map_err(DecodeError::EntryRead)
    }

    async fn read_raw(&self, entry: &ZipFileEntry) -> Result<Bytes> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        self.parser
            .check_region(data_offset, entry.compressed_size)?;

        let mut buf = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_at(data_offset, &mut buf).await?;

        Ok(Bytes::from(buf))
    }
}

/// Decompress an entry's data read by [`ZipExtractor::read_compressed`].
///
/// Blocking: callers on an async runtime should run this off the reactor.
/// STORED data is returned without copying.
pub fn inflate(
    entry: &ZipFileEntry,
    data: Bytes,
    limits: InflateLimits,
) -> Result<Bytes, DecodeError> {
    if entry.is_encrypted() {
        return Err(DecodeError::Encrypted);
    }
    if entry.uncompressed_size > limits.max_bytes {
        return Err(DecodeError::EntryTooLarge {
            size: entry.uncompressed_size,
            limit: limits.max_bytes,
        });
    }

    let out = match entry.compression_method {
        CompressionMethod::Stored => data,
        CompressionMethod::Deflate => {
            let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
            // One byte of headroom so an over-long stream is detected, not truncated.
            DeflateDecoder::new(&data[..])
                .take(limits.max_bytes + 1)
                .read_to_end(&mut out)?;
            if out.len() as u64 > limits.max_bytes {
                return Err(DecodeError::EntryTooLarge {
                    size: out.len() as u64,
                    limit: limits.max_bytes,
                });
            }
            Bytes::from(out)
        }
        CompressionMethod::Unknown(method) => {
            return Err(DecodeError::UnsupportedCompression(method));
        }
    };

    if out.len() as u64 != entry.uncompressed_size {
        return Err(DecodeError::SizeMismatch {
            expected: entry.uncompressed_size,
            actual: out.len() as u64,
        });
    }

    if limits.verify_crc {
        let mut crc = Crc::new();
        crc.update(&out);
        if crc.sum() != entry.crc32 {
            return Err(DecodeError::CrcMismatch {
                expected: entry.crc32,
                actual: crc.sum(),
            });
        }
    }

    Ok(out)
}
