use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

use super::ReadAt;

/// In-memory archive reader backed by a shared, immutable buffer.
///
/// Cloning the underlying [`Bytes`] is a reference-count bump, so the
/// caller's chunk is never copied or mutated while entries are read.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Bytes,
}

impl MemoryReader {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    fn bounds(&self, offset: u64, len: u64) -> Result<(usize, usize)> {
        let end = offset.checked_add(len);
        match end {
            Some(end) if end <= self.data.len() as u64 => Ok((offset as usize, end as usize)),
            _ => bail!(
                "Read of {} bytes at offset {} is past the end of the archive ({} bytes)",
                len,
                offset,
                self.data.len()
            ),
        }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let (start, end) = self.bounds(offset, buf.len() as u64)?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_within_bounds() {
        let reader = MemoryReader::new(Bytes::from_static(b"0123456789"));
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(3, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"3456");
        assert_eq!(reader.size(), 10);
    }

    #[tokio::test]
    async fn read_past_end_is_an_error() {
        let reader = MemoryReader::new(Bytes::from_static(b"0123"));
        let mut buf = [0u8; 4];
        assert!(reader.read_at(1, &mut buf).await.is_err());
        assert!(reader.read_at(u64::MAX, &mut buf).await.is_err());
    }

    #[tokio::test]
    async fn empty_read_at_end_succeeds() {
        let reader = MemoryReader::new(Bytes::from_static(b"abcdef"));
        assert_eq!(reader.read_at(6, &mut []).await.unwrap(), 0);
    }
}
