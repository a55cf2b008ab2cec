/// Errors reported across the decode boundary.
///
/// `ArchiveParse` is fatal to a request and arrives as a
/// [`DecodeFailure`](crate::decoder::DecodeFailure). Every other variant
/// concerns one entry and arrives as an
/// [`EntryFailure`](crate::decoder::EntryFailure) while the rest of the
/// chunk keeps decoding.
///
/// ```text
///   DecodeError
///   ├── ArchiveParse        ← bytes are not an openable ZIP archive
///   ├── EntryRead           ← entry data lies outside the archive
///   ├── Encrypted           ← entry has the encryption flag set
///   ├── UnsupportedCompression
///   ├── EntryTooLarge       ← declared or inflated size over the limit
///   ├── SizeMismatch        ← inflated size differs from the directory
///   ├── CrcMismatch
///   ├── UnsupportedImage    ← 2D entry is not a known image format
///   ├── Png / Image         ← image backend rejected the data
///   ├── Io                  ← inflate stream error
///   ├── TaskFailed          ← blocking decode task panicked
///   └── Interrupted         ← decoder stopped before finishing
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to open archive: {0:#}")]
    ArchiveParse(anyhow::Error),

    #[error("failed to read entry data: {0:#}")]
    EntryRead(anyhow::Error),

    #[error("entry is encrypted")]
    Encrypted,

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("entry expands to {size} bytes, limit is {limit}")]
    EntryTooLarge { size: u64, limit: u64 },

    #[error("entry size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("CRC-32 mismatch: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("unrecognized image format")]
    UnsupportedImage,

    #[error("PNG decode failed: {0}")]
    Png(#[from] png::DecodingError),

    #[error("image decode failed: {0}")]
    Image(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("decode task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("decoder stopped before finishing the chunk")]
    Interrupted,
}
