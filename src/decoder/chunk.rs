use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::Instrument;

use super::bitmap::Bitmap;
use super::types::*;
use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::io::MemoryReader;
use crate::zip::{InflateLimits, ZipExtractor, ZipFileEntry, inflate};

/// Cancels a request. Checked before each entry is scheduled; entries
/// already decoding run to completion.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Decodes chunks on the Tokio runtime.
///
/// Each call to [`decode`](Self::decode) spawns an independent task; the
/// decoder keeps no state between requests and can be cloned freely.
#[derive(Debug, Clone, Default)]
pub struct ChunkDecoder {
    config: Arc<DecoderConfig>,
}

impl ChunkDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Start decoding `request`. Must be called from within a Tokio runtime.
    pub fn decode(&self, request: ChunkRequest) -> ChunkStream {
        self.decode_with_abort(request, AbortHandle::new())
    }

    /// Start decoding `request`, stopping early once `abort` fires.
    pub fn decode_with_abort(&self, request: ChunkRequest, abort: AbortHandle) -> ChunkStream {
        let (events, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        self.dispatch(request, abort.clone(), events);
        ChunkStream::new(rx, abort)
    }

    pub(crate) fn dispatch(
        &self,
        request: ChunkRequest,
        abort: AbortHandle,
        events: mpsc::Sender<DecodeEvent>,
    ) {
        let span = tracing::debug_span!(
            "chunk",
            start = request.start_index,
            end = request.end_index,
            dimension = ?request.dimension
        );
        tokio::spawn(run_request(request, self.config.clone(), abort, events).instrument(span));
    }
}

/// Receiving side of one request.
///
/// Dropping the stream aborts the request.
#[derive(Debug)]
pub struct ChunkStream {
    rx: mpsc::Receiver<DecodeEvent>,
    abort: AbortHandle,
}

impl ChunkStream {
    pub(crate) fn new(rx: mpsc::Receiver<DecodeEvent>, abort: AbortHandle) -> Self {
        Self { rx, abort }
    }

    /// Next event, or `None` once the request is over.
    pub async fn next(&mut self) -> Option<DecodeEvent> {
        self.rx.recv().await
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Wait for the whole chunk.
    ///
    /// Entries and failures come back sorted by index. A request that could
    /// not open its archive yields the [`DecodeFailure`].
    pub async fn collect(mut self) -> Result<DecodedChunk, DecodeFailure> {
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        while let Some(event) = self.next().await {
            match event {
                DecodeEvent::Entry(entry) => entries.push(entry),
                DecodeEvent::EntryFailed(failure) => failures.push(failure),
                DecodeEvent::Failed(failure) => return Err(failure),
                DecodeEvent::Finished(summary) => {
                    entries.sort_by_key(|e| e.index);
                    failures.sort_by_key(|f: &EntryFailure| f.index);
                    return Ok(DecodedChunk {
                        entries,
                        failures,
                        summary,
                    });
                }
            }
        }

        Err(DecodeFailure {
            error: DecodeError::Interrupted,
        })
    }
}

impl Drop for ChunkStream {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

async fn run_request(
    request: ChunkRequest,
    config: Arc<DecoderConfig>,
    abort: AbortHandle,
    events: mpsc::Sender<DecodeEvent>,
) {
    let reader = Arc::new(MemoryReader::new(request.archive.clone()));
    let extractor = Arc::new(ZipExtractor::new(reader));

    let entries = match extractor.list_files().await {
        Ok(entries) => entries,
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::warn!(error = %reason, "cannot open chunk archive");
            let failure = DecodeFailure {
                error: DecodeError::ArchiveParse(e),
            };
            let _ = events.send(DecodeEvent::Failed(failure)).await;
            return;
        }
    };

    if request.start_index > request.end_index {
        tracing::warn!("start index is past end index, every entry will be skipped");
    }

    let limits = InflateLimits {
        max_bytes: config.max_entry_bytes,
        verify_crc: config.verify_crc,
    };
    let permits = Arc::new(Semaphore::new(config.parallelism()));
    let mut tasks = JoinSet::new();
    let mut summary = ChunkSummary::default();
    // None once the counter has run off the end of u64.
    let mut next_index = Some(request.start_index);

    for entry in entries.into_iter().filter(|e| !e.is_directory) {
        let Some(index) = next_index else {
            summary.skipped += 1;
            continue;
        };
        next_index = index.checked_add(1);
        summary.visited += 1;

        if index > request.end_index {
            tracing::trace!(index, name = %entry.file_name, "past end index, skipped");
            summary.skipped += 1;
            continue;
        }

        if abort.is_aborted() || events.is_closed() {
            summary.cancelled = true;
            break;
        }
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        // The wait for a permit may have outlived the caller's interest.
        if abort.is_aborted() || events.is_closed() {
            summary.cancelled = true;
            break;
        }

        tasks.spawn(
            decode_entry(
                extractor.clone(),
                entry,
                index,
                request.dimension,
                limits,
                events.clone(),
                permit,
            )
            .in_current_span(),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => summary.decoded += 1,
            Ok(false) => summary.failed += 1,
            Err(e) => {
                tracing::error!(error = %e, "entry task did not complete");
                summary.failed += 1;
            }
        }
    }

    tracing::debug!(
        visited = summary.visited,
        decoded = summary.decoded,
        failed = summary.failed,
        skipped = summary.skipped,
        cancelled = summary.cancelled,
        "chunk finished"
    );
    let _ = events.send(DecodeEvent::Finished(summary)).await;
}

/// Decode one entry and emit the result. Returns whether it decoded.
async fn decode_entry(
    extractor: Arc<ZipExtractor<MemoryReader>>,
    entry: ZipFileEntry,
    index: u64,
    dimension: Dimension,
    limits: InflateLimits,
    events: mpsc::Sender<DecodeEvent>,
    permit: OwnedSemaphorePermit,
) -> bool {
    let name = entry.file_name.clone();

    let result: Result<Payload, DecodeError> = async {
        let data = extractor.read_compressed(&entry).await?;
        tokio::task::spawn_blocking(move || {
            let raw = inflate(&entry, data, limits)?;
            match dimension {
                Dimension::TwoD => Bitmap::decode(&raw, limits.max_bytes).map(Payload::Bitmap),
                Dimension::ThreeD => Ok(Payload::Blob(raw)),
            }
        })
        .await?
    }
    .await;

    let (event, decoded) = match result {
        Ok(payload) => {
            tracing::trace!(index, name = %name, "entry decoded");
            let entry = DecodedEntry {
                name,
                index,
                payload,
            };
            (DecodeEvent::Entry(entry), true)
        }
        Err(error) => {
            tracing::warn!(index, name = %name, error = %error, "entry failed to decode");
            let failure = EntryFailure { name, index, error };
            (DecodeEvent::EntryFailed(failure), false)
        }
    };

    // The permit is held until the caller has room for the event, so a slow
    // consumer holds back scheduling instead of piling up decoded frames.
    let _ = events.send(event).await;
    drop(permit);
    decoded
}
