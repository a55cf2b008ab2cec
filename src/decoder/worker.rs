//! Long-lived decode worker.
//!
//! The worker owns a request queue and hands each request to a
//! [`ChunkDecoder`] as it arrives, so callers talk to it purely by message
//! passing. Requests run independently: their events may interleave, and
//! requests still decoding at shutdown are allowed to finish.

use anyhow::{Result, bail};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::chunk::{AbortHandle, ChunkDecoder, ChunkStream};
use super::types::{ChunkRequest, DecodeEvent};
use crate::config::DecoderConfig;

/// Queue depth for requests not yet picked up by the worker.
const REQUEST_QUEUE: usize = 32;

struct Job {
    request: ChunkRequest,
    abort: AbortHandle,
    events: mpsc::Sender<DecodeEvent>,
}

pub struct DecodeWorker {
    decoder: ChunkDecoder,
    jobs: mpsc::Receiver<Job>,
    shutdown: broadcast::Receiver<()>,
}

/// Sending side of a [`DecodeWorker`]. Cheap to clone.
#[derive(Clone)]
pub struct WorkerHandle {
    jobs: mpsc::Sender<Job>,
    shutdown: broadcast::Sender<()>,
    channel_capacity: usize,
}

impl DecodeWorker {
    /// Spawn a worker on the current runtime.
    pub fn spawn(config: DecoderConfig) -> (WorkerHandle, JoinHandle<()>) {
        let (jobs_tx, jobs) = mpsc::channel(REQUEST_QUEUE);
        let (shutdown_tx, shutdown) = broadcast::channel(1);

        let handle = WorkerHandle {
            jobs: jobs_tx,
            shutdown: shutdown_tx,
            channel_capacity: config.channel_capacity.max(1),
        };
        tracing::debug!(parallelism = config.parallelism(), "decode worker starting");
        let worker = Self {
            decoder: ChunkDecoder::new(config),
            jobs,
            shutdown,
        };

        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("decode worker shutting down");
                    return;
                }

                job = self.jobs.recv() => {
                    let Some(job) = job else {
                        tracing::info!("all worker handles dropped, decode worker exiting");
                        return;
                    };
                    if job.abort.is_aborted() || job.events.is_closed() {
                        tracing::debug!("request abandoned before it started");
                        continue;
                    }
                    self.decoder.dispatch(job.request, job.abort, job.events);
                }
            }
        }
    }
}

impl WorkerHandle {
    /// Queue a request, returning the stream its events arrive on.
    pub async fn submit(&self, request: ChunkRequest) -> Result<ChunkStream> {
        let abort = AbortHandle::new();
        let (events, rx) = mpsc::channel(self.channel_capacity);
        let job = Job {
            request,
            abort: abort.clone(),
            events,
        };

        if self.jobs.send(job).await.is_err() {
            bail!("decode worker has shut down");
        }
        Ok(ChunkStream::new(rx, abort))
    }

    /// Ask the worker to stop accepting requests.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}
