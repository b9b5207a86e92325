//! Background decode queue.
//!
//! - Bounded worker pool (1-4 threads) calling into the shared `ResizeCache`
//! - Requests and results are tagged with a rebuild generation
//! - Bumping the generation cancels queued work and hides late results, so only
//!   the most recent rebuild's results are ever applied
//! - Uses flume for communication between workers and the owning thread

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use super::cache::ResizeCache;
use super::RasterImage;
use crate::config::MAX_DECODE_WORKERS;
use crate::error::DecodeError;

/// Maximum number of pending requests in the queue. Submissions past this are refused.
pub const MAX_QUEUE_SIZE: usize = 256;

/// How often idle workers check for shutdown.
const WORKER_POLL: Duration = Duration::from_millis(100);

/// A request to decode one strip slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub generation: u64,
    /// Slot index in the active media list.
    pub index: usize,
    pub path: PathBuf,
    pub width: u32,
}

/// Result sent back to the owning thread.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    pub generation: u64,
    pub index: usize,
    pub path: PathBuf,
    pub width: u32,
    pub outcome: Result<RasterImage, DecodeError>,
}

/// Worker pool that warms the resize cache.
pub struct DecodeQueue {
    request_tx: Option<Sender<DecodeRequest>>,
    result_rx: Receiver<DecodeResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    active_workers: Arc<AtomicUsize>,
    cache: Arc<ResizeCache>,
}

impl DecodeQueue {
    /// Start `workers` threads (clamped to 1..=4) decoding into `cache`.
    pub fn new(cache: Arc<ResizeCache>, workers: usize) -> Self {
        let num_workers = workers.clamp(1, MAX_DECODE_WORKERS);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let generation = Arc::new(AtomicU64::new(0));
        let active_workers = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let ctx = WorkerContext {
                worker_id,
                rx: request_rx.clone(),
                tx: result_tx.clone(),
                shutdown: Arc::clone(&shutdown),
                generation: Arc::clone(&generation),
                active: Arc::clone(&active_workers),
                cache: Arc::clone(&cache),
            };

            match thread::Builder::new()
                .name(format!("decode-worker-{}", worker_id))
                .spawn(move || worker_loop(ctx))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => error!(worker_id, error = %e, "Failed to spawn decode worker"),
            }
        }

        debug!(workers = handles.len(), "Started decode queue");

        Self {
            request_tx: Some(request_tx),
            result_rx,
            workers: handles,
            shutdown,
            generation,
            active_workers,
            cache,
        }
    }

    /// Start a new generation, superseding all queued and in-flight work.
    pub fn begin_generation(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation = next, "Began decode generation");
        next
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Submit a request. Returns false if it is stale, the queue is full, or
    /// the queue has shut down.
    pub fn submit(&self, req: DecodeRequest) -> bool {
        if req.generation != self.current_generation() {
            trace!(generation = req.generation, "Refusing superseded request");
            return false;
        }

        let Some(tx) = self.request_tx.as_ref() else {
            return false;
        };

        match tx.try_send(req) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(req)) => {
                warn!(path = ?req.path, "Decode queue full, dropping request");
                false
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                error!("Decode queue disconnected");
                false
            }
        }
    }

    /// Submit several requests; returns how many were accepted. Requests that
    /// do not fit in the queue are dropped, not retried.
    pub fn submit_batch(&self, requests: impl IntoIterator<Item = DecodeRequest>) -> usize {
        requests.into_iter().filter(|r| self.submit(r.clone())).count()
    }

    /// Drain finished results (non-blocking), discarding superseded ones.
    pub fn poll_results(&self) -> Vec<DecodeResult> {
        let current = self.current_generation();
        self.result_rx
            .try_iter()
            .filter(|r| is_current(r, current))
            .collect()
    }

    /// Wait up to `timeout` for the next current-generation result.
    pub fn next_result(&self, timeout: Duration) -> Option<DecodeResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let result = self.result_rx.recv_deadline(deadline).ok()?;
            if is_current(&result, self.current_generation()) {
                return Some(result);
            }
        }
    }

    pub fn cache(&self) -> &Arc<ResizeCache> {
        &self.cache
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn pending_count(&self) -> usize {
        self.request_tx.as_ref().map_or(0, |tx| tx.len())
    }

    /// Whether workers are decoding or requests are waiting.
    pub fn is_busy(&self) -> bool {
        self.pending_count() > 0 || self.active_workers.load(Ordering::Relaxed) > 0
    }

    /// Stop the workers and wait for them to exit.
    pub fn shutdown(&mut self) {
        debug!("Shutting down decode queue");
        self.shutdown.store(true, Ordering::SeqCst);
        // Closing the channel wakes idle workers immediately.
        self.request_tx = None;

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Decode queue shutdown complete");
    }
}

impl Drop for DecodeQueue {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn is_current(result: &DecodeResult, current: u64) -> bool {
    if result.generation == current {
        true
    } else {
        trace!(
            generation = result.generation,
            current,
            index = result.index,
            "Discarding stale decode result"
        );
        false
    }
}

struct WorkerContext {
    worker_id: usize,
    rx: Receiver<DecodeRequest>,
    tx: Sender<DecodeResult>,
    shutdown: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    active: Arc<AtomicUsize>,
    cache: Arc<ResizeCache>,
}

fn worker_loop(ctx: WorkerContext) {
    debug!(worker_id = ctx.worker_id, "Decode worker started");

    loop {
        if ctx.shutdown.load(Ordering::Relaxed) {
            break;
        }

        let req = match ctx.rx.recv_timeout(WORKER_POLL) {
            Ok(req) => req,
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        };

        if req.generation != ctx.generation.load(Ordering::SeqCst) {
            trace!(index = req.index, "Skipping superseded request");
            continue;
        }

        ctx.active.fetch_add(1, Ordering::Relaxed);
        let outcome = ctx.cache.get_or_compute(&req.path, req.width);
        ctx.active.fetch_sub(1, Ordering::Relaxed);

        let result = DecodeResult {
            generation: req.generation,
            index: req.index,
            path: req.path,
            width: req.width,
            outcome,
        };

        if let Err(e) = ctx.tx.send(result) {
            warn!(worker_id = ctx.worker_id, error = ?e, "Failed to send decode result");
        }
    }

    debug!(worker_id = ctx.worker_id, "Decode worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::cache::tests::CountingDecoder;
    use crate::raster::Decoder;
    use std::path::Path;

    fn queue_with(decoder: &Arc<CountingDecoder>, workers: usize) -> DecodeQueue {
        let decoder: Arc<dyn Decoder> = decoder.clone();
        DecodeQueue::new(Arc::new(ResizeCache::unbounded(decoder)), workers)
    }

    fn request(generation: u64, index: usize, name: &str, width: u32) -> DecodeRequest {
        DecodeRequest {
            generation,
            index,
            path: PathBuf::from(format!("/strip/{}", name)),
            width,
        }
    }

    #[test]
    fn test_worker_count_clamped() {
        let decoder = Arc::new(CountingDecoder::default());
        assert_eq!(queue_with(&decoder, 0).worker_count(), 1);
        assert_eq!(queue_with(&decoder, 32).worker_count(), MAX_DECODE_WORKERS);
    }

    #[test]
    fn test_results_warm_the_cache() {
        let decoder = Arc::new(CountingDecoder::default());
        let queue = queue_with(&decoder, 2);
        let generation = queue.begin_generation();

        let accepted = queue.submit_batch((0..3).map(|i| request(generation, i, &format!("{}.png", i), 300)));
        assert_eq!(accepted, 3);

        let mut indices = Vec::new();
        for _ in 0..3 {
            let result = queue.next_result(Duration::from_secs(5)).unwrap();
            assert!(result.outcome.is_ok());
            indices.push(result.index);
        }
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(queue.cache().contains(Path::new("/strip/1.png"), 300));
    }

    #[test]
    fn test_stale_submission_rejected() {
        let decoder = Arc::new(CountingDecoder::default());
        let queue = queue_with(&decoder, 1);
        let old = queue.begin_generation();
        queue.begin_generation();

        assert!(!queue.submit(request(old, 0, "a.png", 100)));
    }

    #[test]
    fn test_superseded_generation_is_dropped() {
        let decoder = Arc::new(CountingDecoder::with_delay(Duration::from_millis(30)));
        let queue = queue_with(&decoder, 1);

        let first = queue.begin_generation();
        queue.submit_batch((0..5).map(|i| request(first, i, &format!("old{}.png", i), 300)));

        let second = queue.begin_generation();
        queue.submit_batch((0..2).map(|i| request(second, i, &format!("new{}.png", i), 360)));

        let mut received = Vec::new();
        while received.len() < 2 {
            let result = queue.next_result(Duration::from_secs(5)).unwrap();
            received.push(result);
        }

        assert!(received.iter().all(|r| r.generation == second));
        // At most the one request already picked up before the bump ran.
        assert!(decoder.calls.load(Ordering::SeqCst) <= 3);
        assert!(queue.poll_results().iter().all(|r| r.generation == second));
    }

    #[test]
    fn test_submit_batch_stops_at_capacity() {
        let decoder = Arc::new(CountingDecoder::with_delay(Duration::from_millis(50)));
        let queue = queue_with(&decoder, 1);
        let generation = queue.begin_generation();

        let total = MAX_QUEUE_SIZE + 40;
        let accepted = queue
            .submit_batch((0..total).map(|i| request(generation, i, &format!("{}.png", i), 100)));

        // The one worker can take a single request off the channel while decoding.
        assert!(accepted <= MAX_QUEUE_SIZE + 1);
        assert!(accepted < total);
    }

    #[test]
    fn test_failures_are_reported() {
        let decoder = Arc::new(CountingDecoder::default());
        decoder.fail(Path::new("/strip/bad.png"));
        let queue = queue_with(&decoder, 1);
        let generation = queue.begin_generation();

        assert!(queue.submit(request(generation, 4, "bad.png", 300)));
        let result = queue.next_result(Duration::from_secs(5)).unwrap();
        assert_eq!(result.index, 4);
        assert!(result.outcome.is_err());
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let decoder = Arc::new(CountingDecoder::default());
        let mut queue = queue_with(&decoder, 2);
        let generation = queue.begin_generation();
        queue.shutdown();

        assert_eq!(queue.worker_count(), 0);
        assert!(!queue.submit(request(generation, 0, "a.png", 100)));
    }
}
