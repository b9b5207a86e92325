//! Memoized decode-and-resize keyed by (source path, target width).
//!
//! - Insert-once, read-many: a cached image is never recomputed or mutated
//! - Failures are returned but never cached, so a retry can succeed
//! - Optional LRU bound; unbounded by default for the session
//! - At most one decode in flight per key; concurrent callers share its result

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use super::resize::{Decoder, MIN_WIDTH};
use super::RasterImage;
use crate::error::DecodeError;

/// Cache key for resized rasters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub width: u32,
}

impl CacheKey {
    /// Widths below the minimum are clamped before lookup.
    pub fn new(path: &Path, width: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            width: width.max(MIN_WIDTH),
        }
    }
}

/// Counters for cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls made into the decoder.
    pub decodes: u64,
    pub failures: u64,
    pub evictions: u64,
}

type DecodeOutcome = Result<RasterImage, DecodeError>;

/// A decode that one caller is running and others may wait on.
struct InFlight {
    outcome: Mutex<Option<DecodeOutcome>>,
    ready: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn wait(&self) -> DecodeOutcome {
        let mut outcome = self.outcome.lock();
        while outcome.is_none() {
            self.ready.wait(&mut outcome);
        }
        match outcome.as_ref() {
            Some(result) => result.clone(),
            None => unreachable!("loop exits only once an outcome is published"),
        }
    }

    fn publish(&self, result: DecodeOutcome) {
        *self.outcome.lock() = Some(result);
        self.ready.notify_all();
    }
}

struct Inner {
    entries: LruCache<CacheKey, RasterImage>,
    in_flight: HashMap<CacheKey, Arc<InFlight>>,
    stats: CacheStats,
}

enum Lookup {
    Hit(RasterImage),
    Wait(Arc<InFlight>),
    Compute(Arc<InFlight>),
}

/// Resize cache shared between the foreground renderer and background workers.
pub struct ResizeCache {
    decoder: Arc<dyn Decoder>,
    capacity: Option<NonZeroUsize>,
    inner: Mutex<Inner>,
}

impl ResizeCache {
    /// Create a cache. `capacity = None` keeps every entry for the process lifetime.
    pub fn new(decoder: Arc<dyn Decoder>, capacity: Option<NonZeroUsize>) -> Self {
        let entries = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        debug!(?capacity, "Initialized resize cache");

        Self {
            decoder,
            capacity,
            inner: Mutex::new(Inner {
                entries,
                in_flight: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Unbounded cache.
    pub fn unbounded(decoder: Arc<dyn Decoder>) -> Self {
        Self::new(decoder, None)
    }

    /// Return the image for `(path, width)`, decoding it on a miss.
    ///
    /// The decode runs synchronously on the calling thread. If another thread is
    /// already decoding the same key, this call blocks until that decode
    /// finishes and returns its result.
    pub fn get_or_compute(&self, path: &Path, width: u32) -> Result<RasterImage, DecodeError> {
        let key = CacheKey::new(path, width);

        let lookup = {
            let mut inner = self.inner.lock();
            if let Some(image) = inner.entries.get(&key).cloned() {
                inner.stats.hits += 1;
                Lookup::Hit(image)
            } else if let Some(flight) = inner.in_flight.get(&key) {
                let flight = Arc::clone(flight);
                inner.stats.hits += 1;
                Lookup::Wait(flight)
            } else {
                inner.stats.misses += 1;
                let flight = Arc::new(InFlight::new());
                inner.in_flight.insert(key.clone(), Arc::clone(&flight));
                Lookup::Compute(flight)
            }
        };

        match lookup {
            Lookup::Hit(image) => {
                trace!(path = ?key.path, width = key.width, "Resize cache hit");
                Ok(image)
            }
            Lookup::Wait(flight) => {
                trace!(path = ?key.path, width = key.width, "Waiting on in-flight decode");
                flight.wait()
            }
            Lookup::Compute(flight) => {
                debug!(path = ?key.path, width = key.width, "Resize cache miss, decoding");
                let result = self.decode(&key);
                self.finish(&key, &result);
                flight.publish(result.clone());
                result
            }
        }
    }

    /// Run the decoder. A panicking decoder is reported as a failed decode so the
    /// in-flight entry is always cleared and published.
    fn decode(&self, key: &CacheKey) -> DecodeOutcome {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.decoder.decode_and_resize(&key.path, key.width)
        }));

        outcome.unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(path = ?key.path, width = key.width, %reason, "Decoder panicked");
            Err(DecodeError::Corrupt {
                path: key.path.clone(),
                reason: format!("decoder panicked: {}", reason),
            })
        })
    }

    fn finish(&self, key: &CacheKey, result: &DecodeOutcome) {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(key);
        inner.stats.decodes += 1;

        match result {
            Ok(image) => {
                if let Some((evicted, _)) = inner.entries.push(key.clone(), image.clone()) {
                    if &evicted != key {
                        inner.stats.evictions += 1;
                        trace!(path = ?evicted.path, width = evicted.width, "Evicted raster");
                    }
                }
            }
            Err(e) => {
                inner.stats.failures += 1;
                warn!(path = ?key.path, width = key.width, error = %e, "Decode failed, not caching");
            }
        }
    }

    /// Check whether `(path, width)` is cached, without touching LRU order.
    pub fn contains(&self, path: &Path, width: u32) -> bool {
        self.inner.lock().entries.contains(&CacheKey::new(path, width))
    }

    /// Cached image for `(path, width)` without decoding.
    pub fn peek(&self, path: &Path, width: u32) -> Option<RasterImage> {
        self.inner
            .lock()
            .entries
            .peek(&CacheKey::new(path, width))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    /// Total bytes held by cached rasters.
    pub fn memory_usage(&self) -> usize {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(_, image)| image.memory_bytes())
            .sum()
    }

    /// Drop every cached raster. In-flight decodes are unaffected.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        debug!("Cleared resize cache");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use crate::raster::resize::fitted_height;

    /// Decoder that fabricates square-source images and counts calls per key.
    #[derive(Default)]
    pub(crate) struct CountingDecoder {
        pub calls: AtomicUsize,
        pub per_key: parking_lot::Mutex<HashMap<(PathBuf, u32), usize>>,
        pub failing: parking_lot::Mutex<HashSet<PathBuf>>,
        /// Source dimensions per file name; square 100x100 when absent.
        pub sizes: parking_lot::Mutex<HashMap<String, (u32, u32)>>,
        pub delay: Option<Duration>,
    }

    impl CountingDecoder {
        pub(crate) fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub(crate) fn fail(&self, path: &Path) {
            self.failing.lock().insert(path.to_path_buf());
        }

        pub(crate) fn heal(&self, path: &Path) {
            self.failing.lock().remove(path);
        }

        pub(crate) fn set_size(&self, name: &str, width: u32, height: u32) {
            self.sizes.lock().insert(name.to_string(), (width, height));
        }

        pub(crate) fn calls_for(&self, path: &Path, width: u32) -> usize {
            self.per_key
                .lock()
                .get(&(path.to_path_buf(), width))
                .copied()
                .unwrap_or(0)
        }
    }

    impl Decoder for CountingDecoder {
        fn decode_and_resize(&self, path: &Path, width: u32) -> Result<RasterImage, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self
                .per_key
                .lock()
                .entry((path.to_path_buf(), width))
                .or_insert(0) += 1;

            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }

            if self.failing.lock().contains(path) {
                return Err(DecodeError::Corrupt {
                    path: path.to_path_buf(),
                    reason: "mock failure".to_string(),
                });
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (src_w, src_h) = self.sizes.lock().get(&name).copied().unwrap_or((100, 100));
            let height = fitted_height(src_w, src_h, width);
            let shade = (width % 251) as u8;
            Ok(RasterImage::new(RgbaImage::from_pixel(
                width,
                height,
                Rgba([shade, 0, 0, 255]),
            )))
        }
    }

    fn cache_with(decoder: &Arc<CountingDecoder>, capacity: Option<usize>) -> ResizeCache {
        let decoder: Arc<dyn Decoder> = decoder.clone();
        ResizeCache::new(decoder, capacity.and_then(NonZeroUsize::new))
    }

    #[test]
    fn test_hit_returns_identical_image_without_recompute() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, None);
        let path = Path::new("/manga/1.png");

        let first = cache.get_or_compute(path, 300).unwrap();
        let second = cache.get_or_compute(path, 300).unwrap();

        assert!(first.shares_buffer(&second));
        assert_eq!(first.as_rgba_bytes(), second.as_rgba_bytes());
        assert_eq!(decoder.calls_for(path, 300), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_distinct_widths_are_distinct_keys() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, None);
        let path = Path::new("/manga/1.png");

        for width in [300, 360, 300, 360, 432] {
            cache.get_or_compute(path, width).unwrap();
        }

        assert_eq!(decoder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(path, 432));
    }

    #[test]
    fn test_zero_width_clamped_before_lookup() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, None);
        let path = Path::new("/manga/1.png");

        let img = cache.get_or_compute(path, 0).unwrap();
        assert_eq!(img.width(), MIN_WIDTH);
        cache.get_or_compute(path, MIN_WIDTH).unwrap();
        assert_eq!(decoder.calls_for(path, MIN_WIDTH), 1);
        assert_eq!(decoder.calls_for(path, 0), 0);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, None);
        let path = Path::new("/manga/locked.png");

        decoder.fail(path);
        assert!(cache.get_or_compute(path, 300).is_err());
        assert!(!cache.contains(path, 300));

        decoder.heal(path);
        let img = cache.get_or_compute(path, 300).unwrap();
        assert_eq!(img.width(), 300);
        assert_eq!(decoder.calls_for(path, 300), 2);
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_lru_bound_evicts_oldest() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, Some(2));
        let a = Path::new("/a.png");
        let b = Path::new("/b.png");
        let c = Path::new("/c.png");

        cache.get_or_compute(a, 100).unwrap();
        cache.get_or_compute(b, 100).unwrap();
        // Touch a so b becomes least recently used.
        cache.get_or_compute(a, 100).unwrap();
        cache.get_or_compute(c, 100).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(a, 100));
        assert!(!cache.contains(b, 100));
        assert!(cache.contains(c, 100));
        assert_eq!(cache.stats().evictions, 1);

        // Evicted keys are recomputed on demand.
        cache.get_or_compute(b, 100).unwrap();
        assert_eq!(decoder.calls_for(b, 100), 2);
    }

    #[test]
    fn test_concurrent_requests_share_one_decode() {
        let decoder = Arc::new(CountingDecoder::with_delay(Duration::from_millis(50)));
        let cache = Arc::new(cache_with(&decoder, None));
        let path = PathBuf::from("/manga/slow.png");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let path = path.clone();
                thread::spawn(move || cache.get_or_compute(&path, 640).unwrap())
            })
            .collect();

        let images: Vec<RasterImage> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(decoder.calls_for(&path, 640), 1);
        assert!(images.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_concurrent_failure_shared_but_not_cached() {
        let decoder = Arc::new(CountingDecoder::with_delay(Duration::from_millis(30)));
        let path = PathBuf::from("/manga/bad.png");
        decoder.fail(&path);
        let cache = Arc::new(cache_with(&decoder, None));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let path = path.clone();
                thread::spawn(move || cache.get_or_compute(&path, 200).is_err())
            })
            .collect();

        assert!(handles.into_iter().all(|h| h.join().unwrap()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_memory_usage() {
        let decoder = Arc::new(CountingDecoder::default());
        let cache = cache_with(&decoder, None);

        cache.get_or_compute(Path::new("/x.png"), 10).unwrap();
        assert_eq!(cache.memory_usage(), 10 * 10 * 4);
        assert!(cache.peek(Path::new("/x.png"), 10).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
    }

    /// Panics on its first call, then decodes normally.
    #[derive(Default)]
    struct PanicOnceDecoder {
        calls: AtomicUsize,
    }

    impl Decoder for PanicOnceDecoder {
        fn decode_and_resize(&self, _path: &Path, width: u32) -> Result<RasterImage, DecodeError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("decoder blew up");
            }
            Ok(RasterImage::new(RgbaImage::from_pixel(
                width,
                width,
                Rgba([0, 0, 0, 255]),
            )))
        }
    }

    #[test]
    fn test_panicking_decoder_does_not_block_retry() {
        let decoder: Arc<dyn Decoder> = Arc::new(PanicOnceDecoder::default());
        let cache = Arc::new(ResizeCache::unbounded(decoder));
        let path = PathBuf::from("/manga/p.png");

        let err = cache.get_or_compute(&path, 100).unwrap_err();
        match &err {
            DecodeError::Corrupt { reason, .. } => assert!(reason.contains("decoder blew up")),
            other => panic!("expected corrupt, got {:?}", other),
        }
        assert!(!cache.contains(&path, 100));
        assert_eq!(cache.stats().failures, 1);

        // The retry must not wait on a decode that never finished.
        let (tx, rx) = flume::bounded(1);
        let retry_cache = Arc::clone(&cache);
        let retry_path = path.clone();
        thread::spawn(move || {
            let _ = tx.send(retry_cache.get_or_compute(&retry_path, 100));
        });

        let retry = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(retry.unwrap().width(), 100);
        assert!(cache.contains(&path, 100));
    }
}
