use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const BUCKET_COUNT: usize = 8;

/// Upper bounds of the latency buckets. The last bucket is open ended and
/// reports a 5 s cap.
pub const BUCKET_BOUNDS_MS: [u64; BUCKET_COUNT] = [5, 10, 20, 50, 100, 250, 500, 5_000];

const WORST_CASE: Duration = Duration::from_millis(BUCKET_BOUNDS_MS[BUCKET_COUNT - 1]);

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Slice {
    start_ms: AtomicU64,
    total: AtomicU64,
    errors: AtomicU64,
    buckets: [AtomicU64; BUCKET_COUNT],
}

impl Slice {
    fn reset(&self, start_ms: u64) {
        self.start_ms.store(start_ms, Ordering::Release);
        self.total.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        for bucket in &self.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
    }

    fn add(&self, bucket: usize, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatedMetrics {
    pub total: u64,
    pub errors: u64,
    pub buckets: [u64; BUCKET_COUNT],
}

impl AggregatedMetrics {
    pub fn percentile(&self, p: f64) -> Duration {
        estimate_percentile(&self.buckets, p)
    }

    pub fn p50(&self) -> Duration {
        self.percentile(0.50)
    }

    pub fn p95(&self) -> Duration {
        self.percentile(0.95)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(0.99)
    }

    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.errors as f64 / self.total as f64
        }
    }
}

/// Sliding-window latency histogram built from a ring of time slices.
///
/// Writers only touch atomics. Rotation to the next slice is claimed with a
/// compare-exchange on the current index; a writer that loses the race
/// records into whatever slice is current by then.
pub struct LatencyMetrics {
    clock: Arc<dyn Clock>,
    slices: Box<[Slice]>,
    current: AtomicUsize,
    window_ms: u64,
    slice_ms: u64,
}

impl LatencyMetrics {
    pub fn new(window: Duration, slice: Duration) -> Self {
        Self::with_clock(window, slice, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, slice: Duration, clock: Arc<dyn Clock>) -> Self {
        let slice_ms = (slice.as_millis() as u64).max(1);
        let window_ms = (window.as_millis() as u64).max(slice_ms);
        let count = window_ms.div_ceil(slice_ms) as usize;

        let slices: Box<[Slice]> = (0..count).map(|_| Slice::default()).collect();
        slices[0].reset(clock.now_ms());

        Self {
            clock,
            slices,
            current: AtomicUsize::new(0),
            window_ms,
            slice_ms,
        }
    }

    pub fn record(&self, elapsed: Duration, success: bool) {
        let bucket = bucket_index(elapsed);
        let now = self.clock.now_ms();

        let idx = self.current.load(Ordering::Acquire);
        let slice = &self.slices[idx];
        let start = slice.start_ms.load(Ordering::Acquire);

        // A reading taken just before another writer rotated lands in the new slice.
        if now.saturating_sub(start) < self.slice_ms {
            slice.add(bucket, success);
            return;
        }

        let next = (idx + 1) % self.slices.len();
        match self
            .current
            .compare_exchange(idx, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let fresh = &self.slices[next];
                fresh.reset(now);
                fresh.add(bucket, success);
            }
            Err(actual) => self.slices[actual].add(bucket, success),
        }
    }

    /// Sums every slice that started within the window. Expired slices are
    /// skipped and left for rotation to overwrite.
    pub fn aggregate(&self) -> AggregatedMetrics {
        let now = self.clock.now_ms();
        let mut agg = AggregatedMetrics::default();

        for slice in self.slices.iter() {
            let start = slice.start_ms.load(Ordering::Acquire);
            if now.saturating_sub(start) >= self.window_ms {
                continue;
            }
            agg.total += slice.total.load(Ordering::Relaxed);
            agg.errors += slice.errors.load(Ordering::Relaxed);
            for (sum, bucket) in agg.buckets.iter_mut().zip(slice.buckets.iter()) {
                *sum += bucket.load(Ordering::Relaxed);
            }
        }

        agg
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn bucket_index(elapsed: Duration) -> usize {
    let ms = elapsed.as_millis() as u64;
    BUCKET_BOUNDS_MS[..BUCKET_COUNT - 1]
        .iter()
        .position(|&bound| ms < bound)
        .unwrap_or(BUCKET_COUNT - 1)
}

/// Upper bound of the first bucket whose cumulative count reaches
/// `ceil(total * p)`. Without data the worst-case bound is returned.
pub fn estimate_percentile(buckets: &[u64; BUCKET_COUNT], p: f64) -> Duration {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return WORST_CASE;
    }

    let target = ((total as f64 * p.clamp(0.0, 1.0)).ceil() as u64).clamp(1, total);
    let mut cumulative = 0;
    for (count, bound) in buckets.iter().zip(BUCKET_BOUNDS_MS) {
        cumulative += count;
        if cumulative >= target {
            return Duration::from_millis(bound);
        }
    }

    WORST_CASE
}
