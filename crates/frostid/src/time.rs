use core::time::Duration;
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

/// Reference instant subtracted from wall-clock time before packing:
/// Friday, January 1, 2021 00:00:00 UTC, in milliseconds since the Unix
/// epoch.
///
/// A 41-bit timestamp field anchored here covers roughly 69 years of ids.
pub const EPOCH_MILLIS: u64 = 1_609_430_400_000;

/// [`EPOCH_MILLIS`] as a [`Duration`] since the Unix epoch.
pub const EPOCH: Duration = Duration::from_millis(EPOCH_MILLIS);

/// A source of millisecond-resolution wall-clock timestamps.
///
/// This abstraction allows you to plug in the shared [`SystemClock`] or a
/// mocked time source in tests. Implementations return milliseconds since
/// the **Unix** epoch; the generator re-anchors to [`EPOCH`] when packing.
///
/// # Example
///
/// ```
/// use frostid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_609_430_400_123
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1_609_430_400_123);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX_EPOCH")
        .as_millis() as u64
}

/// Shared ticker thread that refreshes the cached timestamp every
/// millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A wall-clock time source that caches the current millisecond in an atomic,
/// refreshed by a background ticker thread.
///
/// Reading the clock on the generation hot path is then a single atomic load
/// instead of a syscall. The ticker re-reads [`SystemTime`] on every tick, so
/// external clock adjustments (NTP steps, manual changes) propagate within a
/// millisecond or two; the generator's regression handling is the guard
/// against the clock moving backwards, not this type.
///
/// The clock is cheap to clone; clones share the same ticker. The ticker
/// thread exits once the last handle is dropped.
#[derive(Clone, Debug)]
pub struct SystemClock {
    inner: Arc<SharedTickerInner>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Starts a new cached clock and its ticker thread.
    pub fn new() -> Self {
        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(unix_millis()),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                inner_ref.current.store(unix_millis(), Ordering::Release);
                drop(inner_ref);

                thread::sleep(Duration::from_millis(1));
            }
        });

        inner
            ._handle
            .set(handle)
            .expect("failed to set thread handle");

        Self { inner }
    }
}

impl TimeSource for SystemClock {
    /// Returns the cached wall-clock millisecond.
    fn current_millis(&self) -> u64 {
        self.inner.current.load(Ordering::Acquire)
    }
}
