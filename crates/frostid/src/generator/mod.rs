use core::fmt;
use std::{sync::OnceLock, thread, time::Duration};

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::{Error, Result},
    id::{
        DATACENTER_ID_BITS, FrostId, SEQUENCE_BITS, TIMESTAMP_BITS, WORKER_ID_BITS,
    },
    identity::{HostIdentity, IdentityResolver, NodeIdentity},
    rand::{RandSource, ThreadRandom},
    time::{EPOCH_MILLIS, SystemClock, TimeSource},
};

/// Maximum clock regression, in milliseconds, that a generator waits out
/// rather than failing the call. Regressions in this window are treated as
/// leap-second-class adjustments: the generator sleeps twice the offset and
/// re-reads the clock once.
const REGRESSION_TOLERANCE_MS: u64 = 5;

/// Default size of the range the sequence is re-seeded from on a fresh
/// millisecond. Seeding from `[0, 9)` instead of resetting to zero avoids
/// handing consumers that shard by id parity a skewed distribution.
const DEFAULT_SEQUENCE_SEED_RANGE: u64 = 9;

/// Mutable generation state, owned exclusively by one generator's mutex.
struct GeneratorState {
    /// Per-millisecond sequence counter.
    sequence: u64,
    /// Timestamp of the last successful generation; `None` until the first
    /// id is issued.
    last_timestamp: Option<u64>,
}

/// A thread-safe generator of unique, time-ordered [`FrostId`]s.
///
/// The generator holds its mutable state (`sequence`, `last_timestamp`)
/// behind a [`Mutex`] scoped to the instance, so independent instances never
/// contend with each other. The entire read-decide-mutate-pack sequence runs
/// as one critical section, which keeps ids strictly increasing per instance
/// at the cost of capping throughput at 4096 ids per millisecond.
///
/// [`next_id`] may block the calling thread: for up to twice the regression
/// offset when the clock has stepped backwards within tolerance, and until
/// the next millisecond when the sequence is exhausted. No timeout is
/// exposed; callers needing bounded latency should wrap calls with their own
/// deadline and treat expiry as retryable.
///
/// # Example
///
/// ```
/// use frostid::FrostIdGenerator;
///
/// let generator = FrostIdGenerator::new(3, 7).unwrap();
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(b > a);
/// assert_eq!(b.datacenter_id(), 3);
/// assert_eq!(b.worker_id(), 7);
/// ```
///
/// [`next_id`]: FrostIdGenerator::next_id
pub struct FrostIdGenerator<T = SystemClock, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    identity: NodeIdentity,
    state: Mutex<GeneratorState>,
    time: T,
    rand: R,
    sequence_seed_range: u64,
}

impl FrostIdGenerator {
    /// Creates a generator with an explicit identity and the shared
    /// [`SystemClock`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if either id exceeds its 5-bit
    /// range.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Ok(Self::from_identity(NodeIdentity::new(
            datacenter_id,
            worker_id,
        )?))
    }

    /// Creates a generator from an already validated identity.
    pub fn from_identity(identity: NodeIdentity) -> Self {
        Self::with_clock(identity, SystemClock::new())
    }

    /// Creates a generator whose identity is produced by `resolver`.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's failure, e.g. [`Error::InvalidIdentity`]
    /// from [`ExplicitIdentity`] or [`EnvIdentity`].
    ///
    /// [`ExplicitIdentity`]: crate::ExplicitIdentity
    /// [`EnvIdentity`]: crate::EnvIdentity
    pub fn from_resolver(resolver: &impl IdentityResolver) -> Result<Self> {
        Ok(Self::from_identity(resolver.resolve()?))
    }

    /// Returns the lazily created process-wide generator.
    ///
    /// The instance is created race-free on first access with a
    /// host-derived identity (see [`HostIdentity`]) and reused for the
    /// process lifetime. Construct instances directly when you need explicit
    /// identities or independent streams; one instance per
    /// `(datacenter, worker)` pair is the intended lifecycle.
    ///
    /// # Example
    ///
    /// ```
    /// use frostid::FrostIdGenerator;
    ///
    /// let id = FrostIdGenerator::global().next_id().unwrap();
    /// assert!(id.to_raw() > 0);
    /// ```
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<FrostIdGenerator> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::from_identity(HostIdentity.derive()))
    }
}

impl<T> FrostIdGenerator<T, ThreadRandom>
where
    T: TimeSource,
{
    /// Creates a generator with a custom time source.
    pub fn with_clock(identity: NodeIdentity, time: T) -> Self {
        Self::with_parts(identity, time, ThreadRandom)
    }
}

impl<T, R> FrostIdGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Creates a generator with custom time and randomness sources.
    pub fn with_parts(identity: NodeIdentity, time: T, rand: R) -> Self {
        Self {
            identity,
            state: Mutex::new(GeneratorState {
                sequence: 0,
                last_timestamp: None,
            }),
            time,
            rand,
            sequence_seed_range: DEFAULT_SEQUENCE_SEED_RANGE,
        }
    }

    /// Sets the size of the range the sequence is re-seeded from on a fresh
    /// millisecond, clamped to `[1, 4096]`.
    ///
    /// A range of 1 restores the classic reset-to-zero behaviour. The
    /// default of 9 trades a slightly reduced per-millisecond capacity for
    /// an even spread of id parity.
    pub fn with_sequence_seed_range(mut self, range: u64) -> Self {
        self.sequence_seed_range = range.clamp(1, FrostId::max_sequence() + 1);
        self
    }

    /// Returns the identity this generator stamps into every id.
    pub const fn identity(&self) -> NodeIdentity {
        self.identity
    }

    /// Generates the next unique id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegressed`] when the time source has moved
    /// backwards past the last generation timestamp by more than the
    /// tolerance window, or has not recovered within it. The call may be
    /// retried once the clock has caught up.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<FrostId> {
        let mut state = self.state.lock();
        let mut now = self.time.current_millis();

        match state.last_timestamp {
            Some(last) if now < last => {
                now = self.wait_out_regression(now, last)?;
                if now == last {
                    self.advance_sequence(&mut state, &mut now, last);
                } else {
                    state.sequence = self.seed_sequence();
                }
            }
            Some(last) if now == last => {
                self.advance_sequence(&mut state, &mut now, last);
            }
            _ => {
                state.sequence = self.seed_sequence();
            }
        }

        state.last_timestamp = Some(now);
        Ok(FrostId::from_components(
            now - EPOCH_MILLIS,
            self.identity.datacenter_id(),
            self.identity.worker_id(),
            state.sequence,
        ))
    }

    /// Generates the next unique id and renders it in decimal.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`FrostIdGenerator::next_id`].
    pub fn next_id_string(&self) -> Result<String> {
        Ok(self.next_id()?.to_string())
    }

    /// Advances the intra-millisecond sequence; on wrap-around the
    /// millisecond is exhausted and the clock is spun until it moves past
    /// `last`.
    fn advance_sequence(&self, state: &mut GeneratorState, now: &mut u64, last: u64) {
        state.sequence = (state.sequence + 1) & FrostId::max_sequence();
        if state.sequence == 0 {
            *now = self.spin_until_after(last);
        }
    }

    /// Draws the sequence seed for a fresh millisecond.
    fn seed_sequence(&self) -> u64 {
        self.rand.rand() % self.sequence_seed_range
    }

    /// Handles a clock that stepped backwards while the lock is held.
    ///
    /// Within tolerance, sleeps twice the offset and re-reads the clock
    /// once; a clock that is still behind afterwards, or a regression beyond
    /// tolerance, fails the call. Regressions are never absorbed by moving
    /// to a different worker id.
    #[cold]
    #[inline(never)]
    fn wait_out_regression(&self, now: u64, last: u64) -> Result<u64> {
        let offset_ms = last - now;
        if offset_ms > REGRESSION_TOLERANCE_MS {
            return Err(Error::ClockRegressed { offset_ms });
        }

        thread::sleep(Duration::from_millis(offset_ms * 2));

        let now = self.time.current_millis();
        if now < last {
            return Err(Error::ClockRegressed { offset_ms });
        }
        Ok(now)
    }

    /// Spins on the time source until it reports a millisecond past `last`.
    fn spin_until_after(&self, last: u64) -> u64 {
        loop {
            let now = self.time.current_millis();
            if now > last {
                return now;
            }
            core::hint::spin_loop();
        }
    }
}

impl<T, R> fmt::Debug for FrostIdGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrostIdGenerator")
            .field("identity", &self.identity)
            .field("timestamp_bits", &TIMESTAMP_BITS)
            .field("datacenter_id_bits", &DATACENTER_ID_BITS)
            .field("worker_id_bits", &WORKER_ID_BITS)
            .field("sequence_bits", &SEQUENCE_BITS)
            .field("epoch_millis", &EPOCH_MILLIS)
            .field("sequence_seed_range", &self.sequence_seed_range)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
