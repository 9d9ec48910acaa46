use rand::{Rng, rng};

/// A source of raw randomness for the sequence anti-skew seed.
///
/// The generator reduces the returned value into its configured seed range,
/// so implementations only need to produce uniformly distributed words.
/// Deterministic sources can be injected in tests.
pub trait RandSource {
    /// Returns a random 64-bit value.
    fn rand(&self) -> u64;
}

/// A [`RandSource`] backed by the thread-local RNG.
///
/// Each OS thread has its own RNG instance, so calls from multiple threads
/// are contention-free. This type does not store the RNG itself; it accesses
/// the thread-local generator on each call, which keeps it `Send + Sync`
/// despite `ThreadRng` being neither.
#[derive(Default, Clone, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn rand(&self) -> u64 {
        rng().random()
    }
}
