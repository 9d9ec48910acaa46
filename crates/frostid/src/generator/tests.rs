use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread::scope;

use super::*;
use crate::identity::ExplicitIdentity;

/// Base instant for mock clocks, comfortably past the packing epoch.
const T0: u64 = EPOCH_MILLIS + 42;

struct FixedTime {
    millis: u64,
}

impl TimeSource for FixedTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock that steps through `values` one read at a time and then sticks on
/// the last entry.
struct MockStepTime {
    values: Vec<u64>,
    index: Cell<usize>,
}

impl MockStepTime {
    fn new(values: Vec<u64>) -> Rc<Self> {
        Rc::new(Self {
            values,
            index: Cell::new(0),
        })
    }
}

impl TimeSource for Rc<MockStepTime> {
    fn current_millis(&self) -> u64 {
        let i = self.index.get();
        if i + 1 < self.values.len() {
            self.index.set(i + 1);
        }
        self.values[i]
    }
}

/// A deterministic randomness source.
struct FixedRand(u64);

impl RandSource for FixedRand {
    fn rand(&self) -> u64 {
        self.0
    }
}

fn identity(datacenter_id: u64, worker_id: u64) -> NodeIdentity {
    NodeIdentity::new(datacenter_id, worker_id).unwrap()
}

#[test]
fn same_millisecond_increments_sequence() {
    let generator = FrostIdGenerator::with_clock(identity(3, 7), FixedTime { millis: T0 });

    let first = generator.next_id().unwrap();
    let seed = first.sequence();
    assert!(seed < DEFAULT_SEQUENCE_SEED_RANGE);

    let mut previous = first;
    for k in 1..16 {
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), seed + k);
        assert!(id > previous);
        previous = id;
    }
}

#[test]
fn new_millisecond_reseeds_within_bounded_range() {
    let time = MockStepTime::new(vec![T0, T0 + 1]);
    let generator = FrostIdGenerator::with_clock(identity(1, 1), time.clone());

    let a = generator.next_id().unwrap();
    let b = generator.next_id().unwrap();

    assert_eq!(a.timestamp(), 42);
    assert_eq!(b.timestamp(), 43);
    assert!(a.sequence() < DEFAULT_SEQUENCE_SEED_RANGE);
    assert!(b.sequence() < DEFAULT_SEQUENCE_SEED_RANGE);
    assert!(b > a);
}

#[test]
fn seed_range_is_tunable_and_clamped() {
    let generator =
        FrostIdGenerator::with_clock(identity(0, 0), FixedTime { millis: T0 })
            .with_sequence_seed_range(0);
    // Clamped to 1: the classic reset-to-zero behaviour.
    assert_eq!(generator.next_id().unwrap().sequence(), 0);

    let time = MockStepTime::new(vec![T0, T0 + 1, T0 + 2]);
    let generator = FrostIdGenerator::with_parts(identity(0, 0), time, FixedRand(4100))
        .with_sequence_seed_range(4);
    // 4100 % 4 == 0 on every fresh millisecond.
    assert_eq!(generator.next_id().unwrap().sequence(), 0);
    assert_eq!(generator.next_id().unwrap().sequence(), 0);
}

#[test]
fn sequence_rollover_waits_for_clock_advance() {
    let mut values = vec![T0; 4097];
    values.push(T0 + 1);
    let time = MockStepTime::new(values);
    let generator = FrostIdGenerator::with_clock(identity(2, 2), time.clone())
        .with_sequence_seed_range(1);

    for expected in 0..=FrostId::max_sequence() {
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), expected);
    }

    // 4096 ids consumed this millisecond; the next call must observe the
    // clock advancing rather than reusing a sequence value.
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn regression_within_tolerance_recovers() {
    let time = MockStepTime::new(vec![T0 + 5, T0 + 2, T0 + 5]);
    let generator = FrostIdGenerator::with_clock(identity(1, 1), time.clone());

    let first = generator.next_id().unwrap();
    // The clock now reports 3 ms behind; the generator waits it out and
    // succeeds with the recovered timestamp.
    let second = generator.next_id().unwrap();

    assert_eq!(first.timestamp(), second.timestamp());
    assert_eq!(second.sequence(), first.sequence() + 1);
}

#[test]
fn regression_beyond_tolerance_fails_immediately() {
    let time = MockStepTime::new(vec![T0 + 10, T0]);
    let generator = FrostIdGenerator::with_clock(identity(1, 1), time.clone());

    generator.next_id().unwrap();
    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRegressed { offset_ms: 10 })
    );
}

#[test]
fn regression_without_recovery_fails() {
    let time = MockStepTime::new(vec![T0 + 3, T0, T0]);
    let generator = FrostIdGenerator::with_clock(identity(1, 1), time.clone());

    generator.next_id().unwrap();
    // 3 ms behind and still behind after the tolerance wait.
    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRegressed { offset_ms: 3 })
    );
}

#[test]
fn failed_call_leaves_generator_usable() {
    let time = MockStepTime::new(vec![T0 + 10, T0, T0 + 10]);
    let generator = FrostIdGenerator::with_clock(identity(1, 1), time.clone());

    let first = generator.next_id().unwrap();
    assert!(generator.next_id().is_err());
    let third = generator.next_id().unwrap();
    assert!(third > first);
}

#[test]
fn explicit_identity_is_validated() {
    assert!(matches!(
        FrostIdGenerator::new(32, 0),
        Err(Error::InvalidIdentity { .. })
    ));
    assert!(matches!(
        FrostIdGenerator::new(0, 32),
        Err(Error::InvalidIdentity { .. })
    ));
    assert!(FrostIdGenerator::new(31, 31).is_ok());
}

#[test]
fn ids_carry_the_configured_identity() {
    let generator = FrostIdGenerator::with_clock(identity(3, 7), FixedTime { millis: T0 });
    let parts = generator.next_id().unwrap().parts();
    assert_eq!(parts.datacenter_id, 3);
    assert_eq!(parts.worker_id, 7);
}

#[test]
fn resolver_failures_propagate() {
    assert!(FrostIdGenerator::from_resolver(&ExplicitIdentity::new(40, 0)).is_err());
    let generator = FrostIdGenerator::from_resolver(&ExplicitIdentity::new(4, 5)).unwrap();
    assert_eq!(generator.identity().datacenter_id(), 4);
    assert_eq!(generator.identity().worker_id(), 5);
}

#[test]
fn next_id_string_is_decimal() {
    let generator = FrostIdGenerator::with_clock(identity(1, 2), FixedTime { millis: T0 });
    let rendered = generator.next_id_string().unwrap();
    let raw: u64 = rendered.parse().unwrap();
    let id = FrostId::from_raw(raw);
    assert_eq!(id.timestamp(), 42);
    assert_eq!(id.datacenter_id(), 1);
    assert_eq!(id.worker_id(), 2);
}

#[test]
fn system_clock_ids_strictly_increase() {
    let generator = FrostIdGenerator::new(0, 0).unwrap();
    let mut previous = generator.next_id().unwrap();

    for _ in 0..8192 {
        let id = generator.next_id().unwrap();
        assert!(id > previous, "ids must strictly increase: {id:?} after {previous:?}");
        previous = id;
    }
}

#[test]
fn threaded_generation_is_unique() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 512;

    let generator = Arc::new(FrostIdGenerator::new(0, 1).unwrap());
    let seen_ids = Arc::new(Mutex::new(HashSet::with_capacity(THREADS * IDS_PER_THREAD)));

    scope(|s| {
        for _ in 0..THREADS {
            let generator = Arc::clone(&generator);
            let seen_ids = Arc::clone(&seen_ids);

            s.spawn(move || {
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.next_id().unwrap();
                    let mut set = seen_ids.lock().unwrap();
                    assert!(set.insert(id));
                }
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, THREADS * IDS_PER_THREAD);
}

#[test]
fn global_generator_is_shared() {
    let a = FrostIdGenerator::global();
    let b = FrostIdGenerator::global();
    assert!(core::ptr::eq(a, b));

    let first = a.next_id().unwrap();
    let second = b.next_id().unwrap();
    assert!(second > first);
}

#[test]
fn debug_exposes_layout_and_identity() {
    let generator = FrostIdGenerator::with_clock(identity(3, 7), FixedTime { millis: T0 });
    let rendered = format!("{generator:?}");
    assert!(rendered.contains("@(3,7)"));
    assert!(rendered.contains("timestamp_bits: 41"));
    assert!(rendered.contains("sequence_bits: 12"));
}
