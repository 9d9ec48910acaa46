use core::fmt;

use crate::time::EPOCH_MILLIS;

/// A 64-bit time-ordered unique identifier
///
/// - 1 bit reserved (always zero, keeps the id non-negative as an `i64`)
/// - 41 bits timestamp (ms since [`EPOCH`])
/// - 5 bits datacenter id
/// - 5 bits worker id
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21      17 16      12 11             0
///              +--------------+----------------+----------+----------+---------------+
///  Field:      | reserved (1) | timestamp (41) | dc (5)   | worker(5)| sequence (12) |
///              +--------------+----------------+----------+----------+---------------+
///              |<------------- MSB ----------- 64 bits ----------- LSB ------------->|
/// ```
///
/// Ids generated by the same `(datacenter, worker)` pair compare strictly
/// increasing as integers, so they can be used directly as sortable primary
/// keys.
///
/// [`EPOCH`]: crate::EPOCH
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrostId {
    id: u64,
}

/// Number of reserved high bits.
pub const RESERVED_BITS: u32 = 1;
/// Number of bits holding the epoch-relative millisecond timestamp.
pub const TIMESTAMP_BITS: u32 = 41;
/// Number of bits holding the datacenter id.
pub const DATACENTER_ID_BITS: u32 = 5;
/// Number of bits holding the worker id.
pub const WORKER_ID_BITS: u32 = 5;
/// Number of bits holding the per-millisecond sequence.
pub const SEQUENCE_BITS: u32 = 12;

const _: () = {
    // Compile-time check: the fields must exactly fill the backing integer.
    assert!(
        RESERVED_BITS + TIMESTAMP_BITS + DATACENTER_ID_BITS + WORKER_ID_BITS + SEQUENCE_BITS
            == u64::BITS,
        "FrostId layout must fill all 64 bits"
    );
};

impl FrostId {
    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 5-bit datacenter id field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << DATACENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 5-bit worker id field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << WORKER_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 = (SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS) as u64;

    /// Number of bits to shift the datacenter id to its position (bit 17).
    pub const DATACENTER_ID_SHIFT: u64 = (SEQUENCE_BITS + WORKER_ID_BITS) as u64;

    /// Number of bits to shift the worker id to its position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = SEQUENCE_BITS as u64;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the raw field values into an id.
    ///
    /// Each component is masked into its field, so an out-of-range value is
    /// truncated rather than bleeding into neighbouring bit groups. Prefer
    /// [`FrostId::from_components`], which checks ranges in debug builds.
    pub const fn from(timestamp: u64, datacenter_id: u64, worker_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Constructs an id from its components.
    ///
    /// `timestamp` is epoch-relative (milliseconds since [`EPOCH`]).
    ///
    /// [`EPOCH`]: crate::EPOCH
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(
            datacenter_id <= Self::DATACENTER_ID_MASK,
            "datacenter_id overflow"
        );
        debug_assert!(worker_id <= Self::WORKER_ID_MASK, "worker_id overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from(timestamp, datacenter_id, worker_id, sequence)
    }

    /// Packs an id from an absolute wall-clock timestamp, bypassing all
    /// generator state.
    ///
    /// This is a pure function intended for tests and back-filling. The
    /// caller owns field-range validity: `timestamp_millis` must not precede
    /// [`EPOCH`], and the remaining components must fit their fields.
    ///
    /// # Example
    /// ```
    /// use frostid::{EPOCH_MILLIS, FrostId};
    ///
    /// let id = FrostId::custom(EPOCH_MILLIS + 123, 3, 7, 0);
    /// assert_eq!(id.timestamp(), 123);
    /// ```
    ///
    /// [`EPOCH`]: crate::EPOCH
    pub const fn custom(
        timestamp_millis: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        Self::from_components(
            timestamp_millis - EPOCH_MILLIS,
            datacenter_id,
            worker_id,
            sequence,
        )
    }

    /// Extracts the epoch-relative timestamp from the packed id.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter id from the packed id.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker id from the packed id.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed id.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the maximum representable timestamp value.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum representable datacenter id.
    pub const fn max_datacenter_id() -> u64 {
        Self::DATACENTER_ID_MASK
    }

    /// Returns the maximum representable worker id.
    pub const fn max_worker_id() -> u64 {
        Self::WORKER_ID_MASK
    }

    /// Returns the maximum representable sequence value.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Decomposes the id into its logical fields, re-anchoring the timestamp
    /// to the Unix epoch.
    ///
    /// This is the exact inverse of the packing performed by the generator
    /// and by [`FrostId::custom`].
    ///
    /// # Example
    /// ```
    /// use frostid::FrostId;
    ///
    /// let id = FrostId::custom(1_609_430_400_123, 3, 7, 0);
    /// let parts = id.parts();
    /// assert_eq!(parts.timestamp_millis, 1_609_430_400_123);
    /// assert_eq!(parts.datacenter_id, 3);
    /// assert_eq!(parts.worker_id, 7);
    /// assert_eq!(parts.sequence, 0);
    /// ```
    pub const fn parts(&self) -> IdParts {
        IdParts {
            timestamp_millis: self.timestamp() + EPOCH_MILLIS,
            datacenter_id: self.datacenter_id(),
            worker_id: self.worker_id(),
            sequence: self.sequence(),
        }
    }

    /// Renders the id as a human-readable string: local timestamp with
    /// millisecond precision, the `(datacenter, worker)` pair, and the
    /// sequence number.
    ///
    /// ```text
    /// 2021-01-01 08:00:00.123, @(3,7), #0
    /// ```
    pub fn format(&self) -> String {
        let parts = self.parts();
        let rendered = chrono::DateTime::from_timestamp_millis(parts.timestamp_millis as i64)
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S%.3f")
                    .to_string()
            })
            .unwrap_or_else(|| parts.timestamp_millis.to_string());
        format!(
            "{rendered}, @({},{}), #{}",
            parts.datacenter_id, parts.worker_id, parts.sequence
        )
    }

    /// Converts this id into its raw integer representation.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Converts a raw integer into an id.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }
}

/// The logical fields of a [`FrostId`], with the timestamp re-anchored to the
/// Unix epoch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdParts {
    /// Milliseconds since the Unix epoch at which the id was generated.
    pub timestamp_millis: u64,
    /// Datacenter id of the generating instance.
    pub datacenter_id: u64,
    /// Worker id of the generating instance.
    pub worker_id: u64,
    /// Per-millisecond sequence number.
    pub sequence: u64,
}

impl From<FrostId> for u64 {
    fn from(id: FrostId) -> Self {
        id.to_raw()
    }
}

impl From<FrostId> for i64 {
    /// The reserved high bit is always zero, so the value is non-negative.
    fn from(id: FrostId) -> Self {
        id.to_raw() as i64
    }
}

impl From<u64> for FrostId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<i64> for FrostId {
    fn from(raw: i64) -> Self {
        Self::from_raw(raw as u64)
    }
}

impl fmt::Display for FrostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for FrostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrostId")
            .field("id", &format_args!("{} (0x{:x})", self.id, self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
