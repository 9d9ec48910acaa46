pub type Result<T> = core::result::Result<T, Error>;

/// All error variants that `frostid` can emit.
///
/// Construction-time failures are [`Error::InvalidIdentity`] and are not
/// retryable: the caller must supply corrected values. Generation-time
/// failures are [`Error::ClockRegressed`] and may be retried at the caller's
/// discretion once the clock has caught up; the generator itself only retries
/// internally for regressions within its tolerance window.
///
/// Sequence exhaustion is never an error. It is resolved internally by
/// waiting for the next millisecond.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A datacenter or worker id was outside its encodable range.
    #[error("invalid {field}: {reason}")]
    InvalidIdentity {
        /// Which identity component was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The time source reported a timestamp earlier than the last one used
    /// for generation, beyond what the generator is willing to wait out.
    ///
    /// Carries the regression magnitude in milliseconds.
    #[error("clock moved backwards; refusing to generate id for {offset_ms} ms")]
    ClockRegressed { offset_ms: u64 },
}

impl Error {
    pub(crate) fn identity_out_of_range(field: &'static str, value: u64, max: u64) -> Self {
        Self::InvalidIdentity {
            field,
            reason: format!("{value} exceeds the maximum of {max}"),
        }
    }
}
