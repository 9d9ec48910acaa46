//! Coordination-free 64-bit Snowflake-style id generation.
//!
//! `frostid` produces time-ordered, globally unique 64-bit identifiers
//! across many independent processes without a central allocator: 41 bits of
//! epoch-relative milliseconds, a 5-bit datacenter id, a 5-bit worker id and
//! a 12-bit per-millisecond sequence. Uniqueness across processes rests on
//! disjoint `(datacenter, worker)` assignment; ordering and per-instance
//! uniqueness are enforced by the generator itself.
//!
//! # Quick start
//!
//! ```
//! use frostid::FrostIdGenerator;
//!
//! let generator = FrostIdGenerator::new(3, 7)?;
//! let id = generator.next_id()?;
//!
//! let parts = id.parts();
//! assert_eq!(parts.datacenter_id, 3);
//! assert_eq!(parts.worker_id, 7);
//! # Ok::<(), frostid::Error>(())
//! ```
//!
//! Identity can also be resolved from the host (MAC address and process id),
//! from the environment, or from any custom [`IdentityResolver`]; a
//! process-wide instance is available through
//! [`FrostIdGenerator::global`].
//!
//! # Feature flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`FrostId`]
//! - `tracing`: trace-level instrumentation of the generation path

mod error;
mod generator;
mod id;
mod identity;
mod rand;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::identity::*;
pub use crate::rand::*;
pub use crate::time::*;
