use core::fmt;
use std::{
    env,
    hash::{DefaultHasher, Hash, Hasher},
    process,
};

use crate::{
    error::{Error, Result},
    id::FrostId,
};

/// Datacenter id used when the host has no usable hardware address.
const FALLBACK_DATACENTER_ID: u64 = 1;

/// Environment variable consulted by [`EnvIdentity`] for the datacenter id.
pub const DATACENTER_ID_ENV: &str = "FROSTID_DATACENTER_ID";

/// Environment variable consulted by [`EnvIdentity`] for the worker id.
pub const WORKER_ID_ENV: &str = "FROSTID_WORKER_ID";

/// A validated `(datacenter, worker)` pair identifying one generator
/// instance.
///
/// Global uniqueness of generated ids rests entirely on these pairs being
/// disjoint across all concurrently running instances. That assignment is an
/// external contract; this type only enforces that each component fits its
/// 5-bit field.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    datacenter_id: u64,
    worker_id: u64,
}

impl NodeIdentity {
    /// Validates and constructs an identity pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if either component exceeds its
    /// maximum ([`FrostId::max_datacenter_id`] / [`FrostId::max_worker_id`]).
    ///
    /// # Example
    /// ```
    /// use frostid::NodeIdentity;
    ///
    /// assert!(NodeIdentity::new(31, 31).is_ok());
    /// assert!(NodeIdentity::new(32, 0).is_err());
    /// ```
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        if datacenter_id > FrostId::max_datacenter_id() {
            return Err(Error::identity_out_of_range(
                "datacenter_id",
                datacenter_id,
                FrostId::max_datacenter_id(),
            ));
        }
        if worker_id > FrostId::max_worker_id() {
            return Err(Error::identity_out_of_range(
                "worker_id",
                worker_id,
                FrostId::max_worker_id(),
            ));
        }
        Ok(Self {
            datacenter_id,
            worker_id,
        })
    }

    /// Returns the datacenter id.
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    /// Returns the worker id.
    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@({},{})", self.datacenter_id, self.worker_id)
    }
}

/// Strategy for determining the identity of a generator instance.
///
/// Deployments needing strict uniqueness should implement this against a
/// coordinated source (for example a value assigned by an orchestrator) and
/// hand the result to the generator; the built-in [`HostIdentity`] is a
/// best-effort default, not a coordination protocol.
pub trait IdentityResolver {
    /// Produces the identity this process should generate under.
    fn resolve(&self) -> Result<NodeIdentity>;
}

/// Resolver for caller-supplied identity values.
#[derive(Copy, Clone, Debug)]
pub struct ExplicitIdentity {
    datacenter_id: u64,
    worker_id: u64,
}

impl ExplicitIdentity {
    /// Wraps an explicit pair. Validation happens at [`resolve`] time.
    ///
    /// [`resolve`]: IdentityResolver::resolve
    pub const fn new(datacenter_id: u64, worker_id: u64) -> Self {
        Self {
            datacenter_id,
            worker_id,
        }
    }
}

impl IdentityResolver for ExplicitIdentity {
    fn resolve(&self) -> Result<NodeIdentity> {
        NodeIdentity::new(self.datacenter_id, self.worker_id)
    }
}

/// Resolver that derives an identity from local machine attributes.
///
/// The datacenter id comes from the low bits of the primary network
/// interface's hardware address; the worker id from a hash of the datacenter
/// id and the process id. Both are best-effort: co-located processes can
/// collide (the 16-bit hash is folded into 5 bits), and a host without a
/// hardware address falls back to a fixed datacenter id. Treat this as a
/// convenient default for small fleets, not a uniqueness guarantee.
#[derive(Default, Copy, Clone, Debug)]
pub struct HostIdentity;

impl HostIdentity {
    /// Derives the identity for this process. Never fails; lookup problems
    /// degrade to fixed fallbacks.
    pub fn derive(&self) -> NodeIdentity {
        let datacenter_id = datacenter_from_hardware();
        let worker_id = worker_from_process(datacenter_id);
        NodeIdentity {
            datacenter_id,
            worker_id,
        }
    }
}

impl IdentityResolver for HostIdentity {
    fn resolve(&self) -> Result<NodeIdentity> {
        Ok(self.derive())
    }
}

/// Combines the two low-order bytes of the primary interface's MAC address
/// into a 16-bit value, drops the vendor-aligned low bits, and folds the rest
/// into the datacenter range.
fn datacenter_from_hardware() -> u64 {
    match mac_address::get_mac_address() {
        Ok(Some(mac)) => {
            let bytes = mac.bytes();
            let low = ((bytes[4] as u64) << 8) | bytes[5] as u64;
            (low >> 6) % (FrostId::max_datacenter_id() + 1)
        }
        Ok(None) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                fallback = FALLBACK_DATACENTER_ID,
                "no hardware address available; using fallback datacenter id"
            );
            FALLBACK_DATACENTER_ID
        }
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                error = %_err,
                fallback = FALLBACK_DATACENTER_ID,
                "hardware address lookup failed; using fallback datacenter id"
            );
            FALLBACK_DATACENTER_ID
        }
    }
}

/// Hashes the datacenter id together with the process id and folds the low
/// 16 bits of the hash into the worker range.
fn worker_from_process(datacenter_id: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    datacenter_id.hash(&mut hasher);
    process::id().to_string().hash(&mut hasher);
    (hasher.finish() & 0xFFFF) % (FrostId::max_worker_id() + 1)
}

/// Resolver that reads the identity from the process environment.
///
/// Expects [`DATACENTER_ID_ENV`] and [`WORKER_ID_ENV`] to hold unsigned
/// integers in range, typically assigned by an orchestrator or deployment
/// tooling.
#[derive(Default, Copy, Clone, Debug)]
pub struct EnvIdentity;

impl EnvIdentity {
    fn read(var: &'static str, field: &'static str) -> Result<u64> {
        let raw = env::var(var).map_err(|_| Error::InvalidIdentity {
            field,
            reason: format!("environment variable {var} is not set"),
        })?;
        raw.trim().parse().map_err(|_| Error::InvalidIdentity {
            field,
            reason: format!("environment variable {var} is not an unsigned integer: {raw:?}"),
        })
    }
}

impl IdentityResolver for EnvIdentity {
    fn resolve(&self) -> Result<NodeIdentity> {
        let datacenter_id = Self::read(DATACENTER_ID_ENV, "datacenter_id")?;
        let worker_id = Self::read(WORKER_ID_ENV, "worker_id")?;
        NodeIdentity::new(datacenter_id, worker_id)
    }
}
