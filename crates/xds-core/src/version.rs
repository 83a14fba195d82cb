//! Version and nonce tokens for discovery responses.
//!
//! This module provides [`Version`] and [`Nonce`], the two correlation
//! tokens of the discovery protocol, together with their atomic
//! generators:
//!
//! - A **version** identifies the content of a cache snapshot. Versions
//!   are strictly increasing per resource type.
//! - A **nonce** identifies one pushed response, so a later ACK or NACK
//!   can be matched to the exact response it answers.
//!
//! Both generators are a single monotonic source per server instance,
//! which is what makes the ordering invariants hold under concurrent
//! mutation from multiple resource owners.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Version token for a cache snapshot.
///
/// Versions are ordered integers. `Version::ZERO` is the initial state:
/// the version of an empty snapshot for a type nothing has ever written.
///
/// # Example
///
/// ```rust
/// use xds_core::{Version, VersionGenerator};
///
/// let gen = VersionGenerator::new();
/// let v1 = gen.next();
/// let v2 = gen.next();
///
/// assert!(Version::ZERO < v1);
/// assert!(v1 < v2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// The initial version: no snapshot has ever been written.
    pub const ZERO: Version = Version(0);

    /// Create a version from a raw value.
    ///
    /// Intended for transports reconstructing a client-reported resume
    /// version; new versions come from a [`VersionGenerator`].
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Check whether this is the initial (zero) version.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Get the raw value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Version)
    }
}

/// Nonce token correlating an ACK/NACK to the response it answers.
///
/// A nonce is unique within the lifetime of one watch; in practice it is
/// unique per server instance because all nonces come from one
/// [`NonceGenerator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nonce(u64);

impl Nonce {
    /// Create a nonce from a raw value.
    ///
    /// Intended for transports reconstructing a client-reported nonce.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for Nonce {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Nonce)
    }
}

/// Monotonic version source.
///
/// One generator per server instance; every content-changing cache
/// mutation, for any type, mints the next value. Sharing one counter
/// across types keeps per-type versions strictly increasing without any
/// per-type state.
#[derive(Debug, Default)]
pub struct VersionGenerator {
    counter: AtomicU64,
}

impl VersionGenerator {
    /// Create a generator starting above `Version::ZERO`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next version.
    pub fn next(&self) -> Version {
        Version(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The most recently minted version, `Version::ZERO` if none.
    pub fn current(&self) -> Version {
        Version(self.counter.load(Ordering::Relaxed))
    }
}

/// Monotonic nonce source.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    counter: AtomicU64,
}

impl NonceGenerator {
    /// Create a new nonce generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next nonce.
    pub fn next(&self) -> Nonce {
        Nonce(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_strictly_increase() {
        let gen = VersionGenerator::new();
        let v1 = gen.next();
        let v2 = gen.next();
        let v3 = gen.next();

        assert!(Version::ZERO < v1);
        assert!(v1 < v2);
        assert!(v2 < v3);
        assert_eq!(gen.current(), v3);
    }

    #[test]
    fn zero_is_initial() {
        let gen = VersionGenerator::new();
        assert_eq!(gen.current(), Version::ZERO);
        assert!(Version::ZERO.is_zero());
        assert!(!gen.next().is_zero());
    }

    #[test]
    fn version_string_round_trip() {
        let v = Version::from_raw(42);
        let parsed: Version = v.to_string().parse().expect("parse version");
        assert_eq!(parsed, v);
    }

    #[test]
    fn nonces_unique() {
        let gen = NonceGenerator::new();
        let n1 = gen.next();
        let n2 = gen.next();
        assert_ne!(n1, n2);
    }

    #[test]
    fn nonce_string_round_trip() {
        let gen = NonceGenerator::new();
        let n = gen.next();
        let parsed: Nonce = n.to_string().parse().expect("parse nonce");
        assert_eq!(parsed, n);
    }

    #[test]
    fn concurrent_mints_do_not_collide() {
        use std::sync::Arc;
        use std::thread;

        let gen = Arc::new(VersionGenerator::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let gen = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                (0..1000).map(|_| gen.next()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<Version> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 8000);
    }
}
