//! Subscriber identity.
//!
//! A subscriber is one remote proxy instance holding a discovery
//! session. The core treats the identity as opaque: it is a registry
//! key and a log field, nothing more.

use std::fmt;
use std::sync::Arc;

/// Opaque identity of a proxy instance subscribed to the server.
///
/// Cheap to clone (`Arc<str>` internally), hashable, and printable.
///
/// # Example
///
/// ```rust
/// use xds_core::SubscriberId;
///
/// let a = SubscriberId::new("sidecar-7f3a");
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "sidecar-7f3a");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Arc<str>);

impl SubscriberId {
    /// Create a subscriber identity from its transport-provided ID.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubscriberId {
    fn from(s: String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

impl AsRef<str> for SubscriberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_id() {
        let a = SubscriberId::new("node-1");
        let b = SubscriberId::new("node-1");
        let c = SubscriberId::new("node-2");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_is_cheap_and_equal() {
        let a = SubscriberId::new("node-1");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(format!("{a}"), "node-1");
    }
}
