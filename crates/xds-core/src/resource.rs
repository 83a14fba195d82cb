//! Resource trait and the opaque payload carrier.
//!
//! A resource is a named, typed, immutable payload. The core stores and
//! distributes resources; it never inspects payload contents — that is
//! business logic upstream of the cache, and wire encoding belongs to
//! the transport.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Trait for discovery resources.
///
/// Implement this to store custom resource types in the cache. The core
/// only requires a name (unique within a type) and the type URL; the
/// transport layer calls [`Resource::payload`] when encoding a push.
///
/// # Example
///
/// ```rust
/// use xds_core::{Resource, TypeUrl};
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct MyCluster {
///     name: String,
/// }
///
/// impl Resource for MyCluster {
///     fn type_url(&self) -> &str {
///         TypeUrl::CLUSTER
///     }
///
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     fn payload(&self) -> prost_types::Any {
///         prost_types::Any {
///             type_url: self.type_url().to_string(),
///             value: vec![],
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Get the type URL for this resource.
    fn type_url(&self) -> &str;

    /// Get the resource name, unique within its type.
    fn name(&self) -> &str;

    /// Get the opaque payload for the transport layer to encode.
    fn payload(&self) -> prost_types::Any;

    /// Convert to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A shared, immutable resource handle.
///
/// `Arc` so a resource can sit in multiple snapshots and in-flight
/// pushes without copying the payload.
pub type BoxResource = Arc<dyn Resource>;

/// A raw payload wrapped as a [`Resource`].
///
/// This is the common case for a control plane that receives resources
/// already marshalled: the core carries them through untouched.
#[derive(Debug, Clone)]
pub struct AnyResource {
    type_url: String,
    name: String,
    any: prost_types::Any,
}

impl AnyResource {
    /// Create a new `AnyResource`.
    #[must_use]
    pub fn new(
        type_url: impl Into<String>,
        name: impl Into<String>,
        any: prost_types::Any,
    ) -> Self {
        Self {
            type_url: type_url.into(),
            name: name.into(),
            any,
        }
    }

    /// Get the inner payload.
    #[must_use]
    pub fn inner(&self) -> &prost_types::Any {
        &self.any
    }

    /// Consume and return the inner payload.
    #[must_use]
    pub fn into_inner(self) -> prost_types::Any {
        self.any
    }
}

impl Resource for AnyResource {
    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> prost_types::Any {
        self.any.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeUrl;

    #[test]
    fn test_any_resource() {
        let any = prost_types::Any {
            type_url: TypeUrl::CLUSTER.to_string(),
            value: vec![1, 2, 3],
        };

        let resource = AnyResource::new(TypeUrl::CLUSTER, "my-cluster", any);
        assert_eq!(resource.type_url(), TypeUrl::CLUSTER);
        assert_eq!(resource.name(), "my-cluster");
        assert_eq!(resource.payload().value, vec![1, 2, 3]);
    }

    #[test]
    fn test_shared_resource_clones_cheaply() {
        let any = prost_types::Any {
            type_url: TypeUrl::LISTENER.to_string(),
            value: vec![],
        };
        let shared: BoxResource = Arc::new(AnyResource::new(TypeUrl::LISTENER, "lst", any));
        let other = Arc::clone(&shared);
        assert_eq!(shared.name(), other.name());
    }
}
