//! Error types for discovery-core operations.
//!
//! The error surface is deliberately small. Stale ACK/NACK nonces and
//! acknowledgements for unknown subscriptions are expected protocol
//! races, not errors; they are ignored (and logged by their call sites),
//! so no variant exists for them. Nothing here is fatal to the process:
//! every failing operation leaves prior state intact.

/// Error type for discovery-core operations.
#[derive(Debug, thiserror::Error)]
pub enum XdsError {
    /// An upstream owner supplied a malformed resource set: two
    /// resources in the same call share a name. The cache is left
    /// unchanged and subscribers never see the set.
    #[error("invalid resource set for {type_url}: duplicate resource name {name:?}")]
    InvalidResourceSet {
        /// Partition the bad set was destined for.
        type_url: String,
        /// The duplicated name.
        name: String,
    },

    /// A resource handed to `upsert` carries a different type URL than
    /// the partition it was addressed to.
    #[error("resource {name:?} has type {actual}, expected {type_url}")]
    TypeUrlMismatch {
        /// Partition the resource was addressed to.
        type_url: String,
        /// The resource's own type URL.
        actual: String,
        /// The resource name.
        name: String,
    },

    /// Delivering a push to the transport failed. The owning session
    /// terminates; other sessions are unaffected.
    #[error("push to {subscriber} for {type_url} failed: {message}")]
    PushFailed {
        /// Subscriber whose push failed.
        subscriber: String,
        /// Resource type being pushed.
        type_url: String,
        /// Transport-provided description.
        message: String,
    },

    /// The server is shutting down and no longer accepts sessions.
    #[error("server is shutting down")]
    Shutdown,

    /// Invalid server configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias using [`XdsError`].
pub type XdsResult<T> = std::result::Result<T, XdsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XdsError::InvalidResourceSet {
            type_url: "type.googleapis.com/envoy.config.cluster.v3.Cluster".to_string(),
            name: "my-cluster".to_string(),
        };
        assert!(err.to_string().contains("my-cluster"));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_push_failed_display() {
        let err = XdsError::PushFailed {
            subscriber: "node-1".to_string(),
            type_url: "t".to_string(),
            message: "channel closed".to_string(),
        };
        assert!(err.to_string().contains("node-1"));
    }
}
