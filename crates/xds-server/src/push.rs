//! Outbound boundary between the core and the transport layer.

use std::fmt;

use async_trait::async_trait;
use xds_core::{BoxResource, Nonce, SubscriberId, TypeUrl, Version, XdsResult};

/// One outbound response for the transport to encode and deliver.
///
/// Always a full state-of-the-world set for the type, never a delta.
/// The transport reports the subscriber's reply back through the
/// server's `ack`/`nack` calls, quoting the nonce.
#[derive(Debug, Clone)]
pub struct Push {
    /// Subscriber this response is addressed to.
    pub subscriber: SubscriberId,
    /// Resource type being pushed.
    pub type_url: TypeUrl,
    /// Version of the snapshot the resources came from.
    pub version: Version,
    /// Correlation nonce for the subscriber's reply.
    pub nonce: Nonce,
    /// Full resource set, cheap `Arc` handles.
    pub resources: Vec<BoxResource>,
}

/// Transport-side consumer of pushes.
///
/// `push` may suspend for backpressure; only the owning session is
/// suspended with it. An error terminates that session, so transports
/// should reserve errors for a dead peer rather than a slow one.
#[async_trait]
pub trait PushSink: Send + Sync + fmt::Debug {
    /// Deliver one push to the subscriber.
    async fn push(&self, push: Push) -> XdsResult<()>;
}
