//! Builder for configuring and creating the discovery server.

use std::sync::Arc;
use std::time::Duration;

use xds_cache::ResourceCache;
use xds_core::{XdsError, XdsResult};

use crate::config::{ResumePolicy, ServerConfig};
use crate::metrics::{MetricsSink, NoopSink};
use crate::push::PushSink;
use crate::server::DiscoveryServer;

/// Builder for creating a [`DiscoveryServer`].
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use xds_cache::ResourceCache;
/// use xds_server::{DiscoveryServerBuilder, PrometheusSink, ResumePolicy};
///
/// let cache = Arc::new(ResourceCache::new());
/// let server = DiscoveryServerBuilder::new()
///     .cache(cache)
///     .push_sink(my_transport_sink)
///     .metrics_sink(Arc::new(PrometheusSink::new()))
///     .resume_policy(ResumePolicy::FreshPush)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct DiscoveryServerBuilder {
    cache: Option<Arc<ResourceCache>>,
    push_sink: Option<Arc<dyn PushSink>>,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
    resume_policy: Option<ResumePolicy>,
    session_inbox_depth: Option<usize>,
    change_inbox_depth: Option<usize>,
    grace_period: Option<Duration>,
}

impl DiscoveryServerBuilder {
    /// Create a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache to serve from.
    ///
    /// This is required.
    #[must_use]
    pub fn cache(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the transport-side push sink.
    ///
    /// This is required.
    #[must_use]
    pub fn push_sink(mut self, sink: Arc<dyn PushSink>) -> Self {
        self.push_sink = Some(sink);
        self
    }

    /// Set the ACK/NACK metrics sink.
    ///
    /// Defaults to [`NoopSink`].
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    /// Set how client-supplied resume state is treated.
    #[must_use]
    pub fn resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = Some(policy);
        self
    }

    /// Set the per-session message inbox depth.
    #[must_use]
    pub fn session_inbox_depth(mut self, depth: usize) -> Self {
        self.session_inbox_depth = Some(depth);
        self
    }

    /// Set the per-session change inbox depth.
    #[must_use]
    pub fn change_inbox_depth(mut self, depth: usize) -> Self {
        self.change_inbox_depth = Some(depth);
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = Some(grace);
        self
    }

    /// Build the server.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No cache was provided
    /// - No push sink was provided
    /// - An inbox depth is zero
    pub fn build(self) -> XdsResult<DiscoveryServer> {
        let cache = self
            .cache
            .ok_or_else(|| XdsError::Configuration("cache is required".into()))?;
        let sink = self
            .push_sink
            .ok_or_else(|| XdsError::Configuration("push sink is required".into()))?;

        let defaults = ServerConfig::default();
        let config = ServerConfig {
            resume_policy: self.resume_policy.unwrap_or(defaults.resume_policy),
            session_inbox_depth: self
                .session_inbox_depth
                .unwrap_or(defaults.session_inbox_depth),
            change_inbox_depth: self
                .change_inbox_depth
                .unwrap_or(defaults.change_inbox_depth),
            grace_period: self.grace_period.unwrap_or(defaults.grace_period),
        };

        if config.session_inbox_depth == 0 || config.change_inbox_depth == 0 {
            return Err(XdsError::Configuration(
                "inbox depths must be non-zero".into(),
            ));
        }

        let metrics = self
            .metrics_sink
            .unwrap_or_else(|| Arc::new(NoopSink::new()));

        Ok(DiscoveryServer::new(cache, sink, metrics, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{Push, PushSink};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct DiscardSink;

    #[async_trait]
    impl PushSink for DiscardSink {
        async fn push(&self, _push: Push) -> XdsResult<()> {
            Ok(())
        }
    }

    #[test]
    fn builder_requires_cache() {
        let result = DiscoveryServerBuilder::new()
            .push_sink(Arc::new(DiscardSink))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_requires_push_sink() {
        let result = DiscoveryServerBuilder::new()
            .cache(Arc::new(ResourceCache::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_zero_depth() {
        let result = DiscoveryServerBuilder::new()
            .cache(Arc::new(ResourceCache::new()))
            .push_sink(Arc::new(DiscardSink))
            .session_inbox_depth(0)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builder_success() {
        let server = DiscoveryServerBuilder::new()
            .cache(Arc::new(ResourceCache::new()))
            .push_sink(Arc::new(DiscardSink))
            .resume_policy(ResumePolicy::FreshPush)
            .session_inbox_depth(8)
            .build()
            .unwrap();

        assert_eq!(server.config().resume_policy, ResumePolicy::FreshPush);
        assert_eq!(server.config().session_inbox_depth, 8);
        assert_eq!(server.session_count(), 0);
    }
}
