//! Acknowledgement metrics for the discovery server.
//!
//! The server reports one event per honored ACK or NACK, labeled by
//! type URL. Stale replies are ignored upstream and never reach the
//! sink.

use std::fmt;

use metrics::counter;

/// Sink for acknowledgement outcomes.
///
/// Implement this to route ACK/NACK counts into your monitoring
/// system; [`PrometheusSink`] covers the common case and [`NoopSink`]
/// discards everything.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    /// Record an honored ACK for a type URL.
    fn record_ack(&self, type_url: &str);

    /// Record an honored NACK for a type URL.
    fn record_nack(&self, type_url: &str);
}

/// Sink backed by the `metrics` crate facade.
///
/// Emits `xds_acks_total` and `xds_nacks_total` counters labeled by
/// `type_url`; whatever recorder the process installed picks them up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    /// Create a new sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for PrometheusSink {
    fn record_ack(&self, type_url: &str) {
        counter!("xds_acks_total", "type_url" => type_url.to_string()).increment(1);
    }

    fn record_nack(&self, type_url: &str) {
        counter!("xds_nacks_total", "type_url" => type_url.to_string()).increment(1);
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Create a new sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for NoopSink {
    fn record_ack(&self, _type_url: &str) {}

    fn record_nack(&self, _type_url: &str) {}
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use xds_core::TypeUrl;

    #[test]
    fn recording_sink_counts_by_kind() {
        let sink = RecordingSink::new();

        sink.record_ack(TypeUrl::CLUSTER);
        sink.record_ack(TypeUrl::ROUTE);
        sink.record_nack(TypeUrl::CLUSTER);

        assert_eq!(sink.acks(), 2);
        assert_eq!(sink.nacks(), 1);
        assert_eq!(sink.events()[2], (TypeUrl::CLUSTER.to_string(), false));
    }

    #[test]
    fn noop_sink_is_inert() {
        let sink = NoopSink::new();
        sink.record_ack(TypeUrl::CLUSTER);
        sink.record_nack(TypeUrl::CLUSTER);
    }
}
