//! Server configuration.

use std::time::Duration;

/// Policy for handling a client-supplied resume state on re-subscribe.
///
/// After a transport reconnect a subscriber may report the version and
/// nonce it last acknowledged. Upstream systems differ on whether that
/// report can be trusted, so the choice is configuration rather than a
/// hard-coded behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Seed the watch from the reported state; an already-synchronized
    /// subscriber receives no redundant push.
    #[default]
    Trust,
    /// Ignore the reported state and always push the current snapshot.
    FreshPush,
}

/// Configuration for the discovery server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How to treat client-supplied resume state on re-subscribe.
    pub resume_policy: ResumePolicy,
    /// Depth of each session's message inbox.
    pub session_inbox_depth: usize,
    /// Depth of each session's cache change inbox. Change events are
    /// wake-ups; a shallow inbox only coalesces them.
    pub change_inbox_depth: usize,
    /// Grace period for draining sessions on shutdown.
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resume_policy: ResumePolicy::Trust,
            session_inbox_depth: 64,
            change_inbox_depth: 16,
            grace_period: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.resume_policy, ResumePolicy::Trust);
        assert!(config.session_inbox_depth > 0);
        assert!(config.change_inbox_depth > 0);
        assert_eq!(config.grace_period, Duration::from_secs(30));
    }
}
