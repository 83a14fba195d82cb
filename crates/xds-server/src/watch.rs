//! Per-(subscriber, type) subscription state machine.
//!
//! A watch records what one subscriber has been sent and has
//! acknowledged for one resource type. Watches for different types are
//! independent; a watch is owned by exactly one session task, so it
//! needs no internal synchronization.

use tracing::trace;
use xds_core::{Nonce, TypeUrl, Version};

/// State of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No response in flight; the subscriber may be behind the cache.
    Unsent,
    /// A response was sent and its ACK/NACK has not arrived yet.
    Pending,
    /// The last sent response was acknowledged.
    Acked,
}

/// Subscription record for one (subscriber, type) pair.
///
/// Tracks the acknowledged baseline separately from the last sent
/// version: the cache can advance many versions while a response is in
/// flight, and a slow or NACKing subscriber must keep its last good
/// configuration until a fresh ACK moves the baseline forward.
#[derive(Debug, Clone)]
pub struct Watch {
    type_url: TypeUrl,
    state: WatchState,
    last_acked: Version,
    last_sent: Version,
    last_nonce: Option<Nonce>,
}

impl Watch {
    /// Create a fresh watch that has seen nothing.
    #[must_use]
    pub fn new(type_url: TypeUrl) -> Self {
        Self {
            type_url,
            state: WatchState::Unsent,
            last_acked: Version::ZERO,
            last_sent: Version::ZERO,
            last_nonce: None,
        }
    }

    /// Create a watch seeded from subscriber-reported resume state.
    ///
    /// The watch starts Acked at the reported version, so a subscriber
    /// that is already synchronized with the cache receives no
    /// redundant push.
    #[must_use]
    pub fn resumed(type_url: TypeUrl, version: Version, nonce: Nonce) -> Self {
        Self {
            type_url,
            state: WatchState::Acked,
            last_acked: version,
            last_sent: version,
            last_nonce: Some(nonce),
        }
    }

    /// Get the type URL this watch covers.
    #[inline]
    #[must_use]
    pub fn type_url(&self) -> &TypeUrl {
        &self.type_url
    }

    /// Get the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Get the acknowledged baseline version.
    #[inline]
    #[must_use]
    pub fn last_acked(&self) -> Version {
        self.last_acked
    }

    /// Get the version of the most recent push.
    #[inline]
    #[must_use]
    pub fn last_sent(&self) -> Version {
        self.last_sent
    }

    /// Get the nonce of the most recent push.
    #[inline]
    #[must_use]
    pub fn last_nonce(&self) -> Option<Nonce> {
        self.last_nonce
    }

    /// Check whether a push should be built against the given cache
    /// version.
    ///
    /// Never while a response is in flight (no duplicate pushes for the
    /// same state). An Unsent watch is always due: either it has never
    /// been served, or a NACK re-armed it for the latest snapshot. An
    /// Acked watch is due only when the cache has moved past its
    /// baseline.
    #[must_use]
    pub fn is_due(&self, current: Version) -> bool {
        match self.state {
            WatchState::Pending => false,
            WatchState::Unsent => true,
            WatchState::Acked => current > self.last_acked,
        }
    }

    /// Record a push: the response for `version` left with `nonce`.
    pub fn record_sent(&mut self, version: Version, nonce: Nonce) {
        self.state = WatchState::Pending;
        self.last_sent = version;
        self.last_nonce = Some(nonce);
    }

    /// Apply an ACK. Returns `true` if the nonce matched and the
    /// baseline advanced; a stale nonce changes nothing.
    pub fn handle_ack(&mut self, nonce: Nonce) -> bool {
        if self.last_nonce != Some(nonce) {
            trace!(type_url = %self.type_url, nonce = %nonce, "stale ack nonce, ignoring");
            return false;
        }
        self.last_acked = self.last_sent;
        self.state = WatchState::Acked;
        true
    }

    /// Apply a NACK. Returns `true` if the nonce matched; the watch
    /// re-arms for the latest snapshot but keeps its acknowledged
    /// baseline, so the subscriber retains its last good configuration.
    pub fn handle_nack(&mut self, nonce: Nonce) -> bool {
        if self.last_nonce != Some(nonce) {
            trace!(type_url = %self.type_url, nonce = %nonce, "stale nack nonce, ignoring");
            return false;
        }
        self.state = WatchState::Unsent;
        true
    }

    /// Re-arm the watch for an explicit retry (manual re-subscribe).
    ///
    /// Leaves a Pending watch untouched: the in-flight response still
    /// owns the nonce.
    pub fn rearm(&mut self) {
        if self.state != WatchState::Pending {
            self.state = WatchState::Unsent;
        }
    }
}
