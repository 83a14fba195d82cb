//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of full replaces published.
    replaces: AtomicU64,
    /// Number of upserts published.
    upserts: AtomicU64,
    /// Number of deletes published.
    deletes: AtomicU64,
    /// Number of mutations rejected by validation.
    rejected: AtomicU64,
    /// Number of change notifications fanned out.
    notifications: AtomicU64,
}

impl CacheStats {
    /// Create new cache statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published replace.
    #[inline]
    pub fn record_replace(&self) {
        self.replaces.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published upsert.
    #[inline]
    pub fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published delete.
    #[inline]
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a mutation rejected by validation.
    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a change notification fan-out.
    #[inline]
    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total replaces published.
    #[inline]
    #[must_use]
    pub fn replaces(&self) -> u64 {
        self.replaces.load(Ordering::Relaxed)
    }

    /// Get total upserts published.
    #[inline]
    #[must_use]
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Get total deletes published.
    #[inline]
    #[must_use]
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Get total rejected mutations.
    #[inline]
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Get total change notifications fanned out.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Get total published mutations of any kind.
    #[must_use]
    pub fn mutations(&self) -> u64 {
        self.replaces() + self.upserts() + self.deletes()
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.replaces.store(0, Ordering::Relaxed);
        self.upserts.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.notifications.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_stats_basic() {
        let stats = CacheStats::new();

        stats.record_replace();
        stats.record_upsert();
        stats.record_upsert();
        stats.record_delete();
        stats.record_rejected();

        assert_eq!(stats.replaces(), 1);
        assert_eq!(stats.upserts(), 2);
        assert_eq!(stats.deletes(), 1);
        assert_eq!(stats.rejected(), 1);
        assert_eq!(stats.mutations(), 4);
    }

    #[test]
    fn cache_stats_reset() {
        let stats = CacheStats::new();
        stats.record_replace();
        stats.record_notification();
        stats.reset();
        assert_eq!(stats.mutations(), 0);
        assert_eq!(stats.notifications(), 0);
    }
}
