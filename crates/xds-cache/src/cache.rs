//! Versioned resource cache partitioned by type URL.
//!
//! The cache holds one immutable [`Snapshot`] per type URL. The
//! [`ResourceCache`] implementation uses `DashMap` for lock-free
//! concurrent access; mutations to different types never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};
use xds_core::{BoxResource, TypeUrl, Version, VersionGenerator, XdsError, XdsResult};

use crate::notify::ChangeRouter;
use crate::snapshot::Snapshot;
use crate::stats::CacheStats;

/// The authoritative, versioned store of discovery resources.
///
/// This cache implementation:
/// - Partitions resources by type URL; each partition is an immutable,
///   atomically replaced [`Snapshot`]
/// - Mints versions from one monotonic generator, so versions within a
///   partition are strictly increasing even under concurrent owners
/// - Fans out a change event after every published mutation
/// - Tracks statistics for monitoring
///
/// ## Thread Safety
///
/// All operations are thread-safe and non-blocking for readers. The
/// version for a mutation is minted while holding the partition's
/// `DashMap` entry guard, so two racing mutations to the same type
/// publish in version order.
///
/// ## Important
///
/// All `DashMap` references are dropped before notification and before
/// any async operation, so no lock is ever held across an await point.
#[derive(Debug)]
pub struct ResourceCache {
    /// Snapshots keyed by type URL.
    partitions: DashMap<TypeUrl, Arc<Snapshot>>,
    /// Version source shared by every partition.
    versions: VersionGenerator,
    /// Change fan-out.
    router: ChangeRouter,
    /// Statistics.
    stats: CacheStats,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    /// Create a new cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    /// Create a new cache with a specific initial partition capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            partitions: DashMap::with_capacity(capacity),
            versions: VersionGenerator::new(),
            router: ChangeRouter::new(),
            stats: CacheStats::new(),
        }
    }

    /// Get the change router for registering listeners.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &ChangeRouter {
        &self.router
    }

    /// Get cache statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Replace the full resource set for a type URL.
    ///
    /// Atomic swap: readers see either the old set or the new set,
    /// never a mix. The version is bumped unconditionally, even when
    /// the new set is identical to the old one. Returns the version the
    /// partition reached.
    ///
    /// Fails with [`XdsError::InvalidResourceSet`] on a duplicate name
    /// and [`XdsError::TypeUrlMismatch`] on a foreign resource; the
    /// prior snapshot stays in place and no event is fanned out.
    pub fn replace(&self, type_url: TypeUrl, resources: Vec<BoxResource>) -> XdsResult<Version> {
        let version = {
            let entry = self.partitions.entry(type_url.clone());
            // Minted under the entry guard: racing mutators to the same
            // partition publish in version order.
            let version = self.versions.next();
            let snapshot = match Snapshot::new(type_url.clone(), version, resources) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    self.stats.record_rejected();
                    return Err(err);
                }
            };
            entry.insert(Arc::new(snapshot));
            version
        };

        self.stats.record_replace();
        debug!(type_url = %type_url, version = %version, "replaced resource set");

        // No DashMap lock held
        self.notify(&type_url, version);
        Ok(version)
    }

    /// Insert or overwrite a single resource.
    ///
    /// Read-modify-replace on the partition: the rest of the set is
    /// untouched. Creates the partition if the type URL has never been
    /// written. Returns the version the partition reached.
    pub fn upsert(&self, type_url: TypeUrl, resource: BoxResource) -> XdsResult<Version> {
        if resource.type_url() != type_url.as_str() {
            self.stats.record_rejected();
            return Err(XdsError::TypeUrlMismatch {
                type_url: type_url.as_str().to_string(),
                actual: resource.type_url().to_string(),
                name: resource.name().to_string(),
            });
        }

        let name = resource.name().to_string();
        let version = {
            let mut entry = self
                .partitions
                .entry(type_url.clone())
                .or_insert_with(|| Arc::new(Snapshot::empty(type_url.clone())));
            let version = self.versions.next();
            let next = entry.value().with_resource(version, resource);
            *entry.value_mut() = Arc::new(next);
            version
        };

        self.stats.record_upsert();
        debug!(type_url = %type_url, name = %name, version = %version, "upserted resource");

        self.notify(&type_url, version);
        Ok(version)
    }

    /// Remove a single resource by name.
    ///
    /// Returns the version the partition reached, or `None` if the name
    /// was absent: deleting a missing resource is a no-op with no
    /// version bump and no notification.
    pub fn delete(&self, type_url: &TypeUrl, name: &str) -> Option<Version> {
        let version = {
            let mut entry = self.partitions.get_mut(type_url)?;
            if !entry.value().contains(name) {
                trace!(type_url = %type_url, name = %name, "delete of absent resource, no-op");
                return None;
            }
            let version = self.versions.next();
            let next = entry.value().without_resource(version, name);
            *entry.value_mut() = Arc::new(next);
            version
        };

        self.stats.record_delete();
        debug!(type_url = %type_url, name = %name, version = %version, "deleted resource");

        self.notify(type_url, version);
        Some(version)
    }

    /// Get the current snapshot for a type URL.
    ///
    /// Non-blocking. An unknown type URL yields an empty snapshot at
    /// [`Version::ZERO`] rather than an absence.
    #[must_use]
    pub fn snapshot(&self, type_url: &TypeUrl) -> Arc<Snapshot> {
        // DashMap::get returns a Ref that holds a read lock.
        // We clone the Arc and drop the Ref immediately.
        match self.partitions.get(type_url).map(|r| Arc::clone(&*r)) {
            Some(snapshot) => snapshot,
            None => Arc::new(Snapshot::empty(type_url.clone())),
        }
    }

    /// Get the current version for a type URL, [`Version::ZERO`] if the
    /// type has never been written.
    #[must_use]
    pub fn version_of(&self, type_url: &TypeUrl) -> Version {
        self.partitions
            .get(type_url)
            .map(|r| r.version())
            .unwrap_or(Version::ZERO)
    }

    /// Check whether a type URL has ever been written.
    #[must_use]
    pub fn contains_type(&self, type_url: &TypeUrl) -> bool {
        self.partitions.contains_key(type_url)
    }

    /// Get all type URLs present in the cache.
    #[must_use]
    pub fn type_urls(&self) -> Vec<TypeUrl> {
        self.partitions.iter().map(|r| r.key().clone()).collect()
    }

    /// Get the number of populated partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn notify(&self, type_url: &TypeUrl, version: Version) {
        self.stats.record_notification();
        self.router.notify(type_url, version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tokio::sync::mpsc;
    use xds_core::AnyResource;

    fn resource(type_url: &str, name: &str) -> BoxResource {
        let any = prost_types::Any {
            type_url: type_url.to_string(),
            value: vec![],
        };
        Arc::new(AnyResource::new(type_url, name, any))
    }

    fn cluster(name: &str) -> BoxResource {
        resource(TypeUrl::CLUSTER, name)
    }

    #[test]
    fn cache_replace_and_snapshot() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        // Unknown type serves an empty snapshot at version zero
        let snap = cache.snapshot(&clusters);
        assert!(snap.is_empty());
        assert!(snap.version().is_zero());

        let v1 = cache
            .replace(clusters.clone(), vec![cluster("a"), cluster("b")])
            .unwrap();
        assert!(!v1.is_zero());

        let snap = cache.snapshot(&clusters);
        assert_eq!(snap.version(), v1);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn cache_replace_bumps_unconditionally() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        let v1 = cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();
        // Identical set still gets a fresh version
        let v2 = cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();
        assert!(v2 > v1);
    }

    #[test]
    fn cache_rejected_replace_leaves_prior_state() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        let v1 = cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();

        let err = cache
            .replace(clusters.clone(), vec![cluster("dup"), cluster("dup")])
            .unwrap_err();
        assert!(matches!(err, XdsError::InvalidResourceSet { .. }));

        let snap = cache.snapshot(&clusters);
        assert_eq!(snap.version(), v1);
        assert!(snap.contains("a"));
        assert_eq!(cache.stats().rejected(), 1);
    }

    #[test]
    fn cache_upsert_creates_partition() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        let v1 = cache.upsert(clusters.clone(), cluster("a")).unwrap();
        assert!(cache.contains_type(&clusters));
        assert_eq!(cache.version_of(&clusters), v1);

        // Overwrite keeps the set size
        cache.upsert(clusters.clone(), cluster("a")).unwrap();
        assert_eq!(cache.snapshot(&clusters).len(), 1);
    }

    #[test]
    fn cache_upsert_rejects_foreign_type() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        let err = cache
            .upsert(clusters.clone(), resource(TypeUrl::LISTENER, "lst"))
            .unwrap_err();
        assert!(matches!(err, XdsError::TypeUrlMismatch { .. }));
        assert!(!cache.contains_type(&clusters));
    }

    #[test]
    fn cache_delete_absent_is_noop() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        // Partition never written
        assert!(cache.delete(&clusters, "ghost").is_none());

        cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();
        let before = cache.version_of(&clusters);

        // Name absent
        assert!(cache.delete(&clusters, "ghost").is_none());
        assert_eq!(cache.version_of(&clusters), before);
        assert_eq!(cache.stats().deletes(), 0);

        // Name present
        let v = cache.delete(&clusters, "a").unwrap();
        assert!(v > before);
        assert!(cache.snapshot(&clusters).is_empty());
    }

    #[tokio::test]
    async fn cache_mutation_notifies_listeners() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();

        let (tx, mut rx) = mpsc::channel(4);
        cache.router().subscribe(clusters.clone(), tx);

        let v1 = cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.version, v1);

        let v2 = cache.upsert(clusters.clone(), cluster("b")).unwrap();
        assert_eq!(rx.recv().await.unwrap().version, v2);

        // No-op delete fans out nothing
        cache.delete(&clusters, "ghost");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cache_versions_strictly_increase_under_contention() {
        let cache = Arc::new(ResourceCache::new());
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();
        let mut handles = vec![];

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            let clusters = clusters.clone();
            handles.push(thread::spawn(move || {
                let mut versions = Vec::with_capacity(50);
                for j in 0..50 {
                    let name = format!("c-{i}-{j}");
                    versions.push(cache.upsert(clusters.clone(), cluster(&name)).unwrap());
                }
                versions
            }));
        }

        let mut all: Vec<Version> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();
        all.sort();
        all.dedup();
        // Every mutation minted a distinct version
        assert_eq!(all.len(), 400);
        assert_eq!(cache.snapshot(&clusters).len(), 400);
    }

    #[test]
    fn cache_partitions_are_independent() {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();
        let listeners: TypeUrl = TypeUrl::LISTENER.into();

        cache.replace(clusters.clone(), vec![cluster("a")]).unwrap();
        cache
            .replace(listeners.clone(), vec![resource(TypeUrl::LISTENER, "lst")])
            .unwrap();

        assert_eq!(cache.partition_count(), 2);
        assert_eq!(cache.snapshot(&clusters).len(), 1);
        assert_eq!(cache.snapshot(&listeners).len(), 1);

        cache.delete(&clusters, "a");
        assert_eq!(cache.snapshot(&listeners).len(), 1);
    }
}
