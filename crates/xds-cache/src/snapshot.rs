//! Snapshot: immutable, versioned resource set for one type URL.
//!
//! A snapshot is a consistent state-of-the-world view of every resource
//! of one type. Snapshots are:
//!
//! - **Immutable**: Once created, a snapshot cannot be modified
//! - **Versioned**: Each snapshot carries the version minted for it
//! - **Complete**: A snapshot always holds the full resource set, never
//!   a delta

use std::collections::HashMap;

use xds_core::{BoxResource, TypeUrl, Version, XdsError, XdsResult};

/// An immutable, versioned set of resources of a single type.
///
/// Snapshots are the unit of cache storage and of subscriber pushes.
/// Resource names are unique within a snapshot; lookup by name is O(1)
/// and iteration preserves the order resources were supplied in.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Type URL every resource in this snapshot belongs to.
    type_url: TypeUrl,
    /// Version minted when this snapshot was published.
    version: Version,
    /// Resources in insertion order.
    resources: Vec<BoxResource>,
    /// Name to position in `resources`.
    index: HashMap<String, usize>,
}

impl Snapshot {
    /// Create a snapshot from a full resource set.
    ///
    /// Fails with [`XdsError::InvalidResourceSet`] if two resources
    /// share a name, and with [`XdsError::TypeUrlMismatch`] if a
    /// resource carries a different type URL than the snapshot.
    pub fn new(
        type_url: TypeUrl,
        version: Version,
        resources: Vec<BoxResource>,
    ) -> XdsResult<Self> {
        let mut index = HashMap::with_capacity(resources.len());
        for (pos, resource) in resources.iter().enumerate() {
            if resource.type_url() != type_url.as_str() {
                return Err(XdsError::TypeUrlMismatch {
                    type_url: type_url.as_str().to_string(),
                    actual: resource.type_url().to_string(),
                    name: resource.name().to_string(),
                });
            }
            if index.insert(resource.name().to_string(), pos).is_some() {
                return Err(XdsError::InvalidResourceSet {
                    type_url: type_url.as_str().to_string(),
                    name: resource.name().to_string(),
                });
            }
        }

        Ok(Self {
            type_url,
            version,
            resources,
            index,
        })
    }

    /// Create an empty snapshot at [`Version::ZERO`].
    ///
    /// This is what the cache serves for a type URL that has never been
    /// written; subscribers to such a type receive an empty resource
    /// set rather than no push at all.
    #[must_use]
    pub fn empty(type_url: TypeUrl) -> Self {
        Self {
            type_url,
            version: Version::ZERO,
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Get the type URL for this snapshot.
    #[inline]
    #[must_use]
    pub fn type_url(&self) -> &TypeUrl {
        &self.type_url
    }

    /// Get the version of this snapshot.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a resource by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.index.get(name).map(|&pos| &self.resources[pos])
    }

    /// Check whether a resource with this name is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of resources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if there are no resources.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Get the resources in insertion order.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[BoxResource] {
        &self.resources
    }

    /// Iterate over resource names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name())
    }

    /// Copy the resource handles into a vec, cheap `Arc` clones.
    #[must_use]
    pub fn to_vec(&self) -> Vec<BoxResource> {
        self.resources.clone()
    }

    /// Build the successor snapshot with one resource added or replaced.
    pub(crate) fn with_resource(&self, version: Version, resource: BoxResource) -> Self {
        let mut resources = self.resources.clone();
        let mut index = self.index.clone();

        match index.get(resource.name()) {
            Some(&pos) => resources[pos] = resource,
            None => {
                index.insert(resource.name().to_string(), resources.len());
                resources.push(resource);
            }
        }

        Self {
            type_url: self.type_url.clone(),
            version,
            resources,
            index,
        }
    }

    /// Build the successor snapshot with one resource removed.
    ///
    /// Caller has already checked the name is present.
    pub(crate) fn without_resource(&self, version: Version, name: &str) -> Self {
        let resources: Vec<BoxResource> = self
            .resources
            .iter()
            .filter(|r| r.name() != name)
            .cloned()
            .collect();
        let index = resources
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.name().to_string(), pos))
            .collect();

        Self {
            type_url: self.type_url.clone(),
            version,
            resources,
            index,
        }
    }
}
