//! # xds-cache
//!
//! Versioned resource cache for the meshwork-xds control-plane core.
//!
//! This crate provides the authoritative resource store:
//!
//! - [`ResourceCache`] - DashMap-partitioned cache, one snapshot per type URL
//! - [`Snapshot`] - Immutable, versioned resource set for one type
//! - [`ChangeRouter`] - Non-blocking fan-out of cache change events
//!
//! ## Key Design Decisions
//!
//! - Uses `DashMap` for lock-free concurrent access
//! - Snapshots are immutable and atomically replaced
//! - Versions are minted under the partition's entry guard, so a
//!   partition's published versions are strictly increasing
//! - Change events are best-effort wake-ups delivered with `try_send`;
//!   consumers re-read the cache, so dropped events cost nothing
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xds_cache::ResourceCache;
//! use xds_core::{AnyResource, TypeUrl};
//!
//! let cache = ResourceCache::new();
//! let clusters: TypeUrl = TypeUrl::CLUSTER.into();
//!
//! let payload = prost_types::Any {
//!     type_url: TypeUrl::CLUSTER.to_string(),
//!     value: vec![],
//! };
//! let resource = Arc::new(AnyResource::new(TypeUrl::CLUSTER, "backend", payload));
//!
//! let version = cache.replace(clusters.clone(), vec![resource]).unwrap();
//! assert_eq!(cache.snapshot(&clusters).version(), version);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod notify;
mod snapshot;
mod stats;

pub use cache::ResourceCache;
pub use notify::{ChangeEvent, ChangeRouter, ListenerId};
pub use snapshot::Snapshot;
pub use stats::CacheStats;
