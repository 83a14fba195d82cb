//! # meshwork-xds
//!
//! Discovery control-plane core for Rust.
//!
//! This crate provides the protocol-agnostic heart of an xDS-style
//! control plane:
//!
//! - Versioned, type-partitioned resource cache
//! - Per-subscriber watch state machines with nonce-correlated ACK/NACK
//! - Session workers that fan cache changes out to subscribers
//! - Pluggable push and metrics boundaries for the transport layer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meshwork_xds::prelude::*;
//!
//! // Create the cache and the server
//! let cache = Arc::new(ResourceCache::new());
//! let server = DiscoveryServer::builder()
//!     .cache(Arc::clone(&cache))
//!     .push_sink(my_transport_sink)
//!     .build()?;
//!
//! // Upstream owners mutate the cache
//! cache.replace(TypeUrl::CLUSTER.into(), resources)?;
//!
//! // The transport reports decoded subscriber messages
//! server.subscribe(&subscriber, TypeUrl::CLUSTER.into(), None).await?;
//! ```
//!
//! ## Architecture
//!
//! This library is organized into several crates:
//!
//! - `xds-core` - Core types, traits, and error handling
//! - `xds-cache` - Versioned resource cache with change fan-out
//! - `xds-server` - Watch state machines and the reconciliation loop
//!
//! This crate (`meshwork-xds`) re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **No panics in library code** - All errors are returned as `Result`
//! 2. **No locks held across await points** - Uses DashMap and careful design
//! 3. **No global lock** - Each subscriber's delivery is owned by one task
//! 4. **Observable** - Built-in metrics and tracing support

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export all sub-crates
pub use xds_cache as cache;
pub use xds_core as core;
pub use xds_server as server;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use meshwork_xds::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use xds_core::{
        AnyResource, BoxResource, Nonce, Resource, SubscriberId, TypeUrl, Version, XdsError,
        XdsResult,
    };

    // Cache types
    pub use xds_cache::{CacheStats, ChangeEvent, ResourceCache, Snapshot};

    // Server types
    pub use xds_server::{
        DiscoveryServer, DiscoveryServerBuilder, MetricsSink, Push, PushSink, ResumePolicy,
        ResumeState, ServerConfig,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("meshwork-xds {} (MSRV {})", VERSION, MSRV)
    }
}
