//! # xds-server
//!
//! Discovery-protocol reconciliation core for meshwork-xds.
//!
//! This crate sits between the resource cache and a transport layer:
//!
//! - [`DiscoveryServer`] - Inbound call surface, one method per decoded
//!   protocol message
//! - [`Watch`] - Per-(subscriber, type) subscription state machine with
//!   nonce-correlated ACK/NACK handling
//! - [`PushSink`] - Outbound boundary the transport implements
//! - [`MetricsSink`] - ACK/NACK accounting by type URL
//! - Graceful shutdown with session draining
//!
//! ## Concurrency model
//!
//! Every subscriber gets one session task that owns all of that
//! subscriber's watches. Inbound calls and cache change events are
//! messages into that task, so per-subscriber delivery is strictly
//! ordered without a global lock, and a slow subscriber backpressures
//! only itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xds_cache::ResourceCache;
//! use xds_server::{DiscoveryServer, PrometheusSink};
//!
//! let cache = Arc::new(ResourceCache::new());
//! let server = DiscoveryServer::builder()
//!     .cache(Arc::clone(&cache))
//!     .push_sink(transport_sink)
//!     .metrics_sink(Arc::new(PrometheusSink::new()))
//!     .build()?;
//!
//! // Transport delivers decoded messages:
//! server.subscribe(&subscriber, clusters.clone(), None).await?;
//! server.ack(&subscriber, clusters, nonce).await;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod metrics;
mod push;
mod server;
mod session;
pub mod shutdown;
mod watch;


pub use builder::DiscoveryServerBuilder;
pub use config::{ResumePolicy, ServerConfig};
pub use metrics::{MetricsSink, NoopSink, PrometheusSink};
pub use push::{Push, PushSink};
pub use server::DiscoveryServer;
pub use session::ResumeState;
pub use shutdown::ShutdownController;
pub use watch::{Watch, WatchState};
