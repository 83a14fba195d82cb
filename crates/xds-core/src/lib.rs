//! # xds-core
//!
//! Core types and error handling for the meshwork-xds control-plane
//! core.
//!
//! This crate provides the foundational types used across the other
//! crates:
//!
//! - [`XdsError`] - Error type covering the cache and server failure modes
//! - [`Version`] / [`Nonce`] - Ordered snapshot versions and push
//!   correlation nonces, with their monotonic generators
//! - [`SubscriberId`] - Opaque proxy-instance identity
//! - [`Resource`] - Trait for named, typed, opaque resource payloads
//! - [`TypeUrl`] - Type URL handling and constants
//!
//! ## Example
//!
//! ```rust
//! use xds_core::{SubscriberId, TypeUrl, VersionGenerator};
//!
//! let subscriber = SubscriberId::new("sidecar-7f3a");
//! let versions = VersionGenerator::new();
//!
//! let v1 = versions.next();
//! assert!(!v1.is_zero());
//! assert_eq!(TypeUrl::new(TypeUrl::CLUSTER).short_name(), "Cluster");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod resource;
mod subscriber;
mod type_url;
mod version;

pub use error::{XdsError, XdsResult};
pub use resource::{AnyResource, BoxResource, Resource};
pub use subscriber::SubscriberId;
pub use type_url::TypeUrl;
pub use version::{Nonce, NonceGenerator, Version, VersionGenerator};
