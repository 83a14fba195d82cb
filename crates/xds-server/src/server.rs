//! The discovery server: inbound call surface and session registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{oneshot, watch as signal};
use tracing::{debug, info};
use xds_cache::ResourceCache;
use xds_core::{Nonce, NonceGenerator, SubscriberId, TypeUrl, XdsError, XdsResult};

use crate::builder::DiscoveryServerBuilder;
use crate::config::ServerConfig;
use crate::metrics::MetricsSink;
use crate::push::PushSink;
use crate::session::{self, ResumeState, SessionHandle, SessionMessage};
use crate::shutdown::ShutdownController;

/// The reconciliation core of the control plane.
///
/// The transport layer calls one method per decoded protocol message;
/// the server routes each call into the owning subscriber's session
/// worker and the worker answers through the [`PushSink`]. There is no
/// global lock: sessions only share the cache and the sink.
#[derive(Debug)]
pub struct DiscoveryServer {
    /// Shared cache.
    cache: Arc<ResourceCache>,
    /// Outbound boundary.
    sink: Arc<dyn PushSink>,
    /// ACK/NACK accounting.
    metrics: Arc<dyn MetricsSink>,
    /// Server configuration.
    config: ServerConfig,
    /// Nonce source shared by every session.
    nonces: Arc<NonceGenerator>,
    /// Live sessions keyed by subscriber.
    sessions: Arc<DashMap<SubscriberId, SessionHandle>>,
    /// Shutdown controller.
    shutdown: ShutdownController,
    /// Signal receiver cloned into each session.
    shutdown_rx: signal::Receiver<bool>,
}

impl DiscoveryServer {
    /// Create a new builder for configuring the server.
    #[must_use]
    pub fn builder() -> DiscoveryServerBuilder {
        DiscoveryServerBuilder::new()
    }

    pub(crate) fn new(
        cache: Arc<ResourceCache>,
        sink: Arc<dyn PushSink>,
        metrics: Arc<dyn MetricsSink>,
        config: ServerConfig,
    ) -> Self {
        let shutdown = ShutdownController::new();
        let shutdown_rx = shutdown.subscribe();
        Self {
            cache,
            sink,
            metrics,
            config,
            nonces: Arc::new(NonceGenerator::new()),
            sessions: Arc::new(DashMap::new()),
            shutdown,
            shutdown_rx,
        }
    }

    /// Get a reference to the cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Get the server configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Register a subscription for `(subscriber, type_url)`.
    ///
    /// Creates the session on first contact. `resume` carries the
    /// subscriber's reported state after a reconnect; whether it is
    /// honored follows the configured
    /// [`ResumePolicy`](crate::ResumePolicy).
    pub async fn subscribe(
        &self,
        subscriber: &SubscriberId,
        type_url: TypeUrl,
        resume: Option<ResumeState>,
    ) -> XdsResult<()> {
        loop {
            if self.shutdown.is_shutdown() {
                return Err(XdsError::Shutdown);
            }

            let handle = match self.sessions.entry(subscriber.clone()) {
                Entry::Occupied(occupied) => occupied.get().clone(),
                Entry::Vacant(vacant) => {
                    let handle = self.spawn_session(subscriber);
                    vacant.insert(handle.clone());
                    handle
                }
            };

            // The worker confirms once the watch is registered. A
            // worker that retires with the message still queued drops
            // the confirmation instead, and the subscription must be
            // re-delivered to its successor.
            let (done, registered) = oneshot::channel();
            let msg = SessionMessage::Subscribe {
                type_url: type_url.clone(),
                resume,
                done,
            };
            if handle.dispatch(msg).await.is_ok() && registered.await.is_ok() {
                return Ok(());
            }

            debug!(subscriber = %subscriber, "session handle stale, respawning");
            self.sessions.remove_if(subscriber, |_, h| h.is_closed());
        }
    }

    /// Drop the subscription for `(subscriber, type_url)`.
    ///
    /// Removing the last watch retires the session.
    pub async fn unsubscribe(&self, subscriber: &SubscriberId, type_url: TypeUrl) {
        self.dispatch(subscriber, SessionMessage::Unsubscribe { type_url })
            .await;
    }

    /// Report a subscriber's ACK for the push identified by `nonce`.
    ///
    /// A stale nonce or an unknown subscription is silently dropped;
    /// both are expected races, not errors.
    pub async fn ack(&self, subscriber: &SubscriberId, type_url: TypeUrl, nonce: Nonce) {
        self.dispatch(subscriber, SessionMessage::Ack { type_url, nonce })
            .await;
    }

    /// Report a subscriber's NACK for the push identified by `nonce`.
    pub async fn nack(
        &self,
        subscriber: &SubscriberId,
        type_url: TypeUrl,
        nonce: Nonce,
        detail: impl Into<String>,
    ) {
        self.dispatch(
            subscriber,
            SessionMessage::Nack {
                type_url,
                nonce,
                detail: detail.into(),
            },
        )
        .await;
    }

    /// Report that the subscriber's transport session ended.
    ///
    /// Destroys all of the subscriber's watches.
    pub async fn session_closed(&self, subscriber: &SubscriberId) {
        // Deregister the handle before delivering the close so a
        // reconnect's subscribe cannot queue behind it in a worker
        // that is about to retire.
        let Some((_, handle)) = self.sessions.remove(subscriber) else {
            debug!(subscriber = %subscriber, "close for unknown session, dropping");
            return;
        };
        if handle.dispatch(SessionMessage::Close).await.is_err() {
            debug!(subscriber = %subscriber, "session already retired, close dropped");
        }
    }

    /// Gracefully shut down: stop accepting subscriptions, signal all
    /// sessions, and wait up to the configured grace period for them
    /// to retire. Returns `true` if every session drained in time.
    pub async fn shutdown(&self) -> bool {
        info!(sessions = self.session_count(), "discovery server shutting down");
        self.shutdown.shutdown(self.config.grace_period).await
    }

    async fn dispatch(&self, subscriber: &SubscriberId, msg: SessionMessage) {
        let handle = match self.sessions.get(subscriber) {
            Some(handle) => handle.clone(),
            None => {
                debug!(subscriber = %subscriber, ?msg, "message for unknown session, dropping");
                return;
            }
        };
        if handle.dispatch(msg).await.is_err() {
            debug!(subscriber = %subscriber, "session already retired, message dropped");
        }
    }

    fn spawn_session(&self, subscriber: &SubscriberId) -> SessionHandle {
        session::spawn(
            subscriber.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.sink),
            Arc::clone(&self.metrics),
            &self.config,
            Arc::clone(&self.nonces),
            self.shutdown_rx.clone(),
            Arc::clone(&self.sessions),
            self.shutdown.register_operation(),
        )
    }
}
