//! Per-subscriber session workers.
//!
//! Each connected subscriber gets one worker task that owns every
//! watch for that subscriber. The worker multiplexes its message inbox
//! (decoded protocol messages), its cache change inbox (wake-ups from
//! the router), and the shutdown signal. Because a single task owns
//! the watches, per-(subscriber, type) pushes are version-ordered with
//! no locking, and one slow subscriber suspends only its own worker.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch as signal};
use tracing::{debug, info, trace, warn};
use xds_cache::{ChangeEvent, ListenerId, ResourceCache};
use xds_core::{Nonce, NonceGenerator, SubscriberId, TypeUrl, Version};

use crate::config::{ResumePolicy, ServerConfig};
use crate::metrics::MetricsSink;
use crate::push::{Push, PushSink};
use crate::shutdown::OperationGuard;
use crate::watch::Watch;

/// Resume state a subscriber reports on re-subscribe after a
/// transport reconnect.
#[derive(Debug, Clone, Copy)]
pub struct ResumeState {
    /// Version the subscriber last acknowledged.
    pub version: Version,
    /// Nonce of the response it acknowledged.
    pub nonce: Nonce,
}

/// One decoded protocol message, dispatched into the owning session.
#[derive(Debug)]
pub(crate) enum SessionMessage {
    Subscribe {
        type_url: TypeUrl,
        resume: Option<ResumeState>,
        /// Fired once the watch is registered. A retiring worker drops
        /// this unfired, telling the server to re-deliver.
        done: oneshot::Sender<()>,
    },
    Unsubscribe {
        type_url: TypeUrl,
    },
    Ack {
        type_url: TypeUrl,
        nonce: Nonce,
    },
    Nack {
        type_url: TypeUrl,
        nonce: Nonce,
        detail: String,
    },
    Close,
}

/// Handle the server keeps per live session.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
}

impl SessionHandle {
    /// Dispatch a message into the session, suspending on a full
    /// inbox. Fails only when the worker is gone, handing the message
    /// back to the caller.
    pub(crate) async fn dispatch(&self, msg: SessionMessage) -> Result<(), SessionMessage> {
        self.sender.send(msg).await.map_err(|e| e.0)
    }

    /// Check whether the owning worker has retired.
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Check whether two handles point at the same worker.
    pub(crate) fn same_session(&self, other: &SessionHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

/// Counters for one session's lifetime, reported when it retires.
#[derive(Debug, Default)]
struct SessionStats {
    subscribes: u64,
    pushes: u64,
    acks: u64,
    nacks: u64,
}

struct SessionWatch {
    watch: Watch,
    listener: ListenerId,
}

/// Worker task owning all watches of one subscriber.
pub(crate) struct SessionWorker {
    subscriber: SubscriberId,
    cache: Arc<ResourceCache>,
    sink: Arc<dyn PushSink>,
    metrics: Arc<dyn MetricsSink>,
    resume_policy: ResumePolicy,
    nonces: Arc<NonceGenerator>,
    inbox: mpsc::Receiver<SessionMessage>,
    change_tx: mpsc::Sender<ChangeEvent>,
    changes: mpsc::Receiver<ChangeEvent>,
    shutdown: signal::Receiver<bool>,
    sessions: Arc<DashMap<SubscriberId, SessionHandle>>,
    /// This worker's own handle, for identity checks at retirement.
    handle: SessionHandle,
    watches: HashMap<TypeUrl, SessionWatch>,
    stats: SessionStats,
    _guard: OperationGuard,
}

/// Spawn a session worker and return its handle.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn(
    subscriber: SubscriberId,
    cache: Arc<ResourceCache>,
    sink: Arc<dyn PushSink>,
    metrics: Arc<dyn MetricsSink>,
    config: &ServerConfig,
    nonces: Arc<NonceGenerator>,
    shutdown: signal::Receiver<bool>,
    sessions: Arc<DashMap<SubscriberId, SessionHandle>>,
    guard: OperationGuard,
) -> SessionHandle {
    let (tx, inbox) = mpsc::channel(config.session_inbox_depth);
    let (change_tx, changes) = mpsc::channel(config.change_inbox_depth);
    let handle = SessionHandle { sender: tx };

    let worker = SessionWorker {
        subscriber,
        cache,
        sink,
        metrics,
        resume_policy: config.resume_policy,
        nonces,
        inbox,
        change_tx,
        changes,
        shutdown,
        sessions,
        handle: handle.clone(),
        watches: HashMap::new(),
        stats: SessionStats::default(),
        _guard: guard,
    };
    tokio::spawn(worker.run());

    handle
}

impl SessionWorker {
    async fn run(mut self) {
        // A receiver cloned after the signal fired has already seen the
        // value, so `changed()` would never wake this worker.
        if *self.shutdown.borrow() {
            debug!(subscriber = %self.subscriber, "session spawned during shutdown, retiring");
            self.retire();
            return;
        }

        info!(subscriber = %self.subscriber, "session started");

        loop {
            tokio::select! {
                msg = self.inbox.recv() => {
                    match msg {
                        Some(msg) => {
                            if self.handle_message(msg).await.is_break() {
                                break;
                            }
                        }
                        // The worker holds its own sender, so the inbox
                        // only closes if it is closed explicitly.
                        None => break,
                    }
                }
                event = self.changes.recv() => {
                    // The worker holds a sender clone, so this arm only
                    // ever yields real events.
                    if let Some(event) = event {
                        if self.handle_change(event).await.is_break() {
                            break;
                        }
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        debug!(subscriber = %self.subscriber, "session stopping for shutdown");
                        break;
                    }
                }
            }
        }

        self.retire();
    }

    fn retire(&mut self) {
        for entry in self.watches.values() {
            self.cache.router().unsubscribe(entry.listener);
        }
        self.watches.clear();
        // A reconnect may already have registered a successor session
        // under this subscriber; only remove our own handle.
        self.sessions
            .remove_if(&self.subscriber, |_, h| h.same_session(&self.handle));

        info!(
            subscriber = %self.subscriber,
            subscribes = self.stats.subscribes,
            pushes = self.stats.pushes,
            acks = self.stats.acks,
            nacks = self.stats.nacks,
            "session retired"
        );
    }

    async fn handle_message(&mut self, msg: SessionMessage) -> ControlFlow<()> {
        match msg {
            SessionMessage::Subscribe {
                type_url,
                resume,
                done,
            } => self.handle_subscribe(type_url, resume, done).await,
            SessionMessage::Unsubscribe { type_url } => self.handle_unsubscribe(&type_url),
            SessionMessage::Ack { type_url, nonce } => self.handle_ack(type_url, nonce).await,
            SessionMessage::Nack {
                type_url,
                nonce,
                detail,
            } => self.handle_nack(&type_url, nonce, &detail),
            SessionMessage::Close => {
                debug!(subscriber = %self.subscriber, "session closed by transport");
                ControlFlow::Break(())
            }
        }
    }

    async fn handle_subscribe(
        &mut self,
        type_url: TypeUrl,
        resume: Option<ResumeState>,
        done: oneshot::Sender<()>,
    ) -> ControlFlow<()> {
        self.stats.subscribes += 1;

        let seeded = match (resume, self.resume_policy) {
            (Some(resume), ResumePolicy::Trust) => {
                Some(Watch::resumed(type_url.clone(), resume.version, resume.nonce))
            }
            _ => None,
        };

        match self.watches.get_mut(&type_url) {
            Some(entry) => match seeded {
                Some(watch) => entry.watch = watch,
                // Plain re-subscribe is a manual retry
                None => entry.watch.rearm(),
            },
            None => {
                let listener = self
                    .cache
                    .router()
                    .subscribe(type_url.clone(), self.change_tx.clone());
                let watch = seeded.unwrap_or_else(|| Watch::new(type_url.clone()));
                debug!(
                    subscriber = %self.subscriber,
                    type_url = %type_url,
                    resumed = resume.is_some() && self.resume_policy == ResumePolicy::Trust,
                    "watch created"
                );
                self.watches.insert(type_url.clone(), SessionWatch { watch, listener });
            }
        }

        // The caller may only report success once the watch exists.
        let _ = done.send(());
        self.evaluate(&type_url).await
    }

    fn handle_unsubscribe(&mut self, type_url: &TypeUrl) -> ControlFlow<()> {
        match self.watches.remove(type_url) {
            Some(entry) => {
                self.cache.router().unsubscribe(entry.listener);
                debug!(subscriber = %self.subscriber, type_url = %type_url, "watch destroyed");
            }
            None => {
                debug!(
                    subscriber = %self.subscriber,
                    type_url = %type_url,
                    "unsubscribe for unknown watch, dropping"
                );
            }
        }

        if self.watches.is_empty() {
            debug!(subscriber = %self.subscriber, "last watch gone, retiring session");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    async fn handle_ack(&mut self, type_url: TypeUrl, nonce: Nonce) -> ControlFlow<()> {
        let Some(entry) = self.watches.get_mut(&type_url) else {
            debug!(
                subscriber = %self.subscriber,
                type_url = %type_url,
                "ack for unknown watch, dropping"
            );
            return ControlFlow::Continue(());
        };

        if !entry.watch.handle_ack(nonce) {
            return ControlFlow::Continue(());
        }

        self.stats.acks += 1;
        self.metrics.record_ack(type_url.as_str());
        debug!(
            subscriber = %self.subscriber,
            type_url = %type_url,
            version = %entry.watch.last_acked(),
            "ack honored"
        );

        // The cache may have advanced while the response was in
        // flight; those change events found the watch Pending.
        self.evaluate(&type_url).await
    }

    fn handle_nack(&mut self, type_url: &TypeUrl, nonce: Nonce, detail: &str) -> ControlFlow<()> {
        let Some(entry) = self.watches.get_mut(type_url) else {
            debug!(
                subscriber = %self.subscriber,
                type_url = %type_url,
                "nack for unknown watch, dropping"
            );
            return ControlFlow::Continue(());
        };

        if !entry.watch.handle_nack(nonce) {
            return ControlFlow::Continue(());
        }

        self.stats.nacks += 1;
        self.metrics.record_nack(type_url.as_str());
        warn!(
            subscriber = %self.subscriber,
            type_url = %type_url,
            version = %entry.watch.last_sent(),
            detail = %detail,
            "nack honored, subscriber keeps version {}",
            entry.watch.last_acked()
        );

        // No immediate re-push: the next cache change or an explicit
        // re-subscribe re-triggers eligibility.
        ControlFlow::Continue(())
    }

    async fn handle_change(&mut self, event: ChangeEvent) -> ControlFlow<()> {
        trace!(
            subscriber = %self.subscriber,
            type_url = %event.type_url,
            version = %event.version,
            "change event"
        );
        // Events for a just-unsubscribed type can still be in flight.
        self.evaluate(&event.type_url).await
    }

    /// Push the current snapshot if the watch for this type is due.
    async fn evaluate(&mut self, type_url: &TypeUrl) -> ControlFlow<()> {
        let Some(entry) = self.watches.get_mut(type_url) else {
            return ControlFlow::Continue(());
        };

        let snapshot = self.cache.snapshot(type_url);
        if !entry.watch.is_due(snapshot.version()) {
            return ControlFlow::Continue(());
        }

        let nonce = self.nonces.next();
        entry.watch.record_sent(snapshot.version(), nonce);

        let push = Push {
            subscriber: self.subscriber.clone(),
            type_url: type_url.clone(),
            version: snapshot.version(),
            nonce,
            resources: snapshot.to_vec(),
        };

        debug!(
            subscriber = %self.subscriber,
            type_url = %type_url,
            version = %push.version,
            nonce = %push.nonce,
            count = push.resources.len(),
            "pushing snapshot"
        );

        match self.sink.push(push).await {
            Ok(()) => {
                self.stats.pushes += 1;
                ControlFlow::Continue(())
            }
            Err(err) => {
                warn!(
                    subscriber = %self.subscriber,
                    type_url = %type_url,
                    error = %err,
                    "push failed, terminating session"
                );
                ControlFlow::Break(())
            }
        }
    }
}
