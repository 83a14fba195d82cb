//! Change fan-out for cache mutations.
//!
//! The router delivers lightweight change events to interested
//! listeners:
//! - Unique listener identifiers ([`ListenerId`])
//! - Per-type listener registration ([`ChangeRouter::subscribe`])
//! - Non-blocking fan-out ([`ChangeRouter::notify`])
//!
//! Events are wake-ups, not data: a listener that misses an event
//! because its inbox is full loses nothing, since consumers re-read the
//! cache snapshot when they wake. Mutators never wait on delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use xds_core::{TypeUrl, Version};

/// A cache change event: this type URL now has this version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Type URL whose partition changed.
    pub type_url: TypeUrl,
    /// Version the partition reached.
    pub version: Version,
}

/// Unique identifier for a change listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric value of this listener ID.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct ListenerSender {
    id: ListenerId,
    sender: mpsc::Sender<ChangeEvent>,
}

/// Router for cache change events.
///
/// Listeners register a sender per type URL; one session typically
/// registers clones of a single inbox sender for every type it watches,
/// so its worker can select over one channel.
///
/// Uses a `Mutex` internally but operations are fast (no I/O).
#[derive(Debug, Default)]
pub struct ChangeRouter {
    /// Map of type URL to registered listener senders.
    listeners: std::sync::Mutex<HashMap<TypeUrl, Vec<ListenerSender>>>,
}

impl ChangeRouter {
    /// Create a new change router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one type URL.
    ///
    /// The sender receives a [`ChangeEvent`] each time the partition
    /// for `type_url` publishes a new version. Delivery is best-effort:
    /// a full inbox drops the event.
    pub fn subscribe(&self, type_url: TypeUrl, sender: mpsc::Sender<ChangeEvent>) -> ListenerId {
        let id = ListenerId::next();

        // Lock is held briefly, no I/O
        {
            let mut listeners = self.listeners.lock().expect("listener lock poisoned");
            listeners
                .entry(type_url.clone())
                .or_default()
                .push(ListenerSender { id, sender });
        }

        debug!(listener_id = %id, type_url = %type_url, "registered change listener");
        id
    }

    /// Remove a listener registration.
    pub fn unsubscribe(&self, listener_id: ListenerId) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");

        for senders in listeners.values_mut() {
            if let Some(pos) = senders.iter().position(|s| s.id == listener_id) {
                senders.swap_remove(pos);
                debug!(listener_id = %listener_id, "removed change listener");
                return;
            }
        }

        warn!(listener_id = %listener_id, "attempted to remove unknown change listener");
    }

    /// Fan a change event out to every listener for the type URL.
    ///
    /// Never blocks; a full inbox skips that listener. Closed listeners
    /// are removed automatically.
    pub fn notify(&self, type_url: &TypeUrl, version: Version) {
        // Clone senders while holding lock briefly
        let senders: Vec<ListenerSender> = {
            let listeners = self.listeners.lock().expect("listener lock poisoned");
            listeners.get(type_url).cloned().unwrap_or_default()
        };

        if senders.is_empty() {
            return;
        }

        let mut closed_ids = Vec::new();

        for sender in &senders {
            let event = ChangeEvent {
                type_url: type_url.clone(),
                version,
            };
            match sender.sender.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Inbox full, the listener re-reads the cache when it
                    // drains, so skipping is safe.
                    trace!(listener_id = %sender.id, "listener inbox full, skipping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed_ids.push(sender.id);
                }
            }
        }

        if !closed_ids.is_empty() {
            let mut listeners = self.listeners.lock().expect("listener lock poisoned");
            if let Some(senders) = listeners.get_mut(type_url) {
                senders.retain(|s| !closed_ids.contains(&s.id));
            }
            debug!(count = closed_ids.len(), "removed closed change listeners");
        }

        trace!(
            type_url = %type_url,
            version = %version,
            listener_count = senders.len() - closed_ids.len(),
            "fanned out change event"
        );
    }

    /// Get the number of listeners for a type URL.
    #[must_use]
    pub fn listener_count(&self, type_url: &TypeUrl) -> usize {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.get(type_url).map(|v| v.len()).unwrap_or(0)
    }

    /// Get the total number of listeners across all type URLs.
    #[must_use]
    pub fn total_listener_count(&self) -> usize {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_id_unique() {
        let id1 = ListenerId::next();
        let id2 = ListenerId::next();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn router_subscribe_and_notify() {
        let router = ChangeRouter::new();
        let type_url: TypeUrl = TypeUrl::CLUSTER.into();

        let (tx, mut rx) = mpsc::channel(4);
        router.subscribe(type_url.clone(), tx);
        assert_eq!(router.listener_count(&type_url), 1);

        router.notify(&type_url, Version::from_raw(7));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.type_url, type_url);
        assert_eq!(event.version, Version::from_raw(7));
    }

    #[tokio::test]
    async fn router_notify_is_per_type() {
        let router = ChangeRouter::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();
        let routes: TypeUrl = TypeUrl::ROUTE.into();

        let (tx, mut rx) = mpsc::channel(4);
        router.subscribe(clusters.clone(), tx);

        router.notify(&routes, Version::from_raw(1));
        assert!(rx.try_recv().is_err());

        router.notify(&clusters, Version::from_raw(2));
        assert_eq!(rx.recv().await.unwrap().version, Version::from_raw(2));
    }

    #[test]
    fn router_unsubscribe() {
        let router = ChangeRouter::new();
        let type_url: TypeUrl = TypeUrl::CLUSTER.into();

        let (tx, _rx) = mpsc::channel(4);
        let id = router.subscribe(type_url.clone(), tx);
        assert_eq!(router.listener_count(&type_url), 1);

        router.unsubscribe(id);
        assert_eq!(router.listener_count(&type_url), 0);
    }

    #[tokio::test]
    async fn router_full_inbox_drops_event() {
        let router = ChangeRouter::new();
        let type_url: TypeUrl = TypeUrl::CLUSTER.into();

        let (tx, mut rx) = mpsc::channel(1);
        router.subscribe(type_url.clone(), tx);

        router.notify(&type_url, Version::from_raw(1));
        router.notify(&type_url, Version::from_raw(2));

        // First event delivered, second dropped; the listener stays
        // registered.
        assert_eq!(rx.recv().await.unwrap().version, Version::from_raw(1));
        assert!(rx.try_recv().is_err());
        assert_eq!(router.listener_count(&type_url), 1);
    }

    #[test]
    fn router_prunes_closed_listeners() {
        let router = ChangeRouter::new();
        let type_url: TypeUrl = TypeUrl::CLUSTER.into();

        let (tx, rx) = mpsc::channel(1);
        router.subscribe(type_url.clone(), tx);
        drop(rx);

        router.notify(&type_url, Version::from_raw(1));
        assert_eq!(router.listener_count(&type_url), 0);
    }
}
