//! In-process change feed.
//!
//! Fan-out over per-subscriber tokio mpsc channels, keyed by link. The
//! self-hosted server publishes an event after each committed write, standing
//! in for the platform's change-data-capture stream. Delivery is best-effort
//! per subscriber: a full channel drops the event for that subscriber (a
//! reconnecting client reloads from the store anyway), and closed
//! subscribers are pruned on the next publish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use dogfood_shared::LinkId;

use crate::{ChangeEvent, ChangeFeed, FeedError, ReauthHook, Subscription};

/// Buffered events per subscriber before publishes start dropping.
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Default)]
struct Registry {
    subscribers: HashMap<LinkId, Vec<mpsc::Sender<ChangeEvent>>>,
    reauth_hooks: Vec<ReauthHook>,
}

/// In-process [`ChangeFeed`] implementation.
#[derive(Clone, Default)]
pub struct LocalFeed {
    registry: Arc<Mutex<Registry>>,
}

impl LocalFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every live subscriber of its link.
    pub fn publish(&self, event: ChangeEvent) {
        let link_id = event.link_id();
        let mut registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(senders) = registry.subscribers.get_mut(&link_id) else {
            return;
        };

        senders.retain(|tx| !tx.is_closed());
        for tx in senders.iter() {
            if let Err(e) = tx.try_send(event.clone()) {
                warn!(link = %link_id, error = %e, "dropping change event for slow subscriber");
            }
        }
        if senders.is_empty() {
            registry.subscribers.remove(&link_id);
        }
    }

    /// Number of live subscribers for a link (test helper).
    pub fn subscriber_count(&self, link_id: LinkId) -> usize {
        let mut registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry
            .subscribers
            .get_mut(&link_id)
            .map_or(0, |senders| {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            })
    }

    /// Run every registered re-auth hook. A real transport calls this when
    /// its session token expires; tests use it to observe hook wiring.
    pub fn trigger_reauth(&self) {
        let registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        for hook in &registry.reauth_hooks {
            hook();
        }
    }
}

impl ChangeFeed for LocalFeed {
    async fn subscribe(&self, link_id: LinkId) -> Result<Subscription, FeedError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.subscribers.entry(link_id).or_default().push(tx);
        debug!(link = %link_id, "feed subscription opened");
        Ok(Subscription::new(rx))
    }

    fn on_reauth_needed(&self, hook: ReauthHook) {
        let mut registry = match self.registry.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.reauth_hooks.push(hook);
    }
}
