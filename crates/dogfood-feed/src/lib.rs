//! # dogfood-feed
//!
//! The Change Feed contract: an at-least-once notification stream of message
//! inserts and updates, scoped by link. The platform's CDC stream is a black
//! box; consumers must tolerate duplicates and must not assume any ordering
//! across distinct events, even for the same message id.
//!
//! [`LocalFeed`] is the in-process implementation used by the self-hosted
//! server and by tests.

pub mod local;

mod error;

use std::future::Future;

use tokio::sync::mpsc;

use dogfood_shared::{LinkId, Message};

pub use error::FeedError;
pub use local::LocalFeed;

/// A single change notification.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A new message row was inserted.
    Inserted(Message),
    /// An existing row changed (status transition).
    Updated(Message),
}

impl ChangeEvent {
    pub fn message(&self) -> &Message {
        match self {
            Self::Inserted(m) | Self::Updated(m) => m,
        }
    }

    pub fn link_id(&self) -> LinkId {
        self.message().link_id
    }
}

/// A live subscription to one link's change stream.
///
/// Events arrive on [`Subscription::recv`]. Dropping the subscription tears
/// it down; the feed stops routing events to it.
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { events }
    }

    /// Wait for the next change event. Returns `None` once the feed side has
    /// closed the stream.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll, used by synchronous view code.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }
}

/// Callback invoked when the transport's session needs renewing. The core
/// registers a hook instead of embedding transport-specific refresh logic.
pub type ReauthHook = Box<dyn Fn() + Send + Sync>;

/// At-least-once notification stream of message inserts/updates.
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription for one link's change events.
    fn subscribe(
        &self,
        link_id: LinkId,
    ) -> impl Future<Output = Result<Subscription, FeedError>> + Send;

    /// Register a hook to run whenever the underlying transport needs its
    /// session re-authenticated. Implementations that never re-authenticate
    /// (such as [`LocalFeed`]) simply hold the hook without calling it.
    fn on_reauth_needed(&self, hook: ReauthHook);
}
