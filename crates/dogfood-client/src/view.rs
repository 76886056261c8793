//! Conversation view context.
//!
//! One [`ConversationView`] exists per open conversation. It owns the
//! reconciliation cache, the status synchronizer, the feed subscription, the
//! observer registry, and any running backlog presentation: everything with
//! a lifecycle tied to the view. Tearing the view down (drop or
//! [`ConversationView::close`]) cancels the stagger timers and releases the
//! subscription.

use std::sync::Arc;

use tracing::{debug, warn};

use dogfood_feed::{ChangeEvent, ChangeFeed, Subscription};
use dogfood_shared::{DogfoodError, Link, Message, MessageId, UserId};
use dogfood_store::MessageStore;

use crate::cache::ReconciliationCache;
use crate::events::ClientEvent;
use crate::observer::ObserverRegistry;
use crate::sync::{BacklogConfig, BacklogHandle, StatusSynchronizer};

pub struct ConversationView<S> {
    user: UserId,
    link: Link,
    cache: ReconciliationCache,
    synchronizer: StatusSynchronizer<S>,
    observers: Arc<ObserverRegistry<ClientEvent>>,
    subscription: Subscription,
    backlog: Option<BacklogHandle>,
}

impl<S: MessageStore + 'static> ConversationView<S> {
    /// Open a view: subscribe to the link's change stream and seed the cache
    /// with the initial page. Observers should be registered before
    /// [`Self::start_backlog`] kicks off any staggered presentation.
    pub async fn open<F: ChangeFeed>(
        store: Arc<S>,
        feed: &F,
        user: UserId,
        link: Link,
        initial_messages: Vec<Message>,
    ) -> Result<Self, DogfoodError> {
        let subscription = feed.subscribe(link.id).await?;

        let mut cache = ReconciliationCache::new();
        cache.seed(initial_messages);

        let synchronizer = StatusSynchronizer::new(store, user);
        let observers = Arc::new(ObserverRegistry::new());

        debug!(link = %link.id, user = %user, "conversation view opened");
        Ok(Self {
            user,
            link,
            cache,
            synchronizer,
            observers,
            subscription,
            backlog: None,
        })
    }

    /// Begin delivery of messages that arrived while this receiver was
    /// offline: one batched delivered update immediately, then staggered
    /// [`ClientEvent::Present`] events. A previous backlog run, if any, is
    /// cancelled first.
    pub async fn start_backlog(
        &mut self,
        pending_delivery: Vec<Message>,
        config: BacklogConfig,
    ) -> Result<(), DogfoodError> {
        if let Some(previous) = self.backlog.take() {
            previous.cancel();
        }
        if pending_delivery.is_empty() {
            return Ok(());
        }
        let handle = self
            .synchronizer
            .deliver_backlog(pending_delivery, self.observers.clone(), config)
            .await?;
        self.backlog = Some(handle);
        Ok(())
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Registry the rendering layer attaches its callbacks to.
    pub fn observers(&self) -> &Arc<ObserverRegistry<ClientEvent>> {
        &self.observers
    }

    /// Cached messages in ascending created-at order.
    pub fn messages(&self) -> &[Message] {
        self.cache.messages()
    }

    /// Wait for and process the next feed event. Returns `false` once the
    /// feed has closed the stream.
    pub async fn pump(&mut self) -> Result<bool, DogfoodError> {
        match self.subscription.recv().await {
            Some(event) => {
                self.handle_event(event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drain any already-delivered feed events without blocking.
    pub async fn pump_pending(&mut self) -> Result<usize, DogfoodError> {
        let mut handled = 0;
        while let Some(event) = self.subscription.try_recv() {
            self.handle_event(event).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Route one change event into the cache and the synchronizer.
    pub async fn handle_event(&mut self, event: ChangeEvent) -> Result<(), DogfoodError> {
        match event {
            ChangeEvent::Inserted(message) => self.handle_insert(message).await,
            ChangeEvent::Updated(message) => {
                if let Some(status) = self.cache.apply_status_update(&message) {
                    self.observers.emit(&ClientEvent::StatusChanged {
                        id: message.id,
                        status,
                    });
                }
                Ok(())
            }
        }
    }

    /// Record a message this user just sent (after the durable write
    /// confirmed). The later feed echo of the same insert deduplicates
    /// against this entry.
    pub fn record_sent(&mut self, message: Message) {
        if self.cache.merge(message.clone()) {
            self.observers.emit(&ClientEvent::MessageAdded(message));
        }
    }

    /// A staggered backlog presentation reached this message: surface it in
    /// the cache. Arrival already marked the backlog delivered in one batch.
    pub fn record_presented(&mut self, message: Message) {
        if self.cache.merge(message.clone()) {
            self.observers.emit(&ClientEvent::MessageAdded(message));
        }
    }

    /// The rendering layer finished presenting this message to the user:
    /// advance it to read. Per-message, never batched.
    pub async fn presentation_complete(&mut self, id: MessageId) -> Result<(), DogfoodError> {
        self.synchronizer.mark_read(id).await?;
        Ok(())
    }

    async fn handle_insert(&mut self, message: Message) -> Result<(), DogfoodError> {
        let from_partner = message.sender_id != self.user;
        if !self.cache.merge(message.clone()) {
            // Echo of a row we already hold (own send or duplicate feed
            // delivery). At-least-once feeds make this routine.
            debug!(msg_id = %message.id, "duplicate insert event ignored");
            return Ok(());
        }
        self.observers
            .emit(&ClientEvent::MessageAdded(message.clone()));

        if from_partner {
            // Arrival marks delivered immediately; read waits for the
            // presentation layer's completion signal.
            if let Err(e) = self.synchronizer.mark_delivered(&[message.id]).await {
                warn!(msg_id = %message.id, error = %e, "failed to mark delivered");
                return Err(e);
            }
            self.observers.emit(&ClientEvent::Present(message));
        }
        Ok(())
    }

    /// Tear the view down: cancel any running backlog presentation and drop
    /// the feed subscription.
    pub fn close(mut self) {
        if let Some(backlog) = self.backlog.take() {
            backlog.cancel();
        }
        debug!(link = %self.link.id, "conversation view closed");
    }
}
