//! Receiver-side status synchronization.
//!
//! Three loosely ordered trigger sources advance message status: the local
//! arrival of a fresh message (mark delivered), the presentation layer
//! finishing a message's reveal (mark read), and the backlog of messages that
//! piled up while the receiver was offline. All paths go through the same
//! scoped, idempotent batch update, so overlapping triggers for the same id
//! are harmless.
//!
//! The backlog splits durability from perception: one batched `Delivered`
//! write covers the whole backlog immediately, while the local presentation
//! of each message is paced at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use dogfood_shared::constants::BACKLOG_STAGGER_DELAY;
use dogfood_shared::{DeliveryStatus, DogfoodError, Message, MessageId, UserId};
use dogfood_store::MessageStore;

use crate::events::ClientEvent;
use crate::observer::ObserverRegistry;

/// Pacing for backlog presentation.
#[derive(Debug, Clone, Copy)]
pub struct BacklogConfig {
    /// Pause between presenting consecutive backlog messages.
    pub stagger: Duration,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            stagger: BACKLOG_STAGGER_DELAY,
        }
    }
}

/// Running staggered presentation of a backlog. Aborting the handle cancels
/// every remaining presentation timer as a set; dropping it does the same,
/// so a torn-down view can never be presented to.
pub struct BacklogHandle {
    task: JoinHandle<()>,
}

impl BacklogHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BacklogHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Advances message status on behalf of one receiver.
pub struct StatusSynchronizer<S> {
    store: Arc<S>,
    user: UserId,
}

impl<S: MessageStore + 'static> StatusSynchronizer<S> {
    pub fn new(store: Arc<S>, user: UserId) -> Self {
        Self { store, user }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Request a batched status transition, scoped to this user as receiver.
    ///
    /// Safe to call repeatedly with overlapping id sets: ids whose status
    /// already reached `target` (and ids this user does not own) match zero
    /// rows. Returns the number of rows actually advanced.
    pub async fn request_transition(
        &self,
        ids: &[MessageId],
        target: DeliveryStatus,
    ) -> Result<usize, DogfoodError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let updated = self.store.update_status(ids, target, self.user).await?;
        debug!(
            target = %target,
            requested = ids.len(),
            updated,
            "status transition applied"
        );
        Ok(updated)
    }

    /// Mark freshly arrived messages delivered.
    pub async fn mark_delivered(&self, ids: &[MessageId]) -> Result<usize, DogfoodError> {
        self.request_transition(ids, DeliveryStatus::Delivered).await
    }

    /// Mark one message read. Called only when its presentation completed,
    /// never merely on arrival; per-message, never batched.
    pub async fn mark_read(&self, id: MessageId) -> Result<usize, DogfoodError> {
        self.request_transition(&[id], DeliveryStatus::Read).await
    }

    /// Handle a reconnect backlog.
    ///
    /// Issues one batched `Delivered` update for the whole backlog before any
    /// presentation happens, then spawns a task that emits
    /// [`ClientEvent::Present`] per message at the configured stagger
    /// interval. Each message transitions to `Read` independently, once its
    /// own presentation completes.
    pub async fn deliver_backlog(
        &self,
        backlog: Vec<Message>,
        observers: Arc<ObserverRegistry<ClientEvent>>,
        config: BacklogConfig,
    ) -> Result<BacklogHandle, DogfoodError> {
        let ids: Vec<MessageId> = backlog.iter().map(|m| m.id).collect();
        let delivered = self.mark_delivered(&ids).await?;
        info!(
            backlog = backlog.len(),
            delivered,
            "backlog marked delivered, starting staggered presentation"
        );

        let stagger = config.stagger;
        let task = tokio::spawn(async move {
            for (index, message) in backlog.into_iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(stagger).await;
                }
                observers.emit(&ClientEvent::Present(message));
            }
        });
        Ok(BacklogHandle { task })
    }
}
