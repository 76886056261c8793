//! Outbound send pipeline.
//!
//! Validates a send request, re-verifies the caller's identity and link
//! membership, and persists the message with status `Sent`. The message is
//! returned to the caller only after the durable write succeeds; nothing is
//! inserted into any cache optimistically, so a failed send never leaves a
//! ghost message on screen.

use std::sync::Arc;

use tracing::info;

use dogfood_shared::{DogfoodError, LinkId, MediaMetadata, Message, MessageType, UserId};
use dogfood_store::{MessageStore, NewMessage, StoreError};

/// A send request as it arrives from the UI layer.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub link_id: LinkId,
    /// Claimed sender. Re-checked against the authenticated user even when
    /// an outer layer already did, since the send mutates shared state.
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_metadata: MediaMetadata,
}

impl OutboundMessage {
    pub fn text(link_id: LinkId, sender_id: UserId, receiver_id: UserId, body: &str) -> Self {
        Self {
            link_id,
            sender_id,
            receiver_id,
            message_type: MessageType::Text,
            content: Some(body.to_string()),
            media_url: None,
            media_metadata: MediaMetadata::default(),
        }
    }
}

/// Validates and persists outbound messages for one authenticated user.
///
/// There is no idempotency key on send: a caller that retries after a
/// timed-out-but-actually-successful write will create a duplicate message.
/// Callers wanting exactly-once semantics must not blind-retry.
pub struct SendPipeline<S> {
    store: Arc<S>,
    authenticated_user: UserId,
}

impl<S: MessageStore> SendPipeline<S> {
    pub fn new(store: Arc<S>, authenticated_user: UserId) -> Self {
        Self {
            store,
            authenticated_user,
        }
    }

    /// Validate and persist one outbound message.
    ///
    /// Errors: [`DogfoodError::Authorization`] when the claimed sender is not
    /// the authenticated user or sender/receiver are not the link's
    /// participants; [`DogfoodError::Validation`] for shape violations or an
    /// unknown link; [`DogfoodError::TransientStore`] when the write fails.
    pub async fn send(&self, outbound: OutboundMessage) -> Result<Message, DogfoodError> {
        if outbound.sender_id != self.authenticated_user {
            return Err(DogfoodError::authorization(format!(
                "claimed sender {} does not match authenticated user {}",
                outbound.sender_id, self.authenticated_user
            )));
        }

        let new = NewMessage {
            link_id: outbound.link_id,
            sender_id: outbound.sender_id,
            receiver_id: outbound.receiver_id,
            message_type: outbound.message_type,
            content: outbound.content,
            media_url: outbound.media_url,
            media_metadata: outbound.media_metadata,
        };
        new.validate_shape().map_err(DogfoodError::from)?;

        // Membership is checked against the stored link, never trusted from
        // client input.
        let link = match self.store.get_link(new.link_id).await {
            Ok(link) => link,
            Err(StoreError::NotFound) => {
                return Err(DogfoodError::validation(format!(
                    "unknown link {}",
                    new.link_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        new.validate_against_link(&link).map_err(DogfoodError::from)?;

        let message = self.store.create_message(new).await?;
        info!(
            msg_id = %message.id,
            link = %message.link_id,
            kind = %message.message_type,
            "message sent"
        );
        Ok(message)
    }
}
