//! The abstract Message Store contract.
//!
//! Any backend (the in-memory store, the SQLite store, or a remote platform
//! adapter) must provide these operations with the same semantics:
//!
//! - `create_message` assigns id and timestamps and persists with status
//!   [`DeliveryStatus::Sent`].
//! - `list_messages` pages by `created_at` cursor.
//! - `update_status` is scoped to `receiver_id = scope_receiver`; rows that
//!   do not match are silently excluded (partial success, never a per-id
//!   error), and each matching row only moves strictly forward.
//! - `get_link` resolves a link for membership checks.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dogfood_shared::constants::DEFAULT_HISTORY_LIMIT;
use dogfood_shared::{
    DeliveryStatus, Link, LinkId, MediaMetadata, Message, MessageId, MessageType, UserId,
};

use crate::error::StoreError;
use crate::Result;

/// Input to [`MessageStore::create_message`]. Id, status, and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub link_id: LinkId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_metadata: MediaMetadata,
}

impl NewMessage {
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

    pub fn media(
        link_id: LinkId,
        sender_id: UserId,
        receiver_id: UserId,
        message_type: MessageType,
        media_url: &str,
        media_metadata: MediaMetadata,
    ) -> Self {
        Self {
            link_id,
            sender_id,
            receiver_id,
            message_type,
            content: None,
            media_url: Some(media_url.to_string()),
            media_metadata,
        }
    }

    /// Check the type/content shape rules: text requires a non-empty body,
    /// image and audio require a media reference.
    pub fn validate_shape(&self) -> Result<()> {
        match self.message_type {
            MessageType::Text => {
                if self.content.as_deref().map_or(true, |c| c.is_empty()) {
                    return Err(StoreError::Validation(
                        "text message requires content".into(),
                    ));
                }
            }
            MessageType::Image | MessageType::Audio => {
                if self.media_url.as_deref().map_or(true, |u| u.is_empty()) {
                    return Err(StoreError::Validation(format!(
                        "{} message requires a media reference",
                        self.message_type
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that sender and receiver are the two participants of `link`.
    pub fn validate_against_link(&self, link: &Link) -> Result<()> {
        if !link.contains(self.sender_id) {
            return Err(StoreError::Authorization(format!(
                "sender {} is not a participant of link {}",
                self.sender_id, self.link_id
            )));
        }
        if link.other(self.sender_id) != Some(self.receiver_id) {
            return Err(StoreError::Authorization(format!(
                "receiver {} is not the other participant of link {}",
                self.receiver_id, self.link_id
            )));
        }
        Ok(())
    }

    /// Materialise the stored row, with id and timestamps assigned now.
    pub(crate) fn into_message(self, now: DateTime<Utc>) -> Message {
        Message {
            id: MessageId::new(),
            link_id: self.link_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            message_type: self.message_type,
            content: self.content,
            media_url: self.media_url,
            media_metadata: self.media_metadata,
            status: DeliveryStatus::Sent,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Page direction for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// Most recent first (the UI's initial load).
    #[default]
    NewestFirst,
    /// Chronological, for replay-style consumers.
    OldestFirst,
}

/// Cursor-paginated history query.
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery {
    /// Only return rows created strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Maximum number of rows to return.
    pub limit: u32,
    pub order: HistoryOrder,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            before: None,
            limit: DEFAULT_HISTORY_LIMIT,
            order: HistoryOrder::default(),
        }
    }
}

impl HistoryQuery {
    pub fn before(cursor: DateTime<Utc>) -> Self {
        Self {
            before: Some(cursor),
            ..Self::default()
        }
    }
}

/// Durable record of messages and links.
pub trait MessageStore: Send + Sync {
    /// Persist a new message with status `Sent`. Fails with
    /// [`StoreError::Validation`] on a malformed shape and
    /// [`StoreError::Authorization`] when sender/receiver do not match the
    /// link's participants.
    fn create_message(&self, new: NewMessage) -> impl Future<Output = Result<Message>> + Send;

    /// Cursor-paginated message listing for one link.
    fn list_messages(
        &self,
        link_id: LinkId,
        query: HistoryQuery,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Advance the status of every listed message that belongs to
    /// `scope_receiver` and currently precedes `target`. Returns the number
    /// of rows actually advanced. Idempotent: re-running the same call
    /// matches zero rows and returns 0.
    fn update_status(
        &self,
        ids: &[MessageId],
        target: DeliveryStatus,
        scope_receiver: UserId,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Fetch one message by id, or [`StoreError::NotFound`].
    fn get_message(&self, id: MessageId) -> impl Future<Output = Result<Message>> + Send;

    /// Resolve a link by id, or [`StoreError::NotFound`].
    fn get_link(&self, link_id: LinkId) -> impl Future<Output = Result<Link>> + Send;
}
