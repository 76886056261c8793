//! Per-conversation reconciliation cache.
//!
//! One canonical in-memory ordered set of messages per open conversation
//! view, merging three input streams without duplication: the initial page
//! load, locally sent messages, and remote feed events. The feed is
//! at-least-once with no cross-event ordering guarantee, so a status update
//! may arrive before the insert it refers to; such updates are retained in a
//! pending buffer and re-applied when the row shows up.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use dogfood_shared::{DeliveryStatus, Message, MessageId};

/// Ordered, deduplicated projection of one conversation's messages.
///
/// Entries are kept in ascending `(created_at, id)` order regardless of
/// arrival order. Membership checks are O(1); inserts are a binary search
/// plus a `Vec` shift (arrivals are usually near the tail).
#[derive(Default)]
pub struct ReconciliationCache {
    entries: Vec<Message>,
    ids: HashSet<MessageId>,
    pending_updates: HashMap<MessageId, (DeliveryStatus, DateTime<Utc>)>,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache content with the initial page load. Input may be in
    /// any order; pending updates buffered before the seed are re-applied.
    pub fn seed(&mut self, initial: Vec<Message>) {
        self.entries = initial;
        self.entries
            .sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        self.ids = self.entries.iter().map(|m| m.id).collect();

        let pending = std::mem::take(&mut self.pending_updates);
        for (id, (status, updated_at)) in pending {
            self.apply_retained(id, status, updated_at);
        }
    }

    /// Insert a message unless its id is already tracked. Returns whether the
    /// message was actually inserted.
    pub fn merge(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id) {
            return false;
        }

        let key = (message.created_at, message.id);
        let pos = self
            .entries
            .partition_point(|m| (m.created_at, m.id) < key);
        self.entries.insert(pos, message);

        if let Some((status, updated_at)) = self.pending_updates.remove(&self.entries[pos].id) {
            let id = self.entries[pos].id;
            self.apply_retained(id, status, updated_at);
        }
        true
    }

    /// Apply a remote status update to the cached copy. Only the status and
    /// updated-at fields change. If the id is not cached yet, the update is
    /// retained and applied on a later `seed`/`merge`. Returns the new status
    /// when a cached entry actually advanced.
    pub fn apply_status_update(&mut self, update: &Message) -> Option<DeliveryStatus> {
        if !self.ids.contains(&update.id) {
            self.retain_pending(update.id, update.status, update.updated_at);
            return None;
        }
        self.apply_retained(update.id, update.status, update.updated_at)
    }

    /// Messages in ascending created-at order.
    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.entries.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn retain_pending(&mut self, id: MessageId, status: DeliveryStatus, updated_at: DateTime<Utc>) {
        // Keep only the furthest requested stage for an unseen id.
        self.pending_updates
            .entry(id)
            .and_modify(|(s, ts)| {
                if status > *s {
                    *s = status;
                    *ts = updated_at;
                }
            })
            .or_insert((status, updated_at));
    }

    fn apply_retained(
        &mut self,
        id: MessageId,
        status: DeliveryStatus,
        updated_at: DateTime<Utc>,
    ) -> Option<DeliveryStatus> {
        let entry = self.entries.iter_mut().find(|m| m.id == id)?;
        if !entry.status.can_advance_to(status) {
            return None;
        }
        entry.status = entry.status.advance(status);
        entry.updated_at = updated_at;
        Some(entry.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dogfood_shared::{LinkId, MediaMetadata, MessageType, UserId};

    fn message_at(offset_ms: i64, link_id: LinkId) -> Message {
        let now = Utc::now() + Duration::milliseconds(offset_ms);
        Message {
            id: MessageId::new(),
            link_id,
            sender_id: UserId::new(),
            receiver_id: UserId::new(),
            message_type: MessageType::Text,
            content: Some("hey".into()),
            media_url: None,
            media_metadata: MediaMetadata::default(),
            status: DeliveryStatus::Sent,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn seed_then_merge_deduplicates() {
        let link = LinkId::new();
        let m1 = message_at(0, link);
        let m2 = message_at(10, link);
        let m3 = message_at(20, link);

        let mut cache = ReconciliationCache::new();
        cache.seed(vec![m1.clone(), m2.clone()]);

        assert!(!cache.merge(m1.clone()));
        assert!(cache.merge(m3.clone()));

        let ids: Vec<_> = cache.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m1.id, m2.id, m3.id]);
    }

    #[test]
    fn merge_inserts_in_created_order() {
        let link = LinkId::new();
        let early = message_at(-500, link);
        let late = message_at(500, link);
        let middle = message_at(0, link);

        let mut cache = ReconciliationCache::new();
        cache.merge(late.clone());
        cache.merge(early.clone());
        cache.merge(middle.clone());

        let ids: Vec<_> = cache.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);
    }

    #[test]
    fn status_update_advances_and_never_regresses() {
        let link = LinkId::new();
        let mut m = message_at(0, link);

        let mut cache = ReconciliationCache::new();
        cache.seed(vec![m.clone()]);

        m.status = DeliveryStatus::Read;
        m.updated_at = m.created_at + Duration::seconds(1);
        assert_eq!(
            cache.apply_status_update(&m),
            Some(DeliveryStatus::Read)
        );

        // Late delivered echo is absorbed.
        m.status = DeliveryStatus::Delivered;
        assert_eq!(cache.apply_status_update(&m), None);
        assert_eq!(cache.get(m.id).unwrap().status, DeliveryStatus::Read);
    }

    #[test]
    fn update_before_insert_is_retained() {
        let link = LinkId::new();
        let mut m = message_at(0, link);
        let original = m.clone();

        let mut cache = ReconciliationCache::new();

        // Update races ahead of the insert: no phantom entry, no panic.
        m.status = DeliveryStatus::Delivered;
        assert_eq!(cache.apply_status_update(&m), None);
        assert_eq!(cache.len(), 0);

        // A later, further update for the same unseen id wins the buffer.
        m.status = DeliveryStatus::Read;
        cache.apply_status_update(&m);

        // Once the row arrives the retained update is applied.
        assert!(cache.merge(original));
        assert_eq!(cache.get(m.id).unwrap().status, DeliveryStatus::Read);
    }

    #[test]
    fn retained_update_applies_on_seed_too() {
        let link = LinkId::new();
        let mut m = message_at(0, link);
        let original = m.clone();

        let mut cache = ReconciliationCache::new();
        m.status = DeliveryStatus::Delivered;
        cache.apply_status_update(&m);

        cache.seed(vec![original]);
        assert_eq!(cache.get(m.id).unwrap().status, DeliveryStatus::Delivered);
    }
}
