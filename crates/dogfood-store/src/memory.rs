//! In-memory [`MessageStore`] backend for tests and local development.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use dogfood_shared::{DeliveryStatus, Link, LinkId, Message, MessageId, UserId};

use crate::error::StoreError;
use crate::store::{HistoryOrder, HistoryQuery, MessageStore, NewMessage};
use crate::Result;

#[derive(Default)]
struct Inner {
    links: HashMap<LinkId, Link>,
    messages: HashMap<MessageId, Message>,
    last_created_at: Option<DateTime<Utc>>,
}

/// Mutex-guarded map store. Cheap to clone handles via `Arc` at the caller.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link so membership checks can resolve it.
    pub async fn add_link(&self, link: Link) {
        self.inner.lock().await.links.insert(link.id, link);
    }

    /// Creation timestamps must be strictly increasing per store so that
    /// cursor pagination and created-at ordering stay stable even when two
    /// writes land within clock resolution.
    fn next_created_at(inner: &mut Inner) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = inner.last_created_at {
            if now <= last {
                now = last + Duration::milliseconds(1);
            }
        }
        inner.last_created_at = Some(now);
        now
    }
}

impl MessageStore for MemoryStore {
    async fn create_message(&self, new: NewMessage) -> Result<Message> {
        new.validate_shape()?;

        let mut inner = self.inner.lock().await;
        let link = inner
            .links
            .get(&new.link_id)
            .copied()
            .ok_or(StoreError::NotFound)?;
        new.validate_against_link(&link)?;

        let now = Self::next_created_at(&mut inner);
        let message = new.into_message(now);
        inner.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_messages(&self, link_id: LinkId, query: HistoryQuery) -> Result<Vec<Message>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.link_id == link_id)
            .filter(|m| query.before.map_or(true, |cursor| m.created_at < cursor))
            .cloned()
            .collect();

        rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.order == HistoryOrder::NewestFirst {
            rows.reverse();
        }
        rows.truncate(query.limit as usize);
        Ok(rows)
    }

    async fn update_status(
        &self,
        ids: &[MessageId],
        target: DeliveryStatus,
        scope_receiver: UserId,
    ) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut updated = 0;

        for id in ids {
            // Ids not owned by the scoped receiver are skipped, not errors.
            let Some(message) = inner.messages.get_mut(id) else {
                continue;
            };
            if message.receiver_id != scope_receiver {
                continue;
            }
            if message.status.can_advance_to(target) {
                message.status = message.status.advance(target);
                message.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn get_message(&self, id: MessageId) -> Result<Message> {
        self.inner
            .lock()
            .await
            .messages
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_link(&self, link_id: LinkId) -> Result<Link> {
        self.inner
            .lock()
            .await
            .links
            .get(&link_id)
            .copied()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogfood_shared::MessageType;

    fn linked_pair() -> (Link, UserId, UserId) {
        let a = UserId::new();
        let b = UserId::new();
        (Link::new(a, b), a, b)
    }

    #[tokio::test]
    async fn create_assigns_id_and_sent_status() {
        let store = MemoryStore::new();
        let (link, a, b) = linked_pair();
        store.add_link(link).await;

        let msg = store
            .create_message(NewMessage::text(link.id, a, b, "hi"))
            .await
            .unwrap();
        assert_eq!(msg.status, DeliveryStatus::Sent);
        assert_eq!(msg.created_at, msg.updated_at);
    }

    #[tokio::test]
    async fn create_rejects_outsider_sender() {
        let store = MemoryStore::new();
        let (link, _a, b) = linked_pair();
        store.add_link(link).await;

        let outsider = UserId::new();
        let err = store
            .create_message(NewMessage::text(link.id, outsider, b, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));
    }

    #[tokio::test]
    async fn create_rejects_missing_media_url() {
        let store = MemoryStore::new();
        let (link, a, b) = linked_pair();
        store.add_link(link).await;

        let new = NewMessage {
            message_type: MessageType::Image,
            content: None,
            ..NewMessage::text(link.id, a, b, "ignored")
        };
        let err = store.create_message(new).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn update_status_is_scoped_and_monotonic() {
        let store = MemoryStore::new();
        let (link, a, b) = linked_pair();
        store.add_link(link).await;

        let m1 = store
            .create_message(NewMessage::text(link.id, a, b, "one"))
            .await
            .unwrap();
        let m2 = store
            .create_message(NewMessage::text(link.id, b, a, "two"))
            .await
            .unwrap();

        // b receives m1, a receives m2. Scoping to b must leave m2 untouched
        // while still advancing m1 in the same batch.
        let n = store
            .update_status(&[m1.id, m2.id], DeliveryStatus::Delivered, b)
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            store.get_message(m1.id).await.unwrap().status,
            DeliveryStatus::Delivered
        );
        assert_eq!(
            store.get_message(m2.id).await.unwrap().status,
            DeliveryStatus::Sent
        );

        // Second identical call is a no-op, not an error.
        let n = store
            .update_status(&[m1.id, m2.id], DeliveryStatus::Delivered, b)
            .await
            .unwrap();
        assert_eq!(n, 0);

        // A late Delivered cannot regress a Read row.
        store
            .update_status(&[m1.id], DeliveryStatus::Read, b)
            .await
            .unwrap();
        store
            .update_status(&[m1.id], DeliveryStatus::Delivered, b)
            .await
            .unwrap();
        assert_eq!(
            store.get_message(m1.id).await.unwrap().status,
            DeliveryStatus::Read
        );
    }

    #[tokio::test]
    async fn history_pagination_by_cursor() {
        let store = MemoryStore::new();
        let (link, a, b) = linked_pair();
        store.add_link(link).await;

        let mut created = Vec::new();
        for i in 0..5 {
            created.push(
                store
                    .create_message(NewMessage::text(link.id, a, b, &format!("m{i}")))
                    .await
                    .unwrap(),
            );
        }

        let page = store
            .list_messages(
                link.id,
                HistoryQuery {
                    limit: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, created[4].id);
        assert_eq!(page[1].id, created[3].id);

        let older = store
            .list_messages(
                link.id,
                HistoryQuery {
                    limit: 2,
                    ..HistoryQuery::before(page[1].created_at)
                },
            )
            .await
            .unwrap();
        assert_eq!(older[0].id, created[2].id);
        assert_eq!(older[1].id, created[1].id);
    }
}
