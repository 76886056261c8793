use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use uuid::Uuid;

use dogfood_shared::{
    DeliveryStatus, LinkId, MediaMetadata, Message, MessageId, MessageType, UserId,
};

use crate::database::Database;
use crate::error::StoreError;
use crate::store::{HistoryOrder, HistoryQuery};
use crate::Result;

/// Fixed-width RFC 3339 so lexicographic order in SQLite matches
/// chronological order.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, link_id, sender_id, receiver_id, message_type,
                                   content, media_url, media_metadata, status,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                message.id.to_string(),
                message.link_id.to_string(),
                message.sender_id.to_string(),
                message.receiver_id.to_string(),
                message.message_type.as_str(),
                message.content,
                message.media_url,
                serde_json::to_string(&message.media_metadata)?,
                message.status.as_str(),
                fmt_ts(message.created_at),
                fmt_ts(message.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_messages_for_link(
        &self,
        link_id: LinkId,
        query: HistoryQuery,
    ) -> Result<Vec<Message>> {
        let direction = match query.order {
            HistoryOrder::NewestFirst => "DESC",
            HistoryOrder::OldestFirst => "ASC",
        };
        // created_at ties are broken by id so pages never overlap.
        let sql = format!(
            "SELECT id, link_id, sender_id, receiver_id, message_type,
                    content, media_url, media_metadata, status, created_at, updated_at
             FROM messages
             WHERE link_id = ?1
               AND (?2 IS NULL OR created_at < ?2)
             ORDER BY created_at {direction}, id {direction}
             LIMIT ?3"
        );
        let mut stmt = self.conn().prepare(&sql)?;

        let rows = stmt.query_map(
            params![
                link_id.to_string(),
                query.before.map(fmt_ts),
                query.limit,
            ],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn get_message_by_id(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, link_id, sender_id, receiver_id, message_type,
                        content, media_url, media_metadata, status, created_at, updated_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Batched, receiver-scoped, monotonic status update.
    ///
    /// The guard lives in the UPDATE itself so a concurrent caller can never
    /// regress a row: only rows owned by `scope_receiver` whose current
    /// status strictly precedes `target` are touched. Returns the number of
    /// rows advanced.
    pub fn advance_status_scoped(
        &self,
        ids: &[MessageId],
        target: DeliveryStatus,
        scope_receiver: UserId,
    ) -> Result<usize> {
        let now = fmt_ts(Utc::now());
        let mut updated = 0;

        for id in ids {
            updated += self.conn().execute(
                "UPDATE messages
                 SET status = ?1, updated_at = ?2
                 WHERE id = ?3
                   AND receiver_id = ?4
                   AND (CASE status
                            WHEN 'sent' THEN 0
                            WHEN 'delivered' THEN 1
                            ELSE 2
                        END) < ?5",
                params![
                    target.as_str(),
                    now,
                    id.to_string(),
                    scope_receiver.to_string(),
                    target.rank(),
                ],
            )?;
        }
        Ok(updated)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id = parse_uuid(row, 0)?;
    let link_id = parse_uuid(row, 1)?;
    let sender_id = parse_uuid(row, 2)?;
    let receiver_id = parse_uuid(row, 3)?;

    let type_str: String = row.get(4)?;
    let message_type = MessageType::from_str_opt(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown message type: {type_str}").into(),
        )
    })?;

    let content: Option<String> = row.get(5)?;
    let media_url: Option<String> = row.get(6)?;

    let meta_json: String = row.get(7)?;
    let media_metadata: MediaMetadata = serde_json::from_str(&meta_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status_str: String = row.get(8)?;
    let status = DeliveryStatus::from_str_opt(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_str}").into(),
        )
    })?;

    Ok(Message {
        id: MessageId(id),
        link_id: LinkId(link_id),
        sender_id: UserId(sender_id),
        receiver_id: UserId(receiver_id),
        message_type,
        content,
        media_url,
        media_metadata,
        status,
        created_at: parse_ts(row, 9)?,
        updated_at: parse_ts(row, 10)?,
    })
}

fn parse_uuid(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use crate::store::{MessageStore, NewMessage};
    use crate::SqliteStore;
    use dogfood_shared::{DeliveryStatus, Link, MediaMetadata, MessageType, UserId};

    async fn open_store() -> (tempfile::TempDir, SqliteStore, Link, UserId, UserId) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_at(&dir.path().join("test.db")).unwrap();

        let a = UserId::new();
        let b = UserId::new();
        let link = Link::new(a, b);
        store.add_link(link).await.unwrap();
        (dir, store, link, a, b)
    }

    #[tokio::test]
    async fn persist_and_read_back() {
        let (_dir, store, link, a, b) = open_store().await;

        let meta = MediaMetadata {
            size: Some(2048),
            mime_type: Some("image/webp".into()),
            ..Default::default()
        };
        let sent = store
            .create_message(NewMessage::media(
                link.id,
                a,
                b,
                MessageType::Image,
                "https://blobs/dog.webp",
                meta.clone(),
            ))
            .await
            .unwrap();

        let loaded = store.get_message(sent.id).await.unwrap();
        assert_eq!(loaded, sent);
        assert_eq!(loaded.media_metadata, meta);
        assert_eq!(loaded.status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn scoped_monotonic_update_in_sql() {
        let (_dir, store, link, a, b) = open_store().await;

        let m1 = store
            .create_message(NewMessage::text(link.id, a, b, "one"))
            .await
            .unwrap();
        let m2 = store
            .create_message(NewMessage::text(link.id, b, a, "two"))
            .await
            .unwrap();

        // Batch covering both ids, scoped to b: only m1 advances.
        let n = store
            .update_status(&[m1.id, m2.id], DeliveryStatus::Delivered, b)
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            store.get_message(m2.id).await.unwrap().status,
            DeliveryStatus::Sent
        );

        // Read then a late Delivered: the guard in the UPDATE absorbs it.
        store
            .update_status(&[m1.id], DeliveryStatus::Read, b)
            .await
            .unwrap();
        let n = store
            .update_status(&[m1.id], DeliveryStatus::Delivered, b)
            .await
            .unwrap();
        assert_eq!(n, 0);
        let m1_now = store.get_message(m1.id).await.unwrap();
        assert_eq!(m1_now.status, DeliveryStatus::Read);
        assert!(m1_now.updated_at > m1_now.created_at);
    }

    #[tokio::test]
    async fn list_respects_cursor_and_order() {
        let (_dir, store, link, a, b) = open_store().await;

        let mut ids = Vec::new();
        for i in 0..4 {
            let m = store
                .create_message(NewMessage::text(link.id, a, b, &format!("m{i}")))
                .await
                .unwrap();
            ids.push(m);
            // Distinct created_at values for a deterministic cursor walk.
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let newest = store
            .list_messages(
                link.id,
                crate::HistoryQuery {
                    limit: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(newest[0].id, ids[3].id);
        assert_eq!(newest[1].id, ids[2].id);

        let older = store
            .list_messages(
                link.id,
                crate::HistoryQuery {
                    limit: 10,
                    ..crate::HistoryQuery::before(newest[1].created_at)
                },
            )
            .await
            .unwrap();
        assert_eq!(older.len(), 2);
        assert_eq!(older[0].id, ids[1].id);
    }
}
