//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees
//! that migrations are run before any other operation. [`SqliteStore`] wraps
//! it in an async mutex to satisfy the [`MessageStore`] contract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use rusqlite::Connection;
use tokio::sync::Mutex;

use dogfood_shared::{DeliveryStatus, Link, LinkId, Message, MessageId, UserId};

use crate::error::StoreError;
use crate::migrations;
use crate::store::{HistoryQuery, MessageStore, NewMessage};
use crate::Result;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database in the
    /// platform-appropriate data directory
    /// (e.g. `~/.local/share/dogfood/dogfood.db` on Linux).
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("app", "dogfood", "dogfood").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("dogfood.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        // Run schema migrations.
        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed CRUD helpers, but direct access is
    /// occasionally needed for transactions or ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

/// Async [`MessageStore`] over a [`Database`].
///
/// `rusqlite::Connection` is single-threaded, so the handle serialises all
/// access through a tokio mutex. Clones share the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open a database at `path` and wrap it.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    /// Register a link (test and provisioning helper).
    pub async fn add_link(&self, link: Link) -> Result<()> {
        self.db.lock().await.insert_link(&link)
    }
}

impl MessageStore for SqliteStore {
    async fn create_message(&self, new: NewMessage) -> Result<Message> {
        new.validate_shape()?;

        let db = self.db.lock().await;
        let link = db.get_link_by_id(new.link_id)?;
        new.validate_against_link(&link)?;

        // Timestamps are stored with microsecond precision; truncate up
        // front so the returned row compares equal to a later read-back.
        use chrono::Timelike;
        let now = chrono::Utc::now();
        let now = now
            .with_nanosecond(now.nanosecond() / 1000 * 1000)
            .unwrap_or(now);
        let message = new.into_message(now);
        db.insert_message(&message)?;
        Ok(message)
    }

    async fn list_messages(&self, link_id: LinkId, query: HistoryQuery) -> Result<Vec<Message>> {
        self.db.lock().await.list_messages_for_link(link_id, query)
    }

    async fn update_status(
        &self,
        ids: &[MessageId],
        target: DeliveryStatus,
        scope_receiver: UserId,
    ) -> Result<usize> {
        self.db
            .lock()
            .await
            .advance_status_scoped(ids, target, scope_receiver)
    }

    async fn get_message(&self, id: MessageId) -> Result<Message> {
        self.db.lock().await.get_message_by_id(id)
    }

    async fn get_link(&self, link_id: LinkId) -> Result<Link> {
        self.db.lock().await.get_link_by_id(link_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }
}
