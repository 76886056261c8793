use rusqlite::params;
use uuid::Uuid;

use dogfood_shared::{Link, LinkId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::Result;

impl Database {
    pub fn insert_link(&self, link: &Link) -> Result<()> {
        self.conn().execute(
            "INSERT INTO links (id, user_a, user_b) VALUES (?1, ?2, ?3)",
            params![
                link.id.to_string(),
                link.user_a.to_string(),
                link.user_b.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn get_link_by_id(&self, id: LinkId) -> Result<Link> {
        self.conn()
            .query_row(
                "SELECT id, user_a, user_b FROM links WHERE id = ?1",
                params![id.to_string()],
                row_to_link,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// The link a user participates in, if any. Dogfood pairs each user with
    /// at most one partner.
    pub fn get_link_for_user(&self, user: UserId) -> Result<Option<Link>> {
        let user_str = user.to_string();
        let result = self.conn().query_row(
            "SELECT id, user_a, user_b FROM links WHERE user_a = ?1 OR user_b = ?1",
            params![user_str],
            row_to_link,
        );
        match result {
            Ok(link) => Ok(Some(link)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }
}

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<Link> {
    let parse = |idx: usize, s: String| {
        Uuid::parse_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    };
    let id: String = row.get(0)?;
    let user_a: String = row.get(1)?;
    let user_b: String = row.get(2)?;

    Ok(Link {
        id: LinkId(parse(0, id)?),
        user_a: UserId(parse(1, user_a)?),
        user_b: UserId(parse(2, user_b)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn link_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let link = Link::new(UserId::new(), UserId::new());
        db.insert_link(&link).unwrap();

        assert_eq!(db.get_link_by_id(link.id).unwrap(), link);
        assert_eq!(db.get_link_for_user(link.user_b).unwrap(), Some(link));
        assert_eq!(db.get_link_for_user(UserId::new()).unwrap(), None);
        assert!(matches!(
            db.get_link_by_id(LinkId::new()),
            Err(StoreError::NotFound)
        ));
    }
}
