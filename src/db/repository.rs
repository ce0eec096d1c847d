use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    CatalogCacheRecord, CatalogEntry, NewReview, ReviewCursor, ReviewRecord, TargetKind,
    VoteSets, VoteType,
};

use super::schema::SCHEMA;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Vote ledger operations

    pub async fn get_vote_sets(&self, kind: TargetKind, target_id: &str) -> Result<Option<VoteSets>> {
        let target_id = target_id.to_string();
        let sets = self
            .conn
            .call(move |conn| load_vote_sets(conn, kind, &target_id))
            .await?;
        Ok(sets)
    }

    /// Read, toggle and write one ledger inside a single transaction, creating
    /// the row on first use.
    pub async fn toggle_vote(
        &self,
        kind: TargetKind,
        target_id: &str,
        user_id: &str,
        vote_type: VoteType,
    ) -> Result<()> {
        let target_id = target_id.to_string();
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut sets = load_vote_sets(&tx, kind, &target_id)?.unwrap_or_default();
                sets.toggle(&user_id, vote_type);
                store_vote_sets(&tx, kind, &target_id, &sets)?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn put_vote_sets(&self, kind: TargetKind, target_id: &str, sets: VoteSets) -> Result<()> {
        let target_id = target_id.to_string();
        self.conn
            .call(move |conn| store_vote_sets(conn, kind, &target_id, &sets))
            .await?;
        Ok(())
    }

    /// Run raw SQL, bypassing every invariant the typed methods keep.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Review operations

    /// Insert a review together with its empty ledger.
    pub async fn insert_review(&self, review: NewReview, created_at: DateTime<Utc>) -> Result<ReviewRecord> {
        let record = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO reviews (book_id, author_id, author_display_name, content, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        review.book_id,
                        review.author_id,
                        review.author_display_name,
                        review.content,
                        created_at.timestamp_micros(),
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT OR IGNORE INTO vote_ledgers (target_kind, target_id) VALUES (?1, ?2)",
                    params![TargetKind::Review.as_str(), id.to_string()],
                )?;
                tx.commit()?;

                Ok(ReviewRecord {
                    id,
                    book_id: review.book_id,
                    author_id: review.author_id,
                    author_display_name: review.author_display_name,
                    content: review.content,
                    created_at,
                })
            })
            .await?;
        Ok(record)
    }

    /// Reviews of one book in `(created_at, id)` descending order, strictly
    /// after `cursor` when one is given.
    pub async fn get_reviews_page(
        &self,
        book_id: &str,
        limit: usize,
        cursor: Option<ReviewCursor>,
    ) -> Result<Vec<ReviewRecord>> {
        let book_id = book_id.to_string();
        let cursor_micros = cursor.map(|c| c.created_at.timestamp_micros());
        let cursor_id = cursor.map(|c| c.id);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let reviews = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, book_id, author_id, author_display_name, content, created_at
                       FROM reviews
                       WHERE book_id = ?1
                         AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND id < ?3))
                       ORDER BY created_at DESC, id DESC
                       LIMIT ?4"#,
                )?;
                let reviews = stmt
                    .query_map(params![book_id, cursor_micros, cursor_id, limit], review_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(reviews)
            })
            .await?;
        Ok(reviews)
    }

    /// Delete a review and its ledger. Returns false if no such review exists.
    pub async fn delete_review(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let removed = tx.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
                if removed > 0 {
                    tx.execute(
                        "DELETE FROM vote_ledgers WHERE target_kind = ?1 AND target_id = ?2",
                        params![TargetKind::Review.as_str(), id.to_string()],
                    )?;
                }
                tx.commit()?;
                Ok(removed > 0)
            })
            .await?;
        Ok(deleted)
    }

    // Catalog cache operations

    pub async fn get_catalog_cache(&self, genre_key: &str) -> Result<Option<CatalogCacheRecord>> {
        let genre_key = genre_key.to_string();
        let record = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT entries, last_refreshed_at FROM catalog_cache WHERE genre_key = ?1",
                        params![genre_key],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                    )
                    .optional()?;

                let Some((entries_json, refreshed)) = row else {
                    return Ok(None);
                };
                let entries: Vec<CatalogEntry> =
                    serde_json::from_str(&entries_json).map_err(json_error)?;

                Ok(Some(CatalogCacheRecord {
                    genre_key,
                    entries,
                    // An unreadable timestamp makes the record look stale.
                    last_refreshed_at: DateTime::parse_from_rfc3339(&refreshed)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_default(),
                }))
            })
            .await?;
        Ok(record)
    }

    /// Overwrite the cached listing for a genre.
    pub async fn save_catalog_cache(&self, record: &CatalogCacheRecord) -> Result<()> {
        let entries_json = serde_json::to_string(&record.entries)?;
        let genre_key = record.genre_key.clone();
        let refreshed = record.last_refreshed_at.to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO catalog_cache (genre_key, entries, last_refreshed_at)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(genre_key) DO UPDATE SET
                           entries = excluded.entries,
                           last_refreshed_at = excluded.last_refreshed_at"#,
                    params![genre_key, entries_json, refreshed],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn load_vote_sets(
    conn: &rusqlite::Connection,
    kind: TargetKind,
    target_id: &str,
) -> std::result::Result<Option<VoteSets>, tokio_rusqlite::Error> {
    let row = conn
        .query_row(
            "SELECT upvoters, downvoters FROM vote_ledgers WHERE target_kind = ?1 AND target_id = ?2",
            params![kind.as_str(), target_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    match row {
        Some((up, down)) => Ok(Some(VoteSets {
            upvoters: serde_json::from_str(&up).map_err(json_error)?,
            downvoters: serde_json::from_str(&down).map_err(json_error)?,
        })),
        None => Ok(None),
    }
}

fn store_vote_sets(
    conn: &rusqlite::Connection,
    kind: TargetKind,
    target_id: &str,
    sets: &VoteSets,
) -> std::result::Result<(), tokio_rusqlite::Error> {
    let up = serde_json::to_string(&sets.upvoters).map_err(json_error)?;
    let down = serde_json::to_string(&sets.downvoters).map_err(json_error)?;
    conn.execute(
        r#"INSERT INTO vote_ledgers (target_kind, target_id, upvoters, downvoters)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(target_kind, target_id) DO UPDATE SET
               upvoters = excluded.upvoters,
               downvoters = excluded.downvoters,
               updated_at = datetime('now')"#,
        params![kind.as_str(), target_id, up, down],
    )?;
    Ok(())
}

fn json_error(e: serde_json::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(e))
}

fn review_from_row(row: &Row) -> rusqlite::Result<ReviewRecord> {
    let micros: i64 = row.get(5)?;
    let created_at = DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, micros))?;

    Ok(ReviewRecord {
        id: row.get(0)?,
        book_id: row.get(1)?,
        author_id: row.get(2)?,
        author_display_name: row.get(3)?,
        content: row.get(4)?,
        created_at,
    })
}
