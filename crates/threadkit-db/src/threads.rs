use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use threadkit_types::models::{DeleteCounts, Position, Thread, ThreadPage, ThreadWithPreview};

use crate::Database;
use crate::cascade;
use crate::cursor::{Cursor, finish_page};
use crate::error::{Result, StoreError};
use crate::models::{MESSAGE_COLUMNS, MessageRow, THREAD_COLUMNS, ThreadRow};
use crate::zones::query_zone;

impl Database {
    pub fn create_thread(
        &self,
        zone_id: Uuid,
        position: Option<&Position>,
        metadata: Option<&Value>,
    ) -> Result<Uuid> {
        let now = self.now_millis();
        let id = Uuid::now_v7();
        self.with_tx(|tx| {
            if query_zone(tx, zone_id)?.is_none() {
                return Err(StoreError::not_found("zone", zone_id));
            }
            let position = position.map(serde_json::to_string).transpose()?;
            let metadata = metadata.map(serde_json::to_string).transpose()?;
            tx.execute(
                "INSERT INTO threads (id, zone_id, resolved, created_at, last_activity_at, position, metadata)
                 VALUES (?1, ?2, 0, ?3, ?3, ?4, ?5)",
                params![id.to_string(), zone_id.to_string(), now, position, metadata],
            )?;
            Ok(())
        })?;
        debug!("Created thread {} in zone {}", id, zone_id);
        Ok(id)
    }

    pub fn get_thread(&self, thread_id: Uuid) -> Result<Option<Thread>> {
        self.with_conn(|conn| Ok(query_thread(conn, thread_id)?.map(ThreadRow::into_model)))
    }

    /// Threads in a zone, most recently active first.
    ///
    /// The resolved filter is applied in the same query that looks ahead for
    /// `limit + 1` rows, so `has_more` and `next_cursor` describe the
    /// filtered sequence.
    pub fn list_threads(
        &self,
        zone_id: Uuid,
        limit: u32,
        include_resolved: bool,
        cursor: Option<&str>,
    ) -> Result<ThreadPage> {
        let limit = self.clamp_limit(limit);
        let cursor = Cursor::parse_opt(cursor)?;
        self.with_tx(|tx| {
            let (after_at, after_id) = match cursor {
                Some(c) => (Some(c.at), Some(c.id.to_string())),
                None => (None, None),
            };
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM threads
                 WHERE zone_id = ?1
                   AND (?2 OR resolved = 0)
                   AND (?3 IS NULL OR last_activity_at < ?3 OR (last_activity_at = ?3 AND id < ?4))
                 ORDER BY last_activity_at DESC, id DESC
                 LIMIT ?5",
                THREAD_COLUMNS
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        zone_id.to_string(),
                        include_resolved,
                        after_at,
                        after_id,
                        (limit + 1) as i64
                    ],
                    ThreadRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let (rows, next_cursor, has_more) = finish_page(rows, limit, |r| {
                Cursor::new(r.last_activity_at, r.id.parse().unwrap_or_default())
            });

            let threads = rows
                .into_iter()
                .map(|row| with_preview(tx, row))
                .collect::<Result<Vec<_>>>()?;

            Ok(ThreadPage {
                threads,
                next_cursor,
                has_more,
            })
        })
    }

    pub fn count_unresolved_threads(&self, zone_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM threads WHERE zone_id = ?1 AND resolved = 0",
                [zone_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Mark resolved. Resolving again restamps `resolved_by`/`resolved_at`.
    pub fn resolve_thread(&self, thread_id: Uuid, user_id: &str) -> Result<()> {
        let now = self.now_millis();
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE threads SET resolved = 1, resolved_by = ?2, resolved_at = ?3 WHERE id = ?1",
                params![thread_id.to_string(), user_id, now],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found("thread", thread_id));
            }
            Ok(())
        })
    }

    pub fn unresolve_thread(&self, thread_id: Uuid) -> Result<()> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE threads SET resolved = 0, resolved_by = NULL, resolved_at = NULL WHERE id = ?1",
                [thread_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found("thread", thread_id));
            }
            Ok(())
        })
    }

    pub fn update_thread_position(&self, thread_id: Uuid, position: Option<&Position>) -> Result<()> {
        self.with_tx(|tx| {
            let position = position.map(serde_json::to_string).transpose()?;
            let updated = tx.execute(
                "UPDATE threads SET position = ?2 WHERE id = ?1",
                params![thread_id.to_string(), position],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found("thread", thread_id));
            }
            Ok(())
        })
    }

    pub fn touch_thread_activity(&self, thread_id: Uuid) -> Result<()> {
        let now = self.now_millis();
        self.with_tx(|tx| touch_activity(tx, thread_id, now))
    }

    /// Delete the thread with its messages, their reactions and its typing
    /// indicators. The zone is untouched.
    pub fn delete_thread(&self, thread_id: Uuid) -> Result<DeleteCounts> {
        let counts = self.with_tx(|tx| {
            if query_thread(tx, thread_id)?.is_none() {
                return Err(StoreError::not_found("thread", thread_id));
            }
            cascade::delete_thread(tx, thread_id)
        })?;
        info!(
            "Deleted thread {} ({} messages, {} reactions)",
            thread_id, counts.deleted_messages, counts.deleted_reactions
        );
        Ok(counts)
    }
}

pub(crate) fn query_thread(conn: &Connection, thread_id: Uuid) -> Result<Option<ThreadRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM threads WHERE id = ?1", THREAD_COLUMNS),
            [thread_id.to_string()],
            ThreadRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Fails with `NotFound` unless the thread exists.
pub(crate) fn require_thread(conn: &Connection, thread_id: Uuid) -> Result<ThreadRow> {
    query_thread(conn, thread_id)?.ok_or_else(|| StoreError::not_found("thread", thread_id))
}

/// Bump `last_activity_at`. Never moves it backwards.
pub(crate) fn touch_activity(conn: &Connection, thread_id: Uuid, now: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE threads SET last_activity_at = MAX(last_activity_at, ?2) WHERE id = ?1",
        params![thread_id.to_string(), now],
    )?;
    if updated == 0 {
        return Err(StoreError::not_found("thread", thread_id));
    }
    Ok(())
}

fn with_preview(conn: &Connection, row: ThreadRow) -> Result<ThreadWithPreview> {
    let first: Option<MessageRow> = conn
        .query_row(
            &format!(
                "SELECT {} FROM messages
                 WHERE thread_id = ?1 AND is_deleted = 0
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1",
                MESSAGE_COLUMNS
            ),
            [&row.id],
            MessageRow::from_row,
        )
        .optional()?;

    let message_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE thread_id = ?1 AND is_deleted = 0",
        [&row.id],
        |r| r.get(0),
    )?;

    Ok(ThreadWithPreview {
        thread: row.into_model(),
        first_message: first.as_ref().map(MessageRow::preview),
        message_count: message_count as u64,
    })
}
