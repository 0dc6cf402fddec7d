use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use threadkit_types::api::{AddCommentResponse, EditMessageResponse};
use threadkit_types::extract::{extract_links, extract_mentions};
use threadkit_types::models::{
    Attachment, Message, MessagePage, MessageWithReactions, SortOrder,
};

use crate::Database;
use crate::cascade;
use crate::cursor::{Cursor, finish_page};
use crate::error::{Result, StoreError};
use crate::models::{MESSAGE_COLUMNS, MessageRow};
use crate::reactions::{summarize, summarize_many};
use crate::threads::{require_thread, touch_activity};
use crate::typing;

impl Database {
    /// Post a comment. Also bumps thread activity and clears the author's
    /// typing indicator on the thread.
    pub fn add_comment(
        &self,
        thread_id: Uuid,
        author_id: &str,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<AddCommentResponse> {
        let now = self.now_millis();
        let id = Uuid::now_v7();
        let mentions = extract_mentions(body);
        let links = extract_links(body);

        self.with_tx(|tx| {
            require_thread(tx, thread_id)?;
            tx.execute(
                "INSERT INTO messages (id, thread_id, author_id, body, mentions, links, attachments, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    thread_id.to_string(),
                    author_id,
                    body,
                    serde_json::to_string(&mentions)?,
                    serde_json::to_string(&links)?,
                    serde_json::to_string(attachments)?,
                    now
                ],
            )?;
            touch_activity(tx, thread_id, now)?;
            typing::delete_indicator(tx, thread_id, author_id)?;
            Ok(())
        })?;

        debug!(
            "Message {} added to thread {} ({} mentions)",
            id,
            thread_id,
            mentions.len()
        );
        Ok(AddCommentResponse {
            message_id: id,
            mentions,
            links,
        })
    }

    /// Fetch one message with its grouped reactions. `includes_me` is only
    /// meaningful when `current_user_id` is supplied.
    pub fn get_message(
        &self,
        message_id: Uuid,
        current_user_id: Option<&str>,
    ) -> Result<Option<MessageWithReactions>> {
        self.with_tx(|tx| {
            let Some(row) = query_message(tx, message_id)? else {
                return Ok(None);
            };
            let reactions = summarize(tx, message_id, current_user_id)?;
            Ok(Some(MessageWithReactions {
                message: row.into_model(),
                reactions,
            }))
        })
    }

    pub fn thread_of_message(&self, message_id: Uuid) -> Result<Option<Uuid>> {
        self.with_conn(|conn| {
            Ok(query_message(conn, message_id)?.map(|row| row.into_model().thread_id))
        })
    }

    pub fn list_messages(
        &self,
        thread_id: Uuid,
        limit: u32,
        cursor: Option<&str>,
        order: SortOrder,
        current_user_id: Option<&str>,
        include_deleted: bool,
    ) -> Result<MessagePage> {
        let limit = self.clamp_limit(limit);
        let cursor = Cursor::parse_opt(cursor)?;
        let (cmp, dir) = match order {
            SortOrder::Asc => (">", "ASC"),
            SortOrder::Desc => ("<", "DESC"),
        };

        self.with_tx(|tx| {
            let (after_at, after_id) = match cursor {
                Some(c) => (Some(c.at), Some(c.id.to_string())),
                None => (None, None),
            };
            let mut stmt = tx.prepare(&format!(
                "SELECT {cols} FROM messages
                 WHERE thread_id = ?1
                   AND (?2 OR is_deleted = 0)
                   AND (?3 IS NULL OR created_at {cmp} ?3 OR (created_at = ?3 AND id {cmp} ?4))
                 ORDER BY created_at {dir}, id {dir}
                 LIMIT ?5",
                cols = MESSAGE_COLUMNS,
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        thread_id.to_string(),
                        include_deleted,
                        after_at,
                        after_id,
                        (limit + 1) as i64
                    ],
                    MessageRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let (rows, next_cursor, has_more) = finish_page(rows, limit, |r| {
                Cursor::new(r.created_at, r.id.parse().unwrap_or_default())
            });

            let messages: Vec<Message> = rows.into_iter().map(MessageRow::into_model).collect();
            let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
            let mut grouped = summarize_many(tx, &ids, current_user_id)?;

            let messages = messages
                .into_iter()
                .map(|message| MessageWithReactions {
                    reactions: grouped.remove(&message.id).unwrap_or_default(),
                    message,
                })
                .collect();

            Ok(MessagePage {
                messages,
                next_cursor,
                has_more,
            })
        })
    }

    /// A user's live messages, newest first.
    pub fn list_messages_by_author(&self, author_id: &str, limit: u32) -> Result<Vec<Message>> {
        let limit = self.clamp_limit(limit);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages
                 WHERE author_id = ?1 AND is_deleted = 0
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
                MESSAGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![author_id, limit as i64], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(MessageRow::into_model).collect())
        })
    }

    /// Replace the body and re-derive mentions and links from it. The
    /// response carries the owning thread so callers can route events.
    pub fn edit_message(
        &self,
        message_id: Uuid,
        body: &str,
        author_id: Option<&str>,
    ) -> Result<EditMessageResponse> {
        let now = self.now_millis();
        let mentions = extract_mentions(body);
        let links = extract_links(body);

        let thread_id = self.with_tx(|tx| {
            let row = require_live_message(tx, message_id)?;
            check_author(&row, author_id)?;
            let thread_id = parse_thread_id(&row)?;
            tx.execute(
                "UPDATE messages
                 SET body = ?2, mentions = ?3, links = ?4, is_edited = 1, edited_at = ?5
                 WHERE id = ?1",
                params![
                    message_id.to_string(),
                    body,
                    serde_json::to_string(&mentions)?,
                    serde_json::to_string(&links)?,
                    now
                ],
            )?;
            touch_activity(tx, thread_id, now)?;
            Ok(thread_id)
        })?;

        Ok(EditMessageResponse {
            thread_id,
            mentions,
            links,
        })
    }

    /// Mask the message's content. Reactions stay attached. Returns the
    /// owning thread.
    pub fn soft_delete_message(&self, message_id: Uuid, author_id: Option<&str>) -> Result<Uuid> {
        self.with_tx(|tx| {
            let row = require_live_message(tx, message_id)?;
            check_author(&row, author_id)?;
            let thread_id = parse_thread_id(&row)?;
            tx.execute(
                "UPDATE messages
                 SET body = '', mentions = '[]', links = '[]', attachments = '[]', is_deleted = 1
                 WHERE id = ?1",
                [message_id.to_string()],
            )?;
            Ok(thread_id)
        })
    }

    /// Remove the message and its reactions with no ownership check.
    /// Returns the thread the message belonged to.
    pub fn permanently_delete_message(&self, message_id: Uuid) -> Result<Uuid> {
        self.with_tx(|tx| {
            let row = query_message(tx, message_id)?
                .ok_or_else(|| StoreError::not_found("message", message_id))?;
            cascade::delete_message(tx, message_id)?;
            parse_thread_id(&row)
        })
    }

    pub fn resolve_message(&self, message_id: Uuid, user_id: &str) -> Result<()> {
        let now = self.now_millis();
        self.with_tx(|tx| {
            require_live_message(tx, message_id)?;
            tx.execute(
                "UPDATE messages SET resolved = 1, resolved_by = ?2, resolved_at = ?3 WHERE id = ?1",
                params![message_id.to_string(), user_id, now],
            )?;
            Ok(())
        })
    }

    pub fn unresolve_message(&self, message_id: Uuid) -> Result<()> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE messages SET resolved = 0, resolved_by = NULL, resolved_at = NULL WHERE id = ?1",
                [message_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found("message", message_id));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_message(conn: &Connection, message_id: Uuid) -> Result<Option<MessageRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS),
            [message_id.to_string()],
            MessageRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// The message, provided it exists and has not been soft-deleted.
pub(crate) fn require_live_message(conn: &Connection, message_id: Uuid) -> Result<MessageRow> {
    let row = query_message(conn, message_id)?
        .ok_or_else(|| StoreError::not_found("message", message_id))?;
    if row.is_deleted {
        return Err(StoreError::InvalidState(format!(
            "message {} is deleted",
            message_id
        )));
    }
    Ok(row)
}

pub(crate) fn parse_thread_id(row: &MessageRow) -> Result<Uuid> {
    row.thread_id
        .parse()
        .map_err(|_| StoreError::InvalidState(format!("corrupt thread id on message {}", row.id)))
}

fn check_author(row: &MessageRow, author_id: Option<&str>) -> Result<()> {
    match author_id {
        Some(author) if author != row.author_id => Err(StoreError::PermissionDenied),
        _ => Ok(()),
    }
}
