//! Subtree deletion for zones, threads and messages.
//!
//! These run inside the caller's transaction, so a failure at any step
//! leaves the hierarchy untouched. Each step deletes by parent key and is a
//! no-op when the rows are already gone.

use rusqlite::Connection;
use uuid::Uuid;

use threadkit_types::models::DeleteCounts;

use crate::error::{Result, StoreError};
use crate::zones::query_zone;

/// Remove a message and its reactions. Returns the number of reactions removed.
pub(crate) fn delete_message(conn: &Connection, message_id: Uuid) -> Result<usize> {
    let id = message_id.to_string();
    let reactions = conn.execute("DELETE FROM reactions WHERE message_id = ?1", [&id])?;
    conn.execute("DELETE FROM messages WHERE id = ?1", [&id])?;
    Ok(reactions)
}

/// Remove a thread's reactions, messages and typing indicators, then the thread.
pub(crate) fn delete_thread(conn: &Connection, thread_id: Uuid) -> Result<DeleteCounts> {
    let id = thread_id.to_string();

    let deleted_reactions = conn.execute(
        "DELETE FROM reactions WHERE message_id IN (SELECT id FROM messages WHERE thread_id = ?1)",
        [&id],
    )?;
    let deleted_messages = conn.execute("DELETE FROM messages WHERE thread_id = ?1", [&id])?;
    let deleted_typing_indicators =
        conn.execute("DELETE FROM typing_indicators WHERE thread_id = ?1", [&id])?;
    let deleted_threads = conn.execute("DELETE FROM threads WHERE id = ?1", [&id])?;

    Ok(DeleteCounts {
        deleted_threads,
        deleted_messages,
        deleted_reactions,
        deleted_typing_indicators,
    })
}

/// Remove every thread in the zone, then the zone itself.
pub(crate) fn delete_zone(conn: &Connection, zone_id: Uuid) -> Result<DeleteCounts> {
    if query_zone(conn, zone_id)?.is_none() {
        return Err(StoreError::not_found("zone", zone_id));
    }

    let thread_ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM threads WHERE zone_id = ?1")?;
        stmt.query_map([zone_id.to_string()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut counts = DeleteCounts::default();
    for raw in thread_ids {
        let thread_id: Uuid = raw
            .parse()
            .map_err(|_| StoreError::InvalidState(format!("corrupt thread id {}", raw)))?;
        counts += delete_thread(conn, thread_id)?;
    }

    conn.execute("DELETE FROM zones WHERE id = ?1", [zone_id.to_string()])?;
    Ok(counts)
}
