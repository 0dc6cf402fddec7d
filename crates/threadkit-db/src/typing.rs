//! Typing indicators.
//!
//! A row is live while `now <= expires_at`. Reads filter on that directly, so
//! an expired row is invisible before any sweep physically removes it.

use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use threadkit_types::models::{TypingIndicator, TypingUser};

use crate::Database;
use crate::clock::to_datetime;
use crate::error::Result;
use crate::models::TypingRow;
use crate::threads::require_thread;

impl Database {
    /// Start or stop typing. Starting refreshes the expiry; stopping when
    /// not typing is a no-op. Returns whether presence changed: always for a
    /// start, and for a stop only when an indicator was removed.
    pub fn set_typing(&self, thread_id: Uuid, user_id: &str, is_typing: bool) -> Result<bool> {
        if !is_typing {
            return self.with_tx(|tx| Ok(delete_indicator(tx, thread_id, user_id)? > 0));
        }

        let now = self.now_millis();
        let expires_at = now + self.options().typing_ttl.as_millis() as i64;
        self.with_tx(|tx| {
            require_thread(tx, thread_id)?;
            tx.execute(
                "INSERT INTO typing_indicators (thread_id, user_id, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(thread_id, user_id)
                 DO UPDATE SET updated_at = excluded.updated_at, expires_at = excluded.expires_at",
                params![thread_id.to_string(), user_id, now, expires_at],
            )?;
            Ok(true)
        })
    }

    /// Live typists on a thread, earliest first, optionally minus one user.
    pub fn get_typing_users(
        &self,
        thread_id: Uuid,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<TypingUser>> {
        let now = self.now_millis();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, updated_at FROM typing_indicators
                 WHERE thread_id = ?1 AND expires_at >= ?2 AND (?3 IS NULL OR user_id != ?3)
                 ORDER BY updated_at ASC, user_id ASC",
            )?;
            let users = stmt
                .query_map(
                    params![thread_id.to_string(), now, exclude_user_id],
                    |row| {
                        Ok(TypingUser {
                            user_id: row.get(0)?,
                            updated_at: to_datetime(row.get(1)?),
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    /// Every stored indicator for a thread, expired or not.
    pub fn typing_indicators(&self, thread_id: Uuid) -> Result<Vec<TypingIndicator>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id, user_id, updated_at, expires_at FROM typing_indicators
                 WHERE thread_id = ?1
                 ORDER BY updated_at ASC, user_id ASC",
            )?;
            let rows = stmt
                .query_map([thread_id.to_string()], TypingRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(TypingRow::into_model).collect())
        })
    }

    /// Drop the user's indicators on every thread. Scans the whole table;
    /// there is no index on `user_id`.
    pub fn clear_user_typing(&self, user_id: &str) -> Result<usize> {
        let removed = self.with_tx(|tx| {
            Ok(tx.execute("DELETE FROM typing_indicators WHERE user_id = ?1", [user_id])?)
        })?;
        if removed > 0 {
            debug!("Cleared {} typing indicators for {}", removed, user_id);
        }
        Ok(removed)
    }

    /// Physically remove rows with `expires_at < now_millis`.
    pub fn sweep_expired_typing(&self, now_millis: i64) -> Result<usize> {
        self.with_tx(|tx| {
            Ok(tx.execute(
                "DELETE FROM typing_indicators WHERE expires_at < ?1",
                [now_millis],
            )?)
        })
    }

    /// Sweep against the store's own clock.
    pub fn sweep_expired_typing_now(&self) -> Result<usize> {
        self.sweep_expired_typing(self.now_millis())
    }
}

pub(crate) fn delete_indicator(conn: &Connection, thread_id: Uuid, user_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM typing_indicators WHERE thread_id = ?1 AND user_id = ?2",
        params![thread_id.to_string(), user_id],
    )?)
}
