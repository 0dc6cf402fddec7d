use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use threadkit_types::api::{AddReactionResponse, RemoveReactionResponse, ToggleReactionResponse};
use threadkit_types::models::{Reaction, ReactionGroup};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::messages::{parse_thread_id, query_message, require_live_message};
use crate::models::{REACTION_COLUMNS, ReactionRow};
use crate::threads::touch_activity;

impl Database {
    /// Add a reaction. `reaction_id` is `None` without error when the user
    /// already reacted to the message with this emoji.
    pub fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: &str,
        emoji: &str,
    ) -> Result<AddReactionResponse> {
        validate_emoji(emoji)?;
        let now = self.now_millis();
        self.with_tx(|tx| {
            let message = require_live_message(tx, message_id)?;
            let thread_id = parse_thread_id(&message)?;
            let id = Uuid::now_v7();
            let inserted = tx.execute(
                "INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(message_id, emoji, user_id) DO NOTHING",
                params![id.to_string(), message_id.to_string(), user_id, emoji, now],
            )?;
            if inserted == 0 {
                return Ok(AddReactionResponse {
                    thread_id,
                    reaction_id: None,
                });
            }
            touch_activity(tx, thread_id, now)?;
            Ok(AddReactionResponse {
                thread_id,
                reaction_id: Some(id),
            })
        })
    }

    /// Reports whether a reaction row was removed. Soft-deleted messages
    /// still give up their reactions.
    pub fn remove_reaction(
        &self,
        message_id: Uuid,
        user_id: &str,
        emoji: &str,
    ) -> Result<RemoveReactionResponse> {
        let now = self.now_millis();
        self.with_tx(|tx| {
            let Some(message) = query_message(tx, message_id)? else {
                return Ok(RemoveReactionResponse {
                    removed: false,
                    thread_id: None,
                });
            };
            let thread_id = parse_thread_id(&message)?;
            let removed = delete_reaction(tx, message_id, user_id, emoji)?;
            if removed {
                touch_activity(tx, thread_id, now)?;
            }
            Ok(RemoveReactionResponse {
                removed,
                thread_id: Some(thread_id),
            })
        })
    }

    /// Remove the reaction if present, otherwise add it.
    pub fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: &str,
        emoji: &str,
    ) -> Result<ToggleReactionResponse> {
        validate_emoji(emoji)?;
        let now = self.now_millis();
        self.with_tx(|tx| {
            let message = require_live_message(tx, message_id)?;
            let thread_id = parse_thread_id(&message)?;

            let response = if delete_reaction(tx, message_id, user_id, emoji)? {
                ToggleReactionResponse {
                    thread_id,
                    added: false,
                    reaction_id: None,
                }
            } else {
                let id = Uuid::now_v7();
                tx.execute(
                    "INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id.to_string(), message_id.to_string(), user_id, emoji, now],
                )?;
                ToggleReactionResponse {
                    thread_id,
                    added: true,
                    reaction_id: Some(id),
                }
            };

            touch_activity(tx, thread_id, now)?;
            Ok(response)
        })
    }

    pub fn summarize_reactions(
        &self,
        message_id: Uuid,
        current_user_id: Option<&str>,
    ) -> Result<Vec<ReactionGroup>> {
        self.with_conn(|conn| summarize(conn, message_id, current_user_id))
    }

    /// Batch form of [`Database::summarize_reactions`].
    pub fn summarize_reactions_many(
        &self,
        message_ids: &[Uuid],
        current_user_id: Option<&str>,
    ) -> Result<HashMap<Uuid, Vec<ReactionGroup>>> {
        self.with_conn(|conn| summarize_many(conn, message_ids, current_user_id))
    }

    /// Users who reacted with `emoji`, oldest first.
    pub fn reaction_users(&self, message_id: Uuid, emoji: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM reactions
                 WHERE message_id = ?1 AND emoji = ?2
                 ORDER BY created_at ASC, id ASC",
            )?;
            let users = stmt
                .query_map(params![message_id.to_string(), emoji], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(users)
        })
    }

    pub fn list_reactions(&self, message_id: Uuid) -> Result<Vec<Reaction>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC, id ASC",
                REACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([message_id.to_string()], ReactionRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(ReactionRow::into_model).collect())
        })
    }
}

fn validate_emoji(emoji: &str) -> Result<()> {
    if emoji.trim().is_empty() {
        return Err(StoreError::InvalidArgument("emoji must not be empty".into()));
    }
    Ok(())
}

fn delete_reaction(conn: &Connection, message_id: Uuid, user_id: &str, emoji: &str) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM reactions WHERE message_id = ?1 AND emoji = ?2 AND user_id = ?3",
            params![message_id.to_string(), emoji, user_id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute("DELETE FROM reactions WHERE id = ?1", [&id])?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub(crate) fn summarize(
    conn: &Connection,
    message_id: Uuid,
    current_user_id: Option<&str>,
) -> Result<Vec<ReactionGroup>> {
    Ok(summarize_many(conn, &[message_id], current_user_id)?
        .remove(&message_id)
        .unwrap_or_default())
}

/// Group reactions per message by emoji. Groups appear in order of their
/// first reaction; users within a group in order of reaction.
pub(crate) fn summarize_many(
    conn: &Connection,
    message_ids: &[Uuid],
    current_user_id: Option<&str>,
) -> Result<HashMap<Uuid, Vec<ReactionGroup>>> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reactions WHERE message_id IN ({}) ORDER BY created_at ASC, id ASC",
        REACTION_COLUMNS,
        placeholders.join(", ")
    ))?;
    let rows = stmt
        .query_map(
            params_from_iter(message_ids.iter().map(|id| id.to_string())),
            ReactionRow::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: HashMap<Uuid, Vec<ReactionGroup>> = HashMap::new();
    for row in rows {
        let reaction = row.into_model();
        let groups = grouped.entry(reaction.message_id).or_default();
        let is_me = current_user_id == Some(reaction.user_id.as_str());

        match groups.iter_mut().find(|g| g.emoji == reaction.emoji) {
            Some(group) => {
                group.count += 1;
                group.includes_me |= is_me;
                group.users.push(reaction.user_id);
            }
            None => groups.push(ReactionGroup {
                emoji: reaction.emoji,
                count: 1,
                users: vec![reaction.user_id],
                includes_me: is_me,
            }),
        }
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testutil::{self, tick};

    fn message(db: &Database) -> (Uuid, Uuid) {
        let zone = db.get_or_create_zone("doc", None).unwrap();
        let thread = db.create_thread(zone, None, None).unwrap();
        let msg = db.add_comment(thread, "alice", "hello", &[]).unwrap();
        (thread, msg.message_id)
    }

    #[test]
    fn add_is_idempotent() {
        let (db, _) = testutil::db();
        let (_, msg) = message(&db);
        assert!(db.add_reaction(msg, "bob", "👍").unwrap().reaction_id.is_some());
        assert!(db.add_reaction(msg, "bob", "👍").unwrap().reaction_id.is_none());
        assert_eq!(db.list_reactions(msg).unwrap().len(), 1);
    }

    #[test]
    fn add_requires_message() {
        let (db, _) = testutil::db();
        let err = db.add_reaction(Uuid::now_v7(), "bob", "👍").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let (_, msg) = message(&db);
        let err = db.add_reaction(msg, "bob", " ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn add_touches_thread() {
        let (db, clock) = testutil::db();
        let (thread, msg) = message(&db);
        tick(&clock);
        assert_eq!(db.add_reaction(msg, "bob", "👍").unwrap().thread_id, thread);
        let t = db.get_thread(thread).unwrap().unwrap();
        assert_eq!(t.last_activity_at.timestamp_millis(), testutil::START + 1);
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let (db, _) = testutil::db();
        let (thread, msg) = message(&db);

        let first = db.toggle_reaction(msg, "bob", "❤️").unwrap();
        assert_eq!(first.thread_id, thread);
        assert!(first.added);
        assert!(first.reaction_id.is_some());

        let second = db.toggle_reaction(msg, "bob", "❤️").unwrap();
        assert!(!second.added);
        assert!(second.reaction_id.is_none());

        assert!(db.summarize_reactions(msg, Some("bob")).unwrap().is_empty());
    }

    #[test]
    fn remove_reports_whether_deleted() {
        let (db, _) = testutil::db();
        let (thread, msg) = message(&db);
        db.add_reaction(msg, "bob", "👍").unwrap();

        let removed = db.remove_reaction(msg, "bob", "👍").unwrap();
        assert!(removed.removed);
        assert_eq!(removed.thread_id, Some(thread));
        assert!(!db.remove_reaction(msg, "bob", "👍").unwrap().removed);

        let missing = db.remove_reaction(Uuid::now_v7(), "bob", "👍").unwrap();
        assert!(!missing.removed);
        assert!(missing.thread_id.is_none());
    }

    #[test]
    fn remove_touches_thread() {
        let (db, clock) = testutil::db();
        let (thread, msg) = message(&db);
        db.add_reaction(msg, "bob", "👍").unwrap();

        tick(&clock);
        db.remove_reaction(msg, "carol", "👍").unwrap();
        let t = db.get_thread(thread).unwrap().unwrap();
        assert_eq!(t.last_activity_at.timestamp_millis(), testutil::START);

        db.remove_reaction(msg, "bob", "👍").unwrap();
        let t = db.get_thread(thread).unwrap().unwrap();
        assert_eq!(t.last_activity_at.timestamp_millis(), testutil::START + 1);
    }

    #[test]
    fn remove_works_on_soft_deleted_message() {
        let (db, _) = testutil::db();
        let (_, msg) = message(&db);
        db.add_reaction(msg, "bob", "👍").unwrap();
        db.soft_delete_message(msg, None).unwrap();

        assert!(db.remove_reaction(msg, "bob", "👍").unwrap().removed);
        assert!(db.list_reactions(msg).unwrap().is_empty());
    }

    #[test]
    fn toggle_requires_live_message() {
        let (db, _) = testutil::db();
        let err = db.toggle_reaction(Uuid::now_v7(), "bob", "👍").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let (_, msg) = message(&db);
        db.soft_delete_message(msg, None).unwrap();
        let err = db.toggle_reaction(msg, "bob", "👍").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn summary_groups_in_insertion_order() {
        let (db, clock) = testutil::db();
        let (_, msg) = message(&db);
        for (user, emoji) in [("bob", "👍"), ("carol", "🎉"), ("alice", "👍"), ("dave", "👍")] {
            db.add_reaction(msg, user, emoji).unwrap();
            tick(&clock);
        }

        let groups = db.summarize_reactions(msg, Some("alice")).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].emoji, "👍");
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].users, vec!["bob", "alice", "dave"]);
        assert!(groups[0].includes_me);
        assert_eq!(groups[1].emoji, "🎉");
        assert!(!groups[1].includes_me);

        let anonymous = db.summarize_reactions(msg, None).unwrap();
        assert!(anonymous.iter().all(|g| !g.includes_me));

        assert_eq!(db.reaction_users(msg, "👍").unwrap(), vec!["bob", "alice", "dave"]);
    }

    #[test]
    fn batch_summary_keys_by_message() {
        let (db, _) = testutil::db();
        let (thread, a) = message(&db);
        let b = db.add_comment(thread, "bob", "second", &[]).unwrap().message_id;
        db.add_reaction(a, "bob", "👍").unwrap();
        db.add_reaction(b, "alice", "👀").unwrap();

        let map = db.summarize_reactions_many(&[a, b], None).unwrap();
        assert_eq!(map[&a][0].emoji, "👍");
        assert_eq!(map[&b][0].emoji, "👀");
        assert!(db.summarize_reactions_many(&[], None).unwrap().is_empty());
    }
}
