//! Row types. These map directly to SQLite rows and are converted into the
//! `threadkit-types` models at the edge of each query.

use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use threadkit_types::models::{
    Message, MessagePreview, Position, Reaction, Thread, TypingIndicator, Zone,
};

use crate::clock::to_datetime;

pub const ZONE_COLUMNS: &str = "id, entity_id, metadata, created_at";

pub const THREAD_COLUMNS: &str = "id, zone_id, resolved, resolved_by, resolved_at, created_at, \
     last_activity_at, position, metadata";

pub const MESSAGE_COLUMNS: &str = "id, thread_id, author_id, body, mentions, links, attachments, \
     is_edited, is_deleted, resolved, resolved_by, resolved_at, created_at, edited_at";

pub const REACTION_COLUMNS: &str = "id, message_id, user_id, emoji, created_at";

pub struct ZoneRow {
    pub id: String,
    pub entity_id: String,
    pub metadata: Option<String>,
    pub created_at: i64,
}

pub struct ThreadRow {
    pub id: String,
    pub zone_id: String,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub created_at: i64,
    pub last_activity_at: i64,
    pub position: Option<String>,
    pub metadata: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub author_id: String,
    pub body: String,
    pub mentions: String,
    pub links: String,
    pub attachments: String,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub created_at: i64,
    pub edited_at: Option<i64>,
}

pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: i64,
}

pub struct TypingRow {
    pub thread_id: String,
    pub user_id: String,
    pub updated_at: i64,
    pub expires_at: i64,
}

impl ZoneRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_id: row.get(1)?,
            metadata: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn into_model(self) -> Zone {
        Zone {
            id: parse_id(&self.id, "zone"),
            metadata: self.metadata.as_deref().and_then(|m| parse_json::<Value>(m, &self.id)),
            entity_id: self.entity_id,
            created_at: to_datetime(self.created_at),
        }
    }
}

impl ThreadRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            zone_id: row.get(1)?,
            resolved: row.get(2)?,
            resolved_by: row.get(3)?,
            resolved_at: row.get(4)?,
            created_at: row.get(5)?,
            last_activity_at: row.get(6)?,
            position: row.get(7)?,
            metadata: row.get(8)?,
        })
    }

    pub fn into_model(self) -> Thread {
        Thread {
            id: parse_id(&self.id, "thread"),
            zone_id: parse_id(&self.zone_id, "zone"),
            resolved: self.resolved,
            resolved_by: self.resolved_by,
            resolved_at: self.resolved_at.map(to_datetime),
            created_at: to_datetime(self.created_at),
            last_activity_at: to_datetime(self.last_activity_at),
            position: self
                .position
                .as_deref()
                .and_then(|p| parse_json::<Position>(p, &self.id)),
            metadata: self.metadata.as_deref().and_then(|m| parse_json::<Value>(m, &self.id)),
        }
    }
}

impl MessageRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            thread_id: row.get(1)?,
            author_id: row.get(2)?,
            body: row.get(3)?,
            mentions: row.get(4)?,
            links: row.get(5)?,
            attachments: row.get(6)?,
            is_edited: row.get(7)?,
            is_deleted: row.get(8)?,
            resolved: row.get(9)?,
            resolved_by: row.get(10)?,
            resolved_at: row.get(11)?,
            created_at: row.get(12)?,
            edited_at: row.get(13)?,
        })
    }

    pub fn into_model(self) -> Message {
        Message {
            id: parse_id(&self.id, "message"),
            thread_id: parse_id(&self.thread_id, "thread"),
            mentions: parse_json(&self.mentions, &self.id).unwrap_or_default(),
            links: parse_json(&self.links, &self.id).unwrap_or_default(),
            attachments: parse_json(&self.attachments, &self.id).unwrap_or_default(),
            author_id: self.author_id,
            body: self.body,
            is_edited: self.is_edited,
            is_deleted: self.is_deleted,
            resolved: self.resolved,
            resolved_by: self.resolved_by,
            resolved_at: self.resolved_at.map(to_datetime),
            created_at: to_datetime(self.created_at),
            edited_at: self.edited_at.map(to_datetime),
        }
    }

    pub fn preview(&self) -> MessagePreview {
        MessagePreview {
            body: self.body.clone(),
            author_id: self.author_id.clone(),
            created_at: to_datetime(self.created_at),
        }
    }
}

impl ReactionRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            message_id: row.get(1)?,
            user_id: row.get(2)?,
            emoji: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn into_model(self) -> Reaction {
        Reaction {
            id: parse_id(&self.id, "reaction"),
            message_id: parse_id(&self.message_id, "message"),
            user_id: self.user_id,
            emoji: self.emoji,
            created_at: to_datetime(self.created_at),
        }
    }
}

impl TypingRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            thread_id: row.get(0)?,
            user_id: row.get(1)?,
            updated_at: row.get(2)?,
            expires_at: row.get(3)?,
        })
    }

    pub fn into_model(self) -> TypingIndicator {
        TypingIndicator {
            thread_id: parse_id(&self.thread_id, "thread"),
            user_id: self.user_id,
            updated_at: to_datetime(self.updated_at),
            expires_at: to_datetime(self.expires_at),
        }
    }
}

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_json<T: DeserializeOwned>(raw: &str, owner: &str) -> Option<T> {
    serde_json::from_str(raw)
        .map_err(|e| warn!("Corrupt JSON column on '{}': {}", owner, e))
        .ok()
}
