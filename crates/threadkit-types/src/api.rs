use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Attachment, Link, Mention, Position, SortOrder};

fn default_limit() -> u32 {
    50
}

// -- Zones --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetOrCreateZoneRequest {
    pub entity_id: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

// -- Threads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThreadRequest {
    pub zone_id: Uuid,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListThreadsRequest {
    pub zone_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub include_resolved: bool,
    #[serde(default)]
    pub cursor: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub thread_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddCommentResponse {
    pub message_id: Uuid,
    pub mentions: Vec<Mention>,
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListMessagesRequest {
    pub thread_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub message_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditMessageResponse {
    pub thread_id: Uuid,
    pub mentions: Vec<Mention>,
    pub links: Vec<Link>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub message_id: Uuid,
    pub emoji: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleReactionResponse {
    pub thread_id: Uuid,
    pub added: bool,
    pub reaction_id: Option<Uuid>,
}

/// `reaction_id` is `None` when the reaction already existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddReactionResponse {
    pub thread_id: Uuid,
    pub reaction_id: Option<Uuid>,
}

/// `thread_id` is only known when the message still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveReactionResponse {
    pub removed: bool,
    pub thread_id: Option<Uuid>,
}

// -- Typing --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetTypingRequest {
    pub thread_id: Uuid,
    pub is_typing: bool,
}
