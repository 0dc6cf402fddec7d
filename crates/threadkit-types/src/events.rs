use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Mention;

/// Events published after a write commits, for observers that want to
/// re-query or notify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ThreadEvent {
    /// Fired once per successful comment.
    NewMessage {
        message_id: Uuid,
        thread_id: Uuid,
        author_id: String,
        body: String,
        mentions: Vec<Mention>,
    },

    /// Fired once per entry in a new comment's mention list.
    Mention {
        message_id: Uuid,
        thread_id: Uuid,
        mentioned_user_id: String,
        author_id: String,
        body: String,
    },

    MessageEdited { message_id: Uuid, thread_id: Uuid },

    MessageDeleted { message_id: Uuid, thread_id: Uuid },

    ReactionAdded {
        message_id: Uuid,
        thread_id: Uuid,
        user_id: String,
        emoji: String,
    },

    ReactionRemoved {
        message_id: Uuid,
        thread_id: Uuid,
        user_id: String,
        emoji: String,
    },

    TypingChanged {
        thread_id: Uuid,
        user_id: String,
        is_typing: bool,
    },

    ThreadResolved {
        thread_id: Uuid,
        resolved: bool,
        user_id: Option<String>,
    },

    ThreadDeleted { thread_id: Uuid },
}

impl ThreadEvent {
    pub fn thread_id(&self) -> Uuid {
        match self {
            Self::NewMessage { thread_id, .. }
            | Self::Mention { thread_id, .. }
            | Self::MessageEdited { thread_id, .. }
            | Self::MessageDeleted { thread_id, .. }
            | Self::ReactionAdded { thread_id, .. }
            | Self::ReactionRemoved { thread_id, .. }
            | Self::TypingChanged { thread_id, .. }
            | Self::ThreadResolved { thread_id, .. }
            | Self::ThreadDeleted { thread_id } => *thread_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Create,
    Update,
    Delete,
    React,
}

/// What an authorization hook is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    #[serde(rename = "type")]
    pub op: OperationType,
    pub zone_id: Option<Uuid>,
    pub thread_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
}

impl OperationDescriptor {
    pub fn new(op: OperationType) -> Self {
        Self {
            op,
            zone_id: None,
            thread_id: None,
            message_id: None,
        }
    }

    pub fn zone(mut self, zone_id: Uuid) -> Self {
        self.zone_id = Some(zone_id);
        self
    }

    pub fn thread(mut self, thread_id: Uuid) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn message(mut self, message_id: Uuid) -> Self {
        self.message_id = Some(message_id);
        self
    }
}
