use uuid::Uuid;

use threadkit_types::api::{ToggleReactionRequest, ToggleReactionResponse};
use threadkit_types::events::{OperationDescriptor, OperationType, ThreadEvent};
use threadkit_types::models::ReactionGroup;

use crate::error::ServiceError;
use crate::state::ThreadService;

impl ThreadService {
    pub async fn toggle_reaction(
        &self,
        caller: &str,
        req: ToggleReactionRequest,
    ) -> Result<ToggleReactionResponse, ServiceError> {
        let message_id = req.message_id;
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::React).message(message_id),
            caller,
        )?;

        let uid = user_id.clone();
        let emoji = req.emoji.clone();
        let res = self
            .blocking(move |db| db.toggle_reaction(message_id, &uid, &emoji))
            .await?;

        let thread_id = res.thread_id;
        let event = if res.added {
            ThreadEvent::ReactionAdded {
                message_id,
                thread_id,
                user_id,
                emoji: req.emoji,
            }
        } else {
            ThreadEvent::ReactionRemoved {
                message_id,
                thread_id,
                user_id,
                emoji: req.emoji,
            }
        };
        self.dispatcher().publish(event);
        Ok(res)
    }

    /// Idempotent: `None` when the caller had already reacted with `emoji`.
    pub async fn add_reaction(
        &self,
        caller: &str,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::React).message(message_id),
            caller,
        )?;

        let uid = user_id.clone();
        let e = emoji.to_string();
        let res = self
            .blocking(move |db| db.add_reaction(message_id, &uid, &e))
            .await?;

        if res.reaction_id.is_some() {
            self.dispatcher().publish(ThreadEvent::ReactionAdded {
                message_id,
                thread_id: res.thread_id,
                user_id,
                emoji: emoji.to_string(),
            });
        }
        Ok(res.reaction_id)
    }

    pub async fn remove_reaction(
        &self,
        caller: &str,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<bool, ServiceError> {
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::React).message(message_id),
            caller,
        )?;

        let uid = user_id.clone();
        let e = emoji.to_string();
        let res = self
            .blocking(move |db| db.remove_reaction(message_id, &uid, &e))
            .await?;

        if let (true, Some(thread_id)) = (res.removed, res.thread_id) {
            self.dispatcher().publish(ThreadEvent::ReactionRemoved {
                message_id,
                thread_id,
                user_id,
                emoji: emoji.to_string(),
            });
        }
        Ok(res.removed)
    }

    pub async fn reaction_summary(
        &self,
        caller: &str,
        message_id: Uuid,
    ) -> Result<Vec<ReactionGroup>, ServiceError> {
        let viewer = self.authorize(
            OperationDescriptor::new(OperationType::Read).message(message_id),
            caller,
        )?;
        self.blocking(move |db| db.summarize_reactions(message_id, Some(&viewer)))
            .await
    }

    pub async fn reaction_users(
        &self,
        caller: &str,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<Vec<String>, ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Read).message(message_id),
            caller,
        )?;
        let emoji = emoji.to_string();
        self.blocking(move |db| db.reaction_users(message_id, &emoji))
            .await
    }
}
