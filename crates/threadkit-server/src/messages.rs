use uuid::Uuid;

use threadkit_types::api::{
    AddCommentRequest, AddCommentResponse, EditMessageRequest, EditMessageResponse,
    ListMessagesRequest,
};
use threadkit_types::events::{OperationDescriptor, OperationType, ThreadEvent};
use threadkit_types::models::{MessagePage, MessageWithReactions};

use crate::error::ServiceError;
use crate::state::ThreadService;

impl ThreadService {
    /// Post as the caller. Publishes `NewMessage` and one `Mention` per
    /// mentioned user after the write commits.
    pub async fn add_comment(
        &self,
        caller: &str,
        req: AddCommentRequest,
    ) -> Result<AddCommentResponse, ServiceError> {
        let author_id = self.authorize(
            OperationDescriptor::new(OperationType::Create).thread(req.thread_id),
            caller,
        )?;

        let thread_id = req.thread_id;
        let author = author_id.clone();
        let (res, body) = self
            .blocking(move |db| {
                let res = db.add_comment(req.thread_id, &author, &req.body, &req.attachments)?;
                Ok((res, req.body))
            })
            .await?;

        self.dispatcher()
            .publish_comment(thread_id, &author_id, &body, &res);
        Ok(res)
    }

    /// Reactions carry `includes_me` relative to the caller.
    pub async fn get_message(
        &self,
        caller: &str,
        message_id: Uuid,
    ) -> Result<Option<MessageWithReactions>, ServiceError> {
        let viewer = self.authorize(
            OperationDescriptor::new(OperationType::Read).message(message_id),
            caller,
        )?;
        self.blocking(move |db| db.get_message(message_id, Some(&viewer)))
            .await
    }

    pub async fn list_messages(
        &self,
        caller: &str,
        req: ListMessagesRequest,
    ) -> Result<MessagePage, ServiceError> {
        let viewer = self.authorize(
            OperationDescriptor::new(OperationType::Read).thread(req.thread_id),
            caller,
        )?;
        self.blocking(move |db| {
            db.list_messages(
                req.thread_id,
                req.limit,
                req.cursor.as_deref(),
                req.order,
                Some(&viewer),
                req.include_deleted,
            )
        })
        .await
    }

    /// Edit as the author; anyone else gets `PermissionDenied`.
    pub async fn edit_message(
        &self,
        caller: &str,
        req: EditMessageRequest,
    ) -> Result<EditMessageResponse, ServiceError> {
        let message_id = req.message_id;
        let author_id = self.authorize(
            OperationDescriptor::new(OperationType::Update).message(message_id),
            caller,
        )?;
        let res = self
            .blocking(move |db| db.edit_message(message_id, &req.body, Some(&author_id)))
            .await?;

        self.dispatcher().publish(ThreadEvent::MessageEdited {
            message_id,
            thread_id: res.thread_id,
        });
        Ok(res)
    }

    /// Soft-delete as the author.
    pub async fn delete_message(&self, caller: &str, message_id: Uuid) -> Result<(), ServiceError> {
        let author_id = self.authorize(
            OperationDescriptor::new(OperationType::Delete).message(message_id),
            caller,
        )?;
        let thread_id = self
            .blocking(move |db| db.soft_delete_message(message_id, Some(&author_id)))
            .await?;

        self.dispatcher().publish(ThreadEvent::MessageDeleted {
            message_id,
            thread_id,
        });
        Ok(())
    }

    /// Hard delete with no ownership check. Authorization is the only gate.
    pub async fn permanently_delete_message(
        &self,
        caller: &str,
        message_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Delete).message(message_id),
            caller,
        )?;
        let thread_id = self
            .blocking(move |db| db.permanently_delete_message(message_id))
            .await?;

        self.dispatcher().publish(ThreadEvent::MessageDeleted {
            message_id,
            thread_id,
        });
        Ok(())
    }

    pub async fn resolve_message(&self, caller: &str, message_id: Uuid) -> Result<(), ServiceError> {
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::Update).message(message_id),
            caller,
        )?;
        self.blocking(move |db| db.resolve_message(message_id, &user_id))
            .await
    }

    pub async fn unresolve_message(&self, caller: &str, message_id: Uuid) -> Result<(), ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Update).message(message_id),
            caller,
        )?;
        self.blocking(move |db| db.unresolve_message(message_id))
            .await
    }
}
