use uuid::Uuid;

use threadkit_types::api::SetTypingRequest;
use threadkit_types::events::{OperationDescriptor, OperationType, ThreadEvent};
use threadkit_types::models::TypingUser;

use crate::error::ServiceError;
use crate::state::ThreadService;

impl ThreadService {
    /// Publishes `TypingChanged` only when presence actually changed, so a
    /// stop from a user who was not typing is silent.
    pub async fn set_typing(&self, caller: &str, req: SetTypingRequest) -> Result<(), ServiceError> {
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::Update).thread(req.thread_id),
            caller,
        )?;

        let uid = user_id.clone();
        let changed = self
            .blocking(move |db| db.set_typing(req.thread_id, &uid, req.is_typing))
            .await?;

        if changed {
            self.dispatcher().publish(ThreadEvent::TypingChanged {
                thread_id: req.thread_id,
                user_id,
                is_typing: req.is_typing,
            });
        }
        Ok(())
    }

    /// Who else is typing. The caller is left out of the list.
    pub async fn get_typing_users(
        &self,
        caller: &str,
        thread_id: Uuid,
    ) -> Result<Vec<TypingUser>, ServiceError> {
        let viewer = self.authorize(
            OperationDescriptor::new(OperationType::Read).thread(thread_id),
            caller,
        )?;
        self.blocking(move |db| db.get_typing_users(thread_id, Some(&viewer)))
            .await
    }

    /// Disconnect cleanup for the caller across every thread.
    pub async fn clear_user_typing(&self, caller: &str) -> Result<usize, ServiceError> {
        let user_id = self.authorize(OperationDescriptor::new(OperationType::Delete), caller)?;
        self.blocking(move |db| db.clear_user_typing(&user_id)).await
    }

    /// Physically drop expired indicators as of the store clock.
    pub async fn sweep_expired_typing(&self) -> Result<usize, ServiceError> {
        self.blocking(|db| db.sweep_expired_typing_now()).await
    }
}
