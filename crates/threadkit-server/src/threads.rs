use uuid::Uuid;

use threadkit_types::api::{CreateThreadRequest, ListThreadsRequest};
use threadkit_types::events::{OperationDescriptor, OperationType, ThreadEvent};
use threadkit_types::models::{DeleteCounts, Position, Thread, ThreadPage};

use crate::error::ServiceError;
use crate::state::ThreadService;

impl ThreadService {
    pub async fn create_thread(&self, caller: &str, req: CreateThreadRequest) -> Result<Uuid, ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Create).zone(req.zone_id),
            caller,
        )?;
        self.blocking(move |db| {
            db.create_thread(req.zone_id, req.position.as_ref(), req.metadata.as_ref())
        })
        .await
    }

    pub async fn get_thread(&self, caller: &str, thread_id: Uuid) -> Result<Option<Thread>, ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Read).thread(thread_id), caller)?;
        self.blocking(move |db| db.get_thread(thread_id)).await
    }

    pub async fn list_threads(&self, caller: &str, req: ListThreadsRequest) -> Result<ThreadPage, ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Read).zone(req.zone_id),
            caller,
        )?;
        self.blocking(move |db| {
            db.list_threads(req.zone_id, req.limit, req.include_resolved, req.cursor.as_deref())
        })
        .await
    }

    pub async fn resolve_thread(&self, caller: &str, thread_id: Uuid) -> Result<(), ServiceError> {
        let user_id = self.authorize(
            OperationDescriptor::new(OperationType::Update).thread(thread_id),
            caller,
        )?;
        let by = user_id.clone();
        self.blocking(move |db| db.resolve_thread(thread_id, &by)).await?;
        self.dispatcher().publish(ThreadEvent::ThreadResolved {
            thread_id,
            resolved: true,
            user_id: Some(user_id),
        });
        Ok(())
    }

    pub async fn unresolve_thread(&self, caller: &str, thread_id: Uuid) -> Result<(), ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Update).thread(thread_id),
            caller,
        )?;
        self.blocking(move |db| db.unresolve_thread(thread_id)).await?;
        self.dispatcher().publish(ThreadEvent::ThreadResolved {
            thread_id,
            resolved: false,
            user_id: None,
        });
        Ok(())
    }

    pub async fn update_thread_position(
        &self,
        caller: &str,
        thread_id: Uuid,
        position: Option<Position>,
    ) -> Result<(), ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Update).thread(thread_id),
            caller,
        )?;
        self.blocking(move |db| db.update_thread_position(thread_id, position.as_ref()))
            .await
    }

    pub async fn delete_thread(&self, caller: &str, thread_id: Uuid) -> Result<DeleteCounts, ServiceError> {
        self.authorize(
            OperationDescriptor::new(OperationType::Delete).thread(thread_id),
            caller,
        )?;
        let counts = self.blocking(move |db| db.delete_thread(thread_id)).await?;
        self.dispatcher().publish(ThreadEvent::ThreadDeleted { thread_id });
        Ok(counts)
    }
}
