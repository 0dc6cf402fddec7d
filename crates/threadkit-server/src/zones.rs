use serde_json::Value;
use uuid::Uuid;

use threadkit_types::api::GetOrCreateZoneRequest;
use threadkit_types::events::{OperationDescriptor, OperationType};
use threadkit_types::models::{DeleteCounts, Zone};

use crate::error::ServiceError;
use crate::state::ThreadService;

impl ThreadService {
    pub async fn get_or_create_zone(
        &self,
        caller: &str,
        req: GetOrCreateZoneRequest,
    ) -> Result<Uuid, ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Create), caller)?;
        self.blocking(move |db| db.get_or_create_zone(&req.entity_id, req.metadata.as_ref()))
            .await
    }

    pub async fn get_zone(&self, caller: &str, entity_id: &str) -> Result<Option<Zone>, ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Read), caller)?;
        let entity_id = entity_id.to_string();
        self.blocking(move |db| db.get_zone(&entity_id)).await
    }

    pub async fn get_zone_by_id(&self, caller: &str, zone_id: Uuid) -> Result<Option<Zone>, ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Read).zone(zone_id), caller)?;
        self.blocking(move |db| db.get_zone_by_id(zone_id)).await
    }

    pub async fn update_zone_metadata(
        &self,
        caller: &str,
        zone_id: Uuid,
        metadata: Option<Value>,
    ) -> Result<(), ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Update).zone(zone_id), caller)?;
        self.blocking(move |db| db.update_zone_metadata(zone_id, metadata.as_ref()))
            .await
    }

    pub async fn delete_zone(&self, caller: &str, zone_id: Uuid) -> Result<DeleteCounts, ServiceError> {
        self.authorize(OperationDescriptor::new(OperationType::Delete).zone(zone_id), caller)?;
        self.blocking(move |db| db.delete_zone(zone_id)).await
    }
}
