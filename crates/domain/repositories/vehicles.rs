use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::vehicles::{InsertVehicleEntity, VehicleEntity},
    value_objects::{capabilities::CapacityWrite, enums::vehicle_statuses::VehicleStatus},
};

#[automock]
#[async_trait]
pub trait VehicleRepository {
    /// Inserts the vehicle only if the dealer's subscription, re-read under a row lock in
    /// the same transaction, still has a free listing slot.
    async fn insert_within_capacity(
        &self,
        vehicle: InsertVehicleEntity,
        now: DateTime<Utc>,
    ) -> Result<CapacityWrite<VehicleEntity>>;

    async fn insert(&self, vehicle: InsertVehicleEntity) -> Result<VehicleEntity>;

    /// Marks the vehicle featured if the dealer's featured limit allows it, counted under
    /// the same lock as the write.
    async fn feature_within_capacity(
        &self,
        dealer_id: Uuid,
        vehicle_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CapacityWrite<VehicleEntity>>;

    async fn set_featured(
        &self,
        vehicle_id: Uuid,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<VehicleEntity>;

    /// Moving away from `ACTIVE` also clears the featured flag.
    async fn update_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
        now: DateTime<Utc>,
    ) -> Result<VehicleEntity>;

    async fn find_by_id(&self, vehicle_id: Uuid) -> Result<Option<VehicleEntity>>;

    async fn list_by_dealer(&self, dealer_id: Uuid) -> Result<Vec<VehicleEntity>>;
}
