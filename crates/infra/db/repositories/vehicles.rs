use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::{
    postgres::{postgres_connection::PgPoolSquad, schema::vehicles},
    repositories::subscriptions::lock_capabilities,
};
use domain::{
    entities::vehicles::{InsertVehicleEntity, VehicleEntity},
    repositories::vehicles::VehicleRepository,
    value_objects::{
        capabilities::{CapacityDecision, CapacityWrite},
        enums::vehicle_statuses::VehicleStatus,
    },
};

pub struct VehiclePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl VehiclePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl VehicleRepository for VehiclePostgres {
    async fn insert_within_capacity(
        &self,
        vehicle: InsertVehicleEntity,
        now: DateTime<Utc>,
    ) -> Result<CapacityWrite<VehicleEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let dealer_id = vehicle.dealer_id;

        let result = conn.transaction::<CapacityWrite<VehicleEntity>, diesel::result::Error, _>(
            |tx| {
                let capabilities = lock_capabilities(tx, dealer_id, now)?;

                let non_sold = vehicles::table
                    .filter(vehicles::dealer_id.eq(dealer_id))
                    .filter(vehicles::status.ne(VehicleStatus::Sold.as_str()))
                    .select(count_star())
                    .first::<i64>(tx)?;

                if let CapacityDecision::Deny(reason) = capabilities.can_add_vehicle(non_sold) {
                    debug!(
                        %dealer_id,
                        non_sold,
                        max_vehicles = capabilities.max_vehicles,
                        reason = %reason,
                        "vehicles: insert denied by capacity guard"
                    );
                    return Ok(CapacityWrite::Denied(reason));
                }

                let created = insert_into(vehicles::table)
                    .values(&vehicle)
                    .returning(VehicleEntity::as_select())
                    .get_result::<VehicleEntity>(tx)?;

                Ok(CapacityWrite::Written(created))
            },
        )?;

        Ok(result)
    }

    async fn insert(&self, vehicle: InsertVehicleEntity) -> Result<VehicleEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(vehicles::table)
            .values(&vehicle)
            .returning(VehicleEntity::as_select())
            .get_result::<VehicleEntity>(&mut conn)?;

        Ok(created)
    }

    async fn feature_within_capacity(
        &self,
        dealer_id: Uuid,
        vehicle_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CapacityWrite<VehicleEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<CapacityWrite<VehicleEntity>, diesel::result::Error, _>(
            |tx| {
                let capabilities = lock_capabilities(tx, dealer_id, now)?;

                let vehicle = vehicles::table
                    .filter(vehicles::id.eq(vehicle_id))
                    .filter(vehicles::dealer_id.eq(dealer_id))
                    .select(VehicleEntity::as_select())
                    .for_update()
                    .first::<VehicleEntity>(tx)?;

                if vehicle.status != VehicleStatus::Active.as_str() {
                    debug!(
                        %dealer_id,
                        %vehicle_id,
                        status = %vehicle.status,
                        "vehicles: feature refused for non-active listing"
                    );
                    return Ok(CapacityWrite::NotListed);
                }

                let featured_others = vehicles::table
                    .filter(vehicles::dealer_id.eq(dealer_id))
                    .filter(vehicles::is_featured.eq(true))
                    .filter(vehicles::id.ne(vehicle_id))
                    .select(count_star())
                    .first::<i64>(tx)?;

                if let CapacityDecision::Deny(reason) = capabilities.can_feature(featured_others) {
                    debug!(
                        %dealer_id,
                        %vehicle_id,
                        featured_others,
                        max_featured_cars = capabilities.max_featured_cars,
                        reason = %reason,
                        "vehicles: feature denied by capacity guard"
                    );
                    return Ok(CapacityWrite::Denied(reason));
                }

                if vehicle.is_featured {
                    return Ok(CapacityWrite::Written(vehicle));
                }

                let featured = update(vehicles::table)
                    .filter(vehicles::id.eq(vehicle_id))
                    .set((
                        vehicles::is_featured.eq(true),
                        vehicles::featured_at.eq(Some(now)),
                        vehicles::updated_at.eq(now),
                    ))
                    .returning(VehicleEntity::as_select())
                    .get_result::<VehicleEntity>(tx)?;

                Ok(CapacityWrite::Written(featured))
            },
        )?;

        Ok(result)
    }

    async fn set_featured(
        &self,
        vehicle_id: Uuid,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<VehicleEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let featured_at = if featured { Some(now) } else { None };

        let result = update(vehicles::table)
            .filter(vehicles::id.eq(vehicle_id))
            .set((
                vehicles::is_featured.eq(featured),
                vehicles::featured_at.eq(featured_at),
                vehicles::updated_at.eq(now),
            ))
            .returning(VehicleEntity::as_select())
            .get_result::<VehicleEntity>(&mut conn)?;

        Ok(result)
    }

    async fn update_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
        now: DateTime<Utc>,
    ) -> Result<VehicleEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let target = vehicles::table.filter(vehicles::id.eq(vehicle_id));

        let result = if status == VehicleStatus::Active {
            update(target)
                .set((
                    vehicles::status.eq(status.as_str()),
                    vehicles::updated_at.eq(now),
                ))
                .returning(VehicleEntity::as_select())
                .get_result::<VehicleEntity>(&mut conn)?
        } else {
            update(target)
                .set((
                    vehicles::status.eq(status.as_str()),
                    vehicles::is_featured.eq(false),
                    vehicles::featured_at.eq(None::<DateTime<Utc>>),
                    vehicles::updated_at.eq(now),
                ))
                .returning(VehicleEntity::as_select())
                .get_result::<VehicleEntity>(&mut conn)?
        };

        Ok(result)
    }

    async fn find_by_id(&self, vehicle_id: Uuid) -> Result<Option<VehicleEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = vehicles::table
            .filter(vehicles::id.eq(vehicle_id))
            .select(VehicleEntity::as_select())
            .first::<VehicleEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_dealer(&self, dealer_id: Uuid) -> Result<Vec<VehicleEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = vehicles::table
            .filter(vehicles::dealer_id.eq(dealer_id))
            .order(vehicles::created_at.desc())
            .select(VehicleEntity::as_select())
            .load::<VehicleEntity>(&mut conn)?;

        Ok(results)
    }
}
