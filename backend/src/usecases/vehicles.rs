use crates::domain::{
    entities::vehicles::{InsertVehicleEntity, VehicleEntity},
    repositories::{subscriptions::SubscriptionRepository, vehicles::VehicleRepository},
    value_objects::{
        capabilities::{CapabilitySnapshot, CapacityWrite, DenialReason},
        enums::vehicle_statuses::VehicleStatus,
        iam::AccountIdentity,
        vehicles::{AddVehicleModel, VehicleDto},
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::capabilities::{CapabilityError, CapabilityResolver};

#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("NOT_SUBSCRIBED")]
    NotSubscribed,
    #[error("LIMIT_REACHED")]
    LimitReached,
    #[error("vehicle not found")]
    VehicleNotFound,
    #[error("invalid vehicle status change: {0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DenialReason> for VehicleError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::NotSubscribed => VehicleError::NotSubscribed,
            DenialReason::LimitReached => VehicleError::LimitReached,
        }
    }
}

impl From<CapabilityError> for VehicleError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Internal(err) => VehicleError::Internal(err),
        }
    }
}

impl VehicleError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            VehicleError::NotSubscribed | VehicleError::LimitReached => StatusCode::FORBIDDEN,
            VehicleError::VehicleNotFound => StatusCode::NOT_FOUND,
            VehicleError::InvalidTransition(_) => StatusCode::CONFLICT,
            VehicleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type VehicleResult<T> = std::result::Result<T, VehicleError>;

pub struct VehicleUseCase<S, V>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    vehicle_repo: Arc<V>,
    capability_resolver: Arc<CapabilityResolver<S>>,
}

impl<S, V> VehicleUseCase<S, V>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    pub fn new(vehicle_repo: Arc<V>, capability_resolver: Arc<CapabilityResolver<S>>) -> Self {
        Self {
            vehicle_repo,
            capability_resolver,
        }
    }

    pub async fn list_vehicles(&self, requester: AccountIdentity) -> VehicleResult<Vec<VehicleDto>> {
        let dealer_id = requester.account_id;
        let vehicles = self
            .vehicle_repo
            .list_by_dealer(dealer_id)
            .await
            .map_err(|err| {
                error!(%dealer_id, db_error = ?err, "vehicles: failed to list vehicles");
                VehicleError::Internal(err)
            })?;

        Ok(vehicles.into_iter().map(VehicleDto::from).collect())
    }

    pub async fn add_vehicle(
        &self,
        requester: AccountIdentity,
        model: AddVehicleModel,
    ) -> VehicleResult<VehicleDto> {
        let status = model.status.unwrap_or(VehicleStatus::Active);
        if !matches!(status, VehicleStatus::Active | VehicleStatus::Draft) {
            let err = VehicleError::InvalidTransition(format!("vehicles cannot be created as {status}"));
            warn!(
                account_id = %requester.account_id,
                status = err.status_code().as_u16(),
                "vehicles: rejected initial status"
            );
            return Err(err);
        }

        let dealer_id = match (requester.is_admin(), model.dealer_id) {
            (true, Some(dealer_id)) => dealer_id,
            _ => requester.account_id,
        };
        let now = self.capability_resolver.now();

        let insert_vehicle_entity = InsertVehicleEntity {
            dealer_id,
            title: model.title,
            make: model.make,
            model: model.model,
            year: model.year,
            price_minor: model.price_minor,
            status: status.to_string(),
            is_featured: false,
            featured_at: None,
            created_at: now,
            updated_at: now,
        };

        if requester.is_admin() {
            info!(
                admin_id = %requester.account_id,
                %dealer_id,
                "vehicles: admin listing bypasses capacity guard"
            );
            let created = self
                .vehicle_repo
                .insert(insert_vehicle_entity)
                .await
                .map_err(|err| {
                    error!(%dealer_id, db_error = ?err, "vehicles: failed to insert vehicle");
                    VehicleError::Internal(err)
                })?;
            return Ok(created.into());
        }

        self.gate(dealer_id, |snapshot| snapshot.can_add_vehicles)
            .await?;

        let written = self
            .vehicle_repo
            .insert_within_capacity(insert_vehicle_entity, now)
            .await
            .map_err(|err| {
                error!(%dealer_id, db_error = ?err, "vehicles: failed to insert vehicle");
                VehicleError::Internal(err)
            })?;

        let created = Self::written_or_denied(dealer_id, written, "add")?;
        info!(%dealer_id, vehicle_id = %created.id, "vehicles: vehicle created");

        Ok(created.into())
    }

    pub async fn set_featured(
        &self,
        requester: AccountIdentity,
        vehicle_id: Uuid,
        featured: bool,
    ) -> VehicleResult<VehicleDto> {
        let vehicle = self.load_owned(requester, vehicle_id).await?;
        let dealer_id = vehicle.dealer_id;
        let now = self.capability_resolver.now();

        if featured && vehicle.status != VehicleStatus::Active.as_str() {
            let err = VehicleError::InvalidTransition(format!(
                "only ACTIVE vehicles can be featured, vehicle is {}",
                vehicle.status
            ));
            warn!(
                %dealer_id,
                %vehicle_id,
                status = err.status_code().as_u16(),
                "vehicles: rejected featuring a non-active vehicle"
            );
            return Err(err);
        }

        if !featured || requester.is_admin() {
            let updated = self
                .vehicle_repo
                .set_featured(vehicle_id, featured, now)
                .await
                .map_err(|err| {
                    error!(%dealer_id, %vehicle_id, db_error = ?err, "vehicles: failed to update featured flag");
                    VehicleError::Internal(err)
                })?;
            return Ok(updated.into());
        }

        self.gate(dealer_id, |snapshot| snapshot.can_feature_vehicles)
            .await?;

        let written = self
            .vehicle_repo
            .feature_within_capacity(dealer_id, vehicle_id, now)
            .await
            .map_err(|err| {
                error!(%dealer_id, %vehicle_id, db_error = ?err, "vehicles: failed to feature vehicle");
                VehicleError::Internal(err)
            })?;

        let updated = Self::written_or_denied(dealer_id, written, "feature")?;
        info!(%dealer_id, %vehicle_id, "vehicles: vehicle featured");

        Ok(updated.into())
    }

    pub async fn update_status(
        &self,
        requester: AccountIdentity,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> VehicleResult<VehicleDto> {
        let vehicle = self.load_owned(requester, vehicle_id).await?;
        let dealer_id = vehicle.dealer_id;

        if vehicle.status == VehicleStatus::Sold.as_str() && status != VehicleStatus::Sold {
            let err = VehicleError::InvalidTransition("sold vehicles cannot be relisted".to_string());
            warn!(
                %dealer_id,
                %vehicle_id,
                status = err.status_code().as_u16(),
                "vehicles: attempted to relist sold vehicle"
            );
            return Err(err);
        }

        // Publishing needs a live listing entitlement; the slot itself is already held.
        if status == VehicleStatus::Active && !requester.is_admin() {
            self.gate(dealer_id, |snapshot| snapshot.can_add_vehicles)
                .await?;
        }

        let updated = self
            .vehicle_repo
            .update_status(vehicle_id, status, self.capability_resolver.now())
            .await
            .map_err(|err| {
                error!(%dealer_id, %vehicle_id, db_error = ?err, "vehicles: failed to update status");
                VehicleError::Internal(err)
            })?;

        info!(%dealer_id, %vehicle_id, status = %status, "vehicles: status updated");

        Ok(updated.into())
    }

    /// Resolves capabilities (running lazy expiry) and fails fast when the flag is off.
    async fn gate(
        &self,
        dealer_id: Uuid,
        flag: impl Fn(&CapabilitySnapshot) -> bool,
    ) -> VehicleResult<()> {
        let snapshot = self
            .capability_resolver
            .resolve_capabilities(dealer_id)
            .await?;

        if !flag(&snapshot) {
            let err = VehicleError::from(DenialReason::NotSubscribed);
            warn!(
                %dealer_id,
                subscribed = snapshot.is_subscribed(),
                status = err.status_code().as_u16(),
                "vehicles: dealer has no entitlement for this action"
            );
            return Err(err);
        }

        Ok(())
    }

    async fn load_owned(
        &self,
        requester: AccountIdentity,
        vehicle_id: Uuid,
    ) -> VehicleResult<VehicleEntity> {
        let vehicle = self
            .vehicle_repo
            .find_by_id(vehicle_id)
            .await
            .map_err(|err| {
                error!(%vehicle_id, db_error = ?err, "vehicles: failed to load vehicle");
                VehicleError::Internal(err)
            })?;

        match vehicle {
            Some(vehicle) if requester.is_admin() || vehicle.dealer_id == requester.account_id => {
                Ok(vehicle)
            }
            _ => {
                let err = VehicleError::VehicleNotFound;
                warn!(
                    account_id = %requester.account_id,
                    %vehicle_id,
                    status = err.status_code().as_u16(),
                    "vehicles: vehicle not found for requester"
                );
                Err(err)
            }
        }
    }

    fn written_or_denied(
        dealer_id: Uuid,
        written: CapacityWrite<VehicleEntity>,
        action: &str,
    ) -> VehicleResult<VehicleEntity> {
        match written {
            CapacityWrite::Written(vehicle) => Ok(vehicle),
            CapacityWrite::Denied(reason) => {
                let err = VehicleError::from(reason);
                warn!(
                    %dealer_id,
                    action,
                    reason = %reason,
                    status = err.status_code().as_u16(),
                    "vehicles: capacity guard denied action"
                );
                Err(err)
            }
            CapacityWrite::NotListed => {
                let err = VehicleError::InvalidTransition(format!(
                    "vehicle is no longer ACTIVE, cannot {action}"
                ));
                warn!(
                    %dealer_id,
                    action,
                    status = err.status_code().as_u16(),
                    "vehicles: listing changed status before the guarded write"
                );
                Err(err)
            }
        }
    }
}
