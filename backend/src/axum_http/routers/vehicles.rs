use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::{subscriptions::SubscriptionRepository, vehicles::VehicleRepository},
        value_objects::vehicles::{AddVehicleModel, FeatureVehicleModel, UpdateVehicleStatusModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{subscriptions::SubscriptionPostgres, vehicles::VehiclePostgres},
    },
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    usecases::{capabilities::CapabilityResolver, vehicles::VehicleUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let vehicle_repository = VehiclePostgres::new(Arc::clone(&db_pool));
    let capability_resolver = CapabilityResolver::new(Arc::new(subscription_repository), clock);
    let vehicle_usecase =
        VehicleUseCase::new(Arc::new(vehicle_repository), Arc::new(capability_resolver));

    Router::new()
        .route("/", get(list_vehicles).post(add_vehicle))
        .route("/:vehicle_id/featured", patch(set_featured))
        .route("/:vehicle_id/status", patch(update_status))
        .with_state(Arc::new(vehicle_usecase))
}

pub async fn list_vehicles<S, V>(
    State(vehicle_usecase): State<Arc<VehicleUseCase<S, V>>>,
    auth: AuthUser,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    match vehicle_usecase.list_vehicles(auth.identity()).await {
        Ok(vehicles) => (StatusCode::OK, Json(vehicles)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn add_vehicle<S, V>(
    State(vehicle_usecase): State<Arc<VehicleUseCase<S, V>>>,
    auth: AuthUser,
    Json(add_vehicle_model): Json<AddVehicleModel>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    match vehicle_usecase
        .add_vehicle(auth.identity(), add_vehicle_model)
        .await
    {
        Ok(vehicle) => (StatusCode::CREATED, Json(vehicle)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn set_featured<S, V>(
    State(vehicle_usecase): State<Arc<VehicleUseCase<S, V>>>,
    auth: AuthUser,
    Path(vehicle_id): Path<Uuid>,
    Json(feature_vehicle_model): Json<FeatureVehicleModel>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    match vehicle_usecase
        .set_featured(auth.identity(), vehicle_id, feature_vehicle_model.featured)
        .await
    {
        Ok(vehicle) => (StatusCode::OK, Json(vehicle)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_status<S, V>(
    State(vehicle_usecase): State<Arc<VehicleUseCase<S, V>>>,
    auth: AuthUser,
    Path(vehicle_id): Path<Uuid>,
    Json(update_status_model): Json<UpdateVehicleStatusModel>,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
    V: VehicleRepository + Send + Sync + 'static,
{
    match vehicle_usecase
        .update_status(auth.identity(), vehicle_id, update_status_model.status)
        .await
    {
        Ok(vehicle) => (StatusCode::OK, Json(vehicle)).into_response(),
        Err(err) => err.into_response(),
    }
}
