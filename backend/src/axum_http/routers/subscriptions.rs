use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::{packages::PackageRepository, subscriptions::SubscriptionRepository},
        value_objects::subscriptions::PurchaseSubscriptionModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{packages::PackagePostgres, subscriptions::SubscriptionPostgres},
    },
};
use uuid::Uuid;

use crate::{auth::AuthUser, usecases::subscriptions::SubscriptionUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let package_repository = PackagePostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let subscription_usecase = SubscriptionUseCase::new(
        Arc::new(package_repository),
        Arc::new(subscription_repository),
        clock,
    );

    Router::new()
        .route("/packages", get(list_packages))
        .route("/history", get(history))
        .route("/purchase", post(purchase))
        .route("/:subscription_id/approve", post(approve))
        .route("/:subscription_id/cancel", post(cancel))
        .with_state(Arc::new(subscription_usecase))
}

pub async fn list_packages<P, S>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S>>>,
    _auth: AuthUser,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match subscription_usecase.list_packages().await {
        Ok(packages) => (StatusCode::OK, Json(packages)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn history<P, S>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S>>>,
    auth: AuthUser,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match subscription_usecase.history(auth.identity()).await {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn purchase<P, S>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S>>>,
    auth: AuthUser,
    Json(purchase_subscription_model): Json<PurchaseSubscriptionModel>,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .purchase(auth.identity(), purchase_subscription_model)
        .await
    {
        Ok(activation) => (StatusCode::CREATED, Json(activation)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn approve<P, S>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S>>>,
    auth: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .approve(auth.identity(), subscription_id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel<P, S>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<P, S>>>,
    auth: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .cancel(auth.identity(), subscription_id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}
