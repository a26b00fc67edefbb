use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use crates::{
    domain::{clock::Clock, repositories::subscriptions::SubscriptionRepository},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::subscriptions::SubscriptionPostgres,
    },
};

use crate::{auth::AuthUser, usecases::capabilities::CapabilityResolver};

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let capability_resolver = CapabilityResolver::new(Arc::new(subscription_repository), clock);

    Router::new()
        .route("/", get(current_capabilities))
        .with_state(Arc::new(capability_resolver))
}

pub async fn current_capabilities<S>(
    State(capability_resolver): State<Arc<CapabilityResolver<S>>>,
    auth: AuthUser,
) -> Response
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match capability_resolver.resolve_capabilities(auth.user_id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => err.into_response(),
    }
}
