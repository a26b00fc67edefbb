use std::sync::Arc;

use axum::{
    Json, Router, async_trait,
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::{packages::PackageRepository, user_packages::UserPackageRepository},
        value_objects::user_packages::{ConsumeQuotaModel, PurchaseQuotaModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{packages::PackagePostgres, user_packages::UserPackagePostgres},
    },
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser, axum_http::error_responses::ErrorResponse,
    usecases::quotas::QuotaLedgerUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let package_repository = PackagePostgres::new(Arc::clone(&db_pool));
    let user_package_repository = UserPackagePostgres::new(Arc::clone(&db_pool));
    let quota_usecase = QuotaLedgerUseCase::new(
        Arc::new(package_repository),
        Arc::new(user_package_repository),
        clock,
    );

    Router::new()
        .route("/", get(list))
        .route("/purchase", post(purchase))
        .route("/consume", post(consume))
        .route("/:user_package_id/cancel", post(cancel))
        .with_state(Arc::new(quota_usecase))
}

pub async fn list<P, U>(
    State(quota_usecase): State<Arc<QuotaLedgerUseCase<P, U>>>,
    auth: AuthUser,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    match quota_usecase.list(auth.identity()).await {
        Ok(user_packages) => (StatusCode::OK, Json(user_packages)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn purchase<P, U>(
    State(quota_usecase): State<Arc<QuotaLedgerUseCase<P, U>>>,
    auth: AuthUser,
    Json(purchase_quota_model): Json<PurchaseQuotaModel>,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    match quota_usecase
        .purchase(auth.identity(), purchase_quota_model)
        .await
    {
        Ok(user_package) => (
            StatusCode::CREATED,
            Json(json!({ "user_package": user_package })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Consume request body. A blank body means the default amount; anything else must be
/// a valid `ConsumeQuotaModel`.
pub struct ConsumeQuotaBody(pub ConsumeQuotaModel);

#[async_trait]
impl<S> FromRequest<S> for ConsumeQuotaBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(ConsumeQuotaModel::default()));
        }

        serde_json::from_slice(&bytes).map(Self).map_err(|err| {
            ErrorResponse::into_response_with(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid consume body: {err}"),
            )
        })
    }
}

pub async fn consume<P, U>(
    State(quota_usecase): State<Arc<QuotaLedgerUseCase<P, U>>>,
    auth: AuthUser,
    ConsumeQuotaBody(consume_quota_model): ConsumeQuotaBody,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    match quota_usecase
        .consume(auth.identity(), consume_quota_model)
        .await
    {
        Ok(consumed) => (StatusCode::OK, Json(consumed)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel<P, U>(
    State(quota_usecase): State<Arc<QuotaLedgerUseCase<P, U>>>,
    auth: AuthUser,
    Path(user_package_id): Path<Uuid>,
) -> Response
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    match quota_usecase
        .cancel(auth.identity(), user_package_id)
        .await
    {
        Ok(user_package) => (StatusCode::OK, Json(user_package)).into_response(),
        Err(err) => err.into_response(),
    }
}
