use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::usecases::{
    capabilities::CapabilityError, quotas::QuotaError, subscriptions::SubscriptionError,
    vehicles::VehicleError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn into_response_with(status: StatusCode, message: String) -> Response {
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

fn internal(err: &anyhow::Error) -> Response {
    error!(error = ?err, "http: internal error");
    // Don't leak internal error detail to client
    ErrorResponse::into_response_with(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl IntoResponse for CapabilityError {
    fn into_response(self) -> Response {
        match &self {
            CapabilityError::Internal(err) => internal(err),
        }
    }
}

impl IntoResponse for VehicleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            VehicleError::NotSubscribed | VehicleError::LimitReached => {
                (status, Json(json!({ "reason": self.to_string() }))).into_response()
            }
            VehicleError::Internal(err) => internal(err),
            _ => ErrorResponse::into_response_with(status, self.to_string()),
        }
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        match &self {
            SubscriptionError::Internal(err) => internal(err),
            _ => ErrorResponse::into_response_with(self.status_code(), self.to_string()),
        }
    }
}

impl IntoResponse for QuotaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            QuotaError::AlreadyActive => {
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            QuotaError::PackageRequired | QuotaError::NoActiveQuota => {
                (status, Json(json!({ "code": self.to_string() }))).into_response()
            }
            QuotaError::Internal(err) => internal(err),
            _ => ErrorResponse::into_response_with(status, self.to_string()),
        }
    }
}
