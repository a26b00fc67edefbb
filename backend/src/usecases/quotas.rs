use std::sync::Arc;

use crates::domain::{
    clock::Clock,
    repositories::{packages::PackageRepository, user_packages::UserPackageRepository},
    value_objects::{
        enums::user_package_statuses::UserPackageStatus,
        iam::AccountIdentity,
        user_packages::{
            ConsumeOutcome, ConsumeQuotaDto, ConsumeQuotaModel, PurchaseOutcome,
            PurchaseQuotaModel, UserPackageDto,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("ALREADY_ACTIVE")]
    AlreadyActive,
    #[error("PACKAGE_REQUIRED")]
    PackageRequired,
    #[error("NO_ACTIVE_QUOTA")]
    NoActiveQuota,
    #[error("PACKAGE_NOT_FOUND")]
    PackageNotFound,
    #[error("NOT_A_QUOTA_PACKAGE")]
    NotAQuotaPackage,
    #[error("INVALID_AMOUNT")]
    InvalidAmount,
    #[error("quota package not found")]
    QuotaNotFound,
    #[error("quota package cannot be cancelled from status {0}")]
    InvalidTransition(UserPackageStatus),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl QuotaError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            QuotaError::AlreadyActive
            | QuotaError::NotAQuotaPackage
            | QuotaError::InvalidAmount => StatusCode::BAD_REQUEST,
            QuotaError::PackageRequired | QuotaError::NoActiveQuota => StatusCode::FORBIDDEN,
            QuotaError::PackageNotFound | QuotaError::QuotaNotFound => StatusCode::NOT_FOUND,
            QuotaError::InvalidTransition(_) => StatusCode::CONFLICT,
            QuotaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type QuotaResult<T> = std::result::Result<T, QuotaError>;

/// Tracks consumable credit grants per account.
pub struct QuotaLedgerUseCase<P, U>
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    package_repo: Arc<P>,
    user_package_repo: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<P, U> QuotaLedgerUseCase<P, U>
where
    P: PackageRepository + Send + Sync + 'static,
    U: UserPackageRepository + Send + Sync + 'static,
{
    pub fn new(package_repo: Arc<P>, user_package_repo: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            package_repo,
            user_package_repo,
            clock,
        }
    }

    pub async fn list(&self, requester: AccountIdentity) -> QuotaResult<Vec<UserPackageDto>> {
        let account_id = requester.account_id;
        let instances = self
            .user_package_repo
            .list_by_account(account_id)
            .await
            .map_err(|err| {
                error!(%account_id, db_error = ?err, "quotas: failed to list quota packages");
                QuotaError::Internal(err)
            })?;

        Ok(instances.into_iter().map(UserPackageDto::from).collect())
    }

    pub async fn purchase(
        &self,
        requester: AccountIdentity,
        model: PurchaseQuotaModel,
    ) -> QuotaResult<UserPackageDto> {
        let account_id = requester.account_id;
        let package_id = model.package_id;

        let package = self
            .package_repo
            .find_by_id(package_id)
            .await
            .map_err(|err| {
                error!(%account_id, %package_id, db_error = ?err, "quotas: failed to load package");
                QuotaError::Internal(err)
            })?;

        let package = match package {
            Some(package) if package.is_active => package,
            _ => return Err(Self::rejected(account_id, QuotaError::PackageNotFound)),
        };

        if !package.is_quota_template() {
            return Err(Self::rejected(account_id, QuotaError::NotAQuotaPackage));
        }

        let outcome = self
            .user_package_repo
            .purchase(account_id, package_id, package.credits, self.clock.now())
            .await
            .map_err(|err| {
                error!(%account_id, %package_id, db_error = ?err, "quotas: failed to purchase quota package");
                QuotaError::Internal(err)
            })?;

        match outcome {
            PurchaseOutcome::Created(instance) => {
                info!(
                    %account_id,
                    %package_id,
                    credits = instance.credits_remaining,
                    "quotas: quota package purchased"
                );
                Ok(instance.into())
            }
            PurchaseOutcome::Reactivated(instance) => {
                info!(
                    %account_id,
                    %package_id,
                    credits = instance.credits_remaining,
                    "quotas: quota package reactivated"
                );
                Ok(instance.into())
            }
            PurchaseOutcome::AlreadyActive => {
                Err(Self::rejected(account_id, QuotaError::AlreadyActive))
            }
        }
    }

    /// Spends `amount` credits (default 1) from the oldest active grant. Administrators are
    /// never charged.
    pub async fn consume(
        &self,
        requester: AccountIdentity,
        model: ConsumeQuotaModel,
    ) -> QuotaResult<ConsumeQuotaDto> {
        let account_id = requester.account_id;
        let amount = model.amount.unwrap_or(1);

        if requester.is_admin() {
            info!(%account_id, amount, "quotas: admin consumption bypassed");
            return Ok(ConsumeQuotaDto {
                user_package: None,
                bypassed: true,
            });
        }

        if amount < 1 {
            return Err(Self::rejected(account_id, QuotaError::InvalidAmount));
        }

        let outcome = self
            .user_package_repo
            .consume(account_id, amount, self.clock.now())
            .await
            .map_err(|err| {
                error!(%account_id, amount, db_error = ?err, "quotas: failed to consume quota");
                QuotaError::Internal(err)
            })?;

        match outcome {
            ConsumeOutcome::Consumed(instance) => {
                info!(
                    %account_id,
                    user_package_id = %instance.id,
                    amount,
                    credits_remaining = instance.credits_remaining,
                    status = %instance.status,
                    "quotas: quota consumed"
                );
                Ok(ConsumeQuotaDto {
                    user_package: Some(instance.into()),
                    bypassed: false,
                })
            }
            ConsumeOutcome::PackageRequired => {
                Err(Self::rejected(account_id, QuotaError::PackageRequired))
            }
            ConsumeOutcome::NoActiveQuota => {
                Err(Self::rejected(account_id, QuotaError::NoActiveQuota))
            }
        }
    }

    pub async fn cancel(
        &self,
        requester: AccountIdentity,
        user_package_id: Uuid,
    ) -> QuotaResult<UserPackageDto> {
        let account_id = requester.account_id;

        let cancelled = self
            .user_package_repo
            .cancel(account_id, user_package_id, self.clock.now())
            .await
            .map_err(|err| {
                error!(%account_id, %user_package_id, db_error = ?err, "quotas: failed to cancel quota package");
                QuotaError::Internal(err)
            })?;

        if let Some(instance) = cancelled {
            info!(%account_id, %user_package_id, "quotas: quota package cancelled");
            return Ok(instance.into());
        }

        let existing = self
            .user_package_repo
            .find_by_id(user_package_id)
            .await
            .map_err(QuotaError::Internal)?;

        let err = match existing {
            Some(instance) if instance.account_id == account_id => {
                QuotaError::InvalidTransition(UserPackageStatus::from_str(&instance.status))
            }
            _ => QuotaError::QuotaNotFound,
        };

        Err(Self::rejected(account_id, err))
    }

    fn rejected(account_id: Uuid, err: QuotaError) -> QuotaError {
        warn!(
            %account_id,
            code = %err,
            status = err.status_code().as_u16(),
            "quotas: request rejected"
        );
        err
    }
}
