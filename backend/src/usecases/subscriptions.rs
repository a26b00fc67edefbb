use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Days, Utc};
use crates::domain::{
    clock::Clock,
    entities::{
        packages::PackageEntity, payments::InsertPaymentEntity,
        subscriptions::InsertSubscriptionEntity,
    },
    repositories::{packages::PackageRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        enums::{payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus},
        iam::AccountIdentity,
        packages::PackageDto,
        subscriptions::{
            ActivationDto, PaymentDto, PurchaseSubscriptionModel, SubscriptionDto,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("PACKAGE_NOT_FOUND")]
    PackageNotFound,
    #[error("package is not a listing plan")]
    NotASubscriptionPackage,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("subscription is not awaiting approval")]
    NotPendingApproval,
    #[error("subscription cannot be cancelled from status {0}")]
    InvalidTransition(SubscriptionStatus),
    #[error("only administrators may approve subscriptions")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::PackageNotFound | SubscriptionError::SubscriptionNotFound => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::NotASubscriptionPackage => StatusCode::BAD_REQUEST,
            SubscriptionError::NotPendingApproval | SubscriptionError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            SubscriptionError::Forbidden => StatusCode::FORBIDDEN,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// `[starts_at, starts_at + duration_days]` in calendar days.
pub fn validity_window(
    starts_at: DateTime<Utc>,
    duration_days: i32,
) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let days = u64::try_from(duration_days)
        .map_err(|_| anyhow!("negative package duration: {duration_days}"))?;
    let ends_at = starts_at
        .checked_add_days(Days::new(days))
        .ok_or_else(|| anyhow!("subscription end date out of range"))?;

    Ok((starts_at, ends_at))
}

pub struct SubscriptionUseCase<P, S>
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    package_repo: Arc<P>,
    subscription_repo: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<P, S> SubscriptionUseCase<P, S>
where
    P: PackageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(package_repo: Arc<P>, subscription_repo: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            package_repo,
            subscription_repo,
            clock,
        }
    }

    pub async fn list_packages(&self) -> UseCaseResult<Vec<PackageDto>> {
        let packages = self
            .package_repo
            .list_active_packages()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to list active packages");
                SubscriptionError::Internal(err)
            })?;
        let package_count = packages.len();
        info!(package_count, "subscriptions: active packages loaded");

        Ok(packages.into_iter().map(PackageDto::from).collect())
    }

    pub async fn history(&self, requester: AccountIdentity) -> UseCaseResult<Vec<SubscriptionDto>> {
        let dealer_id = requester.account_id;
        let subscriptions = self
            .subscription_repo
            .list_by_dealer(dealer_id)
            .await
            .map_err(|err| {
                error!(%dealer_id, db_error = ?err, "subscriptions: failed to load history");
                SubscriptionError::Internal(err)
            })?;

        Ok(subscriptions.into_iter().map(SubscriptionDto::from).collect())
    }

    /// Records the payment and the subscription it buys. UPI settles on the spot and the
    /// subscription starts `ACTIVE`; anything else waits in `PENDING_APPROVAL`.
    pub async fn purchase(
        &self,
        requester: AccountIdentity,
        model: PurchaseSubscriptionModel,
    ) -> UseCaseResult<ActivationDto> {
        let dealer_id = requester.account_id;
        let package = self.load_purchasable_package(dealer_id, model.package_id).await?;
        let now = self.clock.now();

        let (starts_at, ends_at) =
            validity_window(now, package.duration_days).map_err(SubscriptionError::Internal)?;

        let settled = model.method.settles_immediately();
        let (payment_status, subscription_status) = if settled {
            (PaymentStatus::Paid, SubscriptionStatus::Active)
        } else {
            (PaymentStatus::Pending, SubscriptionStatus::PendingApproval)
        };

        let insert_payment_entity = InsertPaymentEntity {
            account_id: dealer_id,
            package_id: package.id,
            amount_minor: package.price_minor,
            method: model.method.to_string(),
            status: payment_status.to_string(),
            transaction_id: model.transaction_id,
            paid_at: settled.then_some(now),
        };

        let insert_subscription_entity = InsertSubscriptionEntity {
            dealer_id,
            package_id: package.id,
            payment_id: None,
            starts_at,
            ends_at,
            status: subscription_status.to_string(),
            auto_renew: model.auto_renew,
        };

        let (payment, subscription) = self
            .subscription_repo
            .create_with_payment(insert_payment_entity, insert_subscription_entity)
            .await
            .map_err(|err| {
                error!(
                    %dealer_id,
                    package_id = %package.id,
                    db_error = ?err,
                    "subscriptions: failed to record purchase"
                );
                SubscriptionError::Internal(err)
            })?;

        let payment = PaymentDto::from(payment);
        let subscription = SubscriptionDto::from(subscription);

        info!(
            %dealer_id,
            subscription_id = %subscription.id,
            payment_id = %payment.id,
            method = %model.method,
            status = %subscription.status,
            %ends_at,
            "subscriptions: subscription purchased"
        );

        Ok(ActivationDto {
            requires_approval: !payment.is_paid(),
            payment,
            subscription,
        })
    }

    /// Confirms an offline payment. The validity window restarts at approval time so the
    /// dealer gets the full duration it paid for.
    pub async fn approve(
        &self,
        requester: AccountIdentity,
        subscription_id: Uuid,
    ) -> UseCaseResult<SubscriptionDto> {
        if !requester.is_admin() {
            let err = SubscriptionError::Forbidden;
            warn!(
                account_id = %requester.account_id,
                %subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: non-admin attempted approval"
            );
            return Err(err);
        }

        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to load subscription");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::SubscriptionNotFound)?;

        if subscription.status != SubscriptionStatus::PendingApproval.as_str() {
            let err = SubscriptionError::NotPendingApproval;
            warn!(
                %subscription_id,
                current = %subscription.status,
                status = err.status_code().as_u16(),
                "subscriptions: approval of non-pending subscription"
            );
            return Err(err);
        }

        let package = self
            .package_repo
            .find_by_id(subscription.package_id)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to load package");
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                SubscriptionError::Internal(anyhow!(
                    "package {} referenced by subscription {subscription_id} is missing",
                    subscription.package_id
                ))
            })?;

        let now = self.clock.now();
        let (starts_at, ends_at) =
            validity_window(now, package.duration_days).map_err(SubscriptionError::Internal)?;

        let approved = self
            .subscription_repo
            .approve_pending(subscription_id, starts_at, ends_at, now)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to approve subscription");
                SubscriptionError::Internal(err)
            })?
            // Someone else approved or cancelled it between the read and the write.
            .ok_or(SubscriptionError::NotPendingApproval)?;

        info!(
            admin_id = %requester.account_id,
            dealer_id = %approved.dealer_id,
            %subscription_id,
            %ends_at,
            "subscriptions: subscription approved"
        );

        Ok(approved.into())
    }

    pub async fn cancel(
        &self,
        requester: AccountIdentity,
        subscription_id: Uuid,
    ) -> UseCaseResult<SubscriptionDto> {
        let dealer_id = requester.account_id;
        let now = self.clock.now();

        let cancelled = self
            .subscription_repo
            .cancel(dealer_id, subscription_id, now)
            .await
            .map_err(|err| {
                error!(%dealer_id, %subscription_id, db_error = ?err, "subscriptions: failed to cancel subscription");
                SubscriptionError::Internal(err)
            })?;

        if let Some((subscription, sweep)) = cancelled {
            info!(
                %dealer_id,
                %subscription_id,
                cascaded = sweep.cascaded(),
                deactivated_vehicles = sweep.deactivated_vehicles,
                "subscriptions: subscription cancelled"
            );
            return Ok(subscription.into());
        }

        let existing = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(SubscriptionError::Internal)?;

        let err = match existing {
            Some(subscription) if subscription.dealer_id == dealer_id => {
                SubscriptionError::InvalidTransition(SubscriptionStatus::from_str(
                    &subscription.status,
                ))
            }
            _ => SubscriptionError::SubscriptionNotFound,
        };
        warn!(
            %dealer_id,
            %subscription_id,
            status = err.status_code().as_u16(),
            "subscriptions: subscription not cancellable"
        );

        Err(err)
    }

    async fn load_purchasable_package(
        &self,
        dealer_id: Uuid,
        package_id: Uuid,
    ) -> UseCaseResult<PackageEntity> {
        let package = self
            .package_repo
            .find_by_id(package_id)
            .await
            .map_err(|err| {
                error!(%dealer_id, %package_id, db_error = ?err, "subscriptions: failed to load package");
                SubscriptionError::Internal(err)
            })?;

        let package = match package {
            Some(package) if package.is_active => package,
            _ => {
                let err = SubscriptionError::PackageNotFound;
                warn!(
                    %dealer_id,
                    %package_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: package not found or inactive"
                );
                return Err(err);
            }
        };

        if package.duration_days <= 0 {
            let err = SubscriptionError::NotASubscriptionPackage;
            warn!(
                %dealer_id,
                %package_id,
                status = err.status_code().as_u16(),
                "subscriptions: package has no validity period"
            );
            return Err(err);
        }

        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::capabilities::tests::{sample_package, sample_subscription, t0};
    use chrono::{Duration, TimeZone};
    use crates::domain::{
        clock::FixedClock,
        entities::{payments::PaymentEntity, subscriptions::SubscriptionEntity},
        repositories::{
            packages::MockPackageRepository, subscriptions::MockSubscriptionRepository,
        },
        value_objects::{
            enums::{account_roles::AccountRole, payment_methods::PaymentMethod},
            subscriptions::ExpirySweep,
        },
    };
    use mockall::predicate::eq;

    fn dealer(account_id: Uuid) -> AccountIdentity {
        AccountIdentity::new(account_id, AccountRole::Dealer)
    }

    fn admin() -> AccountIdentity {
        AccountIdentity::new(Uuid::new_v4(), AccountRole::Admin)
    }

    fn stored(
        payment: InsertPaymentEntity,
        subscription: InsertSubscriptionEntity,
    ) -> (PaymentEntity, SubscriptionEntity) {
        let payment = PaymentEntity {
            id: Uuid::new_v4(),
            account_id: payment.account_id,
            package_id: payment.package_id,
            amount_minor: payment.amount_minor,
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id,
            paid_at: payment.paid_at,
            created_at: t0(),
        };
        let subscription = SubscriptionEntity {
            id: Uuid::new_v4(),
            dealer_id: subscription.dealer_id,
            package_id: subscription.package_id,
            payment_id: payment.id,
            starts_at: subscription.starts_at,
            ends_at: subscription.ends_at,
            status: subscription.status,
            auto_renew: subscription.auto_renew,
            created_at: t0(),
            updated_at: t0(),
        };
        (payment, subscription)
    }

    fn purchase_model(package_id: Uuid, method: PaymentMethod) -> PurchaseSubscriptionModel {
        PurchaseSubscriptionModel {
            package_id,
            method,
            transaction_id: Some("UPI-7781".to_string()),
            auto_renew: false,
        }
    }

    fn usecase(
        package_repo: MockPackageRepository,
        subscription_repo: MockSubscriptionRepository,
        now: DateTime<Utc>,
    ) -> SubscriptionUseCase<MockPackageRepository, MockSubscriptionRepository> {
        SubscriptionUseCase::new(
            Arc::new(package_repo),
            Arc::new(subscription_repo),
            Arc::new(FixedClock(now)),
        )
    }

    #[test]
    fn validity_window_uses_calendar_days() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 23, 0, 0).unwrap();
        let (_, end) = validity_window(start, 30).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap());

        assert!(validity_window(start, -1).is_err());
    }

    #[tokio::test]
    async fn upi_purchase_is_paid_and_active_for_thirty_days() {
        let dealer_id = Uuid::new_v4();
        let package = sample_package(10, 0);
        let package_id = package.id;

        let mut package_repo = MockPackageRepository::new();
        package_repo
            .expect_find_by_id()
            .with(eq(package_id))
            .times(1)
            .returning(move |_| Ok(Some(package.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_create_with_payment()
            .withf(move |payment, subscription| {
                payment.status == "PAID"
                    && payment.paid_at == Some(t0())
                    && payment.amount_minor == 99_900
                    && subscription.status == "ACTIVE"
                    && subscription.starts_at == t0()
                    && subscription.ends_at == t0() + Duration::days(30)
                    && subscription.dealer_id == dealer_id
            })
            .times(1)
            .returning(|payment, subscription| Ok(stored(payment, subscription)));

        let usecase = usecase(package_repo, subscription_repo, t0());

        let activation = usecase
            .purchase(dealer(dealer_id), purchase_model(package_id, PaymentMethod::Upi))
            .await
            .unwrap();

        assert!(!activation.requires_approval);
        assert_eq!(activation.subscription.status, SubscriptionStatus::Active);
        assert_eq!(activation.subscription.ends_at, t0() + Duration::days(30));
        assert_eq!(activation.payment.method, "UPI");
        assert_eq!(activation.subscription.payment_id, activation.payment.id);
    }

    #[tokio::test]
    async fn bank_transfer_purchase_waits_for_approval() {
        let dealer_id = Uuid::new_v4();
        let package = sample_package(10, 2);
        let package_id = package.id;

        let mut package_repo = MockPackageRepository::new();
        package_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(package.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_create_with_payment()
            .withf(|payment, subscription| {
                payment.status == "PENDING"
                    && payment.paid_at.is_none()
                    && subscription.status == "PENDING_APPROVAL"
            })
            .times(1)
            .returning(|payment, subscription| Ok(stored(payment, subscription)));

        let usecase = usecase(package_repo, subscription_repo, t0());

        let activation = usecase
            .purchase(
                dealer(dealer_id),
                purchase_model(package_id, PaymentMethod::BankTransfer),
            )
            .await
            .unwrap();

        assert!(activation.requires_approval);
        assert_eq!(
            activation.subscription.status,
            SubscriptionStatus::PendingApproval
        );
        assert_eq!(activation.payment.paid_at, None);
    }

    #[tokio::test]
    async fn inactive_or_missing_package_is_not_found() {
        let mut inactive = sample_package(5, 0);
        inactive.is_active = false;
        let inactive_id = inactive.id;

        let mut package_repo = MockPackageRepository::new();
        package_repo
            .expect_find_by_id()
            .with(eq(inactive_id))
            .returning(move |_| Ok(Some(inactive.clone())));
        package_repo
            .expect_find_by_id()
            .returning(|_| Ok(None));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_create_with_payment().never();

        let usecase = usecase(package_repo, subscription_repo, t0());

        let err = usecase
            .purchase(dealer(Uuid::new_v4()), purchase_model(inactive_id, PaymentMethod::Upi))
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::PackageNotFound));

        let err = usecase
            .purchase(
                dealer(Uuid::new_v4()),
                purchase_model(Uuid::new_v4(), PaymentMethod::Card),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::PackageNotFound));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn approval_restarts_window_at_approval_time() {
        let dealer_id = Uuid::new_v4();
        let package = sample_package(10, 2);
        let mut pending = sample_subscription(dealer_id, &package);
        pending.status = SubscriptionStatus::PendingApproval.to_string();
        let subscription_id = pending.id;
        let approved_at = t0() + Duration::days(4);

        let mut package_repo = MockPackageRepository::new();
        package_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(package.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        let found = pending.clone();
        subscription_repo
            .expect_find_by_id()
            .with(eq(subscription_id))
            .returning(move |_| Ok(Some(found.clone())));
        subscription_repo
            .expect_approve_pending()
            .with(
                eq(subscription_id),
                eq(approved_at),
                eq(approved_at + Duration::days(30)),
                eq(approved_at),
            )
            .times(1)
            .returning(move |_, starts_at, ends_at, _| {
                Ok(Some(SubscriptionEntity {
                    status: SubscriptionStatus::Active.to_string(),
                    starts_at,
                    ends_at,
                    ..pending.clone()
                }))
            });

        let usecase = usecase(package_repo, subscription_repo, approved_at);

        let approved = usecase.approve(admin(), subscription_id).await.unwrap();
        assert_eq!(approved.status, SubscriptionStatus::Active);
        assert_eq!(approved.starts_at, approved_at);
        assert_eq!(approved.ends_at, approved_at + Duration::days(30));
    }

    #[tokio::test]
    async fn dealers_cannot_approve() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_find_by_id().never();
        subscription_repo.expect_approve_pending().never();

        let usecase = usecase(MockPackageRepository::new(), subscription_repo, t0());

        let err = usecase
            .approve(dealer(Uuid::new_v4()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Forbidden));
    }

    #[tokio::test]
    async fn approving_active_subscription_conflicts() {
        let package = sample_package(10, 2);
        let active = sample_subscription(Uuid::new_v4(), &package);
        let subscription_id = active.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(active.clone())));
        subscription_repo.expect_approve_pending().never();

        let usecase = usecase(MockPackageRepository::new(), subscription_repo, t0());

        let err = usecase.approve(admin(), subscription_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NotPendingApproval));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn cancel_returns_cancelled_subscription() {
        let dealer_id = Uuid::new_v4();
        let package = sample_package(10, 2);
        let mut subscription = sample_subscription(dealer_id, &package);
        subscription.status = SubscriptionStatus::Cancelled.to_string();
        let subscription_id = subscription.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_cancel()
            .with(eq(dealer_id), eq(subscription_id), eq(t0()))
            .times(1)
            .returning(move |_, _, _| {
                Ok(Some((
                    subscription.clone(),
                    ExpirySweep {
                        expired_subscriptions: 0,
                        deactivated_vehicles: 3,
                    },
                )))
            });

        let usecase = usecase(MockPackageRepository::new(), subscription_repo, t0());

        let cancelled = usecase
            .cancel(dealer(dealer_id), subscription_id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_expired_subscription_conflicts() {
        let dealer_id = Uuid::new_v4();
        let package = sample_package(10, 2);
        let mut expired = sample_subscription(dealer_id, &package);
        expired.status = SubscriptionStatus::Expired.to_string();
        let subscription_id = expired.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_cancel()
            .returning(|_, _, _| Ok(None));
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(expired.clone())));

        let usecase = usecase(MockPackageRepository::new(), subscription_repo, t0());

        let err = usecase
            .cancel(dealer(dealer_id), subscription_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::InvalidTransition(SubscriptionStatus::Expired)
        ));
    }

    #[tokio::test]
    async fn cancelling_someone_elses_subscription_is_not_found() {
        let package = sample_package(10, 2);
        let foreign = sample_subscription(Uuid::new_v4(), &package);
        let subscription_id = foreign.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_cancel()
            .returning(|_, _, _| Ok(None));
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(foreign.clone())));

        let usecase = usecase(MockPackageRepository::new(), subscription_repo, t0());

        let err = usecase
            .cancel(dealer(Uuid::new_v4()), subscription_id)
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::SubscriptionNotFound));
    }
}
