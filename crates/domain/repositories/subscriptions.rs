use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        packages::PackageEntity,
        payments::{InsertPaymentEntity, PaymentEntity},
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    value_objects::subscriptions::ExpirySweep,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Expires every lapsed `ACTIVE` subscription of the dealer and, when that leaves the
    /// dealer with none, deactivates its `ACTIVE` vehicles. Runs as one transaction.
    async fn expire_lapsed_and_cascade(
        &self,
        dealer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ExpirySweep>;

    /// Latest-ending non-expired `ACTIVE` subscription with its package.
    async fn find_authoritative_subscription(
        &self,
        dealer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(SubscriptionEntity, PackageEntity)>>;

    async fn create_with_payment(
        &self,
        payment: InsertPaymentEntity,
        subscription: InsertSubscriptionEntity,
    ) -> Result<(PaymentEntity, SubscriptionEntity)>;

    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn list_by_dealer(&self, dealer_id: Uuid) -> Result<Vec<SubscriptionEntity>>;

    /// Flips a `PENDING_APPROVAL` subscription to `ACTIVE` with a fresh window and settles
    /// its payment. `None` when the row is no longer pending.
    async fn approve_pending(
        &self,
        subscription_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Cancels an `ACTIVE` or `PENDING_APPROVAL` subscription owned by the dealer,
    /// deactivating listings if no active subscription remains. `None` when nothing matched.
    async fn cancel(
        &self,
        dealer_id: Uuid,
        subscription_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(SubscriptionEntity, ExpirySweep)>>;
}
