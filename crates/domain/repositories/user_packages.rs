use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::user_packages::UserPackageEntity,
    value_objects::user_packages::{ConsumeOutcome, PurchaseOutcome},
};

#[automock]
#[async_trait]
pub trait UserPackageRepository {
    /// Creates the instance, or resets a non-active one, for `(account_id, package_id)`.
    async fn purchase(
        &self,
        account_id: Uuid,
        package_id: Uuid,
        credits: i32,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome>;

    /// Conditional decrement on the oldest active instance.
    async fn consume(
        &self,
        account_id: Uuid,
        amount: i32,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome>;

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<UserPackageEntity>>;

    /// Cancels an `ACTIVE` instance owned by the account. `None` when nothing matched.
    async fn cancel(
        &self,
        account_id: Uuid,
        user_package_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<UserPackageEntity>>;

    async fn find_by_id(&self, user_package_id: Uuid) -> Result<Option<UserPackageEntity>>;
}
