use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    RunQueryDsl,
    dsl::count_star,
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_packages};
use domain::{
    entities::user_packages::{InsertUserPackageEntity, UserPackageEntity},
    repositories::user_packages::UserPackageRepository,
    value_objects::{
        enums::user_package_statuses::UserPackageStatus,
        user_packages::{ConsumeOutcome, PurchaseOutcome},
    },
};

pub struct UserPackagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPackagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserPackageRepository for UserPackagePostgres {
    async fn purchase(
        &self,
        account_id: Uuid,
        package_id: Uuid,
        credits: i32,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<PurchaseOutcome, DieselError, _>(|tx| {
            let existing = user_packages::table
                .filter(user_packages::account_id.eq(account_id))
                .filter(user_packages::package_id.eq(package_id))
                .select(UserPackageEntity::as_select())
                .for_update()
                .first::<UserPackageEntity>(tx)
                .optional()?;

            match existing {
                Some(instance) if instance.status == UserPackageStatus::Active.as_str() => {
                    Ok(PurchaseOutcome::AlreadyActive)
                }
                Some(instance) => {
                    let reactivated = update(user_packages::table)
                        .filter(user_packages::id.eq(instance.id))
                        .set((
                            user_packages::status.eq(UserPackageStatus::Active.as_str()),
                            user_packages::credits_remaining.eq(credits),
                            user_packages::credits_used.eq(0),
                            user_packages::purchased_at.eq(now),
                            user_packages::updated_at.eq(now),
                        ))
                        .returning(UserPackageEntity::as_select())
                        .get_result::<UserPackageEntity>(tx)?;

                    Ok(PurchaseOutcome::Reactivated(reactivated))
                }
                None => {
                    let insert_entity = InsertUserPackageEntity {
                        account_id,
                        package_id,
                        purchased_at: now,
                        credits_remaining: credits,
                        credits_used: 0,
                        status: UserPackageStatus::Active.to_string(),
                    };

                    let created = insert_into(user_packages::table)
                        .values(&insert_entity)
                        .returning(UserPackageEntity::as_select())
                        .get_result::<UserPackageEntity>(tx)?;

                    Ok(PurchaseOutcome::Created(created))
                }
            }
        });

        match result {
            Ok(outcome) => Ok(outcome),
            // A concurrent purchase inserted the same (account, package) row first.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(PurchaseOutcome::AlreadyActive)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn consume(
        &self,
        account_id: Uuid,
        amount: i32,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<ConsumeOutcome, DieselError, _>(|tx| {
            let oldest = user_packages::table
                .filter(user_packages::account_id.eq(account_id))
                .filter(user_packages::status.eq(UserPackageStatus::Active.as_str()))
                .order((user_packages::purchased_at.asc(), user_packages::id.asc()))
                .select(UserPackageEntity::as_select())
                .for_update()
                .first::<UserPackageEntity>(tx)
                .optional()?;

            let Some(instance) = oldest else {
                let held = user_packages::table
                    .filter(user_packages::account_id.eq(account_id))
                    .select(count_star())
                    .first::<i64>(tx)?;

                return Ok(if held == 0 {
                    ConsumeOutcome::PackageRequired
                } else {
                    ConsumeOutcome::NoActiveQuota
                });
            };

            if instance.credits_remaining < amount {
                return Ok(ConsumeOutcome::NoActiveQuota);
            }

            let decremented = update(user_packages::table)
                .filter(user_packages::id.eq(instance.id))
                .filter(user_packages::status.eq(UserPackageStatus::Active.as_str()))
                .filter(user_packages::credits_remaining.ge(amount))
                .set((
                    user_packages::credits_remaining.eq(user_packages::credits_remaining - amount),
                    user_packages::credits_used.eq(user_packages::credits_used + amount),
                    user_packages::updated_at.eq(now),
                ))
                .returning(UserPackageEntity::as_select())
                .get_result::<UserPackageEntity>(tx)
                .optional()?;

            let Some(decremented) = decremented else {
                return Ok(ConsumeOutcome::NoActiveQuota);
            };

            if decremented.credits_remaining > 0 {
                return Ok(ConsumeOutcome::Consumed(decremented));
            }

            let exhausted = update(user_packages::table)
                .filter(user_packages::id.eq(decremented.id))
                .set((
                    user_packages::status.eq(UserPackageStatus::Exhausted.as_str()),
                    user_packages::updated_at.eq(now),
                ))
                .returning(UserPackageEntity::as_select())
                .get_result::<UserPackageEntity>(tx)?;

            Ok(ConsumeOutcome::Consumed(exhausted))
        })?;

        Ok(result)
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<UserPackageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = user_packages::table
            .filter(user_packages::account_id.eq(account_id))
            .order(user_packages::purchased_at.asc())
            .select(UserPackageEntity::as_select())
            .load::<UserPackageEntity>(&mut conn)?;

        Ok(results)
    }

    async fn cancel(
        &self,
        account_id: Uuid,
        user_package_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<UserPackageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(user_packages::table)
            .filter(user_packages::id.eq(user_package_id))
            .filter(user_packages::account_id.eq(account_id))
            .filter(user_packages::status.eq(UserPackageStatus::Active.as_str()))
            .set((
                user_packages::status.eq(UserPackageStatus::Cancelled.as_str()),
                user_packages::updated_at.eq(now),
            ))
            .returning(UserPackageEntity::as_select())
            .get_result::<UserPackageEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_id(&self, user_package_id: Uuid) -> Result<Option<UserPackageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = user_packages::table
            .filter(user_packages::id.eq(user_package_id))
            .select(UserPackageEntity::as_select())
            .first::<UserPackageEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
