use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{packages, payments, subscriptions, vehicles},
    },
};
use domain::{
    entities::{
        packages::PackageEntity,
        payments::{InsertPaymentEntity, PaymentEntity},
        subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    },
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        capabilities::CapabilitySnapshot,
        enums::{
            payment_statuses::PaymentStatus, subscription_statuses::SubscriptionStatus,
            vehicle_statuses::VehicleStatus,
        },
        subscriptions::ExpirySweep,
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn authoritative_subscription(
    conn: &mut PgConnection,
    dealer_id: Uuid,
    now: DateTime<Utc>,
    lock: bool,
) -> QueryResult<Option<(SubscriptionEntity, PackageEntity)>> {
    let query = subscriptions::table
        .filter(subscriptions::dealer_id.eq(dealer_id))
        .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
        .filter(subscriptions::ends_at.ge(now))
        .order((subscriptions::ends_at.desc(), subscriptions::created_at.desc()))
        .select(SubscriptionEntity::as_select());

    let subscription = if lock {
        query.for_update().first::<SubscriptionEntity>(conn).optional()?
    } else {
        query.first::<SubscriptionEntity>(conn).optional()?
    };

    let Some(subscription) = subscription else {
        return Ok(None);
    };

    let package = packages::table
        .filter(packages::id.eq(subscription.package_id))
        .select(PackageEntity::as_select())
        .first::<PackageEntity>(conn)?;

    Ok(Some((subscription, package)))
}

/// Locks the dealer's authoritative subscription row for the rest of the transaction and
/// rebuilds the capability snapshot from it. Concurrent capacity-gated writes for the same
/// dealer serialise here.
pub(crate) fn lock_capabilities(
    conn: &mut PgConnection,
    dealer_id: Uuid,
    now: DateTime<Utc>,
) -> QueryResult<CapabilitySnapshot> {
    let snapshot = authoritative_subscription(conn, dealer_id, now, true)?
        .map(|(subscription, package)| CapabilitySnapshot::from_subscription(&subscription, &package))
        .unwrap_or_else(CapabilitySnapshot::none);

    Ok(snapshot)
}

/// Deactivates the dealer's `ACTIVE` listings when it no longer holds any usable subscription.
fn deactivate_listings_if_unentitled(
    conn: &mut PgConnection,
    dealer_id: Uuid,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    let remaining = subscriptions::table
        .filter(subscriptions::dealer_id.eq(dealer_id))
        .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
        .filter(subscriptions::ends_at.ge(now))
        .select(count_star())
        .first::<i64>(conn)?;

    if remaining > 0 {
        return Ok(0);
    }

    update(vehicles::table)
        .filter(vehicles::dealer_id.eq(dealer_id))
        .filter(vehicles::status.eq(VehicleStatus::Active.as_str()))
        .set((
            vehicles::status.eq(VehicleStatus::Inactive.as_str()),
            vehicles::is_featured.eq(false),
            vehicles::featured_at.eq(None::<DateTime<Utc>>),
            vehicles::updated_at.eq(now),
        ))
        .execute(conn)
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn expire_lapsed_and_cascade(
        &self,
        dealer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ExpirySweep> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let sweep = conn.transaction::<ExpirySweep, diesel::result::Error, _>(|tx| {
            let expired = update(subscriptions::table)
                .filter(subscriptions::dealer_id.eq(dealer_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
                .filter(subscriptions::ends_at.lt(now))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Expired.as_str()),
                    subscriptions::updated_at.eq(now),
                ))
                .execute(tx)?;

            // Nothing lapsed in this pass, so there is no active-to-none transition to cascade.
            if expired == 0 {
                return Ok(ExpirySweep::default());
            }

            let deactivated = deactivate_listings_if_unentitled(tx, dealer_id, now)?;

            Ok(ExpirySweep {
                expired_subscriptions: expired,
                deactivated_vehicles: deactivated,
            })
        })?;

        Ok(sweep)
    }

    async fn find_authoritative_subscription(
        &self,
        dealer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(SubscriptionEntity, PackageEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = authoritative_subscription(&mut conn, dealer_id, now, false)?;

        Ok(result)
    }

    async fn create_with_payment(
        &self,
        payment: InsertPaymentEntity,
        mut subscription: InsertSubscriptionEntity,
    ) -> Result<(PaymentEntity, SubscriptionEntity)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<(PaymentEntity, SubscriptionEntity), diesel::result::Error, _>(
            |tx| {
                let payment = insert_into(payments::table)
                    .values(&payment)
                    .returning(PaymentEntity::as_select())
                    .get_result::<PaymentEntity>(tx)?;

                subscription.payment_id = Some(payment.id);
                let subscription = insert_into(subscriptions::table)
                    .values(&subscription)
                    .returning(SubscriptionEntity::as_select())
                    .get_result::<SubscriptionEntity>(tx)?;

                Ok((payment, subscription))
            },
        )?;

        Ok(result)
    }

    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_dealer(&self, dealer_id: Uuid) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(subscriptions::dealer_id.eq(dealer_id))
            .order(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn approve_pending(
        &self,
        subscription_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<Option<SubscriptionEntity>, diesel::result::Error, _>(|tx| {
            let approved = update(subscriptions::table)
                .filter(subscriptions::id.eq(subscription_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::PendingApproval.as_str()))
                .set((
                    subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
                    subscriptions::starts_at.eq(starts_at),
                    subscriptions::ends_at.eq(ends_at),
                    subscriptions::updated_at.eq(now),
                ))
                .returning(SubscriptionEntity::as_select())
                .get_result::<SubscriptionEntity>(tx)
                .optional()?;

            let Some(approved) = approved else {
                return Ok(None);
            };

            update(payments::table)
                .filter(payments::id.eq(approved.payment_id))
                .filter(payments::status.eq(PaymentStatus::Pending.as_str()))
                .set((
                    payments::status.eq(PaymentStatus::Paid.as_str()),
                    payments::paid_at.eq(Some(now)),
                ))
                .execute(tx)?;

            Ok(Some(approved))
        })?;

        Ok(result)
    }

    async fn cancel(
        &self,
        dealer_id: Uuid,
        subscription_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(SubscriptionEntity, ExpirySweep)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cancellable = vec![
            SubscriptionStatus::Active.as_str(),
            SubscriptionStatus::PendingApproval.as_str(),
        ];

        let result = conn
            .transaction::<Option<(SubscriptionEntity, ExpirySweep)>, diesel::result::Error, _>(
                |tx| {
                    let current = subscriptions::table
                        .filter(subscriptions::id.eq(subscription_id))
                        .filter(subscriptions::dealer_id.eq(dealer_id))
                        .filter(subscriptions::status.eq_any(cancellable))
                        .select(SubscriptionEntity::as_select())
                        .for_update()
                        .first::<SubscriptionEntity>(tx)
                        .optional()?;

                    let Some(current) = current else {
                        return Ok(None);
                    };

                    let cancelled = update(subscriptions::table)
                        .filter(subscriptions::id.eq(current.id))
                        .set((
                            subscriptions::status.eq(SubscriptionStatus::Cancelled.as_str()),
                            subscriptions::updated_at.eq(now),
                        ))
                        .returning(SubscriptionEntity::as_select())
                        .get_result::<SubscriptionEntity>(tx)?;

                    // A pending subscription never granted anything, so it cannot trigger a cascade.
                    let deactivated = if current.status == SubscriptionStatus::Active.as_str() {
                        deactivate_listings_if_unentitled(tx, dealer_id, now)?
                    } else {
                        0
                    };

                    Ok(Some((
                        cancelled,
                        ExpirySweep {
                            expired_subscriptions: 0,
                            deactivated_vehicles: deactivated,
                        },
                    )))
                },
            )?;

        Ok(result)
    }
}
