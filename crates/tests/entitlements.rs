//! Store-level checks against a real Postgres. Each test runs in its own schema and
//! is skipped when `TEST_DATABASE_URL` is not set.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use crates::{
    domain::{
        entities::{
            packages::PackageEntity,
            payments::{InsertPaymentEntity, PaymentEntity},
            subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
            vehicles::{InsertVehicleEntity, VehicleEntity},
        },
        repositories::{
            subscriptions::SubscriptionRepository, user_packages::UserPackageRepository,
            vehicles::VehicleRepository,
        },
        value_objects::{
            capabilities::{CapacityWrite, DenialReason},
            enums::{
                package_categories::PackageCategory, payment_statuses::PaymentStatus,
                subscription_statuses::SubscriptionStatus,
                user_package_statuses::UserPackageStatus, vehicle_statuses::VehicleStatus,
            },
            subscriptions::ExpirySweep,
            user_packages::{ConsumeOutcome, PurchaseOutcome},
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::{PgPoolSquad, establish_connection},
            schema::{packages, payments},
        },
        repositories::{
            subscriptions::SubscriptionPostgres, user_packages::UserPackagePostgres,
            vehicles::VehiclePostgres,
        },
    },
};
use diesel::{Connection, PgConnection, RunQueryDsl, connection::SimpleConnection, prelude::*};
use uuid::Uuid;

const MIGRATION: &str =
    include_str!("../../migrations/2026-01-05-000000_create_entitlements/up.sql");

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
}

fn test_pool() -> Option<Arc<PgPoolSquad>> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        return None;
    };

    let schema = format!("entitlements_{}", Uuid::new_v4().simple());
    let mut conn = PgConnection::establish(&database_url).expect("connect to TEST_DATABASE_URL");
    conn.batch_execute(&format!(
        "CREATE SCHEMA {schema}; SET search_path TO {schema}; {MIGRATION}"
    ))
    .expect("apply migration");

    let separator = if database_url.contains('?') { '&' } else { '?' };
    let scoped_url = format!("{database_url}{separator}options=-csearch_path%3D{schema}");

    Some(Arc::new(
        establish_connection(&scoped_url, 16).expect("build test pool"),
    ))
}

fn seed_package(
    pool: &PgPoolSquad,
    max_vehicles: i32,
    max_featured_cars: i32,
    credits: i32,
) -> PackageEntity {
    let mut conn = pool.get().unwrap();
    diesel::insert_into(packages::table)
        .values((
            packages::name.eq("Test package"),
            packages::category.eq(PackageCategory::Combo.as_str()),
            packages::price_minor.eq(49_900),
            packages::duration_days.eq(30),
            packages::max_vehicles.eq(max_vehicles),
            packages::max_featured_cars.eq(max_featured_cars),
            packages::can_add_vehicles.eq(max_vehicles > 0),
            packages::can_feature_vehicles.eq(max_featured_cars > 0),
            packages::credits.eq(credits),
        ))
        .returning(PackageEntity::as_select())
        .get_result(&mut conn)
        .unwrap()
}

async fn seed_active_subscription(
    repo: &SubscriptionPostgres,
    dealer_id: Uuid,
    package: &PackageEntity,
) -> SubscriptionEntity {
    let (_, subscription) = repo
        .create_with_payment(
            InsertPaymentEntity {
                account_id: dealer_id,
                package_id: package.id,
                amount_minor: package.price_minor,
                method: "UPI".to_string(),
                status: "PAID".to_string(),
                transaction_id: None,
                paid_at: Some(t0()),
            },
            InsertSubscriptionEntity {
                dealer_id,
                package_id: package.id,
                payment_id: None,
                starts_at: t0(),
                ends_at: t0() + Duration::days(package.duration_days.into()),
                status: "ACTIVE".to_string(),
                auto_renew: false,
            },
        )
        .await
        .unwrap();
    subscription
}

fn new_vehicle(dealer_id: Uuid, title: &str, status: VehicleStatus) -> InsertVehicleEntity {
    InsertVehicleEntity {
        dealer_id,
        title: title.to_string(),
        make: None,
        model: None,
        year: None,
        price_minor: None,
        status: status.to_string(),
        is_featured: false,
        featured_at: None,
        created_at: t0(),
        updated_at: t0(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_never_exceed_max_vehicles() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 3, 0, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    seed_active_subscription(&subscriptions, dealer_id, &package).await;

    let vehicles = Arc::new(VehiclePostgres::new(Arc::clone(&pool)));
    let now = t0() + Duration::days(1);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let vehicles = Arc::clone(&vehicles);
            tokio::spawn(async move {
                vehicles
                    .insert_within_capacity(
                        new_vehicle(dealer_id, &format!("car {i}"), VehicleStatus::Active),
                        now,
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut written = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CapacityWrite::Written(_) => written += 1,
            CapacityWrite::Denied(reason) => {
                assert_eq!(reason, DenialReason::LimitReached);
                denied += 1;
            }
            CapacityWrite::NotListed => panic!("every vehicle is ACTIVE"),
        }
    }

    assert_eq!(written, 3);
    assert_eq!(denied, 7);
    assert_eq!(vehicles.list_by_dealer(dealer_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn insert_without_subscription_is_not_subscribed() {
    let Some(pool) = test_pool() else { return };
    let vehicles = VehiclePostgres::new(Arc::clone(&pool));

    let outcome = vehicles
        .insert_within_capacity(new_vehicle(Uuid::new_v4(), "car", VehicleStatus::Active), t0())
        .await
        .unwrap();

    assert_eq!(outcome, CapacityWrite::Denied(DenialReason::NotSubscribed));
}

#[tokio::test]
async fn expiry_cascade_only_touches_active_listings_once() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 10, 2, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    let vehicles = VehiclePostgres::new(Arc::clone(&pool));
    seed_active_subscription(&subscriptions, dealer_id, &package).await;

    let mut seeded: Vec<VehicleEntity> = Vec::new();
    for (title, status) in [
        ("draft", VehicleStatus::Draft),
        ("live", VehicleStatus::Active),
        ("sold", VehicleStatus::Sold),
        ("parked", VehicleStatus::Inactive),
    ] {
        seeded.push(
            vehicles
                .insert(new_vehicle(dealer_id, title, status))
                .await
                .unwrap(),
        );
    }
    let live_id = seeded[1].id;
    vehicles
        .set_featured(live_id, true, t0() + Duration::days(1))
        .await
        .unwrap();

    // Still inside the window: nothing changes.
    let sweep = subscriptions
        .expire_lapsed_and_cascade(dealer_id, t0() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(sweep, ExpirySweep::default());

    let sweep = subscriptions
        .expire_lapsed_and_cascade(dealer_id, t0() + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(
        sweep,
        ExpirySweep {
            expired_subscriptions: 1,
            deactivated_vehicles: 1,
        }
    );

    let after = vehicles.list_by_dealer(dealer_id).await.unwrap();
    let status_of = |title: &str| {
        after
            .iter()
            .find(|vehicle| vehicle.title == title)
            .map(|vehicle| (vehicle.status.clone(), vehicle.is_featured))
            .unwrap()
    };
    assert_eq!(status_of("draft"), ("DRAFT".to_string(), false));
    assert_eq!(status_of("live"), ("INACTIVE".to_string(), false));
    assert_eq!(status_of("sold"), ("SOLD".to_string(), false));
    assert_eq!(status_of("parked"), ("INACTIVE".to_string(), false));

    let again = subscriptions
        .expire_lapsed_and_cascade(dealer_id, t0() + Duration::days(32))
        .await
        .unwrap();
    assert_eq!(again, ExpirySweep::default());
    assert!(
        subscriptions
            .find_authoritative_subscription(dealer_id, t0() + Duration::days(32))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn expiry_keeps_listings_while_another_subscription_is_live() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 10, 0, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    let vehicles = VehiclePostgres::new(Arc::clone(&pool));

    seed_active_subscription(&subscriptions, dealer_id, &package).await;
    let (_, renewal) = subscriptions
        .create_with_payment(
            InsertPaymentEntity {
                account_id: dealer_id,
                package_id: package.id,
                amount_minor: package.price_minor,
                method: "UPI".to_string(),
                status: "PAID".to_string(),
                transaction_id: None,
                paid_at: Some(t0()),
            },
            InsertSubscriptionEntity {
                dealer_id,
                package_id: package.id,
                payment_id: None,
                starts_at: t0() + Duration::days(20),
                ends_at: t0() + Duration::days(50),
                status: "ACTIVE".to_string(),
                auto_renew: false,
            },
        )
        .await
        .unwrap();
    vehicles
        .insert(new_vehicle(dealer_id, "live", VehicleStatus::Active))
        .await
        .unwrap();

    let now = t0() + Duration::days(31);
    let sweep = subscriptions
        .expire_lapsed_and_cascade(dealer_id, now)
        .await
        .unwrap();
    assert_eq!(sweep.expired_subscriptions, 1);
    assert_eq!(sweep.deactivated_vehicles, 0);

    let (authoritative, _) = subscriptions
        .find_authoritative_subscription(dealer_id, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(authoritative.id, renewal.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_credit_is_spent_exactly_once() {
    let Some(pool) = test_pool() else { return };
    let account_id = Uuid::new_v4();
    let package = seed_package(&pool, 0, 0, 1);
    let ledger = Arc::new(UserPackagePostgres::new(Arc::clone(&pool)));

    ledger
        .purchase(account_id, package.id, package.credits, t0())
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.consume(account_id, 1, t0()).await.unwrap() })
        })
        .collect();

    let mut consumed = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            ConsumeOutcome::Consumed(instance) => consumed.push(instance),
            ConsumeOutcome::NoActiveQuota => {}
            ConsumeOutcome::PackageRequired => panic!("account holds a grant"),
        }
    }

    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].credits_remaining, 0);
    assert_eq!(consumed[0].credits_used, 1);
    assert_eq!(consumed[0].status, UserPackageStatus::Exhausted.as_str());
}

#[tokio::test]
async fn purchase_reactivates_exhausted_grant_with_fresh_counters() {
    let Some(pool) = test_pool() else { return };
    let account_id = Uuid::new_v4();
    let package = seed_package(&pool, 0, 0, 2);
    let ledger = UserPackagePostgres::new(Arc::clone(&pool));

    assert_eq!(
        ledger.consume(account_id, 1, t0()).await.unwrap(),
        ConsumeOutcome::PackageRequired
    );

    let created = ledger
        .purchase(account_id, package.id, package.credits, t0())
        .await
        .unwrap();
    let PurchaseOutcome::Created(created) = created else {
        panic!("expected a new grant, got {created:?}");
    };

    assert_eq!(
        ledger
            .purchase(account_id, package.id, package.credits, t0())
            .await
            .unwrap(),
        PurchaseOutcome::AlreadyActive
    );

    ledger.consume(account_id, 2, t0()).await.unwrap();
    assert_eq!(
        ledger.consume(account_id, 1, t0()).await.unwrap(),
        ConsumeOutcome::NoActiveQuota
    );

    let later = t0() + Duration::days(3);
    let reactivated = ledger
        .purchase(account_id, package.id, package.credits, later)
        .await
        .unwrap();
    let PurchaseOutcome::Reactivated(reactivated) = reactivated else {
        panic!("expected reactivation, got {reactivated:?}");
    };

    assert_eq!(reactivated.id, created.id);
    assert_eq!(reactivated.credits_remaining, 2);
    assert_eq!(reactivated.credits_used, 0);
    assert_eq!(reactivated.purchased_at, later);
    assert_eq!(reactivated.status, UserPackageStatus::Active.as_str());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_features_never_exceed_max_featured_cars() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 10, 2, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    seed_active_subscription(&subscriptions, dealer_id, &package).await;

    let vehicles = Arc::new(VehiclePostgres::new(Arc::clone(&pool)));
    let mut ids = Vec::new();
    for i in 0..8 {
        let vehicle = vehicles
            .insert(new_vehicle(dealer_id, &format!("car {i}"), VehicleStatus::Active))
            .await
            .unwrap();
        ids.push(vehicle.id);
    }

    let now = t0() + Duration::days(1);
    let handles: Vec<_> = ids
        .into_iter()
        .map(|vehicle_id| {
            let vehicles = Arc::clone(&vehicles);
            tokio::spawn(async move {
                vehicles
                    .feature_within_capacity(dealer_id, vehicle_id, now)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut written = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CapacityWrite::Written(vehicle) => {
                assert!(vehicle.is_featured);
                written += 1;
            }
            CapacityWrite::Denied(reason) => assert_eq!(reason, DenialReason::LimitReached),
            CapacityWrite::NotListed => panic!("every vehicle is ACTIVE"),
        }
    }

    let featured = vehicles
        .list_by_dealer(dealer_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|vehicle| vehicle.is_featured)
        .count();
    assert_eq!(written, 2);
    assert_eq!(featured, 2);
}

#[tokio::test]
async fn draft_listing_is_never_featured_so_expiry_leaves_nothing_featured() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 10, 2, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    let vehicles = VehiclePostgres::new(Arc::clone(&pool));
    seed_active_subscription(&subscriptions, dealer_id, &package).await;

    let draft = match vehicles
        .insert_within_capacity(new_vehicle(dealer_id, "draft", VehicleStatus::Draft), t0())
        .await
        .unwrap()
    {
        CapacityWrite::Written(vehicle) => vehicle,
        other => panic!("expected the draft to be written, got {other:?}"),
    };

    let outcome = vehicles
        .feature_within_capacity(dealer_id, draft.id, t0() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(outcome, CapacityWrite::NotListed);

    subscriptions
        .expire_lapsed_and_cascade(dealer_id, t0() + Duration::days(31))
        .await
        .unwrap();

    let after = vehicles.find_by_id(draft.id).await.unwrap().unwrap();
    assert_eq!(after.status, VehicleStatus::Draft.as_str());
    assert!(!after.is_featured);
}

#[tokio::test]
async fn approving_pending_subscription_settles_payment_and_restarts_window() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 5, 0, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));

    let (payment, pending) = subscriptions
        .create_with_payment(
            InsertPaymentEntity {
                account_id: dealer_id,
                package_id: package.id,
                amount_minor: package.price_minor,
                method: "BANK_TRANSFER".to_string(),
                status: PaymentStatus::Pending.to_string(),
                transaction_id: None,
                paid_at: None,
            },
            InsertSubscriptionEntity {
                dealer_id,
                package_id: package.id,
                payment_id: None,
                starts_at: t0(),
                ends_at: t0() + Duration::days(30),
                status: SubscriptionStatus::PendingApproval.to_string(),
                auto_renew: false,
            },
        )
        .await
        .unwrap();

    let approved_at = t0() + Duration::days(2);
    let ends_at = approved_at + Duration::days(30);
    let approved = subscriptions
        .approve_pending(pending.id, approved_at, ends_at, approved_at)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(approved.status, SubscriptionStatus::Active.as_str());
    assert_eq!(approved.starts_at, approved_at);
    assert_eq!(approved.ends_at, ends_at);

    let mut conn = pool.get().unwrap();
    let settled = payments::table
        .filter(payments::id.eq(payment.id))
        .select(PaymentEntity::as_select())
        .first::<PaymentEntity>(&mut conn)
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Paid.as_str());
    assert_eq!(settled.paid_at, Some(approved_at));

    assert!(
        subscriptions
            .approve_pending(pending.id, approved_at, ends_at, approved_at)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn cancelling_last_active_subscription_deactivates_listings() {
    let Some(pool) = test_pool() else { return };
    let dealer_id = Uuid::new_v4();
    let package = seed_package(&pool, 10, 2, 0);
    let subscriptions = SubscriptionPostgres::new(Arc::clone(&pool));
    let vehicles = VehiclePostgres::new(Arc::clone(&pool));
    let subscription = seed_active_subscription(&subscriptions, dealer_id, &package).await;

    let live = vehicles
        .insert(new_vehicle(dealer_id, "live", VehicleStatus::Active))
        .await
        .unwrap();
    vehicles
        .set_featured(live.id, true, t0() + Duration::days(1))
        .await
        .unwrap();
    let draft = vehicles
        .insert(new_vehicle(dealer_id, "draft", VehicleStatus::Draft))
        .await
        .unwrap();

    let now = t0() + Duration::days(5);
    let (cancelled, sweep) = subscriptions
        .cancel(dealer_id, subscription.id, now)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled.as_str());
    assert_eq!(sweep.deactivated_vehicles, 1);

    let live = vehicles.find_by_id(live.id).await.unwrap().unwrap();
    assert_eq!(live.status, VehicleStatus::Inactive.as_str());
    assert!(!live.is_featured);
    let draft = vehicles.find_by_id(draft.id).await.unwrap().unwrap();
    assert_eq!(draft.status, VehicleStatus::Draft.as_str());

    assert!(
        subscriptions
            .cancel(dealer_id, subscription.id, now)
            .await
            .unwrap()
            .is_none()
    );
}
