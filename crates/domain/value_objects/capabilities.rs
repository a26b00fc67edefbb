use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use crate::domain::entities::{packages::PackageEntity, subscriptions::SubscriptionEntity};

/// What a dealer may do right now, derived from its authoritative subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    pub can_add_vehicles: bool,
    pub can_feature_vehicles: bool,
    pub max_vehicles: i64,
    pub max_featured_cars: i64,
    pub subscription_id: Option<Uuid>,
    pub package_name: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

impl CapabilitySnapshot {
    /// Snapshot for a dealer with no authoritative subscription.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_subscription(subscription: &SubscriptionEntity, package: &PackageEntity) -> Self {
        Self {
            can_add_vehicles: package.can_add_vehicles,
            can_feature_vehicles: package.can_feature_vehicles,
            max_vehicles: package.max_vehicles.into(),
            max_featured_cars: package.max_featured_cars.into(),
            subscription_id: Some(subscription.id),
            package_name: Some(package.name.clone()),
            end_date: Some(subscription.ends_at),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription_id.is_some()
    }

    pub fn can_add_vehicle(&self, current_non_sold_count: i64) -> CapacityDecision {
        if !self.can_add_vehicles {
            return CapacityDecision::Deny(DenialReason::NotSubscribed);
        }
        if current_non_sold_count >= self.max_vehicles {
            return CapacityDecision::Deny(DenialReason::LimitReached);
        }
        CapacityDecision::Allow
    }

    pub fn can_feature(&self, current_featured_excluding_self: i64) -> CapacityDecision {
        if !self.can_feature_vehicles {
            return CapacityDecision::Deny(DenialReason::NotSubscribed);
        }
        if current_featured_excluding_self >= self.max_featured_cars {
            return CapacityDecision::Deny(DenialReason::LimitReached);
        }
        CapacityDecision::Allow
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    NotSubscribed,
    LimitReached,
}

impl Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            DenialReason::NotSubscribed => "NOT_SUBSCRIBED",
            DenialReason::LimitReached => "LIMIT_REACHED",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityDecision {
    Allow,
    Deny(DenialReason),
}

/// Result of a write that was gated by the capacity guard inside its transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum CapacityWrite<T> {
    Written(T),
    Denied(DenialReason),
    /// The locked row is not an `ACTIVE` listing, so the write does not apply.
    NotListed,
}
