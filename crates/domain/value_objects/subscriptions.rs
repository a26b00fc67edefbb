use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{payments::PaymentEntity, subscriptions::SubscriptionEntity},
    value_objects::enums::{
        payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
        subscription_statuses::SubscriptionStatus,
    },
};

/// What one lazy-expiry pass changed for a dealer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySweep {
    pub expired_subscriptions: usize,
    pub deactivated_vehicles: usize,
}

impl ExpirySweep {
    pub fn cascaded(&self) -> bool {
        self.deactivated_vehicles > 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseSubscriptionModel {
    pub package_id: Uuid,
    pub method: PaymentMethod,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub package_id: Uuid,
    pub payment_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            dealer_id: value.dealer_id,
            package_id: value.package_id,
            payment_id: value.payment_id,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            status: SubscriptionStatus::from_str(&value.status),
            auto_renew: value.auto_renew,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentDto {
    pub id: Uuid,
    pub package_id: Uuid,
    pub amount_minor: i32,
    pub method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentDto {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid.as_str()
    }
}

impl From<PaymentEntity> for PaymentDto {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            package_id: value.package_id,
            amount_minor: value.amount_minor,
            method: value.method,
            status: value.status,
            transaction_id: value.transaction_id,
            paid_at: value.paid_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivationDto {
    pub payment: PaymentDto,
    pub subscription: SubscriptionDto,
    pub requires_approval: bool,
}
