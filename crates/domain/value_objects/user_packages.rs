use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::user_packages::UserPackageEntity,
    value_objects::enums::user_package_statuses::UserPackageStatus,
};

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Created(UserPackageEntity),
    Reactivated(UserPackageEntity),
    AlreadyActive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    Consumed(UserPackageEntity),
    /// The account has never held a quota instance.
    PackageRequired,
    /// No active instance, or the oldest active one cannot cover the amount.
    NoActiveQuota,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseQuotaModel {
    pub package_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsumeQuotaModel {
    #[serde(default)]
    pub amount: Option<i32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserPackageDto {
    pub id: Uuid,
    pub account_id: Uuid,
    pub package_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub credits_remaining: i32,
    pub credits_used: i32,
    pub status: UserPackageStatus,
}

impl From<UserPackageEntity> for UserPackageDto {
    fn from(value: UserPackageEntity) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            package_id: value.package_id,
            purchased_at: value.purchased_at,
            credits_remaining: value.credits_remaining,
            credits_used: value.credits_used,
            status: UserPackageStatus::from_str(&value.status),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsumeQuotaDto {
    pub user_package: Option<UserPackageDto>,
    pub bypassed: bool,
}
