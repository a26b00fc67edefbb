use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::packages;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = packages)]
pub struct PackageEntity {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub price_minor: i32,
    pub duration_days: i32,
    pub max_vehicles: i32,
    pub max_featured_cars: i32,
    pub can_add_vehicles: bool,
    pub can_feature_vehicles: bool,
    /// Credits granted when bought as a quota template; zero for listing plans.
    pub credits: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageEntity {
    pub fn is_quota_template(&self) -> bool {
        self.credits > 0
    }
}
