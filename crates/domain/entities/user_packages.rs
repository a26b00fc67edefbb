use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::user_packages;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = user_packages)]
pub struct UserPackageEntity {
    pub id: Uuid,
    pub account_id: Uuid,
    pub package_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub credits_remaining: i32,
    pub credits_used: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = user_packages)]
pub struct InsertUserPackageEntity {
    pub account_id: Uuid,
    pub package_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub credits_remaining: i32,
    pub credits_used: i32,
    pub status: String,
}
