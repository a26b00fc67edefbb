use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::vehicles;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = vehicles)]
pub struct VehicleEntity {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub title: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_minor: Option<i64>,
    pub status: String,
    pub is_featured: bool,
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = vehicles)]
pub struct InsertVehicleEntity {
    pub dealer_id: Uuid,
    pub title: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_minor: Option<i64>,
    pub status: String,
    pub is_featured: bool,
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
