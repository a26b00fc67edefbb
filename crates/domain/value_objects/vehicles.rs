use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::vehicles::VehicleEntity, value_objects::enums::vehicle_statuses::VehicleStatus,
};

#[derive(Debug, Clone, Deserialize)]
pub struct AddVehicleModel {
    pub title: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub price_minor: Option<i64>,
    /// Listings start as `ACTIVE` unless saved as a draft.
    #[serde(default)]
    pub status: Option<VehicleStatus>,
    /// Admins may list on behalf of a dealer.
    #[serde(default)]
    pub dealer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureVehicleModel {
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVehicleStatusModel {
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleDto {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub title: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price_minor: Option<i64>,
    pub status: Option<VehicleStatus>,
    pub is_featured: bool,
    pub featured_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VehicleEntity> for VehicleDto {
    fn from(value: VehicleEntity) -> Self {
        Self {
            id: value.id,
            dealer_id: value.dealer_id,
            status: VehicleStatus::from_str(&value.status),
            title: value.title,
            make: value.make,
            model: value.model,
            year: value.year,
            price_minor: value.price_minor,
            is_featured: value.is_featured,
            featured_at: value.featured_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
