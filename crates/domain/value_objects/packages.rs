use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::packages::PackageEntity,
    value_objects::enums::package_categories::PackageCategory,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PackageDto {
    pub id: Uuid,
    pub name: String,
    pub category: Option<PackageCategory>,
    pub price_minor: i32,
    pub duration_days: i32,
    pub max_vehicles: i32,
    pub max_featured_cars: i32,
    pub can_add_vehicles: bool,
    pub can_feature_vehicles: bool,
    pub credits: i32,
}

impl From<PackageEntity> for PackageDto {
    fn from(value: PackageEntity) -> Self {
        Self {
            id: value.id,
            category: PackageCategory::from_str(&value.category),
            name: value.name,
            price_minor: value.price_minor,
            duration_days: value.duration_days,
            max_vehicles: value.max_vehicles,
            max_featured_cars: value.max_featured_cars,
            can_add_vehicles: value.can_add_vehicles,
            can_feature_vehicles: value.can_feature_vehicles,
            credits: value.credits,
        }
    }
}
