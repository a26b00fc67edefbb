use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageCategory {
    VehicleSlots,
    FeaturedSlots,
    Combo,
}

impl PackageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageCategory::VehicleSlots => "VEHICLE_SLOTS",
            PackageCategory::FeaturedSlots => "FEATURED_SLOTS",
            PackageCategory::Combo => "COMBO",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "VEHICLE_SLOTS" => Some(PackageCategory::VehicleSlots),
            "FEATURED_SLOTS" => Some(PackageCategory::FeaturedSlots),
            "COMBO" => Some(PackageCategory::Combo),
            _ => None,
        }
    }
}

impl Display for PackageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
