use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Draft,
    #[default]
    Active,
    Inactive,
    Sold,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Draft => "DRAFT",
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::Inactive => "INACTIVE",
            VehicleStatus::Sold => "SOLD",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(VehicleStatus::Draft),
            "ACTIVE" => Some(VehicleStatus::Active),
            "INACTIVE" => Some(VehicleStatus::Inactive),
            "SOLD" => Some(VehicleStatus::Sold),
            _ => None,
        }
    }
}

impl Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
