use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserPackageStatus {
    #[default]
    Active,
    Exhausted,
    Cancelled,
}

impl UserPackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserPackageStatus::Active => "ACTIVE",
            UserPackageStatus::Exhausted => "EXHAUSTED",
            UserPackageStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "ACTIVE" => UserPackageStatus::Active,
            "CANCELLED" => UserPackageStatus::Cancelled,
            _ => UserPackageStatus::Exhausted,
        }
    }
}

impl Display for UserPackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
