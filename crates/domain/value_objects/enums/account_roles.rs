use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Dealer,
    #[default]
    Client,
    Admin,
}

impl AccountRole {
    /// Unrecognised roles get the least privileged account kind.
    pub fn from_claim(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dealer" => AccountRole::Dealer,
            "admin" => AccountRole::Admin,
            _ => AccountRole::Client,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }
}

impl Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            AccountRole::Dealer => "dealer",
            AccountRole::Client => "client",
            AccountRole::Admin => "admin",
        };
        write!(f, "{}", role)
    }
}
