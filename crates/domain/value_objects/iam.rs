use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::account_roles::AccountRole;

/// Authenticated caller as seen by the entitlement use cases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountIdentity {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl AccountIdentity {
    pub fn new(account_id: Uuid, role: AccountRole) -> Self {
        Self { account_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
