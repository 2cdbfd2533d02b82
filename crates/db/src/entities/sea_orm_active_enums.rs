//! `SeaORM` active enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "operator")]
    Operator,
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
}

impl From<UserRole> for tally_core::auth::UserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Operator => Self::Operator,
            UserRole::Supervisor => Self::Supervisor,
        }
    }
}

impl From<tally_core::auth::UserRole> for UserRole {
    fn from(role: tally_core::auth::UserRole) -> Self {
        match role {
            tally_core::auth::UserRole::Operator => Self::Operator,
            tally_core::auth::UserRole::Supervisor => Self::Supervisor,
        }
    }
}
