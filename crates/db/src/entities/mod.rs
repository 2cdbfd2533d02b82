//! `SeaORM` entity definitions.

pub mod cash_sessions;
pub mod expenses;
pub mod flexi_entries;
pub mod sea_orm_active_enums;
pub mod users;
