//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the `CashRegisterStore` trait.
//!
//! # Modules
//!
//! - `ledger` - Session lifecycle, journal entries, derived metrics, storage contract
//! - `reports` - Cross-session summaries and report listings
//! - `auth` - Users, roles, password hashing, credential verification

pub mod auth;
pub mod ledger;
pub mod reports;
