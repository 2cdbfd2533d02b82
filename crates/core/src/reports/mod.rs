//! Cross-session reporting.
//!
//! Dashboards and audit reports built from session snapshots:
//! - Summaries for one user or everyone
//! - Per-session report rows
//! - Flexi listings and consumption by user
//! - User activity and daily trend

pub mod service;
pub mod types;


pub use service::{ReportAggregator, ReportService};
pub use types::*;
