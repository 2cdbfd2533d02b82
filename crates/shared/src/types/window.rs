//! Inclusive time windows used to filter sessions and entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An optional `[from, to]` range over UTC timestamps.
///
/// Both bounds are inclusive. A missing bound leaves that side open. A window
/// whose `from` is after its `to` contains nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Lower bound (inclusive).
    pub from: Option<DateTime<Utc>>,
    /// Upper bound (inclusive).
    pub to: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// A window with no bounds.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Creates a window from optional bounds.
    #[must_use]
    pub const fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Creates a window bounded on both sides.
    #[must_use]
    pub const fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Returns true when `from > to`, i.e. the window selects nothing.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    /// Returns true if `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}
