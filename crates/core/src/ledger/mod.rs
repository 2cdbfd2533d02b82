//! Cash-session ledger.
//!
//! This module implements the register's bookkeeping:
//! - Session lifecycle (open, close, active-session lookup)
//! - Expense and flexi journal entries
//! - Derived per-session metrics
//! - The persistence contract and an in-memory implementation
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod journal;
pub mod memory;
pub mod session;
pub mod store;
pub mod types;

pub use balance::{BalanceCalculator, SessionBalance};
pub use error::LedgerError;
pub use journal::TransactionJournal;
pub use memory::InMemoryStore;
pub use session::SessionLedger;
pub use store::{
    CashRegisterStore, NewCashSession, NewExpense, NewFlexiEntry, NewUser, UserChanges,
};
pub use types::{
    CashSession, CloseSessionInput, Expense, FlexiEntry, FlexiFilter, OpenSessionInput,
    ReclosePolicy, SessionClosing, SessionDetail, SessionFilter, SessionSnapshot,
};
