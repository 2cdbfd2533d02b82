//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod cash_session;
pub mod entry;
pub mod user;

pub use cash_session::CashSessionRepository;
pub use entry::EntryRepository;
pub use user::UserRepository;
