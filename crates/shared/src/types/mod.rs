//! Common types used across the application.

pub mod id;
pub mod window;

pub use id::*;
pub use window::DateWindow;
