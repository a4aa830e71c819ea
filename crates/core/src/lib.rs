//! Core logic for the masterplan classification client.
//!
//! Pure tree functions and guards, plus the store that keeps a project's tree
//! in sync with the backend.

pub mod guard;
pub mod models;
pub mod services;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use guard::GuardError;
pub use services::*;
