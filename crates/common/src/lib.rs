//! Common utilities and shared types for masterplan.
//!
//! This crate provides the foundational pieces used across all masterplan crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//!
//! # Example
//!
//! ```no_run
//! use masterplan_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Backend: {}", config.api.base_url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;

/// Pub/Sub channel names.
pub mod channels {
    /// Classification tree changes.
    pub const CLASSIFICATION_UPDATES: &str = "classification-updates";
}

pub use config::{ApiConfig, Config, SyncConfig};
pub use error::{AppError, AppResult};
