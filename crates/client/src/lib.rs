//! HTTP client for the masterplan REST backend.

pub mod classifications;
pub mod client;
pub mod projects;
pub mod tasks;

pub use client::{ApiClient, USER_ID_HEADER};
