//! Authenticated API client
//!
//! Ties the credential store, transport, and refresh coordinator together
//! behind `ApiClient`, which returns every outcome as an `ApiResponse`
//! envelope.

pub mod client;
pub mod config;
pub mod envelope;

pub use client::{ApiClient, STATUS_CHECK_TIMEOUT};
pub use config::Config;
pub use envelope::{ApiResponse, NETWORK_ERROR_MESSAGE, NETWORK_ERROR_STATUS};
