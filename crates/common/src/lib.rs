//! Types shared by every crate of the authenticated API access layer

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
