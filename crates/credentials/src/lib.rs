//! Credential storage and refresh wire types
//!
//! The access layer never caches credentials. Every outbound request reads the
//! access secret from a `CredentialStore`, and the refresh coordinator writes
//! the new pair back immediately after a successful refresh exchange.
//!
//! Credential flow:
//! 1. Login stores a pair via `CredentialStore::set_access` / `set_refresh`
//! 2. The transport reads `CredentialStore::access` for every authenticated request
//! 3. On 401 the coordinator reads `CredentialStore::refresh` and sends a `RefreshRequest`
//! 4. `parse_refresh_response` validates the reply and the new secrets are stored
//! 5. Any refresh failure ends in `CredentialStore::clear`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialPair, CredentialStore, FileCredentialStore, has_session};
pub use error::{Error, Result};
pub use memory::MemoryCredentialStore;
pub use token::{RefreshRequest, RefreshedTokens, parse_refresh_response};
