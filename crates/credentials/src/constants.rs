//! Refresh exchange and storage constants

/// Default path of the refresh endpoint, relative to the API base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// The only HTTP status (and envelope status) accepted from the refresh endpoint.
pub const REFRESH_SUCCESS_STATUS: u16 = 200;

/// Unix permissions for the credential file (owner read/write only).
pub const CREDENTIAL_FILE_MODE: u32 = 0o600;
