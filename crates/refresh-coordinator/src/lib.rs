//! Single-flight credential refresh for authenticated requests
//!
//! The coordinator sends every request through a `Transport` and owns the
//! decision of what a 401 means. Exactly one refresh exchange runs at a time;
//! requests rejected while it runs are suspended and resumed together once it
//! settles.
//!
//! Request lifecycle:
//! 1. Caller hands a `RequestDescriptor` to `Coordinator::execute`
//! 2. Non-401 outcomes are returned unchanged
//! 3. First 401 while idle → this request leads a refresh (`Refreshing`)
//! 4. 401 while refreshing → request is queued behind the leader
//! 5. Refresh succeeds → queue resumed in arrival order, every request replayed once
//! 6. Refresh fails → credentials cleared, leader and queue rejected with the failure
//! 7. 401 on a replay → surfaced to the caller, never a second refresh

pub mod coordinator;
pub mod error;
pub mod metrics;

pub use coordinator::{Coordinator, MAX_REPLAYS, RefreshPhase};
pub use error::{Error, RefreshFailure, Result};
