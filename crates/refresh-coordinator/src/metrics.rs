//! Refresh coordination metrics
//!
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_requests_queued_total` (counter)
//! - `session_replays_total` (counter)
//! - `session_repeated_auth_total` (counter)
//! - `session_refresh_queue_depth` (gauge)
//!
//! No recorder is installed here; without one every call is a no-op.

/// Record a settled refresh exchange.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request suspended behind an in-flight refresh.
pub fn record_queued() {
    metrics::counter!("session_requests_queued_total").increment(1);
}

/// Record a request replayed after a refresh.
pub fn record_replay() {
    metrics::counter!("session_replays_total").increment(1);
}

/// Record a replay rejected with 401 again.
pub fn record_repeated_auth() {
    metrics::counter!("session_repeated_auth_total").increment(1);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("session_refresh_queue_depth").set(depth as f64);
}
