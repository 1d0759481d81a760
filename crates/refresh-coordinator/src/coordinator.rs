//! Refresh state machine and pending-request queue
//!
//! The coordinator is `Idle` until a request comes back 401. That request
//! flips the state to `Refreshing` and leads the refresh exchange; any other
//! request rejected with 401 before the exchange settles is parked in a FIFO
//! queue as a one-shot receiver. When the exchange settles, the state returns
//! to `Idle` first, then every parked request is resumed (or rejected) in
//! arrival order with the same outcome.
//!
//! The state lives behind a `parking_lot::Mutex` that is never held across an
//! `.await`, so the idle-to-refreshing check-and-set cannot interleave with
//! another request. A `generation` counter, bumped by each successful refresh,
//! lets a 401 that raced an already-finished refresh replay right away instead
//! of starting another one.

use std::collections::VecDeque;
use std::sync::Arc;

use credentials::{
    CredentialStore, DEFAULT_REFRESH_PATH, RefreshRequest, parse_refresh_response,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use transport::{RawResponse, RequestDescriptor, Transport, TransportError};
use uuid::Uuid;

use crate::error::{Error, RefreshFailure, Result};
use crate::metrics;

/// Replays allowed per original request. A replay that is rejected again is
/// surfaced instead of refreshing twice.
pub const MAX_REPLAYS: u32 = 1;

/// Whether a refresh exchange is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// Result of one refresh exchange, shared by the leader and every queued request.
#[derive(Debug, Clone)]
enum RefreshOutcome {
    Refreshed,
    MissingRefreshSecret,
    Failed(RefreshFailure),
    Storage(credentials::Error),
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Refreshed => "refreshed",
            RefreshOutcome::MissingRefreshSecret => "missing_secret",
            RefreshOutcome::Failed(_) => "failed",
            RefreshOutcome::Storage(_) => "storage_error",
        }
    }

    /// What the request that led the refresh sees. Without a refresh secret
    /// the leader gets its own 401 back.
    fn for_leader(self, rejected: TransportError) -> Result<()> {
        match self {
            RefreshOutcome::Refreshed => Ok(()),
            RefreshOutcome::MissingRefreshSecret => Err(Error::Request(rejected)),
            RefreshOutcome::Failed(failure) => Err(Error::SessionExpired(failure)),
            RefreshOutcome::Storage(e) => Err(Error::Storage(e)),
        }
    }

    /// What a queued request sees: always the refresh result, never its own 401.
    fn for_waiter(self) -> Result<()> {
        match self {
            RefreshOutcome::Refreshed => Ok(()),
            RefreshOutcome::MissingRefreshSecret => {
                Err(Error::SessionExpired(RefreshFailure::missing_secret()))
            }
            RefreshOutcome::Failed(failure) => Err(Error::SessionExpired(failure)),
            RefreshOutcome::Storage(e) => Err(Error::Storage(e)),
        }
    }
}

/// A request suspended until the in-flight refresh settles.
struct PendingRequest {
    id: Uuid,
    resume: oneshot::Sender<RefreshOutcome>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    generation: u64,
    queue: VecDeque<PendingRequest>,
}

/// How a request rejected with 401 proceeds.
enum Role<'a> {
    /// A refresh finished after this request was sent; replay now.
    Replay,
    /// A refresh is in flight; wait for its outcome.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// No refresh is in flight; run one.
    Lead(RefreshSession<'a>),
}

/// Ownership of the `Refreshing` state.
///
/// Settling returns the state to `Idle` and releases the queue. If the session
/// is dropped unsettled (the leading future was cancelled or panicked), the
/// queue is rejected so no request stays suspended.
struct RefreshSession<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl RefreshSession<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        release(self.state, outcome);
    }
}

impl Drop for RefreshSession<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh abandoned before completing, rejecting queued requests");
            release(
                self.state,
                &RefreshOutcome::Failed(RefreshFailure::interrupted()),
            );
        }
    }
}

/// Reset to `Idle`, then hand `outcome` to every queued request in arrival order.
fn release(state: &Mutex<RefreshState>, outcome: &RefreshOutcome) {
    let waiters = {
        let mut state = state.lock();
        state.refreshing = false;
        if matches!(outcome, RefreshOutcome::Refreshed) {
            state.generation += 1;
        }
        std::mem::take(&mut state.queue)
    };
    metrics::set_queue_depth(0);

    debug!(
        waiters = waiters.len(),
        outcome = outcome.label(),
        "refresh settled, releasing queued requests"
    );
    for pending in waiters {
        if pending.resume.send(outcome.clone()).is_err() {
            debug!(request_id = %pending.id, "queued request was dropped before refresh settled");
        }
    }
}

/// Sends requests and coordinates credential refresh for one session.
///
/// Share it as `Arc<Coordinator>`; all state is owned by the instance.
pub struct Coordinator {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    refresh_path: String,
    state: Mutex<RefreshState>,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn Transport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Path of the refresh endpoint, relative to the transport's base URL.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn phase(&self) -> RefreshPhase {
        if self.state.lock().refreshing {
            RefreshPhase::Refreshing
        } else {
            RefreshPhase::Idle
        }
    }

    /// Requests currently suspended behind the refresh.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send `request`, refreshing the access credential at most once if the
    /// server rejects it.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<RawResponse> {
        let request_id = Uuid::new_v4();
        let mut request = request;

        loop {
            let sent_at = self.state.lock().generation;
            let rejected = match self.transport.send(&request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !rejected.is_unauthorized() || !request.requires_auth() {
                return Err(rejected.into());
            }

            if request.attempt() >= MAX_REPLAYS {
                warn!(
                    %request_id,
                    path = %request.path(),
                    attempt = request.attempt(),
                    "credential rejected again after refresh"
                );
                metrics::record_repeated_auth();
                return Err(rejected.into());
            }

            self.await_fresh_credential(request_id, sent_at, rejected)
                .await?;

            request = request.replay();
            metrics::record_replay();
            debug!(
                %request_id,
                method = %request.method(),
                path = %request.path(),
                attempt = request.attempt(),
                "replaying request with refreshed credential"
            );
        }
    }

    /// Decide this request's role and return once a fresh credential is stored.
    async fn await_fresh_credential(
        &self,
        request_id: Uuid,
        sent_at: u64,
        rejected: TransportError,
    ) -> Result<()> {
        let role = {
            let mut state = self.state.lock();
            if state.generation != sent_at {
                Role::Replay
            } else if state.refreshing {
                let (resume, wait) = oneshot::channel();
                state.queue.push_back(PendingRequest {
                    id: request_id,
                    resume,
                });
                metrics::set_queue_depth(state.queue.len());
                Role::Wait(wait)
            } else {
                state.refreshing = true;
                Role::Lead(RefreshSession {
                    state: &self.state,
                    settled: false,
                })
            }
        };

        match role {
            Role::Replay => {
                debug!(%request_id, "credential refreshed since request was sent");
                Ok(())
            }
            Role::Wait(wait) => {
                metrics::record_queued();
                debug!(%request_id, "refresh in progress, request suspended");
                let outcome = wait
                    .await
                    .unwrap_or_else(|_| RefreshOutcome::Failed(RefreshFailure::interrupted()));
                outcome.for_waiter()
            }
            Role::Lead(session) => {
                info!(%request_id, "access credential rejected, refreshing");
                let outcome = self.refresh_credentials().await;
                metrics::record_refresh(outcome.label());
                session.settle(&outcome);
                outcome.for_leader(rejected)
            }
        }
    }

    async fn refresh_credentials(&self) -> RefreshOutcome {
        match self.exchange().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "credential store failed during refresh");
                RefreshOutcome::Storage(e)
            }
        }
    }

    /// Trade the refresh secret for a new access secret and store the result.
    /// Every path that does not end in `Refreshed` clears the stored pair.
    async fn exchange(&self) -> credentials::Result<RefreshOutcome> {
        let Some(refresh) = self.credentials.refresh().await? else {
            warn!("no refresh secret stored, clearing session");
            self.credentials.clear().await?;
            return Ok(RefreshOutcome::MissingRefreshSecret);
        };

        let request = RequestDescriptor::post(&self.refresh_path)
            .json(RefreshRequest::new(refresh).to_json())
            .without_auth();

        let failure = match self.transport.send(&request).await {
            Ok(response) => match parse_refresh_response(response.status, &response.body) {
                Ok(tokens) => {
                    let rotated = tokens.refresh.is_some();
                    self.credentials.set_access(tokens.access).await?;
                    if let Some(refresh) = tokens.refresh {
                        self.credentials.set_refresh(refresh).await?;
                    }
                    info!(rotated, "refresh succeeded");
                    return Ok(RefreshOutcome::Refreshed);
                }
                Err(e) => RefreshFailure::new(None, e.to_string()),
            },
            Err(TransportError::Credentials(e)) => return Err(e),
            Err(e @ (TransportError::Timeout(_) | TransportError::Network(_))) => {
                RefreshFailure::unreachable(format!("refresh exchange failed: {e}"))
            }
            Err(e) => RefreshFailure::new(e.status(), format!("refresh exchange failed: {e}")),
        };

        warn!(
            status = ?failure.status,
            reason = %failure.reason,
            "refresh failed, clearing session"
        );
        self.credentials.clear().await?;
        Ok(RefreshOutcome::Failed(failure))
    }
}
