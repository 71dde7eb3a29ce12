//! Reconciliation of local progress with the remote progress service.
//!
//! A [`ServerSyncCoordinator`] owns one [`SyncSession`] and the
//! [`ProgressAccumulator`] for a single (user, journey) pair. Network calls
//! happen only at lifecycle boundaries: load, start, completion and manual
//! refresh. Ticks never touch the network.
//!
//! ```text
//! IDLE --start()--> STARTING --(started | conflict absorbed | offline)--> ACTIVE
//! ACTIVE --progress()--> COMPLETING --ok--> IDLE
//!                                   --err--> ACTIVE (delta kept for retry)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::error::SyncError;
use crate::progress::{ProgressAccumulator, ProgressState};

/// Progress as reported by the remote service.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteProgress {
    pub progress_m: f64,
    pub percent: f64,
    pub message: Option<String>,
}

/// The remote progress service.
#[async_trait]
pub trait ProgressService: Send + Sync {
    /// Start a journey. Fails with [`SyncError::Conflict`] if it was already started.
    async fn start(&self, user_id: &str, journey_id: &str) -> Result<RemoteProgress, SyncError>;

    /// Read the current progress without modifying it.
    async fn get_state(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        next_landmark_distance_m: Option<f64>,
    ) -> Result<RemoteProgress, SyncError>;

    /// Add `delta_m` to the stored progress.
    async fn progress(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        delta_m: f64,
    ) -> Result<RemoteProgress, SyncError>;
}

#[async_trait]
impl<T: ProgressService + ?Sized> ProgressService for Arc<T> {
    async fn start(&self, user_id: &str, journey_id: &str) -> Result<RemoteProgress, SyncError> {
        (**self).start(user_id, journey_id).await
    }

    async fn get_state(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        next_landmark_distance_m: Option<f64>,
    ) -> Result<RemoteProgress, SyncError> {
        (**self)
            .get_state(user_id, journey_id, total_distance_m, next_landmark_distance_m)
            .await
    }

    async fn progress(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        delta_m: f64,
    ) -> Result<RemoteProgress, SyncError> {
        (**self)
            .progress(user_id, journey_id, total_distance_m, delta_m)
            .await
    }
}

/// Identity of a sync session and its re-entrancy guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    pub journey_id: String,
    pub user_id: String,
    /// Set when `start()` begins; cleared by a successful completion or `stop()`
    pub started: bool,
}

impl SyncSession {
    pub fn new(journey_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            user_id: user_id.into(),
            started: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Starting,
    Active,
    Completing,
}

/// How a `start()` call resolved. Every variant except `Suppressed` ends ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The service started the journey.
    Started,
    /// The journey was already started; the conflict was absorbed.
    Resumed,
    /// The start call failed; the session continues on the local baseline.
    Offline,
    /// A session was already started; nothing was sent.
    Suppressed,
}

/// Orchestrates start/progress/refresh for one (user, journey) pair.
#[derive(Debug)]
pub struct ServerSyncCoordinator<S> {
    service: S,
    session: SyncSession,
    phase: SyncPhase,
    progress: ProgressAccumulator,
    next_landmark_m: Option<f64>,
}

impl<S: ProgressService> ServerSyncCoordinator<S> {
    pub fn new(service: S, session: SyncSession, total_route_distance_m: f64) -> Self {
        Self {
            service,
            session,
            phase: SyncPhase::Idle,
            progress: ProgressAccumulator::new(total_route_distance_m),
            next_landmark_m: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn accumulator(&self) -> &ProgressAccumulator {
        &self.progress
    }

    pub fn state(&self) -> ProgressState {
        self.progress.state()
    }

    pub fn is_ready(&self) -> bool {
        self.progress.is_ready()
    }

    /// Distance of the next landmark ahead, sent along with state queries.
    pub fn set_next_landmark_distance(&mut self, distance_m: Option<f64>) {
        self.next_landmark_m = distance_m;
    }

    /// Apply the feed's cumulative session distance.
    pub fn record_distance_km(&mut self, session_distance_km: f64) -> ProgressState {
        self.progress.on_tick(session_distance_km)
    }

    /// A new run started on the feed.
    pub fn begin_run(&mut self) {
        self.progress.begin_run();
    }

    /// Manual adjustment in meters.
    pub fn add_delta(&mut self, meters: f64) -> ProgressState {
        self.progress.add_delta(meters)
    }

    /// Fetch the baseline. Falls back to 0 on failure; always leaves the
    /// coordinator ready.
    pub async fn load(&mut self) -> f64 {
        let baseline_m = match self.fetch_state().await {
            Ok(remote) => {
                info!(
                    "[JourneySync] loaded baseline {:.0}m ({:.1}%) for {}/{}",
                    remote.progress_m, remote.percent, self.session.user_id, self.session.journey_id
                );
                remote.progress_m
            }
            Err(e) => {
                warn!(
                    "[JourneySync] baseline load failed for {}/{}: {}; starting from 0",
                    self.session.user_id, self.session.journey_id, e
                );
                0.0
            }
        };
        self.progress.set_baseline(baseline_m);
        self.progress.mark_ready();
        self.progress.baseline_m()
    }

    /// Start the journey on the server, absorbing "already started" conflicts,
    /// then re-fetch the authoritative state.
    pub async fn start(&mut self) -> StartOutcome {
        if self.session.started {
            debug!(
                "[JourneySync] start suppressed, session already started ({:?})",
                self.phase
            );
            return StartOutcome::Suppressed;
        }
        self.session.started = true;
        self.phase = SyncPhase::Starting;
        self.progress.begin_run();

        let result = self
            .service
            .start(&self.session.user_id, &self.session.journey_id)
            .await;

        let outcome = match result {
            Ok(remote) => {
                info!(
                    "[JourneySync] started {} for {} at {:.0}m",
                    self.session.journey_id, self.session.user_id, remote.progress_m
                );
                self.reconcile(remote.progress_m);
                StartOutcome::Started
            }
            Err(e) if e.is_conflict() => {
                info!("[JourneySync] {}; resuming", e);
                StartOutcome::Resumed
            }
            Err(e) => {
                warn!("[JourneySync] start failed: {}; continuing offline", e);
                StartOutcome::Offline
            }
        };

        match self.fetch_state().await {
            Ok(remote) => self.reconcile(remote.progress_m),
            Err(e) => warn!(
                "[JourneySync] state re-fetch after start failed: {}; keeping {:.0}m",
                e,
                self.progress.baseline_m()
            ),
        }

        self.progress.mark_ready();
        self.phase = SyncPhase::Active;
        outcome
    }

    /// Send the session delta. The server's response becomes the new baseline.
    ///
    /// Returns `Ok(None)` when no session is active. On error the delta is kept
    /// so the call can be retried.
    pub async fn progress(&mut self) -> Result<Option<RemoteProgress>, SyncError> {
        if !self.session.started {
            debug!("[JourneySync] progress skipped, no active session");
            return Ok(None);
        }

        let delta_m = self.progress.session_delta_m();
        self.phase = SyncPhase::Completing;

        let result = self
            .service
            .progress(
                &self.session.user_id,
                &self.session.journey_id,
                self.progress.total_route_distance_m(),
                delta_m,
            )
            .await;

        match result {
            Ok(remote) => {
                info!(
                    "[JourneySync] recorded {:.0}m, progress now {:.0}m ({:.1}%)",
                    delta_m, remote.progress_m, remote.percent
                );
                self.progress.commit(remote.progress_m);
                self.session.started = false;
                self.phase = SyncPhase::Idle;
                Ok(Some(remote))
            }
            Err(e) => {
                warn!(
                    "[JourneySync] failed to record {:.0}m: {} (retryable: {})",
                    delta_m,
                    e,
                    e.is_retryable()
                );
                self.phase = SyncPhase::Active;
                Err(e)
            }
        }
    }

    /// Re-fetch the server state without modifying it. Failures are logged.
    pub async fn refresh(&mut self) -> Option<RemoteProgress> {
        let result = self.fetch_state().await;
        self.progress.mark_ready();
        match result {
            Ok(remote) => {
                self.reconcile(remote.progress_m);
                Some(remote)
            }
            Err(e) => {
                warn!("[JourneySync] refresh failed: {}", e);
                None
            }
        }
    }

    /// Tear down the local session. The server baseline is untouched.
    pub fn stop(&mut self) {
        self.progress.clear_session();
        self.session.started = false;
        self.phase = SyncPhase::Idle;
    }

    async fn fetch_state(&self) -> Result<RemoteProgress, SyncError> {
        self.service
            .get_state(
                &self.session.user_id,
                &self.session.journey_id,
                self.progress.total_route_distance_m(),
                self.next_landmark_m,
            )
            .await
    }

    /// Adopt a server value. While a session is active the total is never lowered.
    fn reconcile(&mut self, server_m: f64) {
        if self.phase != SyncPhase::Active {
            self.progress.set_baseline(server_m);
        } else if !self.progress.raise_baseline(server_m) {
            warn!(
                "[JourneySync] server reports {:.0}m below local baseline {:.0}m; keeping local",
                server_m,
                self.progress.baseline_m()
            );
        }
    }
}
