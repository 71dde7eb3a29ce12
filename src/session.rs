//! A live journey session: feed ticks in, presentation snapshots out.
//!
//! ```text
//! load()  -> coordinator fetches baseline -> tracker seeded silently
//! tick()  -> accumulator -> projector -> tracker (fires listeners)
//! complete() -> coordinator sends delta, adopts server total
//! ```

use log::{debug, info};

use crate::error::SyncError;
use crate::landmarks::{LandmarkListener, LandmarkReachTracker, ListenerId};
use crate::projector::Projection;
use crate::route::JourneyRoute;
use crate::sync::{ProgressService, RemoteProgress, ServerSyncCoordinator, StartOutcome, SyncSession};
use crate::{GpsPoint, Landmark, ProgressState, VirtualPosition};

/// One reading of the external live-tracking feed. Never modified by this crate.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedSnapshot {
    pub is_running: bool,
    /// Cumulative distance of the current run, monotonic within a run
    pub distance_km: f64,
    pub elapsed_sec: f64,
    /// GPS fixes accumulated so far
    pub route: Vec<GpsPoint>,
}

/// Presentation-ready view of a journey session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JourneySnapshot {
    pub virtual_position: Option<VirtualPosition>,
    pub route_index: f64,
    pub progress_percent: f64,
    pub progress_m: f64,
    /// Reached landmark IDs in route order
    pub reached_landmark_ids: Vec<String>,
    pub next_landmark: Option<Landmark>,
    /// Meters left to `next_landmark`
    pub distance_to_next_m: Option<f64>,
    /// False until the first baseline load attempt finished
    pub ready: bool,
}

/// Owns everything needed to follow one user along one journey.
#[derive(Debug)]
pub struct JourneySession<S> {
    route: JourneyRoute,
    sync: ServerSyncCoordinator<S>,
    tracker: LandmarkReachTracker,
    projection_cache: Option<(f64, Projection)>,
    feed_running: bool,
}

impl<S: ProgressService> JourneySession<S> {
    pub fn new(route: JourneyRoute, session: SyncSession, service: S) -> Self {
        let total_distance_m = route.total_distance_m();
        Self {
            route,
            sync: ServerSyncCoordinator::new(service, session, total_distance_m),
            tracker: LandmarkReachTracker::new(),
            projection_cache: None,
            feed_running: false,
        }
    }

    pub fn route(&self) -> &JourneyRoute {
        &self.route
    }

    pub fn sync(&self) -> &ServerSyncCoordinator<S> {
        &self.sync
    }

    pub fn progress(&self) -> ProgressState {
        self.sync.state()
    }

    pub fn is_ready(&self) -> bool {
        self.sync.is_ready()
    }

    /// Register a landmark arrival listener.
    pub fn subscribe(&mut self, listener: LandmarkListener) -> ListenerId {
        self.tracker.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.tracker.unsubscribe(id)
    }

    /// Fetch the baseline and mark landmarks behind it as already reached.
    pub async fn load(&mut self) -> JourneySnapshot {
        self.sync.load().await;
        self.reseed();
        self.snapshot()
    }

    /// Start (or resume) the journey on the server.
    pub async fn start(&mut self) -> StartOutcome {
        let outcome = self.sync.start().await;
        self.reseed();
        outcome
    }

    /// Apply a feed reading. Distance only accumulates while the feed is running.
    ///
    /// The feed switching from idle to running marks a new run.
    pub fn tick(&mut self, feed: &FeedSnapshot) -> JourneySnapshot {
        if feed.is_running && !self.feed_running {
            self.sync.begin_run();
        }
        self.feed_running = feed.is_running;
        if feed.is_running {
            self.sync.record_distance_km(feed.distance_km);
        }
        self.advance()
    }

    /// Manual adjustment in meters, processed like a tick.
    pub fn add_delta(&mut self, meters: f64) -> JourneySnapshot {
        self.sync.add_delta(meters);
        self.advance()
    }

    /// Send the session's distance to the server. Errors keep the delta for a retry.
    pub async fn complete(&mut self) -> Result<Option<RemoteProgress>, SyncError> {
        let result = self.sync.progress().await?;
        if let Some(ref remote) = result {
            info!(
                "[JourneySession] {} completed run, journey at {:.1}%",
                self.sync.session().user_id,
                remote.percent
            );
            self.reseed();
        }
        Ok(result)
    }

    /// Re-fetch the server state. Landmarks behind a raised baseline are not announced.
    pub async fn refresh(&mut self) -> Option<RemoteProgress> {
        let remote = self.sync.refresh().await;
        self.reseed();
        remote
    }

    /// Discard the local session: delta, started flag and reached set.
    pub fn stop(&mut self) {
        debug!("[JourneySession] stopping {}", self.sync.session().journey_id);
        self.sync.stop();
        self.tracker.reset();
        self.projection_cache = None;
        self.feed_running = false;
        self.reseed();
    }

    /// Current view without applying any new distance.
    pub fn snapshot(&mut self) -> JourneySnapshot {
        let state = self.sync.state();
        let next = crate::landmarks::next_landmark(state.total_m, self.route.landmarks()).cloned();
        self.build_snapshot(state, next)
    }

    fn advance(&mut self) -> JourneySnapshot {
        let state = self.sync.state();
        let evaluation = self.tracker.update(state.total_m, self.route.landmarks());
        self.sync
            .set_next_landmark_distance(evaluation.next.as_ref().map(|l| l.cumulative_distance_m));
        self.build_snapshot(state, evaluation.next)
    }

    fn reseed(&mut self) {
        let total_m = self.sync.state().total_m;
        self.tracker.seed(total_m, self.route.landmarks());
        let next = crate::landmarks::next_landmark(total_m, self.route.landmarks());
        self.sync
            .set_next_landmark_distance(next.map(|l| l.cumulative_distance_m));
    }

    fn project(&mut self, progress_m: f64) -> Projection {
        match self.projection_cache {
            Some((cached_m, projection)) if cached_m == progress_m => projection,
            _ => {
                let projection = self.route.project(progress_m);
                self.projection_cache = Some((progress_m, projection));
                projection
            }
        }
    }

    fn build_snapshot(&mut self, state: ProgressState, next: Option<Landmark>) -> JourneySnapshot {
        let projection = self.project(state.total_m);
        let reached_landmark_ids = self
            .route
            .landmarks()
            .iter()
            .filter(|l| self.tracker.is_reached(&l.id))
            .map(|l| l.id.clone())
            .collect();

        JourneySnapshot {
            virtual_position: projection.virtual_position(),
            route_index: projection.route_index,
            progress_percent: state.percent,
            progress_m: state.total_m,
            reached_landmark_ids,
            distance_to_next_m: next
                .as_ref()
                .map(|l| l.cumulative_distance_m - state.total_m),
            next_landmark: next,
            ready: self.sync.is_ready(),
        }
    }
}
