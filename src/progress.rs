//! Progress accumulation: server baseline plus the live session's distance.

use log::{debug, warn};

/// Snapshot of a user's progress on a journey.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressState {
    /// Server-confirmed progress in meters
    pub baseline_m: f64,
    /// Distance covered in the current session, not yet sent to the server
    pub session_delta_m: f64,
    /// `baseline_m + session_delta_m`
    pub total_m: f64,
    /// `total_m` as a percentage of the route, clamped to `[0, 100]`
    pub percent: f64,
}

/// Percentage of `total_route_distance_m` covered by `total_m`, clamped to `[0, 100]`.
pub fn percent_of(total_m: f64, total_route_distance_m: f64) -> f64 {
    if total_route_distance_m > 0.0 && total_m.is_finite() {
        (total_m / total_route_distance_m * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Combines the server baseline with live feed distance.
///
/// The feed reports cumulative distance for the current run. After the
/// session delta is committed (or discarded), the feed value at that moment
/// becomes the offset, so a feed that keeps reporting the same run is never
/// counted twice. The offset is dropped only at an explicit run boundary
/// ([`ProgressAccumulator::begin_run`]).
#[derive(Debug, Clone)]
pub struct ProgressAccumulator {
    total_route_distance_m: f64,
    baseline_m: f64,
    feed_delta_m: f64,
    feed_offset_m: f64,
    manual_delta_m: f64,
    ready: bool,
}

impl ProgressAccumulator {
    pub fn new(total_route_distance_m: f64) -> Self {
        Self {
            total_route_distance_m,
            baseline_m: 0.0,
            feed_delta_m: 0.0,
            feed_offset_m: 0.0,
            manual_delta_m: 0.0,
            ready: false,
        }
    }

    /// True once a baseline load attempt has finished, successfully or not.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn total_route_distance_m(&self) -> f64 {
        self.total_route_distance_m
    }

    pub fn baseline_m(&self) -> f64 {
        self.baseline_m
    }

    pub fn session_delta_m(&self) -> f64 {
        self.feed_delta_m + self.manual_delta_m
    }

    pub fn total_m(&self) -> f64 {
        self.baseline_m + self.session_delta_m()
    }

    pub fn state(&self) -> ProgressState {
        let total_m = self.total_m();
        ProgressState {
            baseline_m: self.baseline_m,
            session_delta_m: self.session_delta_m(),
            total_m,
            percent: percent_of(total_m, self.total_route_distance_m),
        }
    }

    /// Replace the baseline with an authoritative value.
    pub fn set_baseline(&mut self, baseline_m: f64) {
        if !baseline_m.is_finite() || baseline_m < 0.0 {
            warn!("[ProgressAccumulator] ignoring invalid baseline {}", baseline_m);
            return;
        }
        self.baseline_m = baseline_m;
    }

    /// Raise the baseline to `baseline_m` if that does not lower the total.
    ///
    /// Returns `false` when the value was not adopted.
    pub fn raise_baseline(&mut self, baseline_m: f64) -> bool {
        if !baseline_m.is_finite() || baseline_m < self.baseline_m {
            return false;
        }
        self.baseline_m = baseline_m;
        true
    }

    /// Apply a cumulative session distance reported by the feed.
    pub fn on_tick(&mut self, session_distance_km: f64) -> ProgressState {
        let feed_m = session_distance_km * 1000.0;
        if !feed_m.is_finite() || feed_m < 0.0 {
            warn!("[ProgressAccumulator] ignoring feed distance {} km", session_distance_km);
            return self.state();
        }
        self.feed_delta_m = self.feed_delta_m.max(feed_m - self.feed_offset_m);
        self.state()
    }

    /// Mark the start of a new run on the feed.
    ///
    /// Once the previous run is settled, the next run's readings count from
    /// zero. Feed distance still waiting to be sent means the run is ongoing,
    /// and the offset is kept.
    pub fn begin_run(&mut self) {
        if self.feed_delta_m > 0.0 {
            debug!(
                "[ProgressAccumulator] run boundary ignored, {:.0}m of feed distance unsent",
                self.feed_delta_m
            );
            return;
        }
        if self.feed_offset_m > 0.0 {
            debug!(
                "[ProgressAccumulator] new run, dropping feed offset {:.0}m",
                self.feed_offset_m
            );
        }
        self.feed_offset_m = 0.0;
    }

    /// Manual adjustment in meters, applied like a tick. Negative values are ignored.
    pub fn add_delta(&mut self, meters: f64) -> ProgressState {
        if meters.is_finite() && meters > 0.0 {
            self.manual_delta_m += meters;
        } else {
            debug!("[ProgressAccumulator] ignoring manual delta {}", meters);
        }
        self.state()
    }

    /// The server accepted the session delta: adopt its total and start a fresh delta.
    pub fn commit(&mut self, new_baseline_m: f64) {
        self.set_baseline(new_baseline_m);
        self.clear_session();
    }

    /// Drop the session delta without touching the baseline.
    pub fn clear_session(&mut self) {
        self.feed_offset_m += self.feed_delta_m;
        self.feed_delta_m = 0.0;
        self.manual_delta_m = 0.0;
    }
}
