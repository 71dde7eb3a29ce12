//! # Journey Progress
//!
//! Tracks a runner's progress along a long-distance virtual journey.
//!
//! This library provides:
//! - Projection of accumulated distance onto the journey's reference route
//! - One-shot landmark arrival events
//! - Progress accumulation on top of a server-confirmed baseline
//! - Reconciliation against a remote progress service
//!
//! ## Features
//!
//! - **`serde`** - Serialize/deserialize the public value types
//! - **`http`** - Enable the reqwest-backed progress service client
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use journey_progress::{GpsPoint, JourneyRoute, Landmark, ProgressConfig};
//!
//! let route = vec![
//!     GpsPoint::new(0.0, 0.0),
//!     GpsPoint::new(0.0, 0.5),
//!     GpsPoint::new(0.0, 1.0),
//! ];
//! let landmarks = vec![Landmark::new("bridge", "Old Bridge", 500.0)];
//!
//! let journey = JourneyRoute::new(route, landmarks, Some(1000.0), &ProgressConfig::default())
//!     .expect("valid journey");
//!
//! let projection = journey.project(250.0);
//! assert!(projection.position.is_some());
//! assert!((projection.route_index - 0.5).abs() < 1e-9);
//! ```

// Geometry helpers
pub mod geo_utils;

pub mod error;
pub use error::{SyncError, ValidationError};

// Progress distance -> point on the route
pub mod projector;
pub use projector::{approximate_route_index, project, Projection};

pub mod route;
pub use route::JourneyRoute;

// Landmark arrival tracking
pub mod landmarks;
pub use landmarks::{
    evaluate, LandmarkEvaluation, LandmarkListener, LandmarkReachTracker, LandmarkReached,
    ListenerId,
};

pub mod progress;
pub use progress::{ProgressAccumulator, ProgressState};

// Remote reconciliation
pub mod sync;
pub use sync::{
    ProgressService, RemoteProgress, ServerSyncCoordinator, StartOutcome, SyncPhase, SyncSession,
};

// In-memory service for offline runs and tests
pub mod memory;
pub use memory::{InMemoryProgressService, ServiceOperation};

pub mod session;
pub use session::{FeedSnapshot, JourneySession, JourneySnapshot};

// HTTP client for the progress service
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpProgressService};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("JourneyProgressRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use journey_progress::GpsPoint;
/// let point = GpsPoint::new(42.8805, -8.5457); // Santiago de Compostela
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A named point of interest at a fixed distance along a journey.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Landmark {
    pub id: String,
    pub name: String,
    /// Distance along the route in meters; non-decreasing across a journey's landmarks
    pub cumulative_distance_m: f64,
    /// Physical location, when known. Used to pin the landmark onto the route.
    pub position: Option<GpsPoint>,
}

impl Landmark {
    pub fn new(id: impl Into<String>, name: impl Into<String>, cumulative_distance_m: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cumulative_distance_m,
            position: None,
        }
    }

    pub fn with_position(mut self, position: GpsPoint) -> Self {
        self.position = Some(position);
        self
    }
}

/// The point on the reference route matching a user's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Fractional index into the route, in `[0, len - 1]`
    pub route_index: f64,
}

/// Configuration for projection and route indexing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ProgressConfig {
    /// Minimum span (meters) used when two bracket boundaries coincide.
    /// Default: 1e-6
    pub segment_epsilon_m: f64,

    /// Routes with at least this many points resolve landmark coordinates through
    /// an R-tree instead of a linear scan.
    /// Default: 64
    pub spatial_index_min_points: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            segment_epsilon_m: projector::DEFAULT_SEGMENT_EPSILON_M,
            spatial_index_min_points: 64,
        }
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::debug;
    use std::collections::HashSet;

    /// Landmark evaluation with the reached set flattened for foreign callers.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiLandmarkEvaluation {
        /// Reached landmark IDs, in route order
        pub reached: Vec<String>,
        pub newly_reached: Vec<Landmark>,
        pub next: Option<Landmark>,
    }

    /// Project a progress distance onto a route.
    #[uniffi::export]
    pub fn ffi_project_route(
        progress_m: f64,
        route_total_m: f64,
        route: Vec<GpsPoint>,
        landmarks: Vec<Landmark>,
    ) -> Projection {
        init_logging();
        debug!(
            "[JourneyProgressRust] 🦀 project {:.0}m on {} points / {} landmarks",
            progress_m,
            route.len(),
            landmarks.len()
        );
        project(progress_m, route_total_m, &route, &landmarks)
    }

    /// Evaluate which landmarks are reached at `total_m`.
    #[uniffi::export]
    pub fn ffi_evaluate_landmarks(
        total_m: f64,
        landmarks: Vec<Landmark>,
        previously_reached: Vec<String>,
    ) -> FfiLandmarkEvaluation {
        init_logging();
        let previous: HashSet<String> = previously_reached.into_iter().collect();
        let evaluation = evaluate(total_m, &landmarks, &previous);
        let mut reached: Vec<String> = landmarks
            .iter()
            .filter(|l| evaluation.reached.contains(&l.id))
            .map(|l| l.id.clone())
            .collect();
        // IDs only known from `previously_reached` keep their place at the end
        let mut extra: Vec<String> = evaluation
            .reached
            .iter()
            .filter(|id| !landmarks.iter().any(|l| &l.id == *id))
            .cloned()
            .collect();
        extra.sort();
        reached.extend(extra);

        FfiLandmarkEvaluation {
            reached,
            newly_reached: evaluation.newly_reached,
            next: evaluation.next,
        }
    }

    /// Approximate route index for a landmark without coordinates.
    #[uniffi::export]
    pub fn ffi_approximate_route_index(distance_m: f64, route_total_m: f64, route_len: u32) -> u32 {
        approximate_route_index(distance_m, route_total_m, route_len as usize) as u32
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_progress_config() -> ProgressConfig {
        init_logging();
        ProgressConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
