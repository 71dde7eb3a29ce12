//! # Route Projection
//!
//! Maps a scalar progress distance onto a journey's route polyline.
//!
//! Landmarks split the route into brackets. Each landmark is anchored to a
//! (possibly fractional) route index: landmarks with coordinates snap to the
//! nearest route point, the rest are placed proportionally to their cumulative
//! distance. Within a bracket, progress is interpolated linearly between the
//! two anchors, and the resulting fractional index is turned into a position by
//! interpolating between the neighbouring route points.
//!
//! Projection never fails: empty routes yield no position and non-finite
//! intermediate values fall back to the nearest route point.

use crate::geo_utils::{lerp, planar_distance_sq};
use crate::{GpsPoint, Landmark, VirtualPosition};

/// Span used when two bracket boundaries share the same distance.
pub const DEFAULT_SEGMENT_EPSILON_M: f64 = 1e-6;

/// Result of projecting a progress distance onto a route.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projection {
    /// Point on the route, `None` only for an empty route
    pub position: Option<GpsPoint>,
    /// Fractional route index in `[0, len - 1]` (0 for an empty route)
    pub route_index: f64,
}

impl Projection {
    pub const EMPTY: Projection = Projection {
        position: None,
        route_index: 0.0,
    };

    pub fn virtual_position(&self) -> Option<VirtualPosition> {
        self.position.map(|p| VirtualPosition {
            latitude: p.latitude,
            longitude: p.longitude,
            route_index: self.route_index,
        })
    }
}

/// Project `progress_m` onto `route`.
///
/// `landmarks` must be sorted by `cumulative_distance_m`. Landmark anchors are
/// resolved on demand with a linear nearest-point scan; when projecting the
/// same route repeatedly, prefer [`crate::JourneyRoute::project`], which
/// resolves every anchor once.
///
/// Landmarks without a position anchor at their exact fractional index
/// `ratio * (len - 1)`; the rounded index comes only from
/// [`approximate_route_index`].
///
/// # Example
///
/// ```rust
/// use journey_progress::{GpsPoint, Landmark, projector};
///
/// let route = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
/// let landmarks = vec![Landmark::new("half", "Halfway", 500.0)];
///
/// let projection = projector::project(250.0, 1000.0, &route, &landmarks);
/// let position = projection.position.unwrap();
/// assert!((position.longitude - 0.25).abs() < 1e-9);
/// ```
pub fn project(
    progress_m: f64,
    route_total_m: f64,
    route: &[GpsPoint],
    landmarks: &[Landmark],
) -> Projection {
    project_with(
        progress_m,
        route_total_m,
        route,
        landmarks,
        DEFAULT_SEGMENT_EPSILON_M,
        |i| landmark_anchor(&landmarks[i], route, route_total_m),
    )
}

/// Core projection, with landmark anchors supplied by `anchor(landmark_index)`.
pub(crate) fn project_with<F>(
    progress_m: f64,
    route_total_m: f64,
    route: &[GpsPoint],
    landmarks: &[Landmark],
    epsilon_m: f64,
    anchor: F,
) -> Projection
where
    F: Fn(usize) -> f64,
{
    match route.len() {
        0 => return Projection::EMPTY,
        1 => {
            return Projection {
                position: Some(route[0]),
                route_index: 0.0,
            }
        }
        _ => {}
    }

    let last = (route.len() - 1) as f64;
    let progress_m = progress_m.max(0.0);

    let (start_m, start_idx, end_m, end_idx) = if landmarks.is_empty() {
        (0.0, 0.0, route_total_m, last)
    } else {
        let current = landmarks
            .iter()
            .position(|l| progress_m <= l.cumulative_distance_m)
            .unwrap_or(landmarks.len() - 1);
        if current == 0 {
            (0.0, 0.0, landmarks[0].cumulative_distance_m, anchor(0))
        } else {
            (
                landmarks[current - 1].cumulative_distance_m,
                anchor(current - 1),
                landmarks[current].cumulative_distance_m,
                anchor(current),
            )
        }
    };

    let span = end_m - start_m;
    let mut segment_ratio = (progress_m - start_m) / span.max(epsilon_m);
    if span <= 0.0 {
        segment_ratio = segment_ratio.clamp(0.0, 1.0);
    }

    let exact_index = (start_idx + (end_idx - start_idx) * segment_ratio).clamp(0.0, last);
    // NaN saturates to 0 here, and is caught by the ratio guard below
    let before = (exact_index.floor() as usize).min(route.len() - 1);
    let after = (before + 1).min(route.len() - 1);
    let ratio = exact_index - before as f64;

    match (route.get(before), route.get(after)) {
        (Some(a), Some(b)) if ratio.is_finite() => Projection {
            position: Some(lerp(a, b, ratio)),
            route_index: before as f64 + ratio,
        },
        (Some(a), _) => Projection {
            position: Some(*a),
            route_index: before as f64,
        },
        _ => Projection::EMPTY,
    }
}

/// Route index a landmark is pinned to.
///
/// Landmarks with coordinates snap to the nearest route point. Others are
/// placed at `cumulative_distance_m / route_total_m` of the way along the
/// route, kept fractional so interpolation stays continuous.
pub(crate) fn landmark_anchor(landmark: &Landmark, route: &[GpsPoint], route_total_m: f64) -> f64 {
    match landmark.position {
        Some(ref target) => nearest_route_index(target, route) as f64,
        None => proportional_index(landmark.cumulative_distance_m, route_total_m, route.len()),
    }
}

/// Fractional route index proportional to `distance_m / route_total_m`.
pub(crate) fn proportional_index(distance_m: f64, route_total_m: f64, route_len: usize) -> f64 {
    if route_len < 2 {
        return 0.0;
    }
    let last = (route_len - 1) as f64;
    let ratio = distance_m / route_total_m;
    if !ratio.is_finite() {
        return 0.0;
    }
    (ratio * last).clamp(0.0, last)
}

/// Approximate route index of a landmark that has no coordinates:
/// `round(distance_m / route_total_m * (route_len - 1))`, clamped to the route.
///
/// ```rust
/// use journey_progress::projector::approximate_route_index;
///
/// // Halfway along an 11-point route
/// assert_eq!(approximate_route_index(21_000.0, 42_000.0, 11), 5);
/// ```
pub fn approximate_route_index(distance_m: f64, route_total_m: f64, route_len: usize) -> usize {
    proportional_index(distance_m, route_total_m, route_len).round() as usize
}

/// Index of the route point closest to `target` in planar degree space.
///
/// Ties resolve to the earliest index. Returns 0 for an empty route.
pub fn nearest_route_index(target: &GpsPoint, route: &[GpsPoint]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, p) in route.iter().enumerate() {
        let d = planar_distance_sq(p, target);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}
