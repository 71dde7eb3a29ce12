//! Validated journey route with landmark anchors resolved up front.

use log::debug;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::error::ValidationError;
use crate::projector::{self, Projection};
use crate::{geo_utils, GpsPoint, Landmark, ProgressConfig};

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// An immutable journey: route polyline, landmarks and total distance.
///
/// Each landmark's route index is computed once here, so projecting a
/// progress value costs a bracket lookup and one interpolation.
#[derive(Debug, Clone)]
pub struct JourneyRoute {
    points: Vec<GpsPoint>,
    landmarks: Vec<Landmark>,
    total_distance_m: f64,
    anchors: Vec<f64>,
    segment_epsilon_m: f64,
}

impl JourneyRoute {
    /// Build a journey route.
    ///
    /// When `total_distance_m` is `None` it is measured from the route
    /// (haversine polyline length).
    pub fn new(
        points: Vec<GpsPoint>,
        landmarks: Vec<Landmark>,
        total_distance_m: Option<f64>,
        config: &ProgressConfig,
    ) -> Result<Self, ValidationError> {
        validate_points(&points)?;
        validate_landmarks(&landmarks)?;

        let total_distance_m = match total_distance_m {
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => return Err(ValidationError::InvalidTotalDistance(d)),
            None => geo_utils::polyline_length(&points),
        };

        let anchors = resolve_anchors(&points, &landmarks, total_distance_m, config);

        debug!(
            "[JourneyRoute] {} points, {} landmarks, {:.0}m",
            points.len(),
            landmarks.len(),
            total_distance_m
        );

        Ok(Self {
            points,
            landmarks,
            total_distance_m,
            anchors,
            segment_epsilon_m: config.segment_epsilon_m,
        })
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Route index each landmark is pinned to, in landmark order.
    pub fn landmark_anchors(&self) -> &[f64] {
        &self.anchors
    }

    /// Project `progress_m` onto the route.
    pub fn project(&self, progress_m: f64) -> Projection {
        projector::project_with(
            progress_m,
            self.total_distance_m,
            &self.points,
            &self.landmarks,
            self.segment_epsilon_m,
            |i| self.anchors[i],
        )
    }
}

fn validate_points(points: &[GpsPoint]) -> Result<(), ValidationError> {
    match points.iter().position(|p| !p.is_valid()) {
        Some(index) => Err(ValidationError::InvalidPoint {
            index,
            latitude: points[index].latitude,
            longitude: points[index].longitude,
        }),
        None => Ok(()),
    }
}

fn validate_landmarks(landmarks: &[Landmark]) -> Result<(), ValidationError> {
    let mut previous_m = 0.0;
    for landmark in landmarks {
        let distance_m = landmark.cumulative_distance_m;
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(ValidationError::InvalidLandmarkDistance {
                id: landmark.id.clone(),
                distance_m,
            });
        }
        if distance_m < previous_m {
            return Err(ValidationError::LandmarkOrder {
                id: landmark.id.clone(),
                distance_m,
                previous_m,
            });
        }
        if let Some(p) = landmark.position.filter(|p| !p.is_valid()) {
            return Err(ValidationError::InvalidLandmarkPosition {
                id: landmark.id.clone(),
                latitude: p.latitude,
                longitude: p.longitude,
            });
        }
        previous_m = distance_m;
    }
    Ok(())
}

fn resolve_anchors(
    points: &[GpsPoint],
    landmarks: &[Landmark],
    total_distance_m: f64,
    config: &ProgressConfig,
) -> Vec<f64> {
    let needs_lookup = landmarks.iter().any(|l| l.position.is_some());
    let tree = if needs_lookup && points.len() >= config.spatial_index_min_points as usize {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.latitude, p.longitude], i))
            .collect();
        Some(RTree::bulk_load(indexed))
    } else {
        None
    };

    landmarks
        .iter()
        .map(|landmark| match (&landmark.position, &tree) {
            (Some(target), Some(tree)) => tree
                .nearest_neighbor(&[target.latitude, target.longitude])
                .map(|nearest| nearest.data as f64)
                .unwrap_or(0.0),
            _ => projector::landmark_anchor(landmark, points, total_distance_m),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn long_route(n: usize) -> Vec<GpsPoint> {
        // Gentle curve so nearest-point lookups are unambiguous
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.001;
                GpsPoint::new(42.0 + t, -8.0 + t * t)
            })
            .collect()
    }

    #[test]
    fn test_total_distance_measured_when_missing() {
        let points = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0)];
        let journey =
            JourneyRoute::new(points.clone(), vec![], None, &ProgressConfig::default()).unwrap();
        assert!(approx_eq(
            journey.total_distance_m(),
            geo_utils::polyline_length(&points),
            1e-6
        ));
    }

    #[test]
    fn test_rejects_unordered_landmarks() {
        let landmarks = vec![Landmark::new("a", "A", 300.0), Landmark::new("b", "B", 100.0)];
        let err = JourneyRoute::new(vec![], landmarks, Some(1000.0), &ProgressConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::LandmarkOrder {
                id: "b".into(),
                distance_m: 100.0,
                previous_m: 300.0
            }
        );
    }

    #[test]
    fn test_rejects_invalid_input() {
        let config = ProgressConfig::default();
        let bad_point = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(95.0, 0.0)];
        assert!(matches!(
            JourneyRoute::new(bad_point, vec![], Some(1.0), &config),
            Err(ValidationError::InvalidPoint { index: 1, .. })
        ));

        let bad_distance = vec![Landmark::new("a", "A", f64::NAN)];
        assert!(matches!(
            JourneyRoute::new(vec![], bad_distance, Some(1.0), &config),
            Err(ValidationError::InvalidLandmarkDistance { .. })
        ));

        assert_eq!(
            JourneyRoute::new(vec![], vec![], Some(-5.0), &config).unwrap_err(),
            ValidationError::InvalidTotalDistance(-5.0)
        );
    }

    #[test]
    fn test_anchor_without_position_is_proportional() {
        let points: Vec<GpsPoint> = (0..11).map(|i| GpsPoint::new(0.0, i as f64 * 0.01)).collect();
        let landmarks = vec![Landmark::new("mid", "Midpoint", 500.0)];
        let journey =
            JourneyRoute::new(points, landmarks, Some(1000.0), &ProgressConfig::default()).unwrap();
        assert_eq!(journey.landmark_anchors(), &[5.0]);
    }

    #[test]
    fn test_spatial_index_matches_linear_scan() {
        let points = long_route(200);
        let landmarks = vec![
            Landmark::new("a", "A", 1000.0).with_position(GpsPoint::new(42.0501, -7.9975)),
            Landmark::new("b", "B", 5000.0).with_position(GpsPoint::new(42.1702, -7.9711)),
        ];
        let indexed = JourneyRoute::new(
            points.clone(),
            landmarks.clone(),
            Some(20_000.0),
            &ProgressConfig::default(),
        )
        .unwrap();
        let linear_config = ProgressConfig {
            spatial_index_min_points: u32::MAX,
            ..ProgressConfig::default()
        };
        let linear =
            JourneyRoute::new(points, landmarks, Some(20_000.0), &linear_config).unwrap();

        assert_eq!(indexed.landmark_anchors(), linear.landmark_anchors());
        assert_eq!(indexed.landmark_anchors(), &[50.0, 170.0]);
    }

    #[test]
    fn test_project_matches_free_function() {
        let points = long_route(100);
        let landmarks = vec![
            Landmark::new("a", "A", 3000.0),
            Landmark::new("b", "B", 7000.0).with_position(GpsPoint::new(42.07, -7.9951)),
        ];
        let journey = JourneyRoute::new(
            points.clone(),
            landmarks.clone(),
            Some(10_000.0),
            &ProgressConfig::default(),
        )
        .unwrap();

        for progress in [0.0, 1500.0, 3000.0, 5200.0, 7000.0, 9999.0, 12_000.0] {
            assert_eq!(
                journey.project(progress),
                projector::project(progress, 10_000.0, &points, &landmarks)
            );
        }
    }
}
