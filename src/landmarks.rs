//! Landmark arrival tracking.
//!
//! A landmark is reached once total progress is at or beyond its cumulative
//! distance. [`evaluate`] is the pure rule; [`LandmarkReachTracker`] keeps the
//! reached set for a session and announces each newly crossed landmark to its
//! registered listeners exactly once.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use crate::Landmark;

/// Outcome of evaluating progress against a landmark list.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkEvaluation {
    /// Every landmark reached so far, including previously reached ones
    pub reached: HashSet<String>,
    /// Landmarks reached now that were not in the previous set, in route order
    pub newly_reached: Vec<Landmark>,
    /// First landmark still ahead, `None` once the journey is fully traversed
    pub next: Option<Landmark>,
}

/// Event delivered to listeners when a landmark is crossed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LandmarkReached {
    pub id: String,
    pub name: String,
    pub cumulative_distance_m: f64,
}

impl From<&Landmark> for LandmarkReached {
    fn from(landmark: &Landmark) -> Self {
        Self {
            id: landmark.id.clone(),
            name: landmark.name.clone(),
            cumulative_distance_m: landmark.cumulative_distance_m,
        }
    }
}

/// Landmark listener type
pub type LandmarkListener = Arc<dyn Fn(&LandmarkReached) + Send + Sync>;

/// Handle returned by [`LandmarkReachTracker::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Evaluate which landmarks are reached at `total_m`.
///
/// `landmarks` are expected in route order. IDs in `previously_reached` are
/// kept even if `total_m` is below their distance.
///
/// # Example
///
/// ```rust
/// use std::collections::HashSet;
/// use journey_progress::{evaluate, Landmark};
///
/// let landmarks = vec![
///     Landmark::new("a", "Fountain", 500.0),
///     Landmark::new("b", "Tower", 1500.0),
/// ];
///
/// let result = evaluate(600.0, &landmarks, &HashSet::new());
/// assert_eq!(result.newly_reached.len(), 1);
/// assert_eq!(result.next.map(|l| l.id), Some("b".to_string()));
/// ```
pub fn evaluate(
    total_m: f64,
    landmarks: &[Landmark],
    previously_reached: &HashSet<String>,
) -> LandmarkEvaluation {
    let mut reached = previously_reached.clone();
    let newly_reached = absorb(&mut reached, total_m, landmarks);
    LandmarkEvaluation {
        reached,
        newly_reached,
        next: next_landmark(total_m, landmarks).cloned(),
    }
}

/// First landmark strictly beyond `total_m`.
pub fn next_landmark(total_m: f64, landmarks: &[Landmark]) -> Option<&Landmark> {
    landmarks.iter().find(|l| l.cumulative_distance_m > total_m)
}

fn absorb(reached: &mut HashSet<String>, total_m: f64, landmarks: &[Landmark]) -> Vec<Landmark> {
    landmarks
        .iter()
        .filter(|l| total_m >= l.cumulative_distance_m)
        .filter(|l| reached.insert(l.id.clone()))
        .cloned()
        .collect()
}

/// Per-session reached set plus listener registry.
#[derive(Default)]
pub struct LandmarkReachTracker {
    reached: HashSet<String>,
    listeners: Vec<(ListenerId, LandmarkListener)>,
    next_listener_id: u64,
}

impl std::fmt::Debug for LandmarkReachTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandmarkReachTracker")
            .field("reached", &self.reached)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LandmarkReachTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for landmark arrivals.
    pub fn subscribe(&mut self, listener: LandmarkListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Mark everything behind `total_m` as reached without notifying anyone.
    ///
    /// Used when a baseline is loaded or reconciled, so landmarks passed in
    /// earlier sessions are not announced again.
    pub fn seed(&mut self, total_m: f64, landmarks: &[Landmark]) {
        let absorbed = absorb(&mut self.reached, total_m, landmarks);
        if !absorbed.is_empty() {
            debug!(
                "[LandmarkReachTracker] seeded {} landmarks behind {:.0}m",
                absorbed.len(),
                total_m
            );
        }
    }

    /// Evaluate live progress and notify listeners of each newly crossed landmark.
    pub fn update(&mut self, total_m: f64, landmarks: &[Landmark]) -> LandmarkEvaluation {
        let newly_reached = absorb(&mut self.reached, total_m, landmarks);

        for landmark in &newly_reached {
            info!(
                "[LandmarkReachTracker] reached {} ({}) at {:.0}m",
                landmark.name, landmark.id, total_m
            );
            let event = LandmarkReached::from(landmark);
            for (_, listener) in &self.listeners {
                listener(&event);
            }
        }

        LandmarkEvaluation {
            reached: self.reached.clone(),
            newly_reached,
            next: next_landmark(total_m, landmarks).cloned(),
        }
    }

    pub fn reached(&self) -> &HashSet<String> {
        &self.reached
    }

    pub fn is_reached(&self, id: &str) -> bool {
        self.reached.contains(id)
    }

    /// Forget the reached set. Listeners stay registered.
    pub fn reset(&mut self) {
        self.reached.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn camino() -> Vec<Landmark> {
        vec![
            Landmark::new("sjpp", "Saint-Jean-Pied-de-Port", 0.0),
            Landmark::new("pamplona", "Pamplona", 500.0),
            Landmark::new("burgos", "Burgos", 1500.0),
            Landmark::new("leon", "León", 3000.0),
        ]
    }

    fn recorder(tracker: &mut LandmarkReachTracker) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tracker.subscribe(Arc::new(move |event: &LandmarkReached| {
            sink.lock().unwrap().push(event.id.clone());
        }));
        seen
    }

    #[test]
    fn test_next_is_first_landmark_beyond_progress() {
        let landmarks = camino();
        for (progress, expected) in [
            (-1.0, Some("sjpp")),
            (0.0, Some("pamplona")),
            (499.9, Some("pamplona")),
            (500.0, Some("burgos")),
            (2999.0, Some("leon")),
            (3000.0, None),
        ] {
            let next = evaluate(progress, &landmarks, &HashSet::new()).next;
            assert_eq!(next.map(|l| l.id).as_deref(), expected, "at {}m", progress);
        }
    }

    #[test]
    fn test_reached_is_inclusive_of_landmark_distance() {
        let result = evaluate(500.0, &camino(), &HashSet::new());
        assert!(result.reached.contains("sjpp"));
        assert!(result.reached.contains("pamplona"));
        assert!(!result.reached.contains("burgos"));
    }

    #[test]
    fn test_previously_reached_are_not_new() {
        let previous: HashSet<String> = ["sjpp".to_string(), "pamplona".to_string()].into();
        let result = evaluate(1600.0, &camino(), &previous);
        let new_ids: Vec<_> = result.newly_reached.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(new_ids, vec!["burgos"]);
        assert_eq!(result.reached.len(), 3);
    }

    #[test]
    fn test_crossing_fires_once() {
        let landmarks = vec![Landmark::new("lm0", "Fountain", 500.0)];
        let mut tracker = LandmarkReachTracker::new();
        let seen = recorder(&mut tracker);

        tracker.seed(400.0, &landmarks);
        assert!(seen.lock().unwrap().is_empty());

        let at_600 = tracker.update(600.0, &landmarks);
        assert_eq!(at_600.newly_reached.len(), 1);
        let at_650 = tracker.update(650.0, &landmarks);
        assert!(at_650.newly_reached.is_empty());

        assert_eq!(*seen.lock().unwrap(), vec!["lm0".to_string()]);
    }

    #[test]
    fn test_seed_suppresses_landmarks_behind_baseline() {
        let landmarks = camino();
        let mut tracker = LandmarkReachTracker::new();
        let seen = recorder(&mut tracker);

        tracker.seed(1600.0, &landmarks);
        let result = tracker.update(1700.0, &landmarks);

        assert!(result.newly_reached.is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert!(tracker.is_reached("burgos"));
    }

    #[test]
    fn test_reached_set_is_monotonic() {
        let landmarks = camino();
        let mut tracker = LandmarkReachTracker::new();
        tracker.update(1500.0, &landmarks);
        let before = tracker.reached().clone();
        tracker.update(100.0, &landmarks);
        assert!(before.is_subset(tracker.reached()));
    }

    #[test]
    fn test_multiple_listeners_and_unsubscribe() {
        let landmarks = camino();
        let mut tracker = LandmarkReachTracker::new();
        let first = recorder(&mut tracker);
        let second_sink = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&second_sink);
        let second = tracker.subscribe(Arc::new(move |_: &LandmarkReached| {
            *counter.lock().unwrap() += 1;
        }));

        tracker.update(600.0, &landmarks);
        assert!(tracker.unsubscribe(second));
        assert!(!tracker.unsubscribe(second));
        tracker.update(1600.0, &landmarks);

        assert_eq!(first.lock().unwrap().len(), 3);
        assert_eq!(*second_sink.lock().unwrap(), 2);
    }
}
