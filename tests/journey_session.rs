//! End-to-end session behaviour against the in-memory progress service.

use std::sync::{Arc, Mutex};

use journey_progress::{
    FeedSnapshot, GpsPoint, InMemoryProgressService, JourneyRoute, JourneySession, Landmark,
    LandmarkReached, ProgressConfig, ServiceOperation, StartOutcome, SyncError, SyncSession,
};

const USER: &str = "runner-7";
const JOURNEY: &str = "via-francigena";

type Session = JourneySession<Arc<InMemoryProgressService>>;

fn eleven_point_route() -> Vec<GpsPoint> {
    (0..11).map(|i| GpsPoint::new(45.0, 7.0 + i as f64 * 0.01)).collect()
}

fn build(
    landmarks: Vec<Landmark>,
    total_m: f64,
) -> (Session, Arc<InMemoryProgressService>, Arc<Mutex<Vec<LandmarkReached>>>) {
    let route = JourneyRoute::new(
        eleven_point_route(),
        landmarks,
        Some(total_m),
        &ProgressConfig::default(),
    )
    .unwrap();
    let service = Arc::new(InMemoryProgressService::new());
    let mut session = JourneySession::new(route, SyncSession::new(JOURNEY, USER), Arc::clone(&service));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.subscribe(Arc::new(move |event: &LandmarkReached| {
        sink.lock().unwrap().push(event.clone());
    }));

    (session, service, events)
}

fn running(distance_km: f64) -> FeedSnapshot {
    FeedSnapshot {
        is_running: true,
        distance_km,
        ..FeedSnapshot::default()
    }
}

#[tokio::test]
async fn landmark_crossed_in_one_tick_fires_once() {
    let (mut session, _service, events) = build(vec![Landmark::new("lm", "Fountain", 500.0)], 1000.0);
    session.load().await;
    session.start().await;

    session.tick(&running(0.4));
    let snapshot = session.tick(&running(0.6));
    assert_eq!(snapshot.reached_landmark_ids, vec!["lm".to_string()]);
    session.tick(&running(0.65));

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "lm");
    assert_eq!(events[0].name, "Fountain");
    assert_eq!(events[0].cumulative_distance_m, 500.0);
}

#[tokio::test]
async fn landmarks_behind_baseline_are_not_announced() {
    let (mut session, service, events) = build(
        vec![
            Landmark::new("a", "Aosta", 2000.0),
            Landmark::new("b", "Ivrea", 6000.0),
        ],
        10_000.0,
    );
    service.seed(USER, JOURNEY, 3000.0, true);

    let loaded = session.load().await;
    assert!(loaded.ready);
    assert_eq!(loaded.reached_landmark_ids, vec!["a".to_string()]);
    assert_eq!(loaded.next_landmark.as_ref().map(|l| l.id.as_str()), Some("b"));

    assert_eq!(session.start().await, StartOutcome::Resumed);
    let snapshot = session.tick(&running(3.5));
    assert_eq!(snapshot.progress_m, 6500.0);
    assert!((snapshot.progress_percent - 65.0).abs() < 1e-9);

    let ids: Vec<String> = events.lock().unwrap().iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec!["b".to_string()]);
}

#[tokio::test]
async fn completion_adopts_server_total_and_survives_reload() {
    let (mut session, service, _events) = build(vec![], 10_000.0);
    session.load().await;
    session.start().await;
    session.tick(&running(2.25));

    let remote = session.complete().await.unwrap().unwrap();
    assert_eq!(remote.progress_m, 2250.0);
    assert_eq!(session.progress().session_delta_m, 0.0);

    // Completing again without a new start is a no-op
    assert_eq!(session.complete().await, Ok(None));
    assert_eq!(service.count(ServiceOperation::Progress), 1);

    // A fresh mount sees the persisted baseline
    let route = JourneyRoute::new(
        eleven_point_route(),
        vec![],
        Some(10_000.0),
        &ProgressConfig::default(),
    )
    .unwrap();
    let mut remount = JourneySession::new(route, SyncSession::new(JOURNEY, USER), service);
    let snapshot = remount.load().await;
    assert_eq!(snapshot.progress_m, 2250.0);
}

#[tokio::test]
async fn failed_completion_can_be_retried_with_same_delta() {
    let (mut session, service, _events) = build(vec![], 10_000.0);
    session.load().await;
    session.start().await;
    session.tick(&running(1.0));

    service.fail_next(ServiceOperation::Progress, SyncError::Network("timeout".into()));
    let err = session.complete().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.progress().session_delta_m, 1000.0);

    session.complete().await.unwrap();
    assert_eq!(service.progress_of(USER, JOURNEY), Some(1000.0));
}

#[tokio::test]
async fn stop_discards_session_but_not_baseline() {
    let (mut session, service, events) = build(vec![Landmark::new("a", "Aosta", 1000.0)], 10_000.0);
    service.seed(USER, JOURNEY, 1500.0, true);
    session.load().await;
    session.start().await;
    session.tick(&running(0.8));

    session.stop();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.progress_m, 1500.0);
    assert_eq!(snapshot.reached_landmark_ids, vec!["a".to_string()]);
    assert_eq!(service.progress_of(USER, JOURNEY), Some(1500.0));

    // Later ticks do not re-announce the landmark behind the baseline
    session.tick(&running(0.1));
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn load_failure_still_becomes_ready() {
    let (mut session, service, _events) = build(vec![], 10_000.0);
    service.seed(USER, JOURNEY, 5000.0, true);
    service.fail_next(ServiceOperation::GetState, SyncError::Network("dns".into()));

    let snapshot = session.load().await;
    assert!(snapshot.ready);
    assert_eq!(snapshot.progress_m, 0.0);

    // Manual reconciliation picks up the server value
    session.refresh().await.unwrap();
    assert_eq!(session.snapshot().progress_m, 5000.0);
}

#[tokio::test]
async fn route_index_stays_in_bounds_across_the_journey() {
    let (mut session, _service, events) = build(
        vec![
            Landmark::new("a", "A", 1200.0),
            Landmark::new("b", "B", 1200.0),
            Landmark::new("c", "C", 7000.0).with_position(GpsPoint::new(45.0, 7.081)),
        ],
        10_000.0,
    );
    session.load().await;
    session.start().await;

    for step in 0..=120 {
        let snapshot = session.tick(&running(step as f64 * 0.1));
        assert!((0.0..=10.0).contains(&snapshot.route_index));
        assert!((0.0..=100.0).contains(&snapshot.progress_percent));
    }
    assert_eq!(events.lock().unwrap().len(), 3);
    assert!(session.snapshot().next_landmark.is_none());
}

#[tokio::test]
async fn second_run_reaching_past_first_is_recorded_in_full() {
    let (mut session, service, _events) = build(vec![], 10_000.0);
    session.load().await;

    session.start().await;
    session.tick(&running(0.05));
    session.complete().await.unwrap();

    session.start().await;
    session.tick(&running(0.06));
    let snapshot = session.tick(&running(1.0));
    assert_eq!(snapshot.progress_m, 1050.0);

    session.complete().await.unwrap();
    assert_eq!(service.progress_of(USER, JOURNEY), Some(1050.0));
}

#[tokio::test]
async fn lower_server_value_mid_session_keeps_total_and_reached_set() {
    let (mut session, service, _events) = build(vec![Landmark::new("a", "Aosta", 2000.0)], 10_000.0);
    service.seed(USER, JOURNEY, 3000.0, true);
    session.load().await;
    session.start().await;

    service.seed(USER, JOURNEY, 1000.0, true);
    session.refresh().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.progress_m, 3000.0);
    assert_eq!(snapshot.reached_landmark_ids, vec!["a".to_string()]);
}
