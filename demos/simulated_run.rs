//! Simulated run along a short virtual journey.
//!
//! Run with: cargo run --example simulated_run

use std::sync::Arc;

use journey_progress::{
    FeedSnapshot, GpsPoint, InMemoryProgressService, JourneyRoute, JourneySession, Landmark,
    LandmarkReached, ProgressConfig, SyncSession,
};

#[tokio::main]
async fn main() {
    // Last stretch of the Camino Francés, Sarria to Santiago (roughly)
    let route = vec![
        GpsPoint::new(42.7808, -7.4141), // Sarria
        GpsPoint::new(42.8074, -7.6152), // Portomarín
        GpsPoint::new(42.8727, -7.8688), // Palas de Rei
        GpsPoint::new(42.9138, -8.0142), // Melide
        GpsPoint::new(42.9290, -8.1603), // Arzúa
        GpsPoint::new(42.9093, -8.3632), // O Pedrouzo
        GpsPoint::new(42.8805, -8.5457), // Santiago
    ];
    let landmarks = vec![
        Landmark::new("portomarin", "Portomarín", 22_000.0)
            .with_position(GpsPoint::new(42.8074, -7.6152)),
        Landmark::new("melide", "Melide", 50_000.0),
        Landmark::new("santiago", "Santiago de Compostela", 111_000.0)
            .with_position(GpsPoint::new(42.8805, -8.5457)),
    ];

    let journey = match JourneyRoute::new(route, landmarks, Some(111_000.0), &ProgressConfig::default()) {
        Ok(journey) => journey,
        Err(e) => {
            eprintln!("Invalid journey: {}", e);
            return;
        }
    };

    let service = Arc::new(InMemoryProgressService::new());
    // Previous runs already covered 18 km
    service.seed("demo-runner", "camino-sarria", 18_000.0, true);

    let mut session = JourneySession::new(
        journey,
        SyncSession::new("camino-sarria", "demo-runner"),
        Arc::clone(&service),
    );
    session.subscribe(Arc::new(|event: &LandmarkReached| {
        println!("   >> Reached {} at {:.1} km", event.name, event.cumulative_distance_m / 1000.0);
    }));

    println!("Simulated Journey Run\n");

    let loaded = session.load().await;
    println!("Baseline: {:.1} km ({:.1}%)", loaded.progress_m / 1000.0, loaded.progress_percent);

    let outcome = session.start().await;
    println!("Start: {:?}\n", outcome);

    // 6 km run, one reading every 500 m
    for step in 1..=12 {
        let feed = FeedSnapshot {
            is_running: true,
            distance_km: step as f64 * 0.5,
            elapsed_sec: step as f64 * 150.0,
            route: Vec::new(),
        };
        let snapshot = session.tick(&feed);
        let position = snapshot
            .virtual_position
            .map(|p| format!("({:.4}, {:.4})", p.latitude, p.longitude))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5.1} km | {:>5.1}% | index {:>5.2} | {} | next: {}",
            snapshot.progress_m / 1000.0,
            snapshot.progress_percent,
            snapshot.route_index,
            position,
            snapshot
                .next_landmark
                .map(|l| l.name)
                .unwrap_or_else(|| "finished".to_string())
        );
    }

    match session.complete().await {
        Ok(Some(remote)) => println!(
            "\nSaved: {:.1} km ({:.1}%)",
            remote.progress_m / 1000.0,
            remote.percent
        ),
        Ok(None) => println!("\nNothing to save"),
        Err(e) => println!("\nSave failed, keep the run for retry: {}", e),
    }
}
