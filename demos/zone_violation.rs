use std::sync::Arc;
use std::time::{Duration, Instant};
use watchpost::examples::{BoxWalk, CollectingNotifier};
use watchpost::prelude::*;

fn main() {
    env_logger::init();

    let config = WatchpostConfig::default();
    let store = Arc::new(InMemoryAlertStore::new());
    let notifier = CollectingNotifier::default();

    let mut engine = AlertEngine::new(
        "CAM_01",
        Arc::new(config.zone_registry()),
        StationaryTracker::new(config.stationary_options().unwrap()),
        config.identity_gate(),
        Arc::new(InMemoryIdentityRegistry::new()),
        config.alert_engine_options().unwrap(),
    )
    .with_store(store.clone())
    .with_notifier(notifier.clone());

    // one person walks into the zone, the other one stands next to it
    let mut walker = BoxWalk::new_monotonous(500.0, 350.0, 40.0, 90.0, 0.0, 0.0);
    let mut walking = BoxWalk::new(300.0, 320.0, 40.0, 90.0, 8.0, 0.5);
    let standing = BoundingBox::ltwh(450.0, 100.0, 40.0, 90.0);

    let t0 = Instant::now();
    for second in 0..90 {
        let now = t0 + Duration::from_secs(second);
        let approach = walker
            .next()
            .unwrap()
            .shift(-6.0 * second as f32, -4.0 * second as f32);
        let objects = [
            TrackedObject::person(1, walking.next().unwrap()),
            TrackedObject::person(2, standing),
            TrackedObject::person(3, approach),
        ];
        for alert in engine.process_at(&objects, &Default::default(), now) {
            eprintln!(
                "[{:>3}s] {}: {}",
                second,
                alert.alert_type(),
                alert.description()
            );
        }
    }

    if let Some(d) = engine.dispatcher() {
        d.flush().unwrap();
    }
    eprintln!("Stored alerts (newest first):");
    for alert in store.query(Some("CAM_01"), 5).unwrap() {
        eprintln!("  {} {}", alert.created_at(), alert.description());
    }
    eprintln!("Notifications sent: {}", notifier.sent().len());
}
