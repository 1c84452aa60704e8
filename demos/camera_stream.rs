use std::sync::Arc;
use std::thread;
use std::time::Duration;
use watchpost::examples::{
    random_embedding, BoxWalk, SyntheticDetector, SyntheticEnhancer, SyntheticFaceExtractor,
    SyntheticFrame, SyntheticSceneModel, SyntheticTracker,
};
use watchpost::prelude::*;

const DIM: usize = 128;

fn main() {
    env_logger::init();

    let config = WatchpostConfig::default();
    let zones = Arc::new(config.zone_registry());
    let identities = Arc::new(InMemoryIdentityRegistry::with_dimension(DIM));
    let staff = random_embedding(DIM);
    identities
        .add(FaceEmbedding::new(&staff), Some("staff"))
        .unwrap();

    let board = Arc::new(AnalyticsBoard::new());
    let (tx, rx) = crossbeam::channel::bounded(32);

    let engine = AlertEngine::new(
        "CAM_01",
        zones,
        StationaryTracker::new(config.stationary_options().unwrap()),
        config.identity_gate(),
        identities,
        config.alert_engine_options().unwrap(),
    )
    .with_store(Arc::new(InMemoryAlertStore::new()))
    .with_notifier(LogNotifier);

    let pipeline = Pipeline::builder("CAM_01")
        .options(config.pipeline_options())
        .detector(SyntheticDetector)
        .tracker(SyntheticTracker)
        .face_extractor(SyntheticFaceExtractor::default())
        .scene_model(SyntheticSceneModel::default())
        .enhancer(SyntheticEnhancer::default())
        .alert_engine(engine)
        .build()
        .unwrap();
    board.register("CAM_01", pipeline.snapshot_handle());
    let runner = pipeline.spawn(rx);

    let status = {
        let board = board.clone();
        thread::spawn(move || {
            for _ in 0..5 {
                thread::sleep(Duration::from_millis(20));
                for s in board.all() {
                    eprintln!(
                        "Status {}: frame {}, {} alert(s), scene features: {}",
                        s.camera_id, s.frame_count, s.alert_count, s.scene_features_available
                    );
                }
            }
        })
    };

    let mut visitor = BoxWalk::new_monotonous(0.0, 0.0, 40.0, 90.0, 6.0, 0.3);
    let mut guard = BoxWalk::new(800.0, 400.0, 45.0, 95.0, 4.0, 0.3);
    let stranger = random_embedding(DIM);
    for i in 0..120 {
        let brightness = if i % 40 < 10 { 25.0 } else { 140.0 };
        let frame = SyntheticFrame::new(i, brightness)
            .with_object(TrackedObject::person(1, visitor.next().unwrap()))
            .with_face(1, stranger.clone())
            .with_object(TrackedObject::person(2, guard.next().unwrap()))
            .with_face(2, staff.clone());
        tx.send(frame).unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    drop(tx);

    let pipeline = runner.join().unwrap();
    status.join().unwrap();
    eprintln!(
        "Processed {} frames, last snapshot: {}",
        pipeline.frame_count(),
        serde_json::to_string_pretty(pipeline.latest_analytics().as_ref()).unwrap()
    );
}
