use crate::alerts::engine::AlertEngine;
use crate::alerts::Alert;
use crate::identity::embedding::FaceEmbedding;
use crate::objects::TrackedObject;
use crate::pipeline::collaborators::{
    is_low_light, Detector, FaceExtractor, LowLightEnhancer, SceneFeatures, SceneModel, Tracker,
};
use crate::pipeline::snapshot::{AnalyticsSnapshot, SnapshotHandle};
use crate::Errors;
use anyhow::Result;
use crossbeam::channel::Receiver;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};
use std::time::Instant;

/// Pluggable model and tracker interfaces
pub mod collaborators;

/// Analytics snapshot shared with concurrent readers
pub mod snapshot;

/// Default number of frames between two scene-understanding runs
pub const DEFAULT_SCENE_CADENCE: u64 = 15;

/// Default mean brightness below which a frame is enhanced
pub const DEFAULT_LOW_LIGHT_THRESHOLD: f32 = 60.0;

/// Class that is used to configure the frame pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    scene_cadence: u64,
    low_light_threshold: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scene_cadence: DEFAULT_SCENE_CADENCE,
            low_light_threshold: DEFAULT_LOW_LIGHT_THRESHOLD,
        }
    }
}

impl PipelineOptions {
    /// The scene model runs on frames whose index is a multiple of `n` (the first frame included).
    ///
    pub fn scene_cadence(mut self, n: u64) -> Self {
        assert!(n > 0, "Scene cadence must be a positive number");
        self.scene_cadence = n;
        self
    }

    /// Frames with mean brightness below the threshold are passed to the enhancer.
    ///
    pub fn low_light_threshold(mut self, threshold: f32) -> Self {
        self.low_light_threshold = threshold;
        self
    }

    pub fn get_scene_cadence(&self) -> u64 {
        self.scene_cadence
    }

    pub fn get_low_light_threshold(&self) -> f32 {
        self.low_light_threshold
    }
}

/// Everything the pipeline derived from one frame
///
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    pub frame_index: u64,
    pub enhanced: bool,
    pub objects: Vec<TrackedObject>,
    pub embeddings: HashMap<u64, FaceEmbedding>,
    pub scene_features: Option<SceneFeatures>,
    pub alerts: Vec<Alert>,
}

/// Builder for [Pipeline]
///
pub struct PipelineBuilder<F> {
    camera_id: String,
    opts: PipelineOptions,
    detector: Option<Box<dyn Detector<F>>>,
    tracker: Option<Box<dyn Tracker<F>>>,
    faces: Option<Box<dyn FaceExtractor<F>>>,
    scene: Option<Box<dyn SceneModel<F>>>,
    enhancer: Option<Box<dyn LowLightEnhancer<F>>>,
    engine: Option<AlertEngine>,
    snapshot: Option<SnapshotHandle>,
}

impl<F> PipelineBuilder<F> {
    pub fn new(camera_id: &str) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            opts: PipelineOptions::default(),
            detector: None,
            tracker: None,
            faces: None,
            scene: None,
            enhancer: None,
            engine: None,
            snapshot: None,
        }
    }

    pub fn options(mut self, opts: PipelineOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn detector<D: Detector<F> + 'static>(mut self, detector: D) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    pub fn tracker<T: Tracker<F> + 'static>(mut self, tracker: T) -> Self {
        self.tracker = Some(Box::new(tracker));
        self
    }

    pub fn face_extractor<E: FaceExtractor<F> + 'static>(mut self, faces: E) -> Self {
        self.faces = Some(Box::new(faces));
        self
    }

    pub fn scene_model<S: SceneModel<F> + 'static>(mut self, scene: S) -> Self {
        self.scene = Some(Box::new(scene));
        self
    }

    pub fn enhancer<L: LowLightEnhancer<F> + 'static>(mut self, enhancer: L) -> Self {
        self.enhancer = Some(Box::new(enhancer));
        self
    }

    pub fn alert_engine(mut self, engine: AlertEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Publishes snapshots into an existing handle instead of a new one
    ///
    pub fn snapshot_handle(mut self, handle: SnapshotHandle) -> Self {
        self.snapshot = Some(handle);
        self
    }

    /// Builds the pipeline. Fails when the detector, the tracker or the alert engine is missing.
    ///
    pub fn build(self) -> Result<Pipeline<F>> {
        let detector = self.detector.ok_or(Errors::MissingCollaborator("detector"))?;
        let tracker = self.tracker.ok_or(Errors::MissingCollaborator("tracker"))?;
        let engine = self
            .engine
            .ok_or(Errors::MissingCollaborator("alert engine"))?;

        if engine.camera_id() != self.camera_id {
            return Err(Errors::InvalidConfig(format!(
                "alert engine is configured for camera `{}`, the pipeline for `{}`",
                engine.camera_id(),
                self.camera_id
            ))
            .into());
        }

        info!(
            "Pipeline for camera `{}` is built (face extractor: {}, scene model: {}, enhancer: {})",
            self.camera_id,
            self.faces.is_some(),
            self.scene.is_some(),
            self.enhancer.is_some()
        );

        Ok(Pipeline {
            camera_id: self.camera_id,
            opts: self.opts,
            detector,
            tracker,
            faces: self.faces,
            scene: self.scene,
            enhancer: self.enhancer,
            engine,
            snapshot: self.snapshot.unwrap_or_default(),
            frame_count: 0,
        })
    }
}

/// Per-camera frame pipeline
///
/// Stages run strictly in sequence for every frame: low-light enhancement, detection and
/// tracking, face embedding for person tracks, cadence-gated scene understanding, alerting,
/// and snapshot publication. Optional stages that are absent or fail are skipped and the frame
/// passes through unchanged.
///
pub struct Pipeline<F> {
    camera_id: String,
    opts: PipelineOptions,
    detector: Box<dyn Detector<F>>,
    tracker: Box<dyn Tracker<F>>,
    faces: Option<Box<dyn FaceExtractor<F>>>,
    scene: Option<Box<dyn SceneModel<F>>>,
    enhancer: Option<Box<dyn LowLightEnhancer<F>>>,
    engine: AlertEngine,
    snapshot: SnapshotHandle,
    frame_count: u64,
}

impl<F> Pipeline<F> {
    pub fn builder(camera_id: &str) -> PipelineBuilder<F> {
        PipelineBuilder::new(camera_id)
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Number of frames processed so far
    ///
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Handle to read the latest analytics from other threads
    ///
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    pub fn latest_analytics(&self) -> Arc<AnalyticsSnapshot> {
        self.snapshot.latest()
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AlertEngine {
        &mut self.engine
    }

    pub fn process_frame(&mut self, frame: &F) -> FrameResult {
        self.process_frame_at(frame, Instant::now())
    }

    /// Runs all the stages for the frame observed at the moment `now`
    ///
    pub fn process_frame_at(&mut self, frame: &F, now: Instant) -> FrameResult {
        let frame_index = self.frame_count;
        self.frame_count += 1;

        let enhanced = self.enhance(frame);
        let frame = enhanced.as_ref().unwrap_or(frame);

        let objects = self.detect_and_track(frame);
        let embeddings = self.embed_faces(frame, &objects);

        let scene_features = if frame_index % self.opts.scene_cadence == 0 {
            self.analyze_scene(frame)
        } else {
            None
        };

        let alerts = self.engine.process_at(&objects, &embeddings, now);

        self.snapshot.publish(AnalyticsSnapshot {
            camera_id: self.camera_id.clone(),
            frame_count: self.frame_count,
            alert_count: alerts.len(),
            alerts: alerts.clone(),
            scene_features_available: scene_features.is_some(),
            scene_features: scene_features.clone(),
        });

        if !alerts.is_empty() {
            debug!(
                "Camera `{}`, frame {}: {} alert(s)",
                self.camera_id,
                frame_index,
                alerts.len()
            );
        }

        FrameResult {
            frame_index,
            enhanced: enhanced.is_some(),
            objects,
            embeddings,
            scene_features,
            alerts,
        }
    }

    /// Processes the frames one by one, returns the number of processed frames
    ///
    pub fn run<I: IntoIterator<Item = F>>(&mut self, frames: I) -> u64 {
        let mut processed = 0;
        for frame in frames {
            self.process_frame(&frame);
            processed += 1;
        }
        processed
    }

    fn enhance(&mut self, frame: &F) -> Option<F> {
        let enhancer = self.enhancer.as_mut()?;
        let brightness = match enhancer.mean_brightness(frame) {
            Ok(b) => b,
            Err(e) => {
                warn!(
                    "Camera `{}`: brightness test failed, enhancement is skipped. Error is: {:?}",
                    self.camera_id, e
                );
                return None;
            }
        };
        if !is_low_light(brightness, self.opts.low_light_threshold) {
            return None;
        }
        match enhancer.enhance(frame) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!(
                    "Camera `{}`: low-light enhancement failed, the original frame is used. Error is: {:?}",
                    self.camera_id, e
                );
                None
            }
        }
    }

    fn detect_and_track(&mut self, frame: &F) -> Vec<TrackedObject> {
        let detections = match self.detector.detect(frame) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    "Camera `{}`: detection failed, no detections this frame. Error is: {:?}",
                    self.camera_id, e
                );
                Vec::default()
            }
        };
        match self.tracker.update(&detections, frame) {
            Ok(objects) => objects,
            Err(e) => {
                warn!(
                    "Camera `{}`: tracking failed, no tracks this frame. Error is: {:?}",
                    self.camera_id, e
                );
                Vec::default()
            }
        }
    }

    fn embed_faces(&mut self, frame: &F, objects: &[TrackedObject]) -> HashMap<u64, FaceEmbedding> {
        let mut embeddings = HashMap::default();
        let faces = match self.faces.as_mut() {
            Some(f) => f,
            None => return embeddings,
        };
        for person in objects.iter().filter(|o| o.is_person()) {
            match faces.embed(frame, &person.bbox) {
                Ok(Some(e)) => {
                    embeddings.insert(person.track_id, e);
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Camera `{}`: face extraction failed for track {}. Error is: {:?}",
                    self.camera_id, person.track_id, e
                ),
            }
        }
        embeddings
    }

    fn analyze_scene(&mut self, frame: &F) -> Option<SceneFeatures> {
        let scene = self.scene.as_mut()?;
        match scene.analyze(frame) {
            Ok(features) => Some(features),
            Err(e) => {
                warn!(
                    "Camera `{}`: scene analysis failed, the stage is skipped. Error is: {:?}",
                    self.camera_id, e
                );
                None
            }
        }
    }
}

impl<F: Send + 'static> Pipeline<F> {
    /// Moves the pipeline to its own thread that processes frames from the channel until it is
    /// closed. The thread returns the pipeline back when it finishes.
    ///
    pub fn spawn(mut self, frames: Receiver<F>) -> JoinHandle<Pipeline<F>> {
        spawn(move || {
            info!("Camera `{}`: frame loop started", self.camera_id);
            while let Ok(frame) = frames.recv() {
                self.process_frame(&frame);
            }
            info!(
                "Camera `{}`: frame loop stopped after {} frame(s)",
                self.camera_id, self.frame_count
            );
            self
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::alerts::engine::{AlertEngine, AlertEngineOptions};
    use crate::examples::{
        FailingDetector, FailingSceneModel, SyntheticDetector, SyntheticEnhancer,
        SyntheticFaceExtractor, SyntheticFrame, SyntheticSceneModel, SyntheticTracker,
    };
    use crate::identity::registry::InMemoryIdentityRegistry;
    use crate::identity::IdentityGate;
    use crate::objects::TrackedObject;
    use crate::pipeline::{Pipeline, PipelineOptions};
    use crate::stationary::StationaryTracker;
    use crate::utils::bbox::BoundingBox;
    use crate::zones::{Zone, ZoneRegistry};
    use crate::Errors;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn engine() -> AlertEngine {
        AlertEngine::new(
            "CAM_01",
            Arc::new(ZoneRegistry::with_zones(HashMap::from([(
                "CAM_01".to_string(),
                vec![Zone::rect("No Entry", 0.0, 0.0, 400.0, 300.0)],
            )]))),
            StationaryTracker::default(),
            IdentityGate::default(),
            Arc::new(InMemoryIdentityRegistry::new()),
            AlertEngineOptions::default(),
        )
    }

    #[test]
    fn missing_required_collaborators() {
        let r = Pipeline::<SyntheticFrame>::builder("CAM_01")
            .tracker(SyntheticTracker)
            .alert_engine(engine())
            .build();
        assert!(matches!(
            r.err().unwrap().downcast_ref::<Errors>(),
            Some(Errors::MissingCollaborator("detector"))
        ));

        let r = Pipeline::<SyntheticFrame>::builder("CAM_01")
            .detector(SyntheticDetector)
            .alert_engine(engine())
            .build();
        assert!(matches!(
            r.err().unwrap().downcast_ref::<Errors>(),
            Some(Errors::MissingCollaborator("tracker"))
        ));

        let r = Pipeline::<SyntheticFrame>::builder("CAM_02")
            .detector(SyntheticDetector)
            .tracker(SyntheticTracker)
            .alert_engine(engine())
            .build();
        assert!(r.is_err());
    }

    #[test]
    fn scene_model_runs_on_cadence() {
        let scene = SyntheticSceneModel::default();
        let mut p = Pipeline::builder("CAM_01")
            .detector(SyntheticDetector)
            .tracker(SyntheticTracker)
            .scene_model(scene.clone())
            .options(PipelineOptions::default().scene_cadence(15))
            .alert_engine(engine())
            .build()
            .unwrap();

        let mut with_scene = Vec::default();
        for i in 0..31 {
            let r = p.process_frame(&SyntheticFrame::new(i, 120.0));
            if r.scene_features.is_some() {
                with_scene.push(r.frame_index);
            }
        }
        assert_eq!(with_scene, vec![0, 15, 30]);
        assert_eq!(scene.calls(), 3);
        assert_eq!(p.frame_count(), 31);
        let s = p.latest_analytics();
        assert_eq!(s.frame_count, 31);
        assert!(s.scene_features_available);
    }

    #[test]
    fn optional_stage_failures_pass_through() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut p = Pipeline::builder("CAM_01")
            .detector(FailingDetector)
            .tracker(SyntheticTracker)
            .scene_model(FailingSceneModel)
            .alert_engine(engine())
            .build()
            .unwrap();
        let frame = SyntheticFrame::new(0, 120.0)
            .with_object(TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0)));
        let r = p.process_frame(&frame);
        assert!(r.scene_features.is_none());
        // tracks still come from the tracker even without detections
        assert_eq!(r.alerts.len(), 1);
        assert!(!p.latest_analytics().scene_features_available);
    }

    #[test]
    fn dark_frames_are_enhanced() {
        let enhancer = SyntheticEnhancer::default();
        let mut p = Pipeline::builder("CAM_01")
            .detector(SyntheticDetector)
            .tracker(SyntheticTracker)
            .enhancer(enhancer.clone())
            .alert_engine(engine())
            .build()
            .unwrap();
        assert!(p.process_frame(&SyntheticFrame::new(0, 20.0)).enhanced);
        assert!(!p.process_frame(&SyntheticFrame::new(1, 200.0)).enhanced);
        assert_eq!(enhancer.calls(), 1);
    }

    #[test]
    fn run_processes_all_frames() {
        let mut p = Pipeline::builder("CAM_01")
            .detector(SyntheticDetector)
            .tracker(SyntheticTracker)
            .alert_engine(engine())
            .build()
            .unwrap();
        let frames = (0..20).map(|i| {
            SyntheticFrame::new(i, 120.0)
                .with_object(TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0)))
        });
        assert_eq!(p.run(frames), 20);
        assert_eq!(p.frame_count(), 20);
        let s = p.latest_analytics();
        assert_eq!(s.frame_count, 20);
        // the zone alert of the first frame is held back by the cooldown afterwards
        assert_eq!(s.alert_count, 0);
        assert_eq!(p.run(Vec::<SyntheticFrame>::default()), 0);
    }

    #[test]
    fn faces_only_for_persons() {
        let faces = SyntheticFaceExtractor::default();
        let mut p = Pipeline::builder("CAM_01")
            .detector(SyntheticDetector)
            .tracker(SyntheticTracker)
            .face_extractor(faces.clone())
            .alert_engine(engine())
            .build()
            .unwrap();
        let car = TrackedObject::new(
            2,
            BoundingBox::new(600.0, 600.0, 700.0, 700.0),
            crate::objects::ObjectClass::Other("car".into()),
            0.8,
        );
        let frame = SyntheticFrame::new(0, 120.0)
            .with_object(TrackedObject::person(1, BoundingBox::new(800.0, 800.0, 900.0, 1000.0)))
            .with_face(1, vec![0.1, 0.2, 0.3])
            .with_object(car)
            .with_face(2, vec![0.3, 0.2, 0.1]);
        let r = p.process_frame(&frame);
        assert_eq!(faces.calls(), 1);
        assert_eq!(r.embeddings.len(), 1);
        assert!(r.embeddings.contains_key(&1));
        // empty registry, the face is unknown
        assert_eq!(r.alerts.len(), 1);
    }
}
