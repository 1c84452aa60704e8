use crate::alerts::notify::Notifier;
use crate::alerts::store::AlertStore;
use crate::alerts::Alert;
use crate::identity::embedding::FaceEmbedding;
use crate::objects::{Detection, TrackedObject};
use crate::pipeline::collaborators::{
    Detector, FaceExtractor, LowLightEnhancer, SceneFeatures, SceneModel, Tracker,
};
use crate::utils::bbox::BoundingBox;
use crate::Errors;
use anyhow::Result;
use nalgebra::{Point2, Vector2};
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Scripted failure of `{0}`")]
    Failure(&'static str),
}

/// Frame with scripted tracker output and faces
///
#[derive(Debug, Clone, Default)]
pub struct SyntheticFrame {
    pub index: u64,
    pub brightness: f32,
    pub objects: Vec<TrackedObject>,
    pub faces: HashMap<u64, Vec<f32>>,
}

impl SyntheticFrame {
    pub fn new(index: u64, brightness: f32) -> Self {
        Self {
            index,
            brightness,
            ..Default::default()
        }
    }

    pub fn with_object(mut self, object: TrackedObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_face(mut self, track_id: u64, embedding: Vec<f32>) -> Self {
        self.faces.insert(track_id, embedding);
        self
    }
}

#[derive(Debug, Clone, Default)]
struct Calls(Arc<AtomicUsize>);

impl Calls {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reports the scripted objects of the frame as detections
///
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticDetector;

impl Detector<SyntheticFrame> for SyntheticDetector {
    fn detect(&mut self, frame: &SyntheticFrame) -> Result<Vec<Detection>> {
        Ok(frame
            .objects
            .iter()
            .map(|o| Detection::new(o.bbox, o.confidence, o.class.clone()))
            .collect())
    }
}

/// Reports the scripted objects of the frame as confirmed tracks
///
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticTracker;

impl Tracker<SyntheticFrame> for SyntheticTracker {
    fn update(
        &mut self,
        _detections: &[Detection],
        frame: &SyntheticFrame,
    ) -> Result<Vec<TrackedObject>> {
        Ok(frame.objects.clone())
    }
}

/// Returns the scripted face of the track the person box belongs to
///
#[derive(Debug, Clone, Default)]
pub struct SyntheticFaceExtractor {
    calls: Calls,
}

impl SyntheticFaceExtractor {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl FaceExtractor<SyntheticFrame> for SyntheticFaceExtractor {
    fn embed(
        &mut self,
        frame: &SyntheticFrame,
        person: &BoundingBox,
    ) -> Result<Option<FaceEmbedding>> {
        self.calls.hit();
        Ok(frame
            .objects
            .iter()
            .find(|o| &o.bbox == person)
            .and_then(|o| frame.faces.get(&o.track_id))
            .map(|f| FaceEmbedding::new(f)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticSceneModel {
    calls: Calls,
}

impl SyntheticSceneModel {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SceneModel<SyntheticFrame> for SyntheticSceneModel {
    fn analyze(&mut self, frame: &SyntheticFrame) -> Result<SceneFeatures> {
        self.calls.hit();
        Ok(json!({
            "frame": frame.index,
            "objects": frame.objects.len(),
            "brightness": frame.brightness,
        }))
    }
}

/// Brightens the frame by a fixed gain
///
#[derive(Debug, Clone, Default)]
pub struct SyntheticEnhancer {
    calls: Calls,
}

impl SyntheticEnhancer {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl LowLightEnhancer<SyntheticFrame> for SyntheticEnhancer {
    fn mean_brightness(&self, frame: &SyntheticFrame) -> Result<f32> {
        Ok(frame.brightness)
    }

    fn enhance(&mut self, frame: &SyntheticFrame) -> Result<SyntheticFrame> {
        self.calls.hit();
        let mut enhanced = frame.clone();
        enhanced.brightness = (frame.brightness * 2.0 + 40.0).min(255.0);
        Ok(enhanced)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDetector;

impl Detector<SyntheticFrame> for FailingDetector {
    fn detect(&mut self, _frame: &SyntheticFrame) -> Result<Vec<Detection>> {
        Err(ScriptError::Failure("detector").into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSceneModel;

impl SceneModel<SyntheticFrame> for FailingSceneModel {
    fn analyze(&mut self, _frame: &SyntheticFrame) -> Result<SceneFeatures> {
        Err(ScriptError::Failure("scene model").into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingFaceExtractor;

impl FaceExtractor<SyntheticFrame> for FailingFaceExtractor {
    fn embed(
        &mut self,
        _frame: &SyntheticFrame,
        _person: &BoundingBox,
    ) -> Result<Option<FaceEmbedding>> {
        Err(ScriptError::Failure("face extractor").into())
    }
}

/// Keeps the delivered notifications, clones share the same list
///
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl CollectingNotifier {
    /// Delivered `(subject, body)` pairs in delivery order
    ///
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .expect("Access to collected notifications must always succeed")
            .clone()
    }
}

impl Notifier for CollectingNotifier {
    fn send(&mut self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("Access to collected notifications must always succeed")
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&mut self, _subject: &str, _body: &str) -> Result<()> {
        Err(Errors::NotifierUnavailable("mail relay is down".into()).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAlertStore;

impl AlertStore for FailingAlertStore {
    fn save(&self, _alert: &Alert) -> Result<u64> {
        Err(Errors::StoreUnavailable("database is locked".into()).into())
    }

    fn query(&self, _camera_id: Option<&str>, _limit: usize) -> Result<Vec<Alert>> {
        Err(Errors::StoreUnavailable("database is locked".into()).into())
    }
}

/// Random walk of a person box
///
/// Every step moves the box by up to `pos_drift` pixels along each axis and changes its width
/// and height by up to `box_drift` pixels. The box never shrinks below one pixel.
///
pub struct BoxWalk {
    left_top: Point2<f32>,
    size: Vector2<f32>,
    rng: ThreadRng,
    step: Uniform<f32>,
    resize: Uniform<f32>,
}

impl BoxWalk {
    pub fn new(x: f32, y: f32, width: f32, height: f32, pos_drift: f32, box_drift: f32) -> Self {
        Self::with_step(
            Point2::new(x, y),
            Vector2::new(width, height),
            Uniform::new_inclusive(-pos_drift, pos_drift),
            box_drift,
        )
    }

    /// The box moves only towards larger coordinates
    ///
    pub fn new_monotonous(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        pos_drift: f32,
        box_drift: f32,
    ) -> Self {
        Self::with_step(
            Point2::new(x, y),
            Vector2::new(width, height),
            Uniform::new_inclusive(0.0, pos_drift),
            box_drift,
        )
    }

    fn with_step(
        left_top: Point2<f32>,
        size: Vector2<f32>,
        step: Uniform<f32>,
        box_drift: f32,
    ) -> Self {
        Self {
            left_top,
            size,
            rng: rand::thread_rng(),
            step,
            resize: Uniform::new_inclusive(-box_drift, box_drift),
        }
    }
}

impl Iterator for BoxWalk {
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        let rng = &mut self.rng;
        self.left_top += Vector2::new(rng.sample(self.step), rng.sample(self.step));
        self.size += Vector2::new(rng.sample(self.resize), rng.sample(self.resize));
        self.size = self.size.map(|v| v.max(1.0));
        Some(BoundingBox::ltwh(
            self.left_top.x,
            self.left_top.y,
            self.size.x,
            self.size.y,
        ))
    }
}

/// Random face embedding with components in `[-1, 1]`
///
pub fn random_embedding(dim: usize) -> Vec<f32> {
    let mut gen = rand::thread_rng();
    let dist = Uniform::new_inclusive(-1.0_f32, 1.0);
    (0..dim).map(|_| gen.sample(dist)).collect()
}
