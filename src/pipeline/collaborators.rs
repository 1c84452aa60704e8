use crate::identity::embedding::FaceEmbedding;
use crate::objects::{Detection, TrackedObject};
use crate::utils::bbox::BoundingBox;
use anyhow::Result;

/// Opaque scene-understanding output
pub type SceneFeatures = serde_json::Value;

/// Object detector, required
///
pub trait Detector<F>: Send {
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>>;
}

/// Multi-object tracker, required. Returns confirmed tracks only.
///
pub trait Tracker<F>: Send {
    fn update(&mut self, detections: &[Detection], frame: &F) -> Result<Vec<TrackedObject>>;
}

/// Face detection and embedding for a person box, optional.
///
/// `Ok(None)` means no face was found in the box.
///
pub trait FaceExtractor<F>: Send {
    fn embed(&mut self, frame: &F, person: &BoundingBox) -> Result<Option<FaceEmbedding>>;
}

/// Scene segmentation and feature model, optional and cadence-gated
///
pub trait SceneModel<F>: Send {
    fn analyze(&mut self, frame: &F) -> Result<SceneFeatures>;
}

/// Low-light enhancement, optional
///
pub trait LowLightEnhancer<F>: Send {
    /// Mean brightness of the frame in `[0, 255]`
    ///
    fn mean_brightness(&self, frame: &F) -> Result<f32>;

    fn enhance(&mut self, frame: &F) -> Result<F>;
}

/// The frame is dark enough to be enhanced
///
pub fn is_low_light(mean_brightness: f32, threshold: f32) -> bool {
    mean_brightness < threshold
}
