pub use crate::alerts::engine::{AlertEngine, AlertEngineOptions};
pub use crate::alerts::notify::{LogNotifier, NoopNotifier, Notifier};
pub use crate::alerts::store::{AlertStore, InMemoryAlertStore};
pub use crate::alerts::{Alert, AlertType};
pub use crate::config::WatchpostConfig;
pub use crate::distance::DistanceMetric;
pub use crate::identity::embedding::FaceEmbedding;
pub use crate::identity::registry::{IdentityRegistry, InMemoryIdentityRegistry};
pub use crate::identity::IdentityGate;
pub use crate::objects::{Detection, ObjectClass, TrackedObject};
pub use crate::pipeline::collaborators::{
    Detector, FaceExtractor, LowLightEnhancer, SceneFeatures, SceneModel, Tracker,
};
pub use crate::pipeline::snapshot::{AnalyticsBoard, AnalyticsSnapshot, SnapshotHandle};
pub use crate::pipeline::{FrameResult, Pipeline, PipelineBuilder, PipelineOptions};
pub use crate::stationary::{ReferencePolicy, StationaryOptions, StationaryTracker};
pub use crate::utils::bbox::BoundingBox;
pub use crate::zones::{Zone, ZoneRegistry};
pub use crate::Errors;
