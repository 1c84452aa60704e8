use thiserror::Error;

/// Alerts, alert engine, cooldown cache, storage and notification seams
pub mod alerts;

/// JSON configuration document for cameras, zones and thresholds
pub mod config;

/// Distances between face embeddings
pub mod distance;

/// Scripted collaborators and object generators used by demos, benches and tests
pub mod examples;

/// Known-identity registry and the identity gate
pub mod identity;

/// Detections and tracked objects produced by external models
pub mod objects;

/// Frame pipeline orchestration
pub mod pipeline;

/// Commonly used types
pub mod prelude;

/// Loitering detection
pub mod stationary;

/// Bounding boxes and box/polygon intersection
pub mod utils;

/// Restricted zones registry
pub mod zones;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Required collaborator `{0}` is not configured.")]
    MissingCollaborator(&'static str),
    #[error("Zone `{0}` has invalid geometry.")]
    InvalidZone(String),
    #[error("Camera `{0}` is not known.")]
    UnknownCamera(String),
    #[error("Embedding is empty - distance cannot be calculated.")]
    EmptyEmbedding,
    #[error("Embedding contains non-finite values.")]
    NonFiniteEmbedding,
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Alert store is unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Notifier is unavailable: {0}")]
    NotifierUnavailable(String),
    #[error("Alert dispatcher is already closed.")]
    DispatcherClosed,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub(crate) const EPS: f32 = 0.00001;
