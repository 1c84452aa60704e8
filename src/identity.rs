use crate::distance::DistanceMetric;
use crate::identity::embedding::FaceEmbedding;
use crate::identity::registry::IdentityRegistry;
use crate::Errors;
use anyhow::Result;

/// Face embedding representation
pub mod embedding;

/// Registry of known identities
pub mod registry;

/// Default distance below which a face is considered known
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;

/// Registered person
///
#[derive(Debug, Clone)]
pub struct KnownIdentity {
    pub id: u64,
    pub label: Option<String>,
    pub embedding: FaceEmbedding,
}

/// The closest known identity and the distance to it
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentityMatch {
    pub identity_id: u64,
    pub distance: f32,
}

/// Nearest-neighbour distance gate against a known-identity registry
///
#[derive(Debug, Clone, Copy)]
pub struct IdentityGate {
    threshold: f32,
    metric: DistanceMetric,
}

impl Default for IdentityGate {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DistanceMetric::default())
    }
}

impl IdentityGate {
    pub fn new(threshold: f32, metric: DistanceMetric) -> Self {
        assert!(
            threshold > 0.0 && threshold.is_finite(),
            "The threshold is expected to be a positive float"
        );
        Self { threshold, metric }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Looks up the embedding in the registry.
    ///
    /// Returns the nearest identity when its distance is strictly below the threshold, `None`
    /// when the best distance is at or above the threshold or the registry is empty. Empty and
    /// non-finite embeddings are errors.
    ///
    pub fn identify(
        &self,
        embedding: &FaceEmbedding,
        registry: &dyn IdentityRegistry,
    ) -> Result<Option<IdentityMatch>> {
        if embedding.is_empty() {
            return Err(Errors::EmptyEmbedding.into());
        }
        if !embedding.is_finite() {
            return Err(Errors::NonFiniteEmbedding.into());
        }
        Ok(registry
            .nearest(embedding, self.metric)?
            .filter(|m| m.distance < self.threshold))
    }
}
