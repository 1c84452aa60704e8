use crate::distance::DistanceMetric;
use crate::identity::embedding::FaceEmbedding;
use crate::identity::{IdentityMatch, KnownIdentity};
use crate::Errors;
use anyhow::Result;
use log::info;
use rayon::prelude::*;
use std::sync::RwLock;

/// Read-mostly registry of known faces. May be shared by several camera pipelines.
///
pub trait IdentityRegistry: Send + Sync {
    /// The nearest known identity regardless of the distance, `None` for an empty registry
    ///
    fn nearest(
        &self,
        embedding: &FaceEmbedding,
        metric: DistanceMetric,
    ) -> Result<Option<IdentityMatch>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Identities {
    dim: Option<usize>,
    next_id: u64,
    items: Vec<KnownIdentity>,
}

/// Exhaustive-search registry kept in memory
///
/// Identity ids are assigned sequentially in insertion order. All the embeddings must have the
/// same dimension, which is fixed by the first added embedding unless set explicitly.
///
#[derive(Debug, Default)]
pub struct InMemoryIdentityRegistry {
    identities: RwLock<Identities>,
}

impl InMemoryIdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that accepts only embeddings of `dim` values
    ///
    pub fn with_dimension(dim: usize) -> Self {
        Self {
            identities: RwLock::new(Identities {
                dim: Some(dim),
                ..Default::default()
            }),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.identities
            .read()
            .expect("Access to identity registry must always succeed")
            .dim
    }

    /// Registers the face, returns the identity id
    ///
    pub fn add(&self, embedding: FaceEmbedding, label: Option<&str>) -> Result<u64> {
        if embedding.is_empty() {
            return Err(Errors::EmptyEmbedding.into());
        }
        let mut identities = self
            .identities
            .write()
            .expect("Access to identity registry must always succeed");
        match identities.dim {
            Some(dim) if dim != embedding.dim() => {
                return Err(Errors::DimensionMismatch {
                    expected: dim,
                    actual: embedding.dim(),
                }
                .into());
            }
            Some(_) => {}
            None => identities.dim = Some(embedding.dim()),
        }
        let id = identities.next_id;
        identities.next_id += 1;
        identities.items.push(KnownIdentity {
            id,
            label: label.map(String::from),
            embedding,
        });
        info!("Identity {} registered ({:?})", id, label);
        Ok(id)
    }

    /// Unregisters the identity, returns `true` if it was known
    ///
    pub fn remove(&self, id: u64) -> bool {
        let mut identities = self
            .identities
            .write()
            .expect("Access to identity registry must always succeed");
        let before = identities.items.len();
        identities.items.retain(|i| i.id != id);
        before != identities.items.len()
    }

    pub fn get(&self, id: u64) -> Option<KnownIdentity> {
        self.identities
            .read()
            .expect("Access to identity registry must always succeed")
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }
}

impl IdentityRegistry for InMemoryIdentityRegistry {
    fn nearest(
        &self,
        embedding: &FaceEmbedding,
        metric: DistanceMetric,
    ) -> Result<Option<IdentityMatch>> {
        let identities = self
            .identities
            .read()
            .expect("Access to identity registry must always succeed");

        if let Some(dim) = identities.dim {
            if dim != embedding.dim() {
                return Err(Errors::DimensionMismatch {
                    expected: dim,
                    actual: embedding.dim(),
                }
                .into());
            }
        }

        Ok(identities
            .items
            .par_iter()
            .map(|i| IdentityMatch {
                identity_id: i.id,
                distance: metric.distance(embedding, &i.embedding),
            })
            .filter(|m| !m.distance.is_nan())
            .min_by(|l, r| {
                l.distance
                    .total_cmp(&r.distance)
                    .then(l.identity_id.cmp(&r.identity_id))
            }))
    }

    fn len(&self) -> usize {
        self.identities
            .read()
            .expect("Access to identity registry must always succeed")
            .items
            .len()
    }
}

#[cfg(test)]
mod tests {
    use crate::distance::DistanceMetric;
    use crate::identity::embedding::FaceEmbedding;
    use crate::identity::registry::{IdentityRegistry, InMemoryIdentityRegistry};

    #[test]
    fn sequential_ids_and_removal() {
        let r = InMemoryIdentityRegistry::new();
        assert_eq!(r.add(FaceEmbedding::from(vec![1.0, 0.0]), Some("a")).unwrap(), 0);
        assert_eq!(r.add(FaceEmbedding::from(vec![0.0, 1.0]), Some("b")).unwrap(), 1);
        assert_eq!(r.len(), 2);
        assert!(r.remove(0));
        assert!(!r.remove(0));
        assert_eq!(r.add(FaceEmbedding::from(vec![1.0, 1.0]), None).unwrap(), 2);
        assert_eq!(r.get(1).unwrap().label.as_deref(), Some("b"));
    }

    #[test]
    fn nearest_identity() {
        let r = InMemoryIdentityRegistry::new();
        r.add(FaceEmbedding::from(vec![0.0, 0.0]), None).unwrap();
        r.add(FaceEmbedding::from(vec![10.0, 10.0]), None).unwrap();
        let m = r
            .nearest(&FaceEmbedding::from(vec![9.0, 10.0]), DistanceMetric::SquaredEuclidean)
            .unwrap()
            .unwrap();
        assert_eq!(m.identity_id, 1);
        assert!((m.distance - 1.0).abs() < crate::EPS);
    }

    #[test]
    fn dimension_is_enforced() {
        let r = InMemoryIdentityRegistry::with_dimension(3);
        assert!(r.add(FaceEmbedding::from(vec![0.0, 0.0]), None).is_err());
        r.add(FaceEmbedding::from(vec![0.0, 0.0, 0.0]), None).unwrap();
        assert!(r
            .nearest(&FaceEmbedding::from(vec![0.0; 4]), DistanceMetric::Euclidean)
            .is_err());
        assert!(r.add(FaceEmbedding::new(&[]), None).is_err());
    }

    #[test]
    fn empty_registry() {
        let r = InMemoryIdentityRegistry::new();
        assert!(r.is_empty());
        assert!(r
            .nearest(&FaceEmbedding::from(vec![0.0; 4]), DistanceMetric::Euclidean)
            .unwrap()
            .is_none());
    }
}
