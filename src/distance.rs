use crate::identity::embedding::FaceEmbedding;
use crate::EPS;
use serde::{Deserialize, Serialize};
use ultraviolet::f32x8;

/// Squared euclidian distance between two embeddings. This is the distance reported by flat L2
/// nearest-neighbour indexes.
///
/// Embeddings of different length are compared over the common prefix of blocks.
///
pub fn squared_euclidean(f1: &FaceEmbedding, f2: &FaceEmbedding) -> f32 {
    f1.blocks()
        .iter()
        .zip(f2.blocks())
        .map(|(a, b)| {
            let d = *a - *b;
            (d * d).reduce_add()
        })
        .sum()
}

/// Euclidian distance between two embeddings
///
pub fn euclidean(f1: &FaceEmbedding, f2: &FaceEmbedding) -> f32 {
    squared_euclidean(f1, f2).sqrt()
}

/// Cosine similarity between two embeddings. Zero-length vectors have zero similarity to
/// everything.
///
pub fn cosine(f1: &FaceEmbedding, f2: &FaceEmbedding) -> f32 {
    let (dot, norm1, norm2) = f1.blocks().iter().zip(f2.blocks()).fold(
        (f32x8::default(), f32x8::default(), f32x8::default()),
        |(dot, n1, n2), (a, b)| (dot + *a * *b, n1 + *a * *a, n2 + *b * *b),
    );
    let divisor = (norm1.reduce_add() * norm2.reduce_add()).sqrt();
    if divisor < EPS {
        return 0.0;
    }
    dot.reduce_add() / divisor
}

/// Distance used to compare a face against known identities. Lower is closer for every variant.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    SquaredEuclidean,
    Euclidean,
    /// `1 - cosine similarity`
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, f1: &FaceEmbedding, f2: &FaceEmbedding) -> f32 {
        match self {
            DistanceMetric::SquaredEuclidean => squared_euclidean(f1, f2),
            DistanceMetric::Euclidean => euclidean(f1, f2),
            DistanceMetric::Cosine => 1.0 - cosine(f1, f2),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::distance::{cosine, euclidean, squared_euclidean, DistanceMetric};
    use crate::identity::embedding::FaceEmbedding;
    use crate::EPS;

    #[test]
    fn euclidean_distances() {
        let v1 = FaceEmbedding::from(vec![1f32, 0.0, 0.0]);
        let v2 = FaceEmbedding::from(vec![0f32, 1.0f32, 0.0]);
        let d = euclidean(&v1, &v1);
        assert!(d.abs() < EPS);

        let d = euclidean(&v1, &v2);
        assert!((d - 2.0f32.sqrt()).abs() < EPS);

        let d = squared_euclidean(&v1, &v2);
        assert!((d - 2.0).abs() < EPS);
    }

    #[test]
    fn long_embeddings() {
        let v1 = FaceEmbedding::from(vec![0.5f32; 512]);
        let v2 = FaceEmbedding::from(vec![0.25f32; 512]);
        let d = squared_euclidean(&v1, &v2);
        assert!((d - 512.0 * 0.0625).abs() < 1e-3);
    }

    #[test]
    fn cosine_distances() {
        let v1 = dbg!(FaceEmbedding::from(vec![1f32, 0.0, 0.0]));
        let v2 = dbg!(FaceEmbedding::from(vec![0f32, 1.0f32, 0.0]));
        let v3 = dbg!(FaceEmbedding::from(vec![-1.0f32, 0.0, 0.0]));
        let d = cosine(&v1, &v1);
        assert!((d - 1.0).abs() < EPS);
        let d = cosine(&v1, &v3);
        assert!((d + 1.0).abs() < EPS);
        let d = cosine(&v1, &v2);
        assert!(d.abs() < EPS);

        let d = DistanceMetric::Cosine.distance(&v1, &v1);
        assert!(d.abs() < EPS);
        let d = DistanceMetric::Cosine.distance(&v1, &v3);
        assert!((d - 2.0).abs() < EPS);

        let zero = FaceEmbedding::from(vec![0.0f32; 3]);
        assert_eq!(cosine(&v1, &zero), 0.0);
        assert!((DistanceMetric::Cosine.distance(&zero, &v2) - 1.0).abs() < EPS);
    }
}
