use ultraviolet::f32x8;

/// Number of SIMD lanes used to store embedding parts internally
const EMBEDDING_LANES_SIZE: usize = 8;

/// Face embedding produced by an external face model for a person track.
///
/// The values are kept in 8-lane SIMD blocks; the tail of the last block is zero-padded, which
/// doesn't affect euclidian or dot-product based distances.
///
#[derive(Clone, Debug, Default)]
pub struct FaceEmbedding {
    blocks: Vec<f32x8>,
    dim: usize,
}

impl FaceEmbedding {
    pub fn new(values: &[f32]) -> Self {
        let one_more = usize::from(values.len() % EMBEDDING_LANES_SIZE > 0);
        let mut blocks = Vec::with_capacity(values.len() / EMBEDDING_LANES_SIZE + one_more);
        for chunk in values.chunks(EMBEDDING_LANES_SIZE) {
            let mut acc: [f32; EMBEDDING_LANES_SIZE] = [0.0; EMBEDDING_LANES_SIZE];
            acc[..chunk.len()].copy_from_slice(chunk);
            blocks.push(f32x8::new(acc));
        }
        Self {
            blocks,
            dim: values.len(),
        }
    }

    /// Number of values in the embedding
    ///
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    pub(crate) fn blocks(&self) -> &[f32x8] {
        &self.blocks
    }

    pub fn is_finite(&self) -> bool {
        self.to_vec().iter().all(|v| v.is_finite())
    }

    pub fn to_vec(&self) -> Vec<f32> {
        let mut res = Vec::with_capacity(self.blocks.len() * EMBEDDING_LANES_SIZE);
        for e in &self.blocks {
            res.extend_from_slice(e.as_array_ref());
        }
        res.truncate(self.dim);
        res
    }
}

impl From<Vec<f32>> for FaceEmbedding {
    fn from(v: Vec<f32>) -> Self {
        Self::new(&v)
    }
}

impl From<&[f32]> for FaceEmbedding {
    fn from(v: &[f32]) -> Self {
        Self::new(v)
    }
}
