use crate::embeddings::cosine_similarity;
use crate::error::{Result, VectorStoreError};

/// Exhaustive cosine-similarity index over positionally addressed vectors
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a vector, returning its position
    pub fn push(&mut self, vector: Vec<f32>) -> Result<usize> {
        self.check_dimension(&vector)?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Overwrite the vector stored at `position`
    pub fn replace(&mut self, position: usize, vector: Vec<f32>) -> Result<()> {
        self.check_dimension(&vector)?;
        let slot = self
            .vectors
            .get_mut(position)
            .ok_or_else(|| VectorStoreError::Other(format!("no vector at position {position}")))?;
        *slot = vector;
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(Vec::as_slice)
    }

    /// k nearest neighbours as (position, score), best first.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, cosine_similarity(query, vector)))
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);

        Ok(scores)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
