use crate::EdError;
use ndarray::Array2;
use ndarray_npy::read_npy;
use std::path::{Path, PathBuf};

/// Precomputed per-row embeddings for one split, indexed by data row.
#[derive(Debug, Clone)]
pub struct Embeddings {
    matrix: Array2<f32>,
}

impl Embeddings {
    /// `<prefix><split>.npy`, the prefix is concatenated as-is.
    pub fn path_for(prefix: &str, split: &str) -> PathBuf {
        PathBuf::from(format!("{prefix}{split}.npy"))
    }

    /// Load a 2-D `.npy` matrix of f32 or f64 values.
    pub fn load(path: &Path) -> Result<Self, EdError> {
        if !path.exists() {
            return Err(EdError::Embedding(format!(
                "embedding file {} not found",
                path.display()
            )));
        }
        let matrix = match read_npy::<_, Array2<f32>>(path) {
            Ok(m) => m,
            Err(f32_err) => match read_npy::<_, Array2<f64>>(path) {
                Ok(m) => m.mapv(|v| v as f32),
                Err(_) => {
                    return Err(EdError::Embedding(format!("{}: {f32_err}", path.display())));
                }
            },
        };
        log::info!(
            "loaded {} embeddings of dim {} from {}",
            matrix.nrows(),
            matrix.ncols(),
            path.display()
        );
        Ok(Self { matrix })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EdError> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != dim) {
            return Err(EdError::Embedding("rows have differing dimensions".into()));
        }
        let n = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| EdError::Embedding(e.to_string()))?;
        Ok(Self { matrix })
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn row(&self, index: usize) -> Option<Vec<f32>> {
        (index < self.matrix.nrows()).then(|| self.matrix.row(index).to_vec())
    }

    /// Like [`Embeddings::row`] but a missing row is an error.
    pub fn require_row(&self, index: usize) -> Result<Vec<f32>, EdError> {
        self.row(index).ok_or_else(|| {
            EdError::Embedding(format!(
                "no embedding for data row {index} ({} rows loaded)",
                self.len()
            ))
        })
    }
}
