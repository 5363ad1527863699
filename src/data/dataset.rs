use ndarray::{Array1, ArrayD, Axis};

use crate::error::{Result, SolverErr};

/// An immutable, index-aligned pair of feature and label arrays.
///
/// Axis 0 of `features` is the sample axis; the remaining axes form the
/// per-sample feature shape (e.g. `(3, 32, 32)` for image data). Labels are
/// integer class ids, one per sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: ArrayD<f32>,
    labels: Array1<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `features` - The feature array; axis 0 indexes samples.
    /// * `labels` - One class id per sample.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an empty dataset and `ShapeMismatch` when
    /// the two arrays disagree on the number of samples.
    pub fn new(features: ArrayD<f32>, labels: Array1<usize>) -> Result<Self> {
        if features.ndim() == 0 || features.shape()[0] == 0 {
            return Err(SolverErr::InvalidConfig("dataset must be non-empty"));
        }

        if features.shape()[0] != labels.len() {
            return Err(SolverErr::ShapeMismatch {
                what: "labels",
                got: labels.len(),
                expected: features.shape()[0],
            });
        }

        Ok(Self { features, labels })
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the flattened per-sample feature size.
    pub fn feature_dim(&self) -> usize {
        self.features.shape()[1..].iter().product()
    }

    pub fn features(&self) -> &ArrayD<f32> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// Gathers the samples at `indices` into an owned batch.
    pub(crate) fn gather(&self, indices: &[usize]) -> Batch {
        Batch {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// An owned slice of aligned feature/label rows, produced fresh by the batch
/// iterator on every call and consumed by one forward/update step.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: ArrayD<f32>,
    pub labels: Array1<usize>,
}

impl Batch {
    /// Returns the number of rows in this batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
