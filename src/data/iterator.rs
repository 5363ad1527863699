use rand::Rng;
use rand::seq::SliceRandom;

use super::dataset::{Batch, Dataset};
use crate::error::{Result, SolverErr};

/// Yields shuffled or sequential mini-batches over a [`Dataset`].
///
/// One epoch is one pass from a `reset` to exhaustion. Exhaustion is
/// signalled by `None` from [`next_batch`](Self::next_batch); it is an
/// end-of-epoch marker, never an error. A malformed batch size is rejected
/// at construction instead.
#[derive(Debug, Clone)]
pub struct BatchIter {
    dataset: Dataset,
    order: Vec<usize>,
    batch_size: usize,
    shuffle: bool,
    cursor: usize,
}

impl BatchIter {
    /// Creates a new `BatchIter`.
    ///
    /// # Arguments
    /// * `dataset` - The samples to iterate over.
    /// * `batch_size` - Rows per batch.
    /// * `shuffle` - Whether `reset` draws a fresh uniform permutation.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `batch_size` is zero or exceeds the
    /// dataset length.
    pub fn new(dataset: Dataset, batch_size: usize, shuffle: bool) -> Result<Self> {
        if batch_size == 0 {
            return Err(SolverErr::InvalidConfig("batch_size must be > 0"));
        }

        if batch_size > dataset.len() {
            return Err(SolverErr::InvalidConfig(
                "batch_size must not exceed the dataset length",
            ));
        }

        let order = (0..dataset.len()).collect();

        Ok(Self {
            dataset,
            order,
            batch_size,
            shuffle,
            cursor: 0,
        })
    }

    /// Rewinds the cursor and, if shuffling is enabled, redraws the index
    /// permutation.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        if self.shuffle {
            self.order.shuffle(rng);
        }

        self.cursor = 0;
    }

    /// Returns the next batch, or `None` once the epoch is exhausted.
    ///
    /// Batches hold exactly `batch_size` rows while enough samples remain;
    /// when the dataset length is not divisible by the batch size, the final
    /// batch of the epoch is returned short rather than dropped or padded.
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.gather(&self.order[self.cursor..end]);

        self.cursor = end;
        Some(batch)
    }

    /// Returns the number of batches one epoch yields.
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}
