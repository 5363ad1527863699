//! Blocking loader for CIFAR-10-style binary batch files.
//!
//! Each record in a batch file is one label byte followed by a 3x32x32 block
//! of pixel bytes. Pixels are scaled to `[0, 1]` on load.

use std::fs;
use std::path::Path;

use log::info;
use ndarray::{Array1, ArrayD, IxDyn};

use super::dataset::Dataset;
use crate::error::{Result, SolverErr};

const IMAGE_BYTES: usize = 3 * 32 * 32;
const RECORD_BYTES: usize = 1 + IMAGE_BYTES;

const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

/// The train/test split produced by [`load_cifar10`].
#[derive(Debug, Clone)]
pub struct DataBundle {
    pub train: Dataset,
    pub test: Dataset,
}

/// Loads the CIFAR-10 binary batches found in `dir`.
///
/// # Arguments
/// * `dir` - Directory containing `data_batch_1.bin` .. `data_batch_5.bin`
///   and `test_batch.bin`.
///
/// # Errors
/// Returns `Io` when a file cannot be read and `ShapeMismatch` when a file
/// is not a whole number of records.
pub fn load_cifar10(dir: &Path) -> Result<DataBundle> {
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for file in TRAIN_FILES {
        read_batch_file(&dir.join(file), &mut features, &mut labels)?;
    }
    let train = into_dataset(features, labels)?;

    let mut features = Vec::new();
    let mut labels = Vec::new();
    read_batch_file(&dir.join(TEST_FILE), &mut features, &mut labels)?;
    let test = into_dataset(features, labels)?;

    info!(
        "loaded cifar10 from {}: {} train / {} test samples",
        dir.display(),
        train.len(),
        test.len()
    );

    Ok(DataBundle { train, test })
}

fn read_batch_file(path: &Path, features: &mut Vec<f32>, labels: &mut Vec<usize>) -> Result<()> {
    let bytes = fs::read(path)?;

    if !bytes.len().is_multiple_of(RECORD_BYTES) {
        return Err(SolverErr::ShapeMismatch {
            what: "cifar10 batch file",
            got: bytes.len() % RECORD_BYTES,
            expected: 0,
        });
    }

    for record in bytes.chunks_exact(RECORD_BYTES) {
        labels.push(record[0] as usize);
        features.extend(record[1..].iter().map(|&b| b as f32 / 255.0));
    }

    Ok(())
}

fn into_dataset(features: Vec<f32>, labels: Vec<usize>) -> Result<Dataset> {
    let n = labels.len();
    let len = features.len();
    let features = ArrayD::from_shape_vec(IxDyn(&[n, 3, 32, 32]), features).map_err(|_| {
        SolverErr::ShapeMismatch {
            what: "cifar10 features",
            got: len,
            expected: n * IMAGE_BYTES,
        }
    })?;

    Dataset::new(features, Array1::from(labels))
}
