//! Layer functions and their backward counterparts.
//!
//! These are free functions over `ndarray` views rather than stateful layer
//! objects: each forward is pure, and each backward recomputes what it needs
//! from its inputs.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, SolverErr};

/// Computes `x . w + b` row-wise.
///
/// # Errors
/// Returns `ShapeMismatch` when the inner dimensions disagree.
pub fn affine(x: ArrayView2<f32>, w: ArrayView2<f32>, b: ArrayView1<f32>) -> Result<Array2<f32>> {
    if x.ncols() != w.nrows() {
        return Err(SolverErr::ShapeMismatch {
            what: "affine input",
            got: x.ncols(),
            expected: w.nrows(),
        });
    }

    if w.ncols() != b.len() {
        return Err(SolverErr::ShapeMismatch {
            what: "affine bias",
            got: b.len(),
            expected: w.ncols(),
        });
    }

    Ok(x.dot(&w) + &b)
}

/// Gradients of [`affine`] with respect to its input, weights and bias.
pub fn affine_backward(
    d_out: ArrayView2<f32>,
    x: ArrayView2<f32>,
    w: ArrayView2<f32>,
) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
    let dx = d_out.dot(&w.t());
    let dw = x.t().dot(&d_out);
    let db = d_out.sum_axis(Axis(0));
    (dx, dw, db)
}

/// Elementwise rectified linear unit.
pub fn relu(x: &Array2<f32>) -> Array2<f32> {
    x.mapv(|v| v.max(0.0))
}

/// Gradient of [`relu`]: passes `d_out` through where the input was positive.
pub fn relu_backward(d_out: &Array2<f32>, x: &Array2<f32>) -> Array2<f32> {
    let mut dx = d_out.clone();
    dx.zip_mut_with(x, |d, &v| {
        if v <= 0.0 {
            *d = 0.0;
        }
    });
    dx
}

/// Row-wise softmax with the max-subtraction trick.
pub fn softmax(scores: ArrayView2<f32>) -> Array2<f32> {
    let mut probs = scores.to_owned();

    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }

    probs
}

/// Mean softmax cross-entropy between raw scores and integer class labels.
///
/// Non-negative for any finite scores, since the log-sum-exp of a row is
/// never below the score it is compared against.
///
/// # Errors
/// Returns `ShapeMismatch` when the row count disagrees with the label
/// count, and when a label is outside `[0, num_classes)`.
pub fn softmax_cross_entropy(scores: ArrayView2<f32>, labels: &Array1<usize>) -> Result<f32> {
    if scores.nrows() != labels.len() {
        return Err(SolverErr::ShapeMismatch {
            what: "loss labels",
            got: labels.len(),
            expected: scores.nrows(),
        });
    }

    let classes = scores.ncols();
    let mut total = 0.0;

    for (row, &label) in scores.rows().into_iter().zip(labels.iter()) {
        if label >= classes {
            return Err(SolverErr::ShapeMismatch {
                what: "class label",
                got: label,
                expected: classes,
            });
        }

        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum_exp = max + row.mapv(|v| (v - max).exp()).sum().ln();
        total += log_sum_exp - row[label];
    }

    Ok(total / labels.len() as f32)
}

/// Gradient of [`softmax_cross_entropy`] with respect to the raw scores.
pub fn softmax_cross_entropy_backward(
    scores: ArrayView2<f32>,
    labels: &Array1<usize>,
) -> Array2<f32> {
    let n = labels.len() as f32;
    let mut d_scores = softmax(scores);

    for (mut row, &label) in d_scores.rows_mut().into_iter().zip(labels.iter()) {
        row[label] -= 1.0;
    }

    d_scores /= n;
    d_scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn affine_matches_hand_computation() {
        let x = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let w = arr2(&[[1.0, 0.0, 2.0], [0.0, 1.0, 1.0]]);
        let b = arr1(&[0.5, -0.5, 0.0]);

        let out = affine(x.view(), w.view(), b.view()).unwrap();
        assert_eq!(out, arr2(&[[1.5, 1.5, 4.0], [3.5, 3.5, 10.0]]));
    }

    #[test]
    fn affine_rejects_bad_inner_dim() {
        let x = arr2(&[[1.0, 2.0, 3.0]]);
        let w = arr2(&[[1.0], [1.0]]);
        let b = arr1(&[0.0]);
        assert!(affine(x.view(), w.view(), b.view()).is_err());
    }

    #[test]
    fn relu_zeroes_negatives_only() {
        let x = arr2(&[[-1.0, 0.0, 2.5]]);
        assert_eq!(relu(&x), arr2(&[[0.0, 0.0, 2.5]]));
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let scores = arr2(&[[1.0, 2.0, 3.0], [100.0, 100.0, 100.0]]);
        let probs = softmax(scores.view());

        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cross_entropy_is_non_negative() {
        let cases = [
            arr2(&[[0.0, 0.0], [0.0, 0.0]]),
            arr2(&[[10.0, -10.0], [-10.0, 10.0]]),
            arr2(&[[1e3, 1e3], [-1e3, 1e3]]),
        ];
        let labels = arr1(&[0usize, 1]);

        for scores in cases {
            let loss = softmax_cross_entropy(scores.view(), &labels).unwrap();
            assert!(loss >= 0.0, "loss {loss} for {scores:?}");
            assert!(loss.is_finite());
        }
    }

    #[test]
    fn cross_entropy_of_confident_correct_prediction_is_small() {
        let scores = arr2(&[[20.0, 0.0], [0.0, 20.0]]);
        let labels = arr1(&[0usize, 1]);
        let loss = softmax_cross_entropy(scores.view(), &labels).unwrap();
        assert!(loss < 1e-3);
    }

    #[test]
    fn cross_entropy_rejects_out_of_range_label() {
        let scores = arr2(&[[0.0, 0.0]]);
        let labels = arr1(&[2usize]);
        assert!(softmax_cross_entropy(scores.view(), &labels).is_err());
    }
}
