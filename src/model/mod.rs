pub mod layers;
mod params;
mod two_layer;

pub use params::ParamSet;
pub use two_layer::TwoLayerNet;

use ndarray::{Array1, Array2, ArrayD};

use crate::error::Result;
use crate::grad;

/// Whether a forward pass runs under training or inference semantics.
///
/// None of the layers shipped here behave differently between the two, but
/// the distinction is part of the model contract so that mode-sensitive
/// layers can be added without touching the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Inference,
}

/// A trainable model.
///
/// This is a capability contract, not a base class: any type that can
/// register its parameter slots, map a batch to predictions, and score
/// predictions against labels can be driven by the solver. Gradients come
/// from [`backward`](Self::backward), which defaults to numeric
/// differentiation through `forward` and `loss`; models with a cheaper
/// analytic derivation should override it.
pub trait Model {
    /// Registers every trainable parameter slot on `params`.
    ///
    /// # Errors
    /// Returns `DuplicateParam` if a name is registered twice.
    fn register_params(&self, params: &mut ParamSet) -> Result<()>;

    /// Computes raw prediction scores for a batch.
    ///
    /// Must be a pure function of the current parameter values and the
    /// input; it must not mutate parameters.
    ///
    /// # Errors
    /// Returns `Uninitialized` when a parameter has no value yet and
    /// `ShapeMismatch` when the batch is incompatible with the registered
    /// shapes.
    fn forward(&self, params: &ParamSet, x: &ArrayD<f32>, mode: Mode) -> Result<Array2<f32>>;

    /// Scores predictions against ground-truth labels.
    ///
    /// The result is the scalar differentiation target; it is also what the
    /// solver reports.
    fn loss(&self, scores: &Array2<f32>, labels: &Array1<usize>) -> Result<f32>;

    /// Computes the batch loss and one gradient per registered parameter.
    ///
    /// `grads` is index-aligned with `params` and gets overwritten, not
    /// accumulated into. Parameter values must be left unchanged on return.
    ///
    /// # Returns
    /// The batch loss.
    fn backward(
        &self,
        params: &mut ParamSet,
        x: &ArrayD<f32>,
        labels: &Array1<usize>,
        grads: &mut [ArrayD<f32>],
    ) -> Result<f32>
    where
        Self: Sized,
    {
        grad::numeric_loss_grads(self, params, x, labels, grads)
    }
}
