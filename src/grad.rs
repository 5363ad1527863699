//! Numeric differentiation of a model's loss with respect to its parameters.
//!
//! This is the crate's stand-in for an external differentiation engine: given
//! `loss . forward` as a black box, it produces one gradient tensor per
//! registered parameter, same shape, via central differences. It is the
//! default [`Model::backward`](crate::model::Model::backward) and the test
//! oracle for analytic gradients.

use ndarray::{Array1, ArrayD};

use crate::error::{Result, SolverErr};
use crate::model::{Mode, Model, ParamSet};

/// Step size for central differences, sized for `f32` loss surfaces.
const H: f32 = 1e-2;

/// Computes the batch loss and central-difference gradients for every
/// registered parameter.
///
/// Parameters are perturbed in place one element at a time and restored
/// before returning. `grads` must be index-aligned with `params` (as
/// produced by [`ParamSet::zero_grads`]); it gets overwritten.
///
/// # Returns
/// The unperturbed batch loss.
pub fn numeric_loss_grads<M: Model>(
    model: &M,
    params: &mut ParamSet,
    x: &ArrayD<f32>,
    labels: &Array1<usize>,
    grads: &mut [ArrayD<f32>],
) -> Result<f32> {
    if grads.len() != params.len() {
        return Err(SolverErr::ShapeMismatch {
            what: "gradient buffers",
            got: grads.len(),
            expected: params.len(),
        });
    }

    let loss = eval(model, params, x, labels)?;

    for i in 0..params.len() {
        let len = params.value(i)?.len();

        for j in 0..len {
            nudge(params, i, j, H)?;
            let plus = eval(model, params, x, labels)?;
            nudge(params, i, j, -2.0 * H)?;
            let minus = eval(model, params, x, labels)?;
            nudge(params, i, j, H)?;

            let slot = grads[i]
                .as_slice_mut()
                .ok_or(SolverErr::InvalidConfig("gradient buffer is not contiguous"))?;
            slot[j] = (plus - minus) / (2.0 * H);
        }
    }

    Ok(loss)
}

fn eval<M: Model>(
    model: &M,
    params: &ParamSet,
    x: &ArrayD<f32>,
    labels: &Array1<usize>,
) -> Result<f32> {
    let scores = model.forward(params, x, Mode::Train)?;
    model.loss(&scores, labels)
}

fn nudge(params: &mut ParamSet, index: usize, element: usize, delta: f32) -> Result<()> {
    let value = params.value_mut(index)?;
    let slice = value
        .as_slice_mut()
        .ok_or(SolverErr::InvalidConfig("parameter tensor is not contiguous"))?;
    slice[element] += delta;
    Ok(())
}
