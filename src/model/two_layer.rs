use ndarray::{Array1, Array2, ArrayD, ArrayView2, Ix1, Ix2};

use super::{Mode, Model, ParamSet, layers};
use crate::error::{Result, SolverErr};

/// A fully-connected network with one hidden layer:
/// flatten -> affine -> relu -> affine -> scores.
///
/// All dimensions are explicit construction arguments; nothing is captured
/// from the environment.
#[derive(Debug, Clone)]
pub struct TwoLayerNet {
    input_dim: usize,
    hidden_dim: usize,
    num_classes: usize,
}

impl TwoLayerNet {
    /// Creates a new `TwoLayerNet`.
    ///
    /// # Arguments
    /// * `input_dim` - Flattened per-sample feature size.
    /// * `hidden_dim` - Width of the hidden layer.
    /// * `num_classes` - Number of output classes.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when any dimension is zero.
    pub fn new(input_dim: usize, hidden_dim: usize, num_classes: usize) -> Result<Self> {
        if input_dim == 0 || hidden_dim == 0 || num_classes == 0 {
            return Err(SolverErr::InvalidConfig(
                "network dimensions must be positive",
            ));
        }

        Ok(Self {
            input_dim,
            hidden_dim,
            num_classes,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Flattens a batch of arbitrary-rank features into `(n, input_dim)`.
    fn flatten<'a>(&self, x: &'a ArrayD<f32>) -> Result<ArrayView2<'a, f32>> {
        let n = x.shape()[0];
        let dim: usize = x.shape()[1..].iter().product();

        if dim != self.input_dim {
            return Err(SolverErr::ShapeMismatch {
                what: "input batch",
                got: dim,
                expected: self.input_dim,
            });
        }

        x.view()
            .into_shape_with_order((n, dim))
            .map_err(|_| SolverErr::ShapeMismatch {
                what: "input batch layout",
                got: dim,
                expected: self.input_dim,
            })
    }
}

fn as_mat(p: &ArrayD<f32>) -> Result<ArrayView2<'_, f32>> {
    p.view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| SolverErr::ShapeMismatch {
            what: "weight rank",
            got: p.ndim(),
            expected: 2,
        })
}

fn as_vec(p: &ArrayD<f32>) -> Result<ndarray::ArrayView1<'_, f32>> {
    p.view()
        .into_dimensionality::<Ix1>()
        .map_err(|_| SolverErr::ShapeMismatch {
            what: "bias rank",
            got: p.ndim(),
            expected: 1,
        })
}

impl Model for TwoLayerNet {
    fn register_params(&self, params: &mut ParamSet) -> Result<()> {
        params.register("w1", &[self.input_dim, self.hidden_dim])?;
        params.register("b1", &[self.hidden_dim])?;
        params.register("w2", &[self.hidden_dim, self.num_classes])?;
        params.register("b2", &[self.num_classes])?;
        Ok(())
    }

    fn forward(&self, params: &ParamSet, x: &ArrayD<f32>, _mode: Mode) -> Result<Array2<f32>> {
        let x = self.flatten(x)?;
        let w1 = params.get("w1")?;
        let b1 = params.get("b1")?;
        let w2 = params.get("w2")?;
        let b2 = params.get("b2")?;

        let hidden = layers::relu(&layers::affine(x, as_mat(w1)?, as_vec(b1)?)?);
        layers::affine(hidden.view(), as_mat(w2)?, as_vec(b2)?)
    }

    fn loss(&self, scores: &Array2<f32>, labels: &Array1<usize>) -> Result<f32> {
        layers::softmax_cross_entropy(scores.view(), labels)
    }

    fn backward(
        &self,
        params: &mut ParamSet,
        x: &ArrayD<f32>,
        labels: &Array1<usize>,
        grads: &mut [ArrayD<f32>],
    ) -> Result<f32> {
        let i_w1 = params.index_of("w1")?;
        let i_b1 = params.index_of("b1")?;
        let i_w2 = params.index_of("w2")?;
        let i_b2 = params.index_of("b2")?;

        let x = self.flatten(x)?;
        let w1 = as_mat(params.value(i_w1)?)?;
        let b1 = as_vec(params.value(i_b1)?)?;
        let w2 = as_mat(params.value(i_w2)?)?;
        let b2 = as_vec(params.value(i_b2)?)?;

        let pre_hidden = layers::affine(x, w1, b1)?;
        let hidden = layers::relu(&pre_hidden);
        let scores = layers::affine(hidden.view(), w2, b2)?;
        let loss = layers::softmax_cross_entropy(scores.view(), labels)?;

        let d_scores = layers::softmax_cross_entropy_backward(scores.view(), labels);
        let (d_hidden, dw2, db2) = layers::affine_backward(d_scores.view(), hidden.view(), w2);
        let d_pre = layers::relu_backward(&d_hidden, &pre_hidden);
        let (_, dw1, db1) = layers::affine_backward(d_pre.view(), x, w1);

        grads[i_w1].assign(&dw1);
        grads[i_b1].assign(&db1);
        grads[i_w2].assign(&dw2);
        grads[i_b2].assign(&db2);

        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn init_zeros(params: &mut ParamSet) {
        for i in 0..params.len() {
            let shape = params.shape(i).to_vec();
            params.set(i, ArrayD::zeros(IxDyn(&shape))).unwrap();
        }
    }

    #[test]
    fn forward_before_init_fails() {
        let net = TwoLayerNet::new(4, 3, 2).unwrap();
        let mut params = ParamSet::new();
        net.register_params(&mut params).unwrap();

        let x = ArrayD::zeros(IxDyn(&[5, 4]));
        let err = net.forward(&params, &x, Mode::Train);
        assert!(matches!(err, Err(SolverErr::Uninitialized { .. })));
    }

    #[test]
    fn forward_produces_declared_output_shape() {
        let net = TwoLayerNet::new(4, 3, 2).unwrap();
        let mut params = ParamSet::new();
        net.register_params(&mut params).unwrap();
        init_zeros(&mut params);

        let x = ArrayD::zeros(IxDyn(&[5, 2, 2]));
        let scores = net.forward(&params, &x, Mode::Train).unwrap();
        assert_eq!(scores.shape(), &[5, 2]);
    }

    #[test]
    fn forward_rejects_wrong_feature_dim() {
        let net = TwoLayerNet::new(4, 3, 2).unwrap();
        let mut params = ParamSet::new();
        net.register_params(&mut params).unwrap();
        init_zeros(&mut params);

        let x = ArrayD::zeros(IxDyn(&[5, 3]));
        assert!(matches!(
            net.forward(&params, &x, Mode::Train),
            Err(SolverErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn registers_four_parameters() {
        let net = TwoLayerNet::new(10, 4, 3).unwrap();
        let mut params = ParamSet::new();
        net.register_params(&mut params).unwrap();

        assert_eq!(params.len(), 4);
        assert_eq!(params.shape(params.index_of("w1").unwrap()), &[10, 4]);
        assert_eq!(params.shape(params.index_of("b2").unwrap()), &[3]);
    }
}
