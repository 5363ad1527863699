//! Parameter initialization rules.

use ndarray::{ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverErr};

/// A rule for filling a parameter tensor with starting values.
///
/// A closed enumeration: unknown rule names fail when the configuration is
/// deserialized, not at first use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitRule {
    /// Zero-mean normal draws with the given standard deviation.
    Gaussian { std_dev: f32 },
    /// Every element set to the same value.
    Constant { value: f32 },
    /// Uniform draws in `[low, high)`.
    Uniform { low: f32, high: f32 },
    /// Uniform draws in the Xavier/Glorot bound derived from the tensor's
    /// fan-in and fan-out.
    Xavier,
}

impl InitRule {
    /// Produces one tensor of the given shape according to the rule.
    ///
    /// # Arguments
    /// * `shape` - The declared shape of the parameter slot.
    /// * `rng` - The random number generator to draw from.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the rule's own hyperparameters are out
    /// of domain (non-finite standard deviation, inverted uniform range).
    pub fn tensor<R: Rng>(&self, shape: &[usize], rng: &mut R) -> Result<ArrayD<f32>> {
        match *self {
            InitRule::Gaussian { std_dev } => {
                let dist = Normal::new(0.0, std_dev)
                    .map_err(|_| SolverErr::InvalidConfig("gaussian std_dev must be finite"))?;
                Ok(ArrayD::random_using(IxDyn(shape), dist, rng))
            }
            InitRule::Constant { value } => Ok(ArrayD::from_elem(IxDyn(shape), value)),
            InitRule::Uniform { low, high } => {
                let dist = Uniform::new(low, high)
                    .map_err(|_| SolverErr::InvalidConfig("uniform range must satisfy low < high"))?;
                Ok(ArrayD::random_using(IxDyn(shape), dist, rng))
            }
            InitRule::Xavier => {
                let bound = xavier_bound(shape);
                let dist = Uniform::new(-bound, bound)
                    .map_err(|_| SolverErr::InvalidConfig("xavier bound degenerated"))?;
                Ok(ArrayD::random_using(IxDyn(shape), dist, rng))
            }
        }
    }
}

/// `sqrt(6 / (fan_in + fan_out))`, with fan-in/out read off the first and
/// last axis. A rank-1 tensor (a bias) uses its single extent for both.
fn xavier_bound(shape: &[usize]) -> f32 {
    let fan_in = shape[0];
    let fan_out = shape[shape.len() - 1];
    (6.0 / (fan_in + fan_out) as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn constant_zero_fills_declared_shapes_with_zeros() {
        let mut rng = StdRng::seed_from_u64(0);
        let rule = InitRule::Constant { value: 0.0 };

        for shape in [&[10usize, 4] as &[usize], &[4]] {
            let tensor = rule.tensor(shape, &mut rng).unwrap();
            assert_eq!(tensor.shape(), shape);
            assert!(tensor.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn gaussian_respects_std_dev_scale() {
        let mut rng = StdRng::seed_from_u64(1);
        let rule = InitRule::Gaussian { std_dev: 0.01 };
        let tensor = rule.tensor(&[1000], &mut rng).unwrap();

        let mean = tensor.sum() / 1000.0;
        assert!(mean.abs() < 0.005);
        assert!(tensor.iter().all(|&v| v.abs() < 0.1));
    }

    #[test]
    fn gaussian_rejects_non_finite_std_dev() {
        let mut rng = StdRng::seed_from_u64(0);
        let rule = InitRule::Gaussian { std_dev: f32::NAN };
        assert!(rule.tensor(&[2], &mut rng).is_err());
    }

    #[test]
    fn xavier_draws_stay_inside_the_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        let tensor = InitRule::Xavier.tensor(&[10, 4], &mut rng).unwrap();

        let bound = (6.0f32 / 14.0).sqrt();
        assert!(tensor.iter().all(|&v| v.abs() <= bound));
    }

    #[test]
    fn uniform_rejects_inverted_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let rule = InitRule::Uniform { low: 1.0, high: -1.0 };
        assert!(rule.tensor(&[2], &mut rng).is_err());
    }

    #[test]
    fn rule_names_parse_from_snake_case_json() {
        let rule: InitRule = serde_json::from_str(r#"{"gaussian": {"std_dev": 0.001}}"#).unwrap();
        assert!(matches!(rule, InitRule::Gaussian { .. }));

        assert!(serde_json::from_str::<InitRule>(r#"{"orthogonal": {}}"#).is_err());
    }
}
