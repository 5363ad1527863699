//! First-order update rules and their per-parameter running state.

use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverErr};

/// A parameter update rule.
///
/// Each variant carries its own strongly-typed hyperparameters; unknown rule
/// names fail at configuration parse time. A rule maps (parameter, gradient,
/// rule-specific state) to the updated pair, in place. The solver owns one
/// [`RuleState`] per parameter and threads it across steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    Sgd {
        learning_rate: f32,
    },
    Momentum {
        learning_rate: f32,
        momentum: f32,
    },
    RmsProp {
        learning_rate: f32,
        decay_rate: f32,
        epsilon: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
}

/// Per-parameter running state owned by the solver.
#[derive(Debug, Clone)]
pub enum RuleState {
    /// Plain sgd keeps nothing between steps.
    Empty,
    /// Momentum keeps a velocity buffer.
    Velocity(ArrayD<f32>),
    /// Rmsprop keeps a decaying average of squared gradients.
    Cache(ArrayD<f32>),
    /// Adam keeps both moment estimates and a step counter for bias
    /// correction.
    Moments {
        m: ArrayD<f32>,
        v: ArrayD<f32>,
        t: u32,
    },
}

impl UpdateRule {
    /// Allocates the state this rule needs for one parameter of `shape`.
    pub fn state_for(&self, shape: &[usize]) -> RuleState {
        match self {
            UpdateRule::Sgd { .. } => RuleState::Empty,
            UpdateRule::Momentum { .. } => RuleState::Velocity(ArrayD::zeros(IxDyn(shape))),
            UpdateRule::RmsProp { .. } => RuleState::Cache(ArrayD::zeros(IxDyn(shape))),
            UpdateRule::Adam { .. } => RuleState::Moments {
                m: ArrayD::zeros(IxDyn(shape)),
                v: ArrayD::zeros(IxDyn(shape)),
                t: 0,
            },
        }
    }

    /// Applies one update step to `param` in place.
    ///
    /// # Arguments
    /// * `param` - The parameter tensor to move.
    /// * `grad` - Its gradient, same shape.
    /// * `state` - The state previously produced by
    ///   [`state_for`](Self::state_for) for this parameter.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when `grad` disagrees with `param` and
    /// `InvalidConfig` when `state` belongs to a different rule.
    pub fn apply(
        &self,
        param: &mut ArrayD<f32>,
        grad: &ArrayD<f32>,
        state: &mut RuleState,
    ) -> Result<()> {
        if param.shape() != grad.shape() {
            return Err(SolverErr::ShapeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: param.len(),
            });
        }

        match (*self, state) {
            (UpdateRule::Sgd { learning_rate }, RuleState::Empty) => {
                param.scaled_add(-learning_rate, grad);
            }
            (
                UpdateRule::Momentum {
                    learning_rate,
                    momentum,
                },
                RuleState::Velocity(v),
            ) => {
                v.zip_mut_with(grad, |v, &g| *v = momentum * *v - learning_rate * g);
                *param += &*v;
            }
            (
                UpdateRule::RmsProp {
                    learning_rate,
                    decay_rate,
                    epsilon,
                },
                RuleState::Cache(cache),
            ) => {
                cache.zip_mut_with(grad, |c, &g| *c = decay_rate * *c + (1.0 - decay_rate) * g * g);
                Zip::from(param.view_mut())
                    .and(grad.view())
                    .and(cache.view())
                    .for_each(|p, &g, &c| *p -= learning_rate * g / (c.sqrt() + epsilon));
            }
            (
                UpdateRule::Adam {
                    learning_rate,
                    beta1,
                    beta2,
                    epsilon,
                },
                RuleState::Moments { m, v, t },
            ) => {
                *t += 1;
                m.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
                v.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

                let m_scale = 1.0 / (1.0 - beta1.powi(*t as i32));
                let v_scale = 1.0 / (1.0 - beta2.powi(*t as i32));

                Zip::from(param.view_mut())
                    .and(m.view())
                    .and(v.view())
                    .for_each(|p, &m, &v| {
                        *p -= learning_rate * (m * m_scale) / ((v * v_scale).sqrt() + epsilon);
                    });
            }
            _ => {
                return Err(SolverErr::InvalidConfig(
                    "optimizer state does not belong to this update rule",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn dyn1(values: &[f32]) -> ArrayD<f32> {
        arr1(values).into_dyn()
    }

    #[test]
    fn sgd_steps_against_the_gradient() {
        let rule = UpdateRule::Sgd { learning_rate: 0.5 };
        let mut param = dyn1(&[1.0, -2.0]);
        let grad = dyn1(&[0.5, -1.0]);
        let mut state = rule.state_for(&[2]);

        rule.apply(&mut param, &grad, &mut state).unwrap();
        assert_eq!(param, dyn1(&[0.75, -1.5]));
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let rule = UpdateRule::Momentum {
            learning_rate: 0.1,
            momentum: 0.9,
        };
        let mut param = dyn1(&[0.0]);
        let grad = dyn1(&[1.0]);
        let mut state = rule.state_for(&[1]);

        // v1 = -0.1, v2 = 0.9 * -0.1 - 0.1 = -0.19
        rule.apply(&mut param, &grad, &mut state).unwrap();
        rule.apply(&mut param, &grad, &mut state).unwrap();
        assert!((param[[0]] - (-0.29)).abs() < 1e-6);
    }

    #[test]
    fn rmsprop_divides_by_the_running_cache() {
        let rule = UpdateRule::RmsProp {
            learning_rate: 0.1,
            decay_rate: 0.9,
            epsilon: 1e-8,
        };
        let mut param = dyn1(&[0.0]);
        let grad = dyn1(&[2.0]);
        let mut state = rule.state_for(&[1]);

        rule.apply(&mut param, &grad, &mut state).unwrap();

        // cache = 0.1 * 4 = 0.4; step = 0.1 * 2 / sqrt(0.4)
        let expected = -0.1 * 2.0 / 0.4f32.sqrt();
        assert!((param[[0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn adam_first_step_moves_by_the_learning_rate() {
        let rule = UpdateRule::Adam {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        };
        let mut param = dyn1(&[1.0]);
        let grad = dyn1(&[3.0]);
        let mut state = rule.state_for(&[1]);

        rule.apply(&mut param, &grad, &mut state).unwrap();

        // Bias correction makes the first step -lr * g / (|g| + eps).
        assert!((param[[0]] - (1.0 - 0.001)).abs() < 1e-5);
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let rule = UpdateRule::Sgd { learning_rate: 0.1 };
        let mut param = dyn1(&[0.0]);
        let grad = dyn1(&[1.0]);
        let mut state = RuleState::Velocity(dyn1(&[0.0]));

        assert!(matches!(
            rule.apply(&mut param, &grad, &mut state),
            Err(SolverErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn mismatched_gradient_shape_is_rejected() {
        let rule = UpdateRule::Sgd { learning_rate: 0.1 };
        let mut param = dyn1(&[0.0, 0.0]);
        let grad = dyn1(&[1.0]);
        let mut state = rule.state_for(&[2]);

        assert!(matches!(
            rule.apply(&mut param, &grad, &mut state),
            Err(SolverErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rule_names_parse_from_snake_case_json() {
        let rule: UpdateRule =
            serde_json::from_str(r#"{"adam": {"learning_rate": 0.001, "beta1": 0.9, "beta2": 0.999, "epsilon": 1e-8}}"#)
                .unwrap();
        assert!(matches!(rule, UpdateRule::Adam { .. }));

        assert!(serde_json::from_str::<UpdateRule>(r#"{"adagrad": {"learning_rate": 0.1}}"#).is_err());
    }
}
