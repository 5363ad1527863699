use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverErr};
use crate::init::InitRule;
use crate::optim::UpdateRule;

/// Options resolved once at solver construction.
///
/// Every field is validated up front; a bad value is fatal before any
/// training state exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of passes over the training set per `train` call.
    pub num_epochs: usize,
    /// How parameters are filled by `init`.
    pub init: InitRule,
    /// How parameters move on each step.
    pub update: UpdateRule,
    /// Whether periodic loss reports are emitted.
    pub verbose: bool,
    /// Report the most recent loss every this many steps.
    pub print_every: usize,
    /// Seed for the solver's rng; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            num_epochs: 10,
            init: InitRule::Gaussian { std_dev: 1e-2 },
            update: UpdateRule::Sgd {
                learning_rate: 1e-2,
            },
            verbose: true,
            print_every: 10,
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Checks the option domain.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a zero epoch count or reporting period.
    pub fn validate(&self) -> Result<()> {
        if self.num_epochs == 0 {
            return Err(SolverErr::InvalidConfig("num_epochs must be >= 1"));
        }

        if self.print_every == 0 {
            return Err(SolverErr::InvalidConfig("print_every must be >= 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_epochs_is_rejected() {
        let config = SolverConfig {
            num_epochs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_print_every_is_rejected() {
        let config = SolverConfig {
            print_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{
            "num_epochs": 3,
            "update": {"momentum": {"learning_rate": 0.05, "momentum": 0.9}},
            "seed": 7
        }"#;

        let config: SolverConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.seed, Some(7));
        assert!(matches!(config.update, UpdateRule::Momentum { .. }));
        assert!(matches!(config.init, InitRule::Gaussian { .. }));
        assert!(config.verbose);
    }
}
