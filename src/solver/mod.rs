mod config;

pub use config::SolverConfig;

use log::{debug, info, warn};
use ndarray::ArrayD;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::BatchIter;
use crate::error::Result;
use crate::model::{Mode, Model, ParamSet};
use crate::optim::RuleState;

/// Counters and metrics mutated only by the solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingState {
    epoch: usize,
    step: usize,
    best_val_accuracy: Option<f32>,
}

impl TrainingState {
    /// Returns the number of completed epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Returns the number of optimizer update steps performed.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns the best validation accuracy observed across epoch
    /// boundaries, if a validation iterator is configured.
    pub fn best_val_accuracy(&self) -> Option<f32> {
        self.best_val_accuracy
    }
}

/// Drives training: pulls batches, runs the model, applies the update rule,
/// and reports progress.
pub struct Solver<M: Model> {
    model: M,
    params: ParamSet,
    train_iter: BatchIter,
    val_iter: Option<BatchIter>,
    config: SolverConfig,
    opt_states: Vec<RuleState>,
    grads: Vec<ArrayD<f32>>,
    state: TrainingState,
    loss_history: Vec<f32>,
    rng: StdRng,
}

impl<M: Model> Solver<M> {
    /// Creates a new `Solver`.
    ///
    /// # Arguments
    /// * `model` - The model to train; its parameters are registered here.
    /// * `train_iter` - Batches for the training loop.
    /// * `val_iter` - Optional held-out batches scored at epoch boundaries.
    /// * `config` - Options, validated before anything is built.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for out-of-domain options and any
    /// registration error from the model.
    pub fn new(
        model: M,
        train_iter: BatchIter,
        val_iter: Option<BatchIter>,
        config: SolverConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut params = ParamSet::new();
        model.register_params(&mut params)?;

        let opt_states = (0..params.len())
            .map(|i| config.update.state_for(params.shape(i)))
            .collect();
        let grads = params.zero_grads();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            model,
            params,
            train_iter,
            val_iter,
            config,
            opt_states,
            grads,
            state: TrainingState::default(),
            loss_history: Vec::new(),
            rng,
        })
    }

    /// Fills every parameter from the configured init rule.
    ///
    /// Calling this again reinitializes from scratch: parameter values,
    /// optimizer state, and all counters are discarded, including any
    /// trained weights. `train` continues from existing counters instead.
    pub fn init(&mut self) -> Result<()> {
        for i in 0..self.params.len() {
            let tensor = self
                .config
                .init
                .tensor(self.params.shape(i), &mut self.rng)?;
            self.params.set(i, tensor)?;
        }

        for (i, state) in self.opt_states.iter_mut().enumerate() {
            *state = self.config.update.state_for(self.params.shape(i));
        }

        self.state = TrainingState::default();
        self.loss_history.clear();

        debug!("initialized {} parameters", self.params.len());
        Ok(())
    }

    /// Runs `num_epochs` epochs of training.
    ///
    /// Must be preceded by [`init`](Self::init). A second call does not
    /// reset the epoch and step counters; it continues training from the
    /// current parameter values.
    ///
    /// # Errors
    /// Returns `Uninitialized` when a parameter has no value yet, and any
    /// error surfaced by the model or the update rule.
    pub fn train(&mut self) -> Result<()> {
        self.params.ensure_initialized()?;

        for _ in 0..self.config.num_epochs {
            self.state.epoch += 1;
            self.train_iter.reset(&mut self.rng);

            while let Some(batch) = self.train_iter.next_batch() {
                let loss = self.model.backward(
                    &mut self.params,
                    &batch.features,
                    &batch.labels,
                    &mut self.grads,
                )?;

                if !loss.is_finite() {
                    warn!(
                        "epoch {}, step {}: non-finite loss = {loss}",
                        self.state.epoch,
                        self.state.step + 1
                    );
                }

                for (i, state) in self.opt_states.iter_mut().enumerate() {
                    let param = self.params.value_mut(i)?;
                    self.config.update.apply(param, &self.grads[i], state)?;
                }

                self.state.step += 1;
                self.loss_history.push(loss);

                if self.config.verbose && self.state.step % self.config.print_every == 0 {
                    info!(
                        "epoch {}, step {}: loss = {loss}",
                        self.state.epoch, self.state.step
                    );
                }
            }

            if let Some(iter) = self.val_iter.as_mut() {
                let accuracy = eval_on(&self.model, &self.params, iter, &mut self.rng)?;
                info!(
                    "epoch {} validation: accuracy = {accuracy}",
                    self.state.epoch
                );

                let best = self.state.best_val_accuracy.get_or_insert(accuracy);
                *best = best.max(accuracy);
            }
        }

        Ok(())
    }

    /// Scores the model over `iter` in inference mode.
    ///
    /// # Returns
    /// The fraction of samples whose argmax score matches the label.
    pub fn evaluate(&mut self, iter: &mut BatchIter) -> Result<f32> {
        eval_on(&self.model, &self.params, iter, &mut self.rng)
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Returns the per-step loss series recorded since the last `init`.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

fn eval_on<M: Model, R: Rng>(
    model: &M,
    params: &ParamSet,
    iter: &mut BatchIter,
    rng: &mut R,
) -> Result<f32> {
    iter.reset(rng);

    let mut correct = 0usize;
    let mut total = 0usize;

    while let Some(batch) = iter.next_batch() {
        let scores = model.forward(params, &batch.features, Mode::Inference)?;

        for (row, &label) in scores.rows().into_iter().zip(batch.labels.iter()) {
            let predicted = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);

            if predicted == label {
                correct += 1;
            }
        }

        total += batch.len();
    }

    Ok(correct as f32 / total as f32)
}
