pub mod data;
pub mod error;
pub mod grad;
pub mod init;
pub mod model;
pub mod optim;
pub mod solver;

pub use data::{Batch, BatchIter, Dataset};
pub use error::{Result, SolverErr};
pub use init::InitRule;
pub use model::{Mode, Model, ParamSet, TwoLayerNet};
pub use optim::{RuleState, UpdateRule};
pub use solver::{Solver, SolverConfig, TrainingState};
