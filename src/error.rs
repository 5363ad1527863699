use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the whole crate.
pub type Result<T> = std::result::Result<T, SolverErr>;

/// The crate's error type.
///
/// Construction-time problems (bad shapes, bad option values) are reported
/// through this type before any training state exists. Exhaustion of a batch
/// iterator is *not* an error; it is signalled by `None` from `next_batch`.
#[derive(Debug)]
pub enum SolverErr {
    /// A construction-time option is invalid for semantic or domain reasons.
    InvalidConfig(&'static str),

    /// A shape invariant was violated (e.g. mismatched lengths).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "labels", "gradient").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// A parameter value was read before the initializer filled it.
    Uninitialized { name: String },

    /// Two parameters were registered under the same name.
    DuplicateParam { name: String },

    /// A parameter name was requested that was never registered.
    UnknownParam { name: String },

    /// A dataset file could not be read.
    Io(io::Error),
}

impl Display for SolverErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverErr::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            SolverErr::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            SolverErr::Uninitialized { name } => {
                write!(f, "parameter {name} was used before initialization")
            }
            SolverErr::DuplicateParam { name } => {
                write!(f, "parameter {name} is already registered")
            }
            SolverErr::UnknownParam { name } => {
                write!(f, "parameter {name} was never registered")
            }
            SolverErr::Io(err) => write!(f, "dataset io error: {err}"),
        }
    }
}

impl Error for SolverErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SolverErr::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SolverErr {
    fn from(err: io::Error) -> Self {
        SolverErr::Io(err)
    }
}
