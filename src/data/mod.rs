mod dataset;
mod iterator;
pub mod io;

pub use dataset::{Batch, Dataset};
pub use iterator::BatchIter;
