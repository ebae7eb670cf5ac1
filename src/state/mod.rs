mod dict;
mod optim;
mod stats;

pub use dict::{NamedParams, ParamEntry, ParamVisitor, StateDict};
pub use optim::{OptimizerStateDict, OptimizerStateEntry};
pub use stats::ParamStats;
