pub mod comparator;
pub mod engine;
pub mod models;
pub mod optimizer;
pub mod walk_forward;

#[cfg(test)]
mod tests;

pub use comparator::ModelComparator;
pub use engine::Backtester;
pub use models::*;
pub use optimizer::{HyperparamOptimizer, OptimizationResult, ParamRange, SearchSpace, TrialRecord};
pub use walk_forward::WalkForwardValidator;
