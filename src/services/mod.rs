pub mod classifier;
pub mod factory;
pub mod generation;
pub mod permutation;
pub mod persistence;
pub mod prompt;
pub mod queue;
pub mod scheduler;
pub mod stores;
