pub mod aggregator;
pub mod classifier;
pub mod coordinator;
pub mod pacer;
pub mod runner;
pub mod scanner;

pub use runner::{ReconciliationRunner, RunReport, RunnerConfig};
