//! Optimizer strategies - method-specific encoding and generation control.

#![warn(missing_docs)]

pub mod schedule;
pub mod strategy;
pub mod de;
pub mod ga;

pub use schedule::{
    fitness_progress, GenerationSchedule, Progress, ProgressReport, StrategyState, UNBOUNDED,
};
pub use strategy::{OptimizerStrategy, Strategy, StrategyConfig, MAX_GENERATIONS};
pub use de::DifferentialEvolution;
pub use ga::GeneticAlgorithm;
