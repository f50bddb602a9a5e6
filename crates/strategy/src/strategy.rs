//! The optimizer strategy capability and its configuration.

use eva_core::{
    ConfigError, OptimizationRequest, ParameterSpace, ParameterValueSet, ProblemEncoding,
    ProtocolError, WireMessage,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::schedule::{GenerationSchedule, ProgressReport, StrategyState, UNBOUNDED};
use crate::{DifferentialEvolution, GeneticAlgorithm};

/// Largest accepted generation cap.
pub const MAX_GENERATIONS: i64 = 1024;

/// A remote optimization method.
///
/// Implementors describe the problem in their own encoding and decode
/// the candidates the server sends back. Generation bookkeeping is shared
/// through [`GenerationSchedule`].
pub trait OptimizerStrategy: Send {
    /// Method name sent to the server.
    fn name(&self) -> &str;

    /// Shared generation bookkeeping.
    fn schedule(&self) -> &GenerationSchedule;

    /// Shared generation bookkeeping, mutable.
    fn schedule_mut(&mut self) -> &mut GenerationSchedule;

    /// Method-specific problem description.
    fn encode_parameters(&self, space: &ParameterSpace) -> Result<ProblemEncoding, ConfigError>;

    /// Decode one candidate into a flat value vector.
    fn decode_parameters(
        &mut self,
        message: &WireMessage,
        space: &ParameterSpace,
    ) -> Result<ParameterValueSet, ProtocolError>;

    /// Method options.
    fn options(&self) -> BTreeMap<String, serde_json::Value> {
        let schedule = self.schedule();
        BTreeMap::from([
            ("individuals".to_string(), json!(schedule.individuals())),
            (
                "individuals/later_generations".to_string(),
                json!(schedule.later_individuals()),
            ),
        ])
    }

    /// Build the configuration document for `space`.
    fn request(&mut self, space: &ParameterSpace) -> Result<OptimizationRequest, ConfigError> {
        let problem = self.encode_parameters(space)?;
        self.schedule_mut().configure();
        Ok(OptimizationRequest {
            method: self.name().to_string(),
            options: self.options(),
            problem,
        })
    }

    /// Whether another generation may be started.
    fn can_continue(&self) -> bool {
        self.schedule().can_continue()
    }

    /// The first generation starts.
    fn begin(&mut self) {
        self.schedule_mut().begin();
    }

    /// The server asked whether to continue.
    fn await_continuation(&mut self) {
        self.schedule_mut().await_continuation();
    }

    /// Advance to the next generation.
    fn next_iteration(&mut self) {
        self.schedule_mut().next_iteration();
    }

    /// The server was told to stop.
    fn terminate(&mut self) {
        self.schedule_mut().terminate();
    }

    /// One candidate has been evaluated.
    fn finish(&mut self, fitness: f64, best_fitness: f64, worst_fitness: f64) {
        self.schedule_mut().finish(fitness, best_fitness, worst_fitness);
    }

    /// Clear all counters for a new run.
    fn reset(&mut self) {
        self.schedule_mut().reset();
    }

    /// Current progress indicators.
    fn progress(&self) -> ProgressReport {
        self.schedule().progress()
    }

    /// Lifecycle state.
    fn state(&self) -> StrategyState {
        self.schedule().state()
    }
}

/// Strategy settings, usually read from the session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Method name, `DE` or `GA`
    pub method: String,
    /// Size of the first generation
    pub individuals: u32,
    /// Size of later generations
    pub later_individuals: u32,
    /// Generation cap, -1 for unbounded
    pub generations: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            method: DifferentialEvolution::NAME.to_string(),
            individuals: 60,
            later_individuals: 30,
            generations: UNBOUNDED,
        }
    }
}

impl StrategyConfig {
    /// Check population sizes and the generation cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.individuals == 0 {
            return Err(ConfigError::InvalidPopulation(
                "individuals must be at least 1".to_string(),
            ));
        }
        if self.later_individuals == 0 {
            return Err(ConfigError::InvalidPopulation(
                "later individuals must be at least 1".to_string(),
            ));
        }
        if self.generations != UNBOUNDED && !(1..=MAX_GENERATIONS).contains(&self.generations) {
            return Err(ConfigError::InvalidGenerations(self.generations));
        }
        Ok(())
    }

    fn schedule(&self) -> GenerationSchedule {
        GenerationSchedule::new(self.individuals, self.later_individuals, self.generations)
    }
}

/// Strategies available.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Differential evolution over typed ranges
    DifferentialEvolution(DifferentialEvolution),
    /// Genetic algorithm over raw bit chromosomes
    GeneticAlgorithm(GeneticAlgorithm),
}

impl Strategy {
    /// Build the strategy named by `config.method`.
    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let method = config.method.trim();
        if method.eq_ignore_ascii_case(DifferentialEvolution::NAME) {
            Ok(Self::DifferentialEvolution(DifferentialEvolution::new(config.schedule())))
        } else if method.eq_ignore_ascii_case(GeneticAlgorithm::NAME) {
            Ok(Self::GeneticAlgorithm(GeneticAlgorithm::new(config.schedule())))
        } else {
            Err(ConfigError::UnknownMethod(config.method.clone()))
        }
    }
}

impl OptimizerStrategy for Strategy {
    fn name(&self) -> &str {
        match self {
            Self::DifferentialEvolution(s) => s.name(),
            Self::GeneticAlgorithm(s) => s.name(),
        }
    }

    fn schedule(&self) -> &GenerationSchedule {
        match self {
            Self::DifferentialEvolution(s) => s.schedule(),
            Self::GeneticAlgorithm(s) => s.schedule(),
        }
    }

    fn schedule_mut(&mut self) -> &mut GenerationSchedule {
        match self {
            Self::DifferentialEvolution(s) => s.schedule_mut(),
            Self::GeneticAlgorithm(s) => s.schedule_mut(),
        }
    }

    fn encode_parameters(&self, space: &ParameterSpace) -> Result<ProblemEncoding, ConfigError> {
        match self {
            Self::DifferentialEvolution(s) => s.encode_parameters(space),
            Self::GeneticAlgorithm(s) => s.encode_parameters(space),
        }
    }

    fn decode_parameters(
        &mut self,
        message: &WireMessage,
        space: &ParameterSpace,
    ) -> Result<ParameterValueSet, ProtocolError> {
        match self {
            Self::DifferentialEvolution(s) => s.decode_parameters(message, space),
            Self::GeneticAlgorithm(s) => s.decode_parameters(message, space),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unbounded_de() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());

        let strategy = Strategy::from_config(&config).unwrap();
        assert_eq!(strategy.name(), "DE");
        assert!(strategy.schedule().is_unbounded());
    }

    #[test]
    fn test_method_lookup_ignores_case() {
        let config = StrategyConfig {
            method: "ga".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Strategy::from_config(&config).unwrap(),
            Strategy::GeneticAlgorithm(_)
        ));
    }

    #[test]
    fn test_unknown_method() {
        let config = StrategyConfig {
            method: "CMA-ES".to_string(),
            ..Default::default()
        };
        assert_eq!(
            Strategy::from_config(&config).unwrap_err(),
            ConfigError::UnknownMethod("CMA-ES".to_string())
        );
    }

    #[test]
    fn test_generation_cap_bounds() {
        for generations in [0, -2, MAX_GENERATIONS + 1] {
            let config = StrategyConfig {
                generations,
                ..Default::default()
            };
            assert_eq!(
                config.validate().unwrap_err(),
                ConfigError::InvalidGenerations(generations)
            );
        }
    }

    #[test]
    fn test_options_carry_population_sizes() {
        let strategy = Strategy::from_config(&StrategyConfig::default()).unwrap();
        let options = strategy.options();
        assert_eq!(options["individuals"], json!(60));
        assert_eq!(options["individuals/later_generations"], json!(30));
    }
}
