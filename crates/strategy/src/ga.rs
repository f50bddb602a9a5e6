//! Genetic algorithm over raw bit chromosomes.

use eva_core::{
    chromosome, ConfigError, ParameterSpace, ParameterValueSet, ProblemEncoding, ProtocolError,
    WireMessage,
};
use tracing::debug;

use crate::schedule::GenerationSchedule;
use crate::OptimizerStrategy;

/// Genetic algorithm.
///
/// The server only learns the chromosome width and answers with raw bit
/// buffers, which are decoded locally.
#[derive(Debug, Clone)]
pub struct GeneticAlgorithm {
    schedule: GenerationSchedule,
}

impl GeneticAlgorithm {
    /// Method name on the wire.
    pub const NAME: &'static str = "GA";

    /// Create with the given schedule.
    pub fn new(schedule: GenerationSchedule) -> Self {
        Self { schedule }
    }
}

impl OptimizerStrategy for GeneticAlgorithm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&self) -> &GenerationSchedule {
        &self.schedule
    }

    fn schedule_mut(&mut self) -> &mut GenerationSchedule {
        &mut self.schedule
    }

    fn encode_parameters(&self, space: &ParameterSpace) -> Result<ProblemEncoding, ConfigError> {
        let problem_dimension = chromosome::total_bits(space);
        debug!("Chromosome width: {} bits", problem_dimension);
        Ok(ProblemEncoding::Dimension { problem_dimension })
    }

    fn decode_parameters(
        &mut self,
        message: &WireMessage,
        space: &ParameterSpace,
    ) -> Result<ParameterValueSet, ProtocolError> {
        match message {
            WireMessage::Text(buffer) => chromosome::decode(buffer, space),
            other => Err(ProtocolError::UnexpectedMessage {
                expected: "chromosome",
                actual: other.kind(),
            }),
        }
    }
}
