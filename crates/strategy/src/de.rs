//! Differential evolution over typed ranges.

use eva_core::{
    describe, ConfigError, ParameterSpace, ParameterValueSet, ProblemEncoding, ProtocolError,
    WireMessage,
};

use crate::schedule::GenerationSchedule;
use crate::OptimizerStrategy;

/// Differential evolution.
///
/// The server receives one `double/range` entry per slot and answers with
/// vectors holding exactly one value per slot.
#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    schedule: GenerationSchedule,
}

impl DifferentialEvolution {
    /// Method name on the wire.
    pub const NAME: &'static str = "DE";

    /// Create with the given schedule.
    pub fn new(schedule: GenerationSchedule) -> Self {
        Self { schedule }
    }
}

impl OptimizerStrategy for DifferentialEvolution {
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
        Ok(ProblemEncoding::Params {
            params: describe(space, Self::NAME)?,
        })
    }

    fn decode_parameters(
        &mut self,
        message: &WireMessage,
        space: &ParameterSpace,
    ) -> Result<ParameterValueSet, ProtocolError> {
        let WireMessage::Vector(values) = message else {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "parameter vector",
                actual: message.kind(),
            });
        };

        if values.len() != space.slot_count() {
            return Err(ProtocolError::SlotCountMismatch {
                expected: space.slot_count(),
                actual: values.len(),
            });
        }

        Ok(ParameterValueSet::from(values.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eva_core::{MessageKind, ParameterDescriptor, ValueType};

    fn strategy() -> DifferentialEvolution {
        DifferentialEvolution::new(GenerationSchedule::new(60, 30, 3))
    }

    fn space() -> ParameterSpace {
        ParameterSpace::new(vec![
            ParameterDescriptor::double_range("alpha", 0.0, 1.0, 0.01),
            ParameterDescriptor::int_interval("band", 0, 20, 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_encodes_one_param_per_slot() {
        let ProblemEncoding::Params { params } = strategy().encode_parameters(&space()).unwrap() else {
            panic!("Wrong encoding");
        };
        assert_eq!(params.len(), 3);
        assert!(params.iter().all(|p| p.kind == "double/range"));
    }

    #[test]
    fn test_rejects_value_descriptors() {
        let space = ParameterSpace::new(vec![ParameterDescriptor::value("flag", ValueType::Bool)]).unwrap();
        assert!(matches!(
            strategy().encode_parameters(&space),
            Err(ConfigError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_decode_requires_exact_slot_count() {
        let space = space();
        let mut de = strategy();

        let decoded = de
            .decode_parameters(&WireMessage::Vector(vec![0.5, 2.0, 7.0]), &space)
            .unwrap();
        assert_eq!(decoded.len(), space.slot_count());

        for values in [vec![0.5, 2.0], vec![0.5, 2.0, 7.0, 1.0]] {
            let len = values.len();
            assert_eq!(
                de.decode_parameters(&WireMessage::Vector(values), &space).unwrap_err(),
                ProtocolError::SlotCountMismatch {
                    expected: 3,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn test_decode_rejects_text() {
        assert_eq!(
            strategy()
                .decode_parameters(&WireMessage::text("hello"), &space())
                .unwrap_err(),
            ProtocolError::UnexpectedMessage {
                expected: "parameter vector",
                actual: MessageKind::Text
            }
        );
    }

    #[test]
    fn test_request_contains_method_and_options() {
        let request = strategy().request(&space()).unwrap();
        assert_eq!(request.method, "DE");
        assert!(request.options.contains_key("individuals/later_generations"));
    }
}
