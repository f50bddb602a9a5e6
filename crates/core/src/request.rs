//! The configuration document sent to the optimizer after the welcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::descriptor::{ParameterKind, ParameterSpace};
use crate::wire::WireMessage;
use crate::ConfigError;

/// Wire type name of every numeric range.
pub const DOUBLE_RANGE: &str = "double/range";

/// Which end of an interval a wire parameter addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalSlot {
    /// Lower end
    Low,
    /// Upper end
    High,
}

/// One wire-visible parameter entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireParam {
    /// Descriptor name
    pub name: String,
    /// Wire type, always [`DOUBLE_RANGE`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
    /// Resolution
    pub step: f64,
    /// Interval end, only set for interval descriptors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<IntervalSlot>,
}

impl WireParam {
    fn range(name: &str, min: f64, max: f64, step: f64, slot: Option<IntervalSlot>) -> Self {
        Self {
            name: name.to_string(),
            kind: DOUBLE_RANGE.to_string(),
            min,
            max,
            step,
            slot,
        }
    }
}

/// Expand descriptors into wire parameters, one per slot.
///
/// Integer bounds are widened to doubles since the wire has a single
/// numeric range type. Unbounded values have no range representation.
pub fn describe(space: &ParameterSpace, method: &str) -> Result<Vec<WireParam>, ConfigError> {
    let mut params = Vec::with_capacity(space.slot_count());

    for descriptor in space.descriptors() {
        let name = descriptor.name.as_str();
        match descriptor.kind {
            ParameterKind::DoubleRange { min, max, step } => {
                params.push(WireParam::range(name, min, max, step, None));
            }
            ParameterKind::IntRange { min, max, step } => {
                params.push(WireParam::range(name, min as f64, max as f64, step as f64, None));
            }
            ParameterKind::IntInterval { min, max, step } => {
                let (min, max, step) = (min as f64, max as f64, step as f64);
                params.push(WireParam::range(name, min, max, step, Some(IntervalSlot::Low)));
                params.push(WireParam::range(name, min, max, step, Some(IntervalSlot::High)));
            }
            ParameterKind::Value { .. } => {
                return Err(ConfigError::UnsupportedKind {
                    method: method.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(params)
}

/// Method-specific description of the problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProblemEncoding {
    /// Typed ranges, one per slot
    Params {
        /// Expanded parameters
        params: Vec<WireParam>,
    },
    /// Width of a raw bit chromosome
    Dimension {
        /// Total number of bits
        problem_dimension: usize,
    },
}

/// Outbound configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Optimizer method name
    pub method: String,
    /// Method options
    pub options: BTreeMap<String, serde_json::Value>,
    /// Problem description
    #[serde(flatten)]
    pub problem: ProblemEncoding,
}

impl OptimizationRequest {
    /// Serialize into the structured text document.
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wrap the document as a text message.
    pub fn to_message(&self) -> Result<WireMessage, serde_json::Error> {
        Ok(WireMessage::Text(self.to_document()?.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParameterDescriptor, ValueType};
    use serde_json::json;

    #[test]
    fn test_interval_expands_to_low_and_high() {
        let space = ParameterSpace::new(vec![
            ParameterDescriptor::int_range("depth", 1, 8, 1),
            ParameterDescriptor::int_interval("window", 0, 100, 5),
        ])
        .unwrap();

        let params = describe(&space, "DE").unwrap();
        assert_eq!(params.len(), space.slot_count());
        assert_eq!(params[0].slot, None);
        assert_eq!(params[0].min, 1.0);
        assert_eq!(params[1].name, "window");
        assert_eq!(params[1].slot, Some(IntervalSlot::Low));
        assert_eq!(params[2].name, "window");
        assert_eq!(params[2].slot, Some(IntervalSlot::High));
        assert_eq!((params[1].min, params[1].max, params[1].step), (params[2].min, params[2].max, params[2].step));
    }

    #[test]
    fn test_values_cannot_be_described() {
        let space = ParameterSpace::new(vec![ParameterDescriptor::value("flag", ValueType::Bool)]).unwrap();
        assert_eq!(
            describe(&space, "DE").unwrap_err(),
            ConfigError::UnsupportedKind {
                method: "DE".to_string(),
                name: "flag".to_string()
            }
        );
    }

    #[test]
    fn test_document_shape() {
        let request = OptimizationRequest {
            method: "DE".to_string(),
            options: BTreeMap::from([("individuals".to_string(), json!(60))]),
            problem: ProblemEncoding::Params {
                params: vec![WireParam::range("x", 0.0, 1.0, 0.5, None)],
            },
        };

        let document: serde_json::Value = serde_json::from_str(&request.to_document().unwrap()).unwrap();
        assert_eq!(
            document,
            json!({
                "method": "DE",
                "options": {"individuals": 60},
                "params": [{"name": "x", "type": "double/range", "min": 0.0, "max": 1.0, "step": 0.5}]
            })
        );
    }

    #[test]
    fn test_dimension_document() {
        let request = OptimizationRequest {
            method: "GA".to_string(),
            options: BTreeMap::new(),
            problem: ProblemEncoding::Dimension { problem_dimension: 12 },
        };

        let document: serde_json::Value = serde_json::from_str(&request.to_document().unwrap()).unwrap();
        assert_eq!(document, json!({"method": "GA", "options": {}, "problem_dimension": 12}));

        let parsed: OptimizationRequest = serde_json::from_value(document).unwrap();
        assert_eq!(parsed, request);
    }
}
