//! Parameter descriptors and the resolved parameter space.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::value::{ParameterValue, ParameterValueSet};
use crate::{ConfigError, ProtocolError};

/// Type of an unbounded value parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// 64-bit floating point
    Double,
    /// 32-bit signed integer
    Int,
    /// Single flag
    Bool,
}

/// Shape of one tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Bounded floating point range
    DoubleRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
        /// Resolution
        step: f64,
    },
    /// Bounded integer range
    IntRange {
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
        /// Resolution
        step: i64,
    },
    /// Integer interval, occupying a low and a high slot
    IntInterval {
        /// Lower bound of both ends
        min: i64,
        /// Upper bound of both ends
        max: i64,
        /// Resolution
        step: i64,
    },
    /// Unbounded scalar
    Value {
        /// Scalar type
        value_type: ValueType,
    },
}

impl ParameterKind {
    /// Number of scalar slots this kind occupies in a value vector.
    pub fn slots(&self) -> usize {
        match self {
            Self::IntInterval { .. } => 2,
            Self::DoubleRange { .. } | Self::IntRange { .. } | Self::Value { .. } => 1,
        }
    }

    fn check(&self) -> Result<(), String> {
        match *self {
            Self::DoubleRange { min, max, step } => {
                if !(min.is_finite() && max.is_finite() && step.is_finite()) {
                    return Err("bounds and step must be finite".to_string());
                }
                check_bounds(min <= max, step > 0.0)
            }
            Self::IntRange { min, max, step } | Self::IntInterval { min, max, step } => {
                check_bounds(min <= max, step > 0)
            }
            Self::Value { .. } => Ok(()),
        }
    }
}

fn check_bounds(ordered: bool, positive_step: bool) -> Result<(), String> {
    if !ordered {
        return Err("min must not exceed max".to_string());
    }
    if !positive_step {
        return Err("step must be positive".to_string());
    }
    Ok(())
}

/// A named, bounded tunable dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Stable name, unique within a session
    pub name: String,

    /// Kind and bounds
    #[serde(flatten)]
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Floating point range.
    pub fn double_range(name: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self::new(name, ParameterKind::DoubleRange { min, max, step })
    }

    /// Integer range.
    pub fn int_range(name: impl Into<String>, min: i64, max: i64, step: i64) -> Self {
        Self::new(name, ParameterKind::IntRange { min, max, step })
    }

    /// Integer interval (two slots).
    pub fn int_interval(name: impl Into<String>, min: i64, max: i64, step: i64) -> Self {
        Self::new(name, ParameterKind::IntInterval { min, max, step })
    }

    /// Unbounded scalar.
    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ParameterKind::Value { value_type })
    }

    /// Number of slots this descriptor expands to.
    pub fn slots(&self) -> usize {
        self.kind.slots()
    }
}

/// Validated, ordered set of descriptors with its slot layout resolved.
///
/// Built once when a session is configured; immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    descriptors: Vec<ParameterDescriptor>,
    slot_count: usize,
}

impl ParameterSpace {
    /// Validate descriptors and resolve the slot layout.
    pub fn new(descriptors: Vec<ParameterDescriptor>) -> Result<Self, ConfigError> {
        if descriptors.is_empty() {
            return Err(ConfigError::NoParameters);
        }

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if descriptor.name.trim().is_empty() {
                return Err(ConfigError::InvalidDescriptor {
                    name: descriptor.name.clone(),
                    reason: "name must not be empty".to_string(),
                });
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ConfigError::DuplicateParameter(descriptor.name.clone()));
            }
            descriptor
                .kind
                .check()
                .map_err(|reason| ConfigError::InvalidDescriptor {
                    name: descriptor.name.clone(),
                    reason,
                })?;
        }

        let slot_count = descriptors.iter().map(ParameterDescriptor::slots).sum();
        Ok(Self {
            descriptors,
            slot_count,
        })
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> &[ParameterDescriptor] {
        &self.descriptors
    }

    /// Total number of scalar slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Map a flat value vector onto typed per-descriptor values.
    ///
    /// Fails without producing anything when the length does not match
    /// the slot layout, so callers can apply the result all-or-nothing.
    pub fn assignments<'a>(
        &'a self,
        values: &ParameterValueSet,
    ) -> Result<Vec<(&'a str, ParameterValue)>, ProtocolError> {
        if values.len() != self.slot_count {
            return Err(ProtocolError::SlotCountMismatch {
                expected: self.slot_count,
                actual: values.len(),
            });
        }

        let slots = values.as_slice();
        let mut offset = 0;
        let mut out = Vec::with_capacity(self.descriptors.len());

        for descriptor in &self.descriptors {
            let value = match descriptor.kind {
                ParameterKind::DoubleRange { .. } => ParameterValue::Double(slots[offset]),
                ParameterKind::IntRange { .. } => ParameterValue::Int(to_int(slots[offset])),
                ParameterKind::IntInterval { .. } => {
                    ParameterValue::Interval(to_int(slots[offset]), to_int(slots[offset + 1]))
                }
                ParameterKind::Value { value_type } => match value_type {
                    ValueType::Double => ParameterValue::Double(slots[offset]),
                    ValueType::Int => ParameterValue::Int(to_int(slots[offset])),
                    ValueType::Bool => ParameterValue::Bool(slots[offset] != 0.0),
                },
            };
            offset += descriptor.slots();
            out.push((descriptor.name.as_str(), value));
        }

        Ok(out)
    }
}

fn to_int(value: f64) -> i64 {
    value.round() as i64
}
