//! Parameter values and the sinks they are applied to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed value for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// Floating point value
    Double(f64),
    /// Integer value
    Int(i64),
    /// Integer interval as `(low, high)`
    Interval(i64, i64),
    /// Flag
    Bool(bool),
}

impl ParameterValue {
    /// Scalar view of the value, one entry per slot.
    pub fn to_slots(&self) -> Vec<f64> {
        match *self {
            Self::Double(v) => vec![v],
            Self::Int(v) => vec![v as f64],
            Self::Interval(low, high) => vec![low as f64, high as f64],
            Self::Bool(v) => vec![if v { 1.0 } else { 0.0 }],
        }
    }
}

/// Flat vector of scalars, one per slot of a parameter space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterValueSet(Vec<f64>);

impl ParameterValueSet {
    /// Wrap a slot vector.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slot values in order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for ParameterValueSet {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Destination for decoded parameter values.
///
/// This is the live parameter set owned by the host; the engine only
/// writes to it.
pub trait ParameterSink: Send {
    /// Set the value of a named parameter.
    fn apply(&mut self, name: &str, value: ParameterValue);
}

/// In-memory parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterStore {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a parameter.
    pub fn get(&self, name: &str) -> Option<ParameterValue> {
        self.values.get(name).copied()
    }

    /// All values, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters that have been set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been set yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterSink for ParameterStore {
    fn apply(&mut self, name: &str, value: ParameterValue) {
        self.values.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_occupies_two_slots() {
        assert_eq!(ParameterValue::Interval(3, 9).to_slots(), vec![3.0, 9.0]);
        assert_eq!(ParameterValue::Bool(true).to_slots(), vec![1.0]);
    }

    #[test]
    fn test_store_overwrites() {
        let mut store = ParameterStore::new();
        store.apply("x", ParameterValue::Int(1));
        store.apply("x", ParameterValue::Int(2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x"), Some(ParameterValue::Int(2)));
        assert_eq!(store.get("y"), None);
    }

    #[test]
    fn test_store_iterates_by_name() {
        let mut store = ParameterStore::new();
        store.apply("taps", ParameterValue::Int(3));
        store.apply("gain", ParameterValue::Double(0.5));

        let entries: Vec<_> = store.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("gain", &ParameterValue::Double(0.5)),
                ("taps", &ParameterValue::Int(3)),
            ]
        );
    }
}
