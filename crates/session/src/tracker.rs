//! Last/best result bookkeeping.

use chrono::{DateTime, Utc};
use eva_core::ParameterValueSet;
use serde::{Deserialize, Serialize};

/// Records the fitness of every completed evaluation and the best
/// parameter set seen so far. Lower fitness is better.
#[derive(Debug, Clone, PartialEq)]
pub struct BestTracker {
    fitness: f64,
    last_fitness: f64,
    best_fitness: f64,
    worst_fitness: f64,
    best_parameter_set: Option<ParameterValueSet>,
    best_found_at: Option<DateTime<Utc>>,
    evaluations: u64,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BestTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            fitness: f64::NAN,
            last_fitness: f64::NAN,
            best_fitness: f64::INFINITY,
            worst_fitness: f64::NEG_INFINITY,
            best_parameter_set: None,
            best_found_at: None,
            evaluations: 0,
        }
    }

    /// Record a completed evaluation. Returns whether it is a new best.
    pub fn record(&mut self, fitness: f64, parameters: &ParameterValueSet) -> bool {
        self.last_fitness = self.fitness;
        self.fitness = fitness;
        self.evaluations += 1;

        if fitness > self.worst_fitness {
            self.worst_fitness = fitness;
        }

        if fitness < self.best_fitness {
            self.best_fitness = fitness;
            self.best_parameter_set = Some(parameters.clone());
            self.best_found_at = Some(Utc::now());
            return true;
        }

        false
    }

    /// Most recently reported fitness, NaN before the first evaluation.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Fitness reported before the most recent one.
    pub fn last_fitness(&self) -> f64 {
        self.last_fitness
    }

    /// Lowest fitness so far, +inf before the first evaluation.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Highest fitness so far, -inf before the first evaluation.
    pub fn worst_fitness(&self) -> f64 {
        self.worst_fitness
    }

    /// Snapshot taken at the best evaluation.
    pub fn best_parameter_set(&self) -> Option<&ParameterValueSet> {
        self.best_parameter_set.as_ref()
    }

    /// When the best evaluation was recorded.
    pub fn best_found_at(&self) -> Option<DateTime<Utc>> {
        self.best_found_at
    }

    /// Number of recorded evaluations.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Snapshot of a session's results and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Most recently reported fitness
    pub fitness: f64,
    /// Fitness reported before that
    pub last_fitness: f64,
    /// Best fitness so far
    pub best_fitness: f64,
    /// Worst fitness so far
    pub worst_fitness: f64,
    /// Parameters that produced the best fitness
    pub best_parameter_set: Option<ParameterValueSet>,
    /// When the best fitness was found
    pub best_found_at: Option<DateTime<Utc>>,
    /// Current generation, 1-based
    pub generation: u32,
    /// Individuals evaluated in the current generation
    pub individual: u32,
    /// Evaluations in this run
    pub evaluations: u64,
    /// Final value reported by the optimizer once the run is over
    pub result: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(v: f64) -> ParameterValueSet {
        ParameterValueSet::from(vec![v])
    }

    #[test]
    fn test_starts_unbounded() {
        let tracker = BestTracker::new();
        assert_eq!(tracker.best_fitness(), f64::INFINITY);
        assert_eq!(tracker.worst_fitness(), f64::NEG_INFINITY);
        assert!(tracker.best_parameter_set().is_none());
    }

    #[test]
    fn test_only_strict_improvements_update_best() {
        let mut tracker = BestTracker::new();
        let improved: Vec<bool> = [10.0, 3.0, 7.0, 1.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, &f)| tracker.record(f, &set(i as f64)))
            .collect();

        assert_eq!(improved, vec![true, true, false, true, false]);
        assert_eq!(tracker.best_fitness(), 1.0);
        assert_eq!(tracker.best_parameter_set(), Some(&set(3.0)));
        assert_eq!(tracker.worst_fitness(), 10.0);
        assert_eq!(tracker.fitness(), 5.0);
        assert_eq!(tracker.last_fitness(), 1.0);
        assert_eq!(tracker.evaluations(), 5);
    }

    #[test]
    fn test_tie_keeps_first_snapshot() {
        let mut tracker = BestTracker::new();
        tracker.record(2.0, &set(0.0));
        assert!(!tracker.record(2.0, &set(1.0)));
        assert_eq!(tracker.best_parameter_set(), Some(&set(0.0)));
    }

    #[test]
    fn test_nan_never_becomes_best() {
        let mut tracker = BestTracker::new();
        assert!(!tracker.record(f64::NAN, &set(0.0)));
        assert!(tracker.best_parameter_set().is_none());
    }

    #[test]
    fn test_reset() {
        let mut tracker = BestTracker::new();
        tracker.record(1.0, &set(0.0));
        tracker.reset();
        assert_eq!(tracker.evaluations(), 0);
        assert!(tracker.best_found_at().is_none());
    }
}
