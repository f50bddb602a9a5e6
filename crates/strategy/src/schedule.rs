//! Generation and individual bookkeeping shared by all strategies.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Generation cap meaning "run until stopped".
pub const UNBOUNDED: i64 = -1;

/// Lifecycle of a strategy within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyState {
    /// Not started
    Idle,
    /// Request built, waiting for the first candidate
    Configuring,
    /// Candidates of the current generation are being evaluated
    Evaluating,
    /// Server asked whether to run another generation
    AwaitingContinuation,
    /// Server was told to stop
    Terminated,
}

/// A `current / total` fraction. `total == 0` means indeterminate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completed units
    pub current: u32,
    /// Expected units, zero when unbounded
    pub total: u32,
}

impl Progress {
    /// Create a fraction.
    pub fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }

    /// Whether the total is unknown.
    pub fn is_indeterminate(&self) -> bool {
        self.total == 0
    }
}

/// Progress indicators exposed to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Rank of the last fitness between best (100) and worst (0)
    pub fitness: f64,
    /// Individuals evaluated in the current generation
    pub individual: Progress,
    /// Generations run
    pub generation: Progress,
}

/// Normalized position of `fitness` between `best` and `worst`.
///
/// Returns 100 for the best individual and 0 for the worst. A converged
/// population (`worst == best`) yields 0.
pub fn fitness_progress(fitness: f64, best: f64, worst: f64) -> f64 {
    if worst == best {
        return 0.0;
    }
    (100.0 - ((fitness - best) / (worst - best)) * 100.0).clamp(0.0, 100.0)
}

/// Generation counter, population sizes and continuation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSchedule {
    individuals: u32,
    later_individuals: u32,
    generations: i64,
    generation: u32,
    individual: u32,
    fitness: f64,
    state: StrategyState,
}

impl GenerationSchedule {
    /// Create a schedule. `generations` is [`UNBOUNDED`] or a positive cap.
    pub fn new(individuals: u32, later_individuals: u32, generations: i64) -> Self {
        Self {
            individuals,
            later_individuals,
            generations,
            generation: 0,
            individual: 0,
            fitness: 0.0,
            state: StrategyState::Idle,
        }
    }

    /// Size of the first generation.
    pub fn individuals(&self) -> u32 {
        self.individuals
    }

    /// Size of every later generation.
    pub fn later_individuals(&self) -> u32 {
        self.later_individuals
    }

    /// Generation cap, [`UNBOUNDED`] for none.
    pub fn generations(&self) -> i64 {
        self.generations
    }

    /// Whether the run has no generation cap.
    pub fn is_unbounded(&self) -> bool {
        self.generations == UNBOUNDED
    }

    /// Current generation, 1-based; 0 before the run begins.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Individuals finished in the current generation.
    pub fn individual(&self) -> u32 {
        self.individual
    }

    /// Lifecycle state.
    pub fn state(&self) -> StrategyState {
        self.state
    }

    /// Whether another generation may be started.
    pub fn can_continue(&self) -> bool {
        self.is_unbounded() || i64::from(self.generation) < self.generations
    }

    /// Back to idle with all counters cleared.
    pub fn reset(&mut self) {
        self.generation = 0;
        self.individual = 0;
        self.fitness = 0.0;
        self.state = StrategyState::Idle;
    }

    /// The request is about to be sent.
    pub fn configure(&mut self) {
        self.state = StrategyState::Configuring;
    }

    /// The first generation starts.
    pub fn begin(&mut self) {
        self.generation = 1;
        self.individual = 0;
        self.state = StrategyState::Evaluating;
    }

    /// The server asked whether to continue.
    pub fn await_continuation(&mut self) {
        self.state = StrategyState::AwaitingContinuation;
    }

    /// Advance to the next generation.
    pub fn next_iteration(&mut self) {
        self.generation += 1;
        self.individual = 0;
        self.state = StrategyState::Evaluating;
        debug!("Starting generation {}", self.generation);
    }

    /// The server was told to stop.
    pub fn terminate(&mut self) {
        self.state = StrategyState::Terminated;
        debug!("Terminated after generation {}", self.generation);
    }

    /// One individual has been evaluated.
    pub fn finish(&mut self, fitness: f64, best: f64, worst: f64) {
        self.individual += 1;
        self.fitness = fitness_progress(fitness, best, worst);
    }

    /// Population size of the current generation.
    fn population(&self) -> u32 {
        if self.generation > 1 {
            self.later_individuals
        } else {
            self.individuals
        }
    }

    /// Current progress indicators.
    pub fn progress(&self) -> ProgressReport {
        let generation = if self.is_unbounded() {
            Progress::new(0, 0)
        } else {
            let cap = self.generations as u32;
            if self.state == StrategyState::Terminated {
                Progress::new(cap, cap)
            } else {
                Progress::new(self.generation.min(cap), cap)
            }
        };

        ProgressReport {
            fitness: self.fitness,
            individual: Progress::new(self.individual, self.population()),
            generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_progress_midpoint() {
        assert_eq!(fitness_progress(5.0, 0.0, 10.0), 50.0);
    }

    #[test]
    fn test_fitness_progress_best_is_full() {
        assert_eq!(fitness_progress(0.0, 0.0, 10.0), 100.0);
        assert_eq!(fitness_progress(10.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_fitness_progress_converged_population() {
        for fitness in [-3.0, 0.0, 2.0, 1e9] {
            assert_eq!(fitness_progress(fitness, 2.0, 2.0), 0.0);
        }
    }

    #[test]
    fn test_bounded_schedule_stops_at_cap() {
        let mut schedule = GenerationSchedule::new(60, 30, 3);
        schedule.begin();

        let mut continued = 0;
        while schedule.can_continue() {
            schedule.next_iteration();
            continued += 1;
            assert!(i64::from(schedule.generation()) <= schedule.generations());
        }
        schedule.terminate();

        assert_eq!(continued, 2);
        assert_eq!(schedule.generation(), 3);
        assert_eq!(schedule.progress().generation, Progress::new(3, 3));
    }

    #[test]
    fn test_unbounded_schedule_is_indeterminate() {
        let mut schedule = GenerationSchedule::new(60, 30, UNBOUNDED);
        schedule.begin();
        for _ in 0..50 {
            assert!(schedule.can_continue());
            assert!(schedule.progress().generation.is_indeterminate());
            schedule.next_iteration();
        }
        assert_eq!(schedule.generation(), 51);
    }

    #[test]
    fn test_individual_total_shrinks_after_first_generation() {
        let mut schedule = GenerationSchedule::new(60, 30, 5);
        schedule.begin();
        schedule.finish(1.0, 0.0, 2.0);
        assert_eq!(schedule.progress().individual, Progress::new(1, 60));

        schedule.next_iteration();
        assert_eq!(schedule.progress().individual, Progress::new(0, 30));
        schedule.finish(1.0, 0.0, 2.0);
        assert_eq!(schedule.progress().individual, Progress::new(1, 30));
    }

    #[test]
    fn test_state_transitions() {
        let mut schedule = GenerationSchedule::new(10, 10, 2);
        assert_eq!(schedule.state(), StrategyState::Idle);
        schedule.configure();
        assert_eq!(schedule.state(), StrategyState::Configuring);
        schedule.begin();
        assert_eq!(schedule.state(), StrategyState::Evaluating);
        schedule.await_continuation();
        assert_eq!(schedule.state(), StrategyState::AwaitingContinuation);
        schedule.next_iteration();
        assert_eq!(schedule.state(), StrategyState::Evaluating);
        schedule.terminate();
        assert_eq!(schedule.state(), StrategyState::Terminated);
        schedule.reset();
        assert_eq!(schedule.state(), StrategyState::Idle);
        assert_eq!(schedule.generation(), 0);
    }
}
