//! Built-in objective functions for local runs.

use clap::ValueEnum;
use std::f64::consts::PI;

/// Benchmark function evaluated for every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Objective {
    /// Sum of squares, minimum 0 at the origin
    Sphere,
    /// Highly multimodal, minimum 0 at the origin
    Rastrigin,
    /// Curved valley, minimum 0 at (1, ..., 1)
    Rosenbrock,
}

impl Objective {
    /// Evaluate at `x`. Lower is better.
    pub fn evaluate(self, x: &[f64]) -> f64 {
        match self {
            Self::Sphere => sphere(x),
            Self::Rastrigin => rastrigin(x),
            Self::Rosenbrock => rosenbrock(x),
        }
    }

    /// Symmetric search bound per dimension.
    pub fn bound(self) -> f64 {
        match self {
            Self::Sphere => 5.0,
            Self::Rastrigin => 5.12,
            Self::Rosenbrock => 2.048,
        }
    }
}

fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|xi| xi * xi).sum()
}

fn rastrigin(x: &[f64]) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
            .sum::<f64>()
}

fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| 100.0 * (w[1] - w[0].powi(2)).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_minima() {
        assert_eq!(Objective::Sphere.evaluate(&[0.0, 0.0, 0.0]), 0.0);
        assert!(Objective::Rastrigin.evaluate(&[0.0, 0.0]).abs() < 1e-12);
        assert_eq!(Objective::Rosenbrock.evaluate(&[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_away_from_minimum() {
        assert_eq!(Objective::Sphere.evaluate(&[1.0, 2.0]), 5.0);
        assert!((Objective::Rastrigin.evaluate(&[1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(Objective::Rosenbrock.evaluate(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_single_dimension_rosenbrock_is_flat() {
        assert_eq!(Objective::Rosenbrock.evaluate(&[3.0]), 0.0);
    }
}
