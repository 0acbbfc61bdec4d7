//! Core solution primitives.
//!
//! These types are shared by every engine in the crate: the bounds check used
//! when sampling candidates and the [`Solution`] record produced for each
//! evaluated design.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod experiment;

/// Error returned when invalid bounds are provided.
///
/// # Examples
/// ```
/// use ibeam::core::sample_within;
/// let err = sample_within(&[0.0, 0.0], &[1.0], &mut rand::thread_rng()).unwrap_err();
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    /// The number of provided bounds entries does not match the expected
    /// dimensionality.
    #[error("dimension mismatch: expected {expected} bounds entries but found {found}")]
    DimensionMismatch {
        /// Number of dimensions specified by the caller.
        expected: usize,
        /// Number of bounds entries actually provided.
        found: usize,
    },
    /// One of the dimensions has an invalid lower/upper pairing.
    #[error("invalid bounds for dimension {dimension} (lower: {lower}, upper: {upper})")]
    InvalidRange {
        /// The index of the problematic dimension.
        dimension: usize,
        /// The invalid lower bound value.
        lower: f64,
        /// The invalid upper bound value.
        upper: f64,
    },
}

/// Checks that both bound slices have the same length and describe
/// non-empty, finite intervals.
///
/// # Errors
/// Returns [`BoundsError`] for mismatched lengths or inverted ranges.
pub fn validate_bounds(lower_bounds: &[f64], upper_bounds: &[f64]) -> Result<(), BoundsError> {
    if lower_bounds.len() != upper_bounds.len() {
        return Err(BoundsError::DimensionMismatch {
            expected: lower_bounds.len(),
            found: upper_bounds.len(),
        });
    }
    for (idx, (lower, upper)) in lower_bounds.iter().zip(upper_bounds.iter()).enumerate() {
        if !(lower.is_finite() && upper.is_finite()) || lower > upper {
            return Err(BoundsError::InvalidRange {
                dimension: idx,
                lower: *lower,
                upper: *upper,
            });
        }
    }
    Ok(())
}

/// Draws one candidate uniformly from the box described by the bounds.
///
/// # Errors
/// Returns [`BoundsError`] when the bounds are inconsistent.
pub fn sample_within(
    lower_bounds: &[f64],
    upper_bounds: &[f64],
    rng: &mut impl Rng,
) -> Result<Vec<f64>, BoundsError> {
    validate_bounds(lower_bounds, upper_bounds)?;
    Ok(lower_bounds
        .iter()
        .zip(upper_bounds.iter())
        .map(|(&lower, &upper)| {
            Uniform::new_inclusive(lower, upper)
                .sample(rng)
                .clamp(lower, upper)
        })
        .collect())
}

/// An evaluated design: decision variables together with the objective and
/// constraint values computed for them.
///
/// Constraints use the "`g >= 0` is satisfied" convention, so the violation
/// is the sum of the negative parts.
///
/// # Examples
/// ```
/// use ibeam::Solution;
/// let solution = Solution::new(vec![1.0], vec![2.0, 3.0], vec![-0.5]);
/// assert!(!solution.is_feasible());
/// assert_eq!(solution.constraint_violation, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Decision variables of the design.
    pub variables: Vec<f64>,
    /// Objective values, all minimized.
    pub objectives: Vec<f64>,
    /// Raw constraint values.
    pub constraints: Vec<f64>,
    /// Aggregated violation derived from [`Self::constraints`].
    pub constraint_violation: f64,
}

impl Solution {
    /// Builds a solution and derives its constraint violation.
    #[must_use]
    pub fn new(variables: Vec<f64>, objectives: Vec<f64>, constraints: Vec<f64>) -> Self {
        let constraint_violation = violation_of(&constraints);
        Self {
            variables,
            objectives,
            constraints,
            constraint_violation,
        }
    }

    /// Whether every constraint is satisfied.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.constraint_violation <= 0.0
    }
}

pub(crate) fn violation_of(constraints: &[f64]) -> f64 {
    constraints.iter().map(|value| (-value).max(0.0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sample_within_respects_bounds() {
        let lower = vec![10.0, 10.0, 0.9, 0.9];
        let upper = vec![80.0, 50.0, 5.0, 5.0];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let genes = sample_within(&lower, &upper, &mut rng).unwrap();
            assert_eq!(genes.len(), 4);
            for ((gene, lower), upper) in genes.iter().zip(&lower).zip(&upper) {
                assert!(*lower <= *gene && *gene <= *upper);
            }
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = validate_bounds(&[1.0, 5.0], &[2.0, 4.0]).unwrap_err();
        assert_eq!(
            err,
            BoundsError::InvalidRange {
                dimension: 1,
                lower: 5.0,
                upper: 4.0
            }
        );
    }

    #[test]
    fn violation_only_counts_negative_constraints() {
        let solution = Solution::new(vec![], vec![1.0], vec![2.0, -1.5, 0.0, -0.5]);
        assert!((solution.constraint_violation - 2.0).abs() < f64::EPSILON);
        assert!(!solution.is_feasible());
        let feasible = Solution::new(vec![], vec![1.0], vec![0.0]);
        assert!(feasible.is_feasible());
    }
}
