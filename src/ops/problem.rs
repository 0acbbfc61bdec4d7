//! Problem abstractions used by the engines and evaluators.

use crate::core::{violation_of, Solution};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Convenience alias used by the problem traits.
pub type ProblemResult<T> = Result<T, ProblemError>;

/// Errors produced when a candidate solution is incompatible with a problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// The candidate contains the wrong number of decision variables.
    #[error("candidate has {found} decision variables but problem expects {expected}")]
    DimensionMismatch {
        /// Number of variables expected by the problem.
        expected: usize,
        /// Number of variables provided by the candidate solution.
        found: usize,
    },
    /// The lower and upper bounds do not align with the expected dimensionality.
    #[error("bounds lengths ({lower}, {upper}) do not match problem dimensionality ({expected})")]
    BoundsLengthMismatch {
        /// Expected dimensionality of the problem.
        expected: usize,
        /// Number of lower bounds provided.
        lower: usize,
        /// Number of upper bounds provided.
        upper: usize,
    },
    /// A section property that must be strictly positive was not.
    #[error("degenerate section: {quantity} evaluated to {value}")]
    DegenerateSection {
        /// Name of the offending section property.
        quantity: &'static str,
        /// Value that was computed for it.
        value: f64,
    },
}

/// Shared domain metadata required by every problem.
pub trait ProblemBounds {
    /// Returns the number of decision variables handled by the problem.
    fn dimensions(&self) -> usize;

    /// Returns the lower bounds used to clamp candidate solutions.
    fn lower_bounds(&self) -> &[f64];

    /// Returns the upper bounds used to clamp candidate solutions.
    fn upper_bounds(&self) -> &[f64];

    /// Ensures that all bound arrays match the reported dimensionality.
    ///
    /// # Errors
    /// Returns [`ProblemError::BoundsLengthMismatch`] when the provided bound
    /// vectors do not align with [`Self::dimensions`].
    fn validate_bounds(&self) -> ProblemResult<()> {
        let expected = self.dimensions();
        let lower = self.lower_bounds().len();
        let upper = self.upper_bounds().len();
        if expected != lower || expected != upper {
            return Err(ProblemError::BoundsLengthMismatch {
                expected,
                lower,
                upper,
            });
        }
        Ok(())
    }

    /// Ensures that a candidate with the provided length is valid for the problem.
    ///
    /// # Errors
    /// Returns [`ProblemError::DimensionMismatch`] when the candidate contains
    /// the wrong number of decision variables.
    fn validate_candidate_length(&self, candidate_len: usize) -> ProblemResult<()> {
        let expected = self.dimensions();
        if candidate_len != expected {
            return Err(ProblemError::DimensionMismatch {
                expected,
                found: candidate_len,
            });
        }
        Ok(())
    }

    /// Clamps the provided candidate to the box described by the bounds.
    ///
    /// # Errors
    /// Propagates any [`ProblemError`] emitted by [`Self::validate_bounds`] or
    /// [`Self::validate_candidate_length`].
    fn clamp_to_domain(&self, genes: &mut [f64]) -> ProblemResult<()> {
        self.validate_bounds()?;
        self.validate_candidate_length(genes.len())?;
        for (value, (lower, upper)) in genes
            .iter_mut()
            .zip(self.lower_bounds().iter().zip(self.upper_bounds().iter()))
        {
            *value = value.clamp(*lower, *upper);
        }
        Ok(())
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for &T {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        (**self).lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        (**self).upper_bounds()
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for &mut T {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        (**self).lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        (**self).upper_bounds()
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        (**self).lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        (**self).upper_bounds()
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for Arc<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        (**self).lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        (**self).upper_bounds()
    }
}

/// Objective and constraint values computed for one candidate.
///
/// Objectives are minimized. Constraints are satisfied when `>= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Objective values.
    pub objectives: Vec<f64>,
    /// Constraint values.
    pub constraints: Vec<f64>,
}

impl Evaluation {
    /// Creates an evaluation from raw objective and constraint values.
    #[must_use]
    pub fn new(objectives: Vec<f64>, constraints: Vec<f64>) -> Self {
        Self {
            objectives,
            constraints,
        }
    }

    /// Sum of the amounts by which each constraint falls below zero.
    #[must_use]
    pub fn violation(&self) -> f64 {
        violation_of(&self.constraints)
    }

    /// Whether every constraint is satisfied.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.violation() <= 0.0
    }

    /// Pairs the evaluation with the variables that produced it.
    #[must_use]
    pub fn into_solution(self, variables: Vec<f64>) -> Solution {
        Solution::new(variables, self.objectives, self.constraints)
    }
}

/// Multi-objective problem with inequality constraints.
///
/// Evaluation takes `&self` so a single instance can be shared across worker
/// tasks.
///
/// # Examples
/// ```
/// use ibeam::ops::{ConstrainedProblem, Evaluation, ProblemBounds, ProblemResult};
///
/// struct Disk;
///
/// impl ProblemBounds for Disk {
///     fn dimensions(&self) -> usize { 2 }
///     fn lower_bounds(&self) -> &[f64] { &[-2.0, -2.0] }
///     fn upper_bounds(&self) -> &[f64] { &[2.0, 2.0] }
/// }
///
/// impl ConstrainedProblem for Disk {
///     fn objectives(&self) -> usize { 2 }
///     fn constraints(&self) -> usize { 1 }
///     fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
///         let radius = 1.0 - genes[0] * genes[0] - genes[1] * genes[1];
///         Ok(Evaluation::new(vec![genes[0], genes[1]], vec![radius]))
///     }
/// }
///
/// let evaluation = Disk.evaluate(&[1.0, 1.0]).unwrap();
/// assert!(!evaluation.is_feasible());
/// assert_eq!(evaluation.violation(), 1.0);
/// ```
pub trait ConstrainedProblem: ProblemBounds + Send + Sync {
    /// Number of objectives returned by [`Self::evaluate`].
    fn objectives(&self) -> usize;

    /// Number of constraints returned by [`Self::evaluate`].
    fn constraints(&self) -> usize;

    /// Evaluates the provided candidate.
    ///
    /// # Errors
    /// Implementations may return [`ProblemError`] to describe domain issues.
    fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation>;
}

impl<T: ConstrainedProblem + ?Sized> ConstrainedProblem for &T {
    fn objectives(&self) -> usize {
        (**self).objectives()
    }

    fn constraints(&self) -> usize {
        (**self).constraints()
    }

    fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
        (**self).evaluate(genes)
    }
}

impl<T: ConstrainedProblem + ?Sized> ConstrainedProblem for Box<T> {
    fn objectives(&self) -> usize {
        (**self).objectives()
    }

    fn constraints(&self) -> usize {
        (**self).constraints()
    }

    fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
        (**self).evaluate(genes)
    }
}

impl<T: ConstrainedProblem + ?Sized> ConstrainedProblem for Arc<T> {
    fn objectives(&self) -> usize {
        (**self).objectives()
    }

    fn constraints(&self) -> usize {
        (**self).constraints()
    }

    fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
        (**self).evaluate(genes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Band {
        lower: Vec<f64>,
        upper: Vec<f64>,
    }

    impl Band {
        fn new() -> Self {
            Self {
                lower: vec![-1.0, -1.0],
                upper: vec![1.0, 1.0],
            }
        }
    }

    impl ProblemBounds for Band {
        fn dimensions(&self) -> usize {
            2
        }

        fn lower_bounds(&self) -> &[f64] {
            &self.lower
        }

        fn upper_bounds(&self) -> &[f64] {
            &self.upper
        }
    }

    impl ConstrainedProblem for Band {
        fn objectives(&self) -> usize {
            1
        }

        fn constraints(&self) -> usize {
            1
        }

        fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
            self.validate_candidate_length(genes.len())?;
            Ok(Evaluation::new(
                vec![genes.iter().sum()],
                vec![genes[0] - genes[1]],
            ))
        }
    }

    #[test]
    fn clamp_to_domain_bounds_values() {
        let problem = Band::new();
        let mut genes = vec![-2.0, 2.0];
        problem.clamp_to_domain(&mut genes).unwrap();
        assert_eq!(genes, vec![-1.0, 1.0]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let problem = Band::new();
        let err = problem.evaluate(&[0.0]).unwrap_err();
        assert_eq!(
            err,
            ProblemError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn shared_problem_delegates() {
        let problem = Arc::new(Band::new());
        let evaluation = problem.evaluate(&[0.25, 0.75]).unwrap();
        assert_eq!(evaluation.objectives, vec![1.0]);
        assert!((evaluation.violation() - 0.5).abs() < f64::EPSILON);
        let solution = evaluation.into_solution(vec![0.25, 0.75]);
        assert!(!solution.is_feasible());
    }
}
