//! Genetic operators and problem abstractions.
//!
//! Each sub-module focuses on one aspect of the optimization workflow so the
//! engines can mix and match implementations.

pub mod crossover;
pub mod mutation;
pub mod problem;
pub mod selection;

use crate::core::BoundsError;
use rand::RngCore;
use thiserror::Error;

pub use crossover::{BlendAlphaCrossover, CrossoverOperator, SimulatedBinaryCrossover};
pub use mutation::{GaussianMutation, MutationOperator, PolynomialMutation};
pub use problem::{ConstrainedProblem, Evaluation, ProblemBounds, ProblemError, ProblemResult};
pub use selection::{SelectionOperator, TournamentSelection};

/// Errors raised while constructing operators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperatorError {
    /// Distribution index was non-positive or not finite.
    #[error("{operator} distribution index must be positive (received {value})")]
    InvalidDistributionIndex {
        /// Operator reporting the error.
        operator: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Probability outside `[0, 1]`.
    #[error("{operator} probability must be within [0, 1] (received {value})")]
    InvalidProbability {
        /// Operator reporting the error.
        operator: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Any other parameter failed validation.
    #[error("{operator} parameter {parameter} was invalid (received {value})")]
    InvalidParameter {
        /// Operator reporting the error.
        operator: &'static str,
        /// Name of the invalid parameter.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Bounds supplied to the operator were inconsistent.
    #[error(transparent)]
    Bounds(#[from] BoundsError),
}

pub(crate) fn check_probability(operator: &'static str, value: f64) -> Result<(), OperatorError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OperatorError::InvalidProbability { operator, value })
    }
}

pub(crate) fn check_distribution_index(
    operator: &'static str,
    value: f64,
) -> Result<(), OperatorError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OperatorError::InvalidDistributionIndex { operator, value })
    }
}

/// Uniform sample in `[0, 1)`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn random_unit(rng: &mut dyn RngCore) -> f64 {
    let value = rng.next_u64() as f64;
    value / (u64::MAX as f64 + 1.0)
}

pub(crate) fn random_index(len: usize, rng: &mut dyn RngCore) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    {
        (rng.next_u64() % len as u64) as usize
    }
}
