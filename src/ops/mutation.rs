//! Mutation operators for perturbing real-coded designs.

use crate::core::validate_bounds;
use crate::ops::{check_distribution_index, check_probability, random_unit, OperatorError};
use rand::RngCore;
use std::f64::consts::PI;

/// Applies a mutation to a candidate and returns a new one.
///
/// # Examples
/// ```
/// use ibeam::ops::MutationOperator;
/// use rand::thread_rng;
///
/// struct AddOne;
///
/// impl MutationOperator for AddOne {
///     fn mutate(&self, parent: &[f64], _rng: &mut dyn rand::RngCore) -> Vec<f64> {
///         parent.iter().map(|value| value + 1.0).collect()
///     }
/// }
///
/// assert_eq!(AddOne.mutate(&[0.0, 1.0], &mut thread_rng()), vec![1.0, 2.0]);
/// ```
pub trait MutationOperator: Send + Sync {
    /// Mutates the provided candidate slice.
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64>;
}

impl<T: MutationOperator + ?Sized> MutationOperator for Box<T> {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).mutate(parent, rng)
    }
}

/// Polynomial mutation operator that respects problem bounds.
#[derive(Debug, Clone)]
pub struct PolynomialMutation {
    distribution_index: f64,
    probability: f64,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
}

impl PolynomialMutation {
    /// Creates a new polynomial mutation operator.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when the distribution index or probability is
    /// invalid, or when the bound vectors are inconsistent.
    pub fn new(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        distribution_index: f64,
        probability: f64,
    ) -> Result<Self, OperatorError> {
        check_distribution_index("polynomial mutation", distribution_index)?;
        check_probability("polynomial mutation", probability)?;
        validate_bounds(&lower_bounds, &upper_bounds)?;
        Ok(Self {
            distribution_index,
            probability,
            lower_bounds,
            upper_bounds,
        })
    }

    /// Mutation probability of `1 / n` for an `n`-variable problem.
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub fn per_variable(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        distribution_index: f64,
    ) -> Result<Self, OperatorError> {
        #[allow(clippy::cast_precision_loss)]
        let probability = if lower_bounds.is_empty() {
            1.0
        } else {
            1.0 / lower_bounds.len() as f64
        };
        Self::new(lower_bounds, upper_bounds, distribution_index, probability)
    }

    fn perturb(&self, gene: f64, lower: f64, upper: f64, rng: &mut dyn RngCore) -> f64 {
        let range = upper - lower;
        if range.abs() < f64::EPSILON {
            return lower;
        }
        let power = self.distribution_index + 1.0;
        let u = random_unit(rng);
        let delta_q = if u < 0.5 {
            let delta = (gene - lower) / range;
            let term = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - delta).powf(power);
            term.powf(1.0 / power) - 1.0
        } else {
            let delta = (upper - gene) / range;
            let term = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - delta).powf(power);
            1.0 - term.powf(1.0 / power)
        };
        let delta_q = if delta_q.is_finite() { delta_q } else { 0.0 };
        (gene + delta_q * range).clamp(lower, upper)
    }
}

impl MutationOperator for PolynomialMutation {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let bounds = self.lower_bounds.iter().zip(self.upper_bounds.iter());
        parent
            .iter()
            .zip(bounds)
            .map(|(&gene, (&lower, &upper))| {
                if random_unit(rng) < self.probability {
                    self.perturb(gene, lower, upper, rng)
                } else {
                    gene
                }
            })
            .collect()
    }
}

/// Gaussian mutation whose step is a fraction of each variable's range.
///
/// Scaling by range keeps the step meaningful when variables differ by an
/// order of magnitude, as the beam height and the plate thicknesses do.
#[derive(Debug, Clone)]
pub struct GaussianMutation {
    probability: f64,
    relative_sigma: f64,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
}

impl GaussianMutation {
    /// Creates a Gaussian mutation operator.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when the bounds are inconsistent, the
    /// probability lies outside `[0, 1]`, or `relative_sigma` is not positive.
    pub fn new(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        relative_sigma: f64,
        probability: f64,
    ) -> Result<Self, OperatorError> {
        if !(relative_sigma.is_finite() && relative_sigma > 0.0) {
            return Err(OperatorError::InvalidParameter {
                operator: "gaussian mutation",
                parameter: "relative_sigma",
                value: relative_sigma,
            });
        }
        check_probability("gaussian mutation", probability)?;
        validate_bounds(&lower_bounds, &upper_bounds)?;
        Ok(Self {
            probability,
            relative_sigma,
            lower_bounds,
            upper_bounds,
        })
    }
}

impl MutationOperator for GaussianMutation {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let bounds = self.lower_bounds.iter().zip(self.upper_bounds.iter());
        parent
            .iter()
            .zip(bounds)
            .map(|(&gene, (&lower, &upper))| {
                if random_unit(rng) >= self.probability {
                    return gene;
                }
                let sigma = self.relative_sigma * (upper - lower);
                (gene + normal_sample(rng) * sigma).clamp(lower, upper)
            })
            .collect()
    }
}

fn normal_sample(rng: &mut dyn RngCore) -> f64 {
    let u1 = loop {
        let sample = random_unit(rng);
        if sample > 0.0 {
            break sample;
        }
    };
    let u2 = random_unit(rng);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn polynomial_mutation_stays_within_bounds() {
        let operator =
            PolynomialMutation::new(vec![10.0, 0.9], vec![80.0, 5.0], 20.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..500 {
            let child = operator.mutate(&[79.9, 0.95], &mut rng);
            assert!((10.0..=80.0).contains(&child[0]));
            assert!((0.9..=5.0).contains(&child[1]));
        }
    }

    #[test]
    fn polynomial_mutation_with_zero_probability_is_identity() {
        let operator = PolynomialMutation::new(vec![0.0], vec![1.0], 20.0, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(operator.mutate(&[0.3], &mut rng), vec![0.3]);
    }

    #[test]
    fn per_variable_probability_rejects_bad_index() {
        let err = PolynomialMutation::per_variable(vec![0.0], vec![1.0], -1.0).unwrap_err();
        assert!(matches!(err, OperatorError::InvalidDistributionIndex { .. }));
    }

    #[test]
    fn gaussian_mutation_stays_within_bounds() {
        let operator = GaussianMutation::new(vec![0.0], vec![1.0], 0.5, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            let child = operator.mutate(&[0.5], &mut rng);
            assert!((0.0..=1.0).contains(&child[0]));
        }
    }

    #[test]
    fn gaussian_mutation_rejects_mismatched_bounds() {
        let err = GaussianMutation::new(vec![0.0, 0.0], vec![1.0], 0.1, 0.5).unwrap_err();
        assert!(matches!(err, OperatorError::Bounds(_)));
    }
}
