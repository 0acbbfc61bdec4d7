//! Crossover operators for recombining real-coded designs.

use crate::core::validate_bounds;
use crate::ops::{check_distribution_index, check_probability, random_unit, OperatorError};
use rand::RngCore;

/// Produces new candidates by mixing genes from two parents.
///
/// # Examples
/// ```
/// use ibeam::ops::CrossoverOperator;
/// use rand::thread_rng;
///
/// struct Swap;
///
/// impl CrossoverOperator for Swap {
///     fn crossover(
///         &self,
///         parent_a: &[f64],
///         parent_b: &[f64],
///         _rng: &mut dyn rand::RngCore,
///     ) -> (Vec<f64>, Vec<f64>) {
///         (parent_b.to_vec(), parent_a.to_vec())
///     }
/// }
///
/// let (child_a, child_b) = Swap.crossover(&[0.0, 1.0], &[2.0, 3.0], &mut thread_rng());
/// assert_eq!(child_a, vec![2.0, 3.0]);
/// assert_eq!(child_b, vec![0.0, 1.0]);
/// ```
pub trait CrossoverOperator: Send + Sync {
    /// Applies crossover to parent slices and returns their offspring.
    fn crossover(
        &self,
        parent_a: &[f64],
        parent_b: &[f64],
        rng: &mut dyn RngCore,
    ) -> (Vec<f64>, Vec<f64>);
}

impl<T: CrossoverOperator + ?Sized> CrossoverOperator for Box<T> {
    fn crossover(
        &self,
        parent_a: &[f64],
        parent_b: &[f64],
        rng: &mut dyn RngCore,
    ) -> (Vec<f64>, Vec<f64>) {
        (**self).crossover(parent_a, parent_b, rng)
    }
}

/// Bounded Simulated Binary Crossover (Deb & Agrawal).
///
/// The spread factor is computed against the distance to each bound, so
/// children never leave the box. Each variable is recombined with
/// probability one half, and the two children are swapped at random.
#[derive(Debug, Clone)]
pub struct SimulatedBinaryCrossover {
    distribution_index: f64,
    probability: f64,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
}

impl SimulatedBinaryCrossover {
    /// Creates a new SBX operator applied to every mating pair.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when the distribution index is not positive
    /// or the bounds are inconsistent.
    pub fn new(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        distribution_index: f64,
    ) -> Result<Self, OperatorError> {
        Self::with_probability(lower_bounds, upper_bounds, distribution_index, 1.0)
    }

    /// Creates a new SBX operator that recombines a pair with `probability`.
    ///
    /// # Errors
    /// Returns [`OperatorError`] when a parameter is out of range.
    pub fn with_probability(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        distribution_index: f64,
        probability: f64,
    ) -> Result<Self, OperatorError> {
        check_distribution_index("sbx", distribution_index)?;
        check_probability("sbx", probability)?;
        validate_bounds(&lower_bounds, &upper_bounds)?;
        Ok(Self {
            distribution_index,
            probability,
            lower_bounds,
            upper_bounds,
        })
    }

    fn spread(&self, u: f64, beta: f64) -> f64 {
        let exponent = 1.0 / (self.distribution_index + 1.0);
        let alpha = 2.0 - beta.powf(-(self.distribution_index + 1.0));
        if u <= 1.0 / alpha {
            (u * alpha).powf(exponent)
        } else {
            (1.0 / (2.0 - u * alpha)).powf(exponent)
        }
    }

    fn crossover_gene(
        &self,
        value_a: f64,
        value_b: f64,
        lower: f64,
        upper: f64,
        rng: &mut dyn RngCore,
    ) -> (f64, f64) {
        if (value_a - value_b).abs() < 1.0e-14 {
            return (value_a, value_b);
        }
        let y1 = value_a.min(value_b);
        let y2 = value_a.max(value_b);
        let gap = y2 - y1;
        let u = random_unit(rng);

        let beta_low = 1.0 + 2.0 * (y1 - lower) / gap;
        let child_low = 0.5 * ((y1 + y2) - self.spread(u, beta_low) * gap);

        let beta_high = 1.0 + 2.0 * (upper - y2) / gap;
        let child_high = 0.5 * ((y1 + y2) + self.spread(u, beta_high) * gap);

        let child_low = child_low.clamp(lower, upper);
        let child_high = child_high.clamp(lower, upper);
        if random_unit(rng) < 0.5 {
            (child_high, child_low)
        } else {
            (child_low, child_high)
        }
    }
}

impl CrossoverOperator for SimulatedBinaryCrossover {
    fn crossover(
        &self,
        parent_a: &[f64],
        parent_b: &[f64],
        rng: &mut dyn RngCore,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut child_a = parent_a.to_vec();
        let mut child_b = parent_b.to_vec();
        if random_unit(rng) >= self.probability {
            return (child_a, child_b);
        }
        let bounds = self.lower_bounds.iter().zip(self.upper_bounds.iter());
        for ((gene_a, gene_b), (&lower, &upper)) in
            child_a.iter_mut().zip(child_b.iter_mut()).zip(bounds)
        {
            if random_unit(rng) > 0.5 {
                continue;
            }
            let (a, b) = self.crossover_gene(*gene_a, *gene_b, lower, upper, rng);
            *gene_a = a;
            *gene_b = b;
        }
        (child_a, child_b)
    }
}

/// Blend crossover with configurable α parameter.
///
/// Children may land outside the bounds; engines clamp them afterwards.
#[derive(Debug, Clone)]
pub struct BlendAlphaCrossover {
    alpha: f64,
}

impl BlendAlphaCrossover {
    /// Creates a new BLX-α operator.
    ///
    /// # Errors
    /// Returns [`OperatorError::InvalidParameter`] when `alpha` is negative or
    /// not finite.
    pub fn new(alpha: f64) -> Result<Self, OperatorError> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(OperatorError::InvalidParameter {
                operator: "blx-alpha",
                parameter: "alpha",
                value: alpha,
            });
        }
        Ok(Self { alpha })
    }

    fn sample_gene(&self, value_a: f64, value_b: f64, rng: &mut dyn RngCore) -> f64 {
        let min = value_a.min(value_b);
        let max = value_a.max(value_b);
        let range = max - min;
        let lower = min - self.alpha * range;
        let upper = max + self.alpha * range;
        lower + random_unit(rng) * (upper - lower)
    }
}

impl CrossoverOperator for BlendAlphaCrossover {
    fn crossover(
        &self,
        parent_a: &[f64],
        parent_b: &[f64],
        rng: &mut dyn RngCore,
    ) -> (Vec<f64>, Vec<f64>) {
        parent_a
            .iter()
            .zip(parent_b.iter())
            .map(|(&value_a, &value_b)| {
                (
                    self.sample_gene(value_a, value_b, rng),
                    self.sample_gene(value_a, value_b, rng),
                )
            })
            .unzip()
    }
}
