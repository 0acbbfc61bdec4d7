//! Weighted-sum decomposition of a two-objective problem.
//!
//! A [`WeightedSumSweep`] spends part of its budget on a random sample that
//! fixes the normalization, then runs one [`RealGa`] per weight vector
//! `(i / d, 1 - i / d)` for `i = 0..=d`. The best design of every sub-run is
//! kept and the non-dominated subset is returned as the front.

use crate::core::experiment::RunStats;
use crate::core::{sample_within, Solution};
use crate::evaluator::PopulationEvaluator;
use crate::pareto::{feasible_only, ideal, nadir, pareto_front};
use crate::real_ga::{RealGa, RealGaError, Scalarization, StopCondition};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_POPULATION: usize = 50;
const DEFAULT_DIVISIONS: usize = 4;
const DEFAULT_BUDGET: usize = 10_000;

/// Errors produced by [`WeightedSumSweep`].
#[derive(Error, Debug)]
pub enum SweepError {
    /// At least one division is required.
    #[error("weighted sum sweep needs at least one division")]
    InvalidDivisions,
    /// Only bi-objective problems can be swept.
    #[error("weighted sum sweep supports two objectives (problem has {0})")]
    UnsupportedObjectives(usize),
    /// The budget cannot fund the sample plus one generation per weight.
    #[error(
        "evaluation budget {budget} cannot cover {weights} weights \
         with population size {population_size}"
    )]
    InsufficientBudget {
        /// Requested budget.
        budget: usize,
        /// Number of weight vectors.
        weights: usize,
        /// Configured population size.
        population_size: usize,
    },
    /// A sub-run failed.
    #[error(transparent)]
    Engine(#[from] RealGaError),
}

/// Outcome of a sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Feasible, non-dominated subset of the per-weight winners.
    pub front: Vec<Solution>,
    /// Best design of each sub-run, in weight order.
    pub winners: Vec<Solution>,
    /// Weight on the first objective for each sub-run.
    pub weights: Vec<f64>,
    /// Generations summed over the sub-runs.
    pub generations: usize,
    /// Evaluations consumed, normalization sample included.
    pub evaluations: usize,
    /// Statistics of the sub-runs, one after another.
    pub stats: RunStats,
}

/// Weighted-sum sweep over evenly spaced weights.
///
/// # Examples
/// ```
/// use ibeam::{IBeamProblem, SerialEvaluator, WeightedSumSweep};
/// use rand::SeedableRng;
///
/// let mut sweep = WeightedSumSweep::new(SerialEvaluator::new(IBeamProblem::new()))
///     .divisions(2)
///     .population_size(10)
///     .max_evaluations(310);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
/// let report = sweep.run(&mut rng).unwrap();
/// assert_eq!(report.winners.len(), 3);
/// assert!(report.evaluations <= 310);
/// ```
pub struct WeightedSumSweep<E> {
    evaluator: E,
    divisions: usize,
    population_size: usize,
    budget: usize,
    penalty: Option<f64>,
}

impl<E> WeightedSumSweep<E>
where
    E: PopulationEvaluator,
{
    /// Creates a sweep with four divisions and a 10 000 evaluation budget.
    #[must_use]
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            divisions: DEFAULT_DIVISIONS,
            population_size: DEFAULT_POPULATION,
            budget: DEFAULT_BUDGET,
            penalty: None,
        }
    }

    /// Number of divisions `d`; the sweep runs `d + 1` weights.
    #[must_use]
    pub fn divisions(mut self, divisions: usize) -> Self {
        self.divisions = divisions;
        self
    }

    /// Population size of the sample and of every sub-run.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Total evaluation budget.
    #[must_use]
    pub fn max_evaluations(mut self, evaluations: usize) -> Self {
        self.budget = evaluations;
        self
    }

    /// Overrides the constraint penalty factor of every sub-run.
    #[must_use]
    pub fn penalty(mut self, penalty: f64) -> Self {
        self.penalty = Some(penalty);
        self
    }

    /// Evenly spaced weights on the first objective.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        #[allow(clippy::cast_precision_loss)]
        let divisions = self.divisions as f64;
        (0..=self.divisions)
            .map(|idx| {
                #[allow(clippy::cast_precision_loss)]
                let idx = idx as f64;
                idx / divisions
            })
            .collect()
    }

    /// Runs every sub-problem and returns the combined front.
    ///
    /// # Errors
    /// Returns [`SweepError`] for an invalid configuration or when a sub-run
    /// fails.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<SweepReport, SweepError> {
        if self.divisions == 0 {
            return Err(SweepError::InvalidDivisions);
        }
        let objectives = self.evaluator.objectives();
        if objectives != 2 {
            return Err(SweepError::UnsupportedObjectives(objectives));
        }
        let weights = self.weights();
        let per_weight = self.budget.saturating_sub(self.population_size) / weights.len();
        let generations = (per_weight / self.population_size.max(1)).saturating_sub(1);
        if self.population_size == 0 || generations == 0 {
            return Err(SweepError::InsufficientBudget {
                budget: self.budget,
                weights: weights.len(),
                population_size: self.population_size,
            });
        }

        let (ideal_point, nadir_point) = self.normalization(rng)?;
        let mut evaluations = self.population_size;
        let mut total_generations = 0;
        let mut stats = RunStats::new();
        let mut winners = Vec::with_capacity(weights.len());
        for &weight in &weights {
            let mut scalarization = Scalarization::new(
                vec![weight, 1.0 - weight],
                ideal_point.clone(),
                nadir_point.clone(),
            )?;
            if let Some(penalty) = self.penalty {
                scalarization = scalarization.with_penalty(penalty)?;
            }
            let mut engine = RealGa::builder(&mut self.evaluator, scalarization)
                .population_size(self.population_size)
                .stop_condition(StopCondition::max_generations(generations))
                .build()?;
            let report = engine.run(rng)?;
            debug!(
                weight,
                fitness = report.best_fitness,
                feasible = report.best.is_feasible(),
                "weighted sum sub-run complete"
            );
            evaluations += report.evaluations;
            total_generations += report.generations;
            stats.append(report.stats);
            winners.push(report.best);
        }
        let front = pareto_front(&winners);
        if front.is_empty() {
            warn!("weighted sum sweep found no feasible design");
        }
        Ok(SweepReport {
            front,
            winners,
            weights,
            generations: total_generations,
            evaluations,
            stats,
        })
    }

    fn normalization<R: Rng>(&mut self, rng: &mut R) -> Result<(Vec<f64>, Vec<f64>), SweepError> {
        let lower = self.evaluator.lower_bounds().to_vec();
        let upper = self.evaluator.upper_bounds().to_vec();
        let sample = (0..self.population_size)
            .map(|_| sample_within(&lower, &upper, rng))
            .collect::<Result<Vec<_>, _>>()
            .map_err(RealGaError::from)?;
        let evaluations = self
            .evaluator
            .evaluate_population(&sample)
            .map_err(RealGaError::from)?;
        let solutions: Vec<Solution> = sample
            .into_iter()
            .zip(evaluations)
            .map(|(genes, evaluation)| evaluation.into_solution(genes))
            .collect();
        let feasible = feasible_only(&solutions);
        let reference = if feasible.len() >= 2 {
            feasible
        } else {
            warn!(
                feasible = feasible.len(),
                "normalization sample has too few feasible designs, using all of it"
            );
            solutions
        };
        let low = ideal(&reference).unwrap_or_else(|| vec![0.0; 2]);
        let high = nadir(&reference).unwrap_or_else(|| vec![1.0; 2]);
        debug!(?low, ?high, "weighted sum normalization");
        Ok((low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::IBeamProblem;
    use crate::evaluator::SerialEvaluator;
    use crate::pareto::dominates;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sweep(divisions: usize, budget: usize) -> WeightedSumSweep<SerialEvaluator<IBeamProblem>> {
        WeightedSumSweep::new(SerialEvaluator::new(IBeamProblem::new()))
            .divisions(divisions)
            .population_size(20)
            .max_evaluations(budget)
    }

    #[test]
    fn weights_are_evenly_spaced() {
        assert_eq!(sweep(4, 1_000).weights(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn zero_divisions_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = sweep(0, 1_000).run(&mut rng);
        assert!(matches!(result, Err(SweepError::InvalidDivisions)));
    }

    #[test]
    fn tiny_budget_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = sweep(4, 100).run(&mut rng);
        assert!(matches!(result, Err(SweepError::InsufficientBudget { .. })));
    }

    #[test]
    fn sweep_stays_within_budget_and_returns_non_dominated_front() {
        let mut rng = StdRng::seed_from_u64(17);
        let report = sweep(4, 2_000).run(&mut rng).unwrap();
        assert!(report.evaluations <= 2_000);
        assert_eq!(report.winners.len(), 5);
        assert!(!report.front.is_empty());
        for a in &report.front {
            assert!(a.is_feasible());
            for b in &report.front {
                assert!(!dominates(&a.objectives, &b.objectives));
            }
        }
    }
}
