//! Side-by-side comparison of several algorithm configurations.
//!
//! An [`Experiment`] runs every [`AlgorithmSpec`] in turn against the same
//! evaluator and evaluation budget, keeps each feasible front, and scores the
//! fronts by hypervolume against one shared reference point so the numbers are
//! comparable across algorithms.

use crate::core::experiment::{ExperimentMetadata, RunStats};
use crate::core::Solution;
use crate::evaluator::PopulationEvaluator;
use crate::nsga2::{Nsga2, Nsga2Error};
use crate::ops::{
    BlendAlphaCrossover, CrossoverOperator, GaussianMutation, MutationOperator, OperatorError,
    PolynomialMutation, SimulatedBinaryCrossover,
};
use crate::pareto::{hypervolume_2d, merge_fronts, nadir, pareto_front};
use crate::sweep::{SweepError, WeightedSumSweep};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Evaluation budget shared by every algorithm unless configured otherwise.
pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

const REFERENCE_MARGIN: f64 = 1.1;

/// Crossover used by an NSGA-II configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CrossoverKind {
    /// Bounded simulated binary crossover.
    Sbx {
        /// Distribution index.
        eta: f64,
    },
    /// Blend crossover.
    Blend {
        /// Extension factor.
        alpha: f64,
    },
}

/// Mutation used by an NSGA-II configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MutationKind {
    /// Polynomial mutation with probability `1 / n`.
    Polynomial {
        /// Distribution index.
        eta: f64,
    },
    /// Gaussian perturbation scaled to each variable range.
    Gaussian {
        /// Standard deviation as a fraction of the range.
        relative_sigma: f64,
        /// Per-variable mutation probability.
        probability: f64,
    },
}

/// Engine configuration behind an [`AlgorithmSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlgorithmConfig {
    /// Constrained NSGA-II.
    Nsga2 {
        /// Population size.
        population_size: usize,
        /// Crossover operator.
        crossover: CrossoverKind,
        /// Mutation operator.
        mutation: MutationKind,
    },
    /// Weighted-sum decomposition sweep.
    WeightedSum {
        /// Number of divisions of the weight interval.
        divisions: usize,
        /// Population size of every sub-run.
        population_size: usize,
    },
}

/// A named algorithm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    /// Label used in logs, figures and the results file.
    pub name: String,
    /// Engine configuration.
    pub config: AlgorithmConfig,
}

impl AlgorithmSpec {
    /// NSGA-II with bounded SBX and polynomial mutation.
    #[must_use]
    pub fn nsga2(name: impl Into<String>, population_size: usize) -> Self {
        Self {
            name: name.into(),
            config: AlgorithmConfig::Nsga2 {
                population_size,
                crossover: CrossoverKind::Sbx { eta: 15.0 },
                mutation: MutationKind::Polynomial { eta: 20.0 },
            },
        }
    }

    /// Weighted-sum sweep with `divisions + 1` weights.
    #[must_use]
    pub fn weighted_sum(name: impl Into<String>, divisions: usize) -> Self {
        Self {
            name: name.into(),
            config: AlgorithmConfig::WeightedSum {
                divisions,
                population_size: 50,
            },
        }
    }

    /// The eight configurations compared by the benchmark binary.
    ///
    /// # Examples
    /// ```
    /// use ibeam::AlgorithmSpec;
    /// let names: Vec<String> = AlgorithmSpec::default_lineup()
    ///     .into_iter()
    ///     .map(|spec| spec.name)
    ///     .collect();
    /// assert_eq!(names[0], "NSGAII");
    /// assert_eq!(names.len(), 8);
    /// ```
    #[must_use]
    pub fn default_lineup() -> Vec<Self> {
        let mut blend = Self::nsga2("NSGAII_BLX", 100);
        if let AlgorithmConfig::Nsga2 { crossover, .. } = &mut blend.config {
            *crossover = CrossoverKind::Blend { alpha: 0.5 };
        }
        let mut gauss = Self::nsga2("NSGAII_GAUSS", 100);
        if let AlgorithmConfig::Nsga2 { mutation, .. } = &mut gauss.config {
            *mutation = MutationKind::Gaussian {
                relative_sigma: 0.1,
                probability: 0.25,
            };
        }
        vec![
            Self::nsga2("NSGAII", 100),
            Self::nsga2("NSGAII_50", 50),
            Self::nsga2("NSGAII_200", 200),
            blend,
            gauss,
            Self::weighted_sum("WEIGHTED_4", 4),
            Self::weighted_sum("WEIGHTED_12", 12),
            Self::weighted_sum("WEIGHTED_24", 24),
        ]
    }
}

/// Errors produced while running an [`Experiment`].
#[derive(Error, Debug)]
pub enum ExperimentError {
    /// No algorithm was configured.
    #[error("experiment has no algorithms to run")]
    EmptyLineup,
    /// Operator construction failed for an algorithm.
    #[error("{algorithm}: {source}")]
    Operator {
        /// Name of the algorithm.
        algorithm: String,
        /// Underlying error.
        #[source]
        source: OperatorError,
    },
    /// An NSGA-II run failed.
    #[error("{algorithm}: {source}")]
    Nsga2 {
        /// Name of the algorithm.
        algorithm: String,
        /// Underlying error.
        #[source]
        source: Nsga2Error,
    },
    /// A weighted-sum sweep failed.
    #[error("{algorithm}: {source}")]
    Sweep {
        /// Name of the algorithm.
        algorithm: String,
        /// Underlying error.
        #[source]
        source: SweepError,
    },
}

/// Result of one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Run metadata, including the seed used.
    pub metadata: ExperimentMetadata,
    /// Feasible, non-dominated designs found by the algorithm.
    pub front: Vec<Solution>,
    /// Hypervolume of [`Self::front`] against the report's reference point.
    pub hypervolume: f64,
    /// Wall-clock time of the run in seconds.
    pub elapsed_seconds: f64,
    /// Per-generation statistics.
    pub stats: RunStats,
}

impl AlgorithmResult {
    /// Name of the algorithm.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.algorithm
    }
}

/// Everything an experiment produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Evaluation budget given to each algorithm.
    pub max_evaluations: usize,
    /// Base seed, when the experiment was seeded.
    pub seed: Option<u64>,
    /// Reference point used for every hypervolume.
    pub reference_point: Vec<f64>,
    /// Per-algorithm results in lineup order.
    pub algorithms: Vec<AlgorithmResult>,
    /// Non-dominated union of every algorithm's front.
    pub merged_front: Vec<Solution>,
}

/// Runs a lineup of algorithms under one evaluation budget.
///
/// # Examples
/// ```
/// use ibeam::{AlgorithmSpec, Experiment, IBeamProblem, SerialEvaluator};
///
/// let experiment = Experiment::new(vec![AlgorithmSpec::nsga2("NSGAII_20", 20)])
///     .max_evaluations(200)
///     .seed(1);
/// let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
/// let report = experiment.run(&mut evaluator).unwrap();
/// assert_eq!(report.algorithms[0].metadata.evaluations, 200);
/// ```
#[derive(Debug, Clone)]
pub struct Experiment {
    algorithms: Vec<AlgorithmSpec>,
    max_evaluations: usize,
    seed: Option<u64>,
}

impl Default for Experiment {
    fn default() -> Self {
        Self::new(AlgorithmSpec::default_lineup())
    }
}

impl Experiment {
    /// Creates an unseeded experiment with the default budget.
    #[must_use]
    pub fn new(algorithms: Vec<AlgorithmSpec>) -> Self {
        Self {
            algorithms,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            seed: None,
        }
    }

    /// Sets the evaluation budget of every algorithm.
    #[must_use]
    pub fn max_evaluations(mut self, evaluations: usize) -> Self {
        self.max_evaluations = evaluations;
        self
    }

    /// Seeds algorithm `i` with `seed + i`.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configured algorithms.
    #[must_use]
    pub fn algorithms(&self) -> &[AlgorithmSpec] {
        &self.algorithms
    }

    /// Runs every algorithm in lineup order.
    ///
    /// # Errors
    /// Returns [`ExperimentError`] naming the first algorithm that failed.
    pub fn run<E>(&self, evaluator: &mut E) -> Result<ExperimentReport, ExperimentError>
    where
        E: PopulationEvaluator,
    {
        if self.algorithms.is_empty() {
            return Err(ExperimentError::EmptyLineup);
        }
        let mut algorithms = Vec::with_capacity(self.algorithms.len());
        for (idx, spec) in self.algorithms.iter().enumerate() {
            let seed = self.seed.map(|base| base.wrapping_add(idx as u64));
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let started = Instant::now();
            let outcome = self.run_one(spec, &mut *evaluator, &mut rng)?;
            let elapsed_seconds = started.elapsed().as_secs_f64();
            info!(
                algorithm = %spec.name,
                front = outcome.front.len(),
                evaluations = outcome.evaluations,
                elapsed_seconds,
                "algorithm finished"
            );
            algorithms.push(AlgorithmResult {
                metadata: ExperimentMetadata::new(
                    spec.name.clone(),
                    outcome.generations,
                    outcome.evaluations,
                    seed,
                ),
                front: outcome.front,
                hypervolume: 0.0,
                elapsed_seconds,
                stats: outcome.stats,
            });
        }

        let pooled: Vec<Solution> = algorithms
            .iter()
            .flat_map(|result| result.front.iter().cloned())
            .collect();
        let reference_point: Vec<f64> = nadir(&pooled)
            .map(|point| point.into_iter().map(|value| value * REFERENCE_MARGIN).collect())
            .unwrap_or_default();
        if let [x, y, ..] = reference_point.as_slice() {
            for result in &mut algorithms {
                let points: Vec<Vec<f64>> =
                    result.front.iter().map(|s| s.objectives.clone()).collect();
                result.hypervolume = hypervolume_2d(&points, [*x, *y]);
            }
        }
        let merged_front = merge_fronts(algorithms.iter().map(|result| result.front.as_slice()));
        info!(
            merged = merged_front.len(),
            algorithms = algorithms.len(),
            "experiment complete"
        );
        Ok(ExperimentReport {
            max_evaluations: self.max_evaluations,
            seed: self.seed,
            reference_point,
            algorithms,
            merged_front,
        })
    }

    fn run_one<E>(
        &self,
        spec: &AlgorithmSpec,
        evaluator: &mut E,
        rng: &mut StdRng,
    ) -> Result<RunOutcome, ExperimentError>
    where
        E: PopulationEvaluator,
    {
        match &spec.config {
            AlgorithmConfig::Nsga2 {
                population_size,
                crossover,
                mutation,
            } => {
                let operator_error = |source: OperatorError| ExperimentError::Operator {
                    algorithm: spec.name.clone(),
                    source,
                };
                let lower = evaluator.lower_bounds().to_vec();
                let upper = evaluator.upper_bounds().to_vec();
                let crossover =
                    build_crossover(*crossover, &lower, &upper).map_err(operator_error)?;
                let mutation = build_mutation(*mutation, &lower, &upper).map_err(operator_error)?;
                let nsga2_error = |source: Nsga2Error| ExperimentError::Nsga2 {
                    algorithm: spec.name.clone(),
                    source,
                };
                let mut engine = Nsga2::builder(evaluator)
                    .population_size(*population_size)
                    .max_evaluations(self.max_evaluations)
                    .crossover(crossover)
                    .mutation(mutation)
                    .build()
                    .map_err(nsga2_error)?;
                let report = engine.run(rng).map_err(nsga2_error)?;
                Ok(RunOutcome {
                    front: pareto_front(&report.front),
                    generations: report.generations,
                    evaluations: report.evaluations,
                    stats: report.stats,
                })
            }
            AlgorithmConfig::WeightedSum {
                divisions,
                population_size,
            } => {
                let report = WeightedSumSweep::new(evaluator)
                    .divisions(*divisions)
                    .population_size(*population_size)
                    .max_evaluations(self.max_evaluations)
                    .run(rng)
                    .map_err(|source| ExperimentError::Sweep {
                        algorithm: spec.name.clone(),
                        source,
                    })?;
                Ok(RunOutcome {
                    front: report.front,
                    generations: report.generations,
                    evaluations: report.evaluations,
                    stats: report.stats,
                })
            }
        }
    }
}

struct RunOutcome {
    front: Vec<Solution>,
    generations: usize,
    evaluations: usize,
    stats: RunStats,
}

fn build_crossover(
    kind: CrossoverKind,
    lower: &[f64],
    upper: &[f64],
) -> Result<Box<dyn CrossoverOperator>, OperatorError> {
    Ok(match kind {
        CrossoverKind::Sbx { eta } => Box::new(SimulatedBinaryCrossover::new(
            lower.to_vec(),
            upper.to_vec(),
            eta,
        )?),
        CrossoverKind::Blend { alpha } => Box::new(BlendAlphaCrossover::new(alpha)?),
    })
}

fn build_mutation(
    kind: MutationKind,
    lower: &[f64],
    upper: &[f64],
) -> Result<Box<dyn MutationOperator>, OperatorError> {
    Ok(match kind {
        MutationKind::Polynomial { eta } => Box::new(PolynomialMutation::per_variable(
            lower.to_vec(),
            upper.to_vec(),
            eta,
        )?),
        MutationKind::Gaussian {
            relative_sigma,
            probability,
        } => Box::new(GaussianMutation::new(
            lower.to_vec(),
            upper.to_vec(),
            relative_sigma,
            probability,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::IBeamProblem;
    use crate::evaluator::SerialEvaluator;

    fn small_lineup() -> Vec<AlgorithmSpec> {
        let mut gauss = AlgorithmSpec::nsga2("GAUSS", 20);
        if let AlgorithmConfig::Nsga2 { mutation, .. } = &mut gauss.config {
            *mutation = MutationKind::Gaussian {
                relative_sigma: 0.1,
                probability: 0.25,
            };
        }
        let mut sweep = AlgorithmSpec::weighted_sum("SWEEP", 2);
        if let AlgorithmConfig::WeightedSum { population_size, .. } = &mut sweep.config {
            *population_size = 10;
        }
        vec![AlgorithmSpec::nsga2("PLAIN", 20), gauss, sweep]
    }

    #[test]
    fn lineup_names_are_unique() {
        let lineup = AlgorithmSpec::default_lineup();
        let mut names: Vec<&str> = lineup.iter().map(|spec| spec.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), lineup.len());
    }

    #[test]
    fn empty_lineup_is_rejected() {
        let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
        let result = Experiment::new(Vec::new()).run(&mut evaluator);
        assert!(matches!(result, Err(ExperimentError::EmptyLineup)));
    }

    #[test]
    fn every_algorithm_reports_a_feasible_front_within_budget() {
        let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
        let report = Experiment::new(small_lineup())
            .max_evaluations(600)
            .seed(21)
            .run(&mut evaluator)
            .unwrap();
        assert_eq!(report.algorithms.len(), 3);
        assert_eq!(report.reference_point.len(), 2);
        for result in &report.algorithms {
            assert!(result.metadata.evaluations <= 600);
            assert!(result.front.iter().all(Solution::is_feasible));
            assert!(result.hypervolume >= 0.0);
        }
        assert_eq!(report.algorithms[1].metadata.rng_seed, Some(22));
        assert!(!report.merged_front.is_empty());
    }

    #[test]
    fn failing_algorithm_is_named() {
        let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
        let err = Experiment::new(vec![AlgorithmSpec::nsga2("TOO_BIG", 500)])
            .max_evaluations(600)
            .run(&mut evaluator)
            .unwrap_err();
        assert!(err.to_string().starts_with("TOO_BIG"));
    }
}
