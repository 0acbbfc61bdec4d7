//! Real-coded genetic algorithm over a penalized scalarization.
//!
//! The [`RealGa`] builder wires the operators from [`crate::ops`] around a
//! [`Scalarization`] that folds the objectives of a constrained problem into a
//! single fitness value. Users construct the engine through
//! [`RealGa::builder`], customize the operators or stop conditions, and call
//! [`RealGa::run`] with a random number generator.

use crate::core::experiment::RunStats;
use crate::core::{sample_within, BoundsError, Solution};
use crate::evaluator::{EvaluationError, PopulationEvaluator};
use crate::ops::{
    CrossoverOperator, Evaluation, MutationOperator, OperatorError, PolynomialMutation,
    ProblemError, SelectionOperator, SimulatedBinaryCrossover, TournamentSelection,
};
use crate::pareto::constrained_dominates;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

const DEFAULT_SBX_ETA: f64 = 15.0;
const DEFAULT_POLY_ETA: f64 = 20.0;
const DEFAULT_TOURNAMENT_SIZE: usize = 3;
const DEFAULT_GENERATIONS: usize = 100;
const DEFAULT_PENALTY: f64 = 10.0;

/// Reports produced after running [`RealGa::run`].
///
/// # Examples
/// ```
/// use ibeam::{IBeamProblem, RealGa, Scalarization, SerialEvaluator, StopCondition};
/// use rand::SeedableRng;
///
/// let scalarization =
///     Scalarization::new(vec![1.0, 0.0], vec![0.0, 0.0], vec![1_000.0, 1.0]).unwrap();
/// let mut ga = RealGa::builder(SerialEvaluator::new(IBeamProblem::new()), scalarization)
///     .population_size(20)
///     .stop_condition(StopCondition::max_generations(5))
///     .build()
///     .unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let report = ga.run(&mut rng).unwrap();
/// assert_eq!(report.generations, 5);
/// assert_eq!(report.evaluations, 20 * 6);
/// ```
#[derive(Debug, Clone)]
pub struct RealGaReport {
    /// Best design discovered by the engine. Feasible designs always beat
    /// infeasible ones, then lower fitness wins.
    pub best: Solution,
    /// Fitness associated with [`Self::best`].
    pub best_fitness: f64,
    /// Number of generations executed before stopping.
    pub generations: usize,
    /// Number of evaluations consumed, initial population included.
    pub evaluations: usize,
    /// Per-generation statistics.
    pub stats: RunStats,
}

/// Errors produced by the [`RealGa`] engine or its default operators.
#[derive(Error, Debug)]
pub enum RealGaError {
    /// The configured population size was zero.
    #[error("population size must be greater than zero (received {0})")]
    InvalidPopulationSize(usize),
    /// Weights, ideal and nadir vectors disagree with the objective count.
    #[error("scalarization covers {found} objectives but the problem has {expected}")]
    ScalarizationMismatch {
        /// Number of objectives reported by the problem.
        expected: usize,
        /// Length of the offending scalarization vector.
        found: usize,
    },
    /// A weight or the penalty factor was negative or not finite.
    #[error("scalarization parameter {parameter} was invalid (received {value})")]
    InvalidScalarization {
        /// Name of the parameter.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Selection operator failed to return parents for reproduction.
    #[error("selection operator failed to provide parents")]
    SelectionFailed,
    /// An operator failed validation.
    #[error(transparent)]
    Operator(#[from] OperatorError),
    /// Wrapper around [`BoundsError`].
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    /// Wrapper around [`ProblemError`].
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// Population evaluation failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Weighted sum of normalized objectives plus a constraint penalty.
///
/// Each objective is mapped through `(f - ideal) / (nadir - ideal)`; a
/// dimension where the nadir does not exceed the ideal is left unscaled.
///
/// # Examples
/// ```
/// use ibeam::Scalarization;
/// use ibeam::ops::Evaluation;
///
/// let scalarization = Scalarization::new(vec![0.5, 0.5], vec![0.0, 0.0], vec![10.0, 2.0])
///     .unwrap()
///     .with_penalty(100.0)
///     .unwrap();
/// let feasible = Evaluation::new(vec![5.0, 1.0], vec![1.0]);
/// assert!((scalarization.fitness(&feasible) - 0.5).abs() < 1e-12);
/// let infeasible = Evaluation::new(vec![5.0, 1.0], vec![-0.01]);
/// assert!((scalarization.fitness(&infeasible) - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Scalarization {
    weights: Vec<f64>,
    ideal: Vec<f64>,
    nadir: Vec<f64>,
    penalty: f64,
}

impl Scalarization {
    /// Creates a scalarization with the default penalty factor.
    ///
    /// # Errors
    /// Returns [`RealGaError`] when the vectors differ in length or a weight
    /// is negative or not finite.
    pub fn new(weights: Vec<f64>, ideal: Vec<f64>, nadir: Vec<f64>) -> Result<Self, RealGaError> {
        for vector in [&ideal, &nadir] {
            if vector.len() != weights.len() {
                return Err(RealGaError::ScalarizationMismatch {
                    expected: weights.len(),
                    found: vector.len(),
                });
            }
        }
        if let Some(&value) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(RealGaError::InvalidScalarization {
                parameter: "weight",
                value,
            });
        }
        Ok(Self {
            weights,
            ideal,
            nadir,
            penalty: DEFAULT_PENALTY,
        })
    }

    /// Replaces the factor applied to the total constraint violation.
    ///
    /// # Errors
    /// Returns [`RealGaError::InvalidScalarization`] for a negative or
    /// non-finite factor.
    pub fn with_penalty(mut self, penalty: f64) -> Result<Self, RealGaError> {
        if !(penalty.is_finite() && penalty >= 0.0) {
            return Err(RealGaError::InvalidScalarization {
                parameter: "penalty",
                value: penalty,
            });
        }
        self.penalty = penalty;
        Ok(self)
    }

    /// Objective weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Scalar fitness of an evaluation; lower is better.
    #[must_use]
    pub fn fitness(&self, evaluation: &Evaluation) -> f64 {
        let weighted: f64 = evaluation
            .objectives
            .iter()
            .zip(&self.weights)
            .zip(self.ideal.iter().zip(&self.nadir))
            .map(|((value, weight), (ideal, nadir))| {
                let span = nadir - ideal;
                let normalized = if span > f64::EPSILON {
                    (value - ideal) / span
                } else {
                    value - ideal
                };
                weight * normalized
            })
            .sum();
        weighted + self.penalty * evaluation.violation()
    }
}

/// Combines primitive stop conditions.
#[derive(Debug, Clone)]
pub enum StopCondition {
    /// Stop when the generation counter reaches this limit.
    MaxGenerations {
        /// Maximum number of generations to run.
        limit: usize,
    },
    /// Stop when the best fitness drops below the provided value.
    TargetFitnessBelow {
        /// Target fitness that ends the run when best fitness is below or equal.
        threshold: f64,
    },
    /// Logical OR that triggers when either child condition is met.
    Or(Box<StopCondition>, Box<StopCondition>),
}

impl StopCondition {
    /// Creates a stop condition that limits the maximum number of generations.
    #[must_use]
    pub fn max_generations(limit: usize) -> Self {
        Self::MaxGenerations { limit }
    }

    /// Creates a stop condition that targets a best fitness threshold.
    #[must_use]
    pub fn target_fitness_below(threshold: f64) -> Self {
        Self::TargetFitnessBelow { threshold }
    }

    /// Combines two stop conditions using logical OR semantics.
    #[must_use]
    pub fn or(self, other: StopCondition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    fn is_met(&self, generations: usize, best_fitness: f64) -> bool {
        match self {
            Self::MaxGenerations { limit } => generations >= *limit,
            Self::TargetFitnessBelow { threshold } => best_fitness <= *threshold,
            Self::Or(left, right) => {
                left.is_met(generations, best_fitness) || right.is_met(generations, best_fitness)
            }
        }
    }
}

/// Builder returned by [`RealGa::builder`].
pub struct RealGaBuilder<E> {
    evaluator: E,
    scalarization: Scalarization,
    population_size: usize,
    crossover: Option<Box<dyn CrossoverOperator>>,
    mutation: Option<Box<dyn MutationOperator>>,
    selection: Option<Box<dyn SelectionOperator>>,
    stop_condition: StopCondition,
}

impl<E> RealGaBuilder<E>
where
    E: PopulationEvaluator,
{
    /// Configures the number of individuals per generation.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Replaces the crossover operator.
    #[must_use]
    pub fn crossover(mut self, operator: impl CrossoverOperator + 'static) -> Self {
        self.crossover = Some(Box::new(operator));
        self
    }

    /// Replaces the mutation operator.
    #[must_use]
    pub fn mutation(mut self, operator: impl MutationOperator + 'static) -> Self {
        self.mutation = Some(Box::new(operator));
        self
    }

    /// Replaces the selection operator.
    #[must_use]
    pub fn selection(mut self, operator: impl SelectionOperator + 'static) -> Self {
        self.selection = Some(Box::new(operator));
        self
    }

    /// Configures the stop condition evaluated during [`RealGa::run`].
    #[must_use]
    pub fn stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    /// Finalizes the builder into a [`RealGa`] engine.
    ///
    /// # Errors
    /// Returns [`RealGaError`] when the population size is zero, the problem
    /// bounds are inconsistent, the scalarization does not cover every
    /// objective, or default operator construction fails.
    pub fn build(self) -> Result<RealGa<E>, RealGaError> {
        if self.population_size == 0 {
            return Err(RealGaError::InvalidPopulationSize(0));
        }
        let evaluator = self.evaluator;
        evaluator.validate_bounds()?;
        let objectives = evaluator.objectives();
        if self.scalarization.weights.len() != objectives {
            return Err(RealGaError::ScalarizationMismatch {
                expected: objectives,
                found: self.scalarization.weights.len(),
            });
        }
        let lower_bounds = evaluator.lower_bounds().to_vec();
        let upper_bounds = evaluator.upper_bounds().to_vec();
        let crossover: Box<dyn CrossoverOperator> = match self.crossover {
            Some(operator) => operator,
            None => Box::new(SimulatedBinaryCrossover::new(
                lower_bounds.clone(),
                upper_bounds.clone(),
                DEFAULT_SBX_ETA,
            )?),
        };
        let mutation: Box<dyn MutationOperator> = match self.mutation {
            Some(operator) => operator,
            None => Box::new(PolynomialMutation::per_variable(
                lower_bounds.clone(),
                upper_bounds.clone(),
                DEFAULT_POLY_ETA,
            )?),
        };
        let selection: Box<dyn SelectionOperator> = match self.selection {
            Some(operator) => operator,
            None => Box::new(TournamentSelection::new(DEFAULT_TOURNAMENT_SIZE)?),
        };
        Ok(RealGa {
            evaluator,
            scalarization: self.scalarization,
            population_size: self.population_size,
            crossover,
            mutation,
            selection,
            stop_condition: self.stop_condition,
            lower_bounds,
            upper_bounds,
        })
    }
}

/// Real-coded genetic algorithm engine minimizing a [`Scalarization`].
pub struct RealGa<E> {
    evaluator: E,
    scalarization: Scalarization,
    population_size: usize,
    crossover: Box<dyn CrossoverOperator>,
    mutation: Box<dyn MutationOperator>,
    selection: Box<dyn SelectionOperator>,
    stop_condition: StopCondition,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
}

#[derive(Clone)]
struct Scored {
    genes: Vec<f64>,
    evaluation: Evaluation,
    fitness: f64,
}

impl Scored {
    fn beats(&self, other: &Self) -> bool {
        match (self.evaluation.is_feasible(), other.evaluation.is_feasible()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.fitness < other.fitness,
        }
    }
}

impl<E> RealGa<E>
where
    E: PopulationEvaluator,
{
    /// Creates a builder used to configure the engine.
    #[must_use]
    pub fn builder(evaluator: E, scalarization: Scalarization) -> RealGaBuilder<E> {
        RealGaBuilder {
            evaluator,
            scalarization,
            population_size: 50,
            crossover: None,
            mutation: None,
            selection: None,
            stop_condition: StopCondition::max_generations(DEFAULT_GENERATIONS),
        }
    }

    /// Runs the genetic algorithm using the provided random number generator.
    ///
    /// # Errors
    /// Propagates any [`RealGaError`] emitted by population evaluation or the
    /// configured operators.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<RealGaReport, RealGaError> {
        let mut stats = RunStats::new();
        let population = self.initialize_population(rng)?;
        let mut scored = self.score(population)?;
        let mut evaluations = scored.len();
        record(&mut stats, &scored);
        let mut best = scored[best_of(&scored)].clone();
        let mut generation = 0_usize;
        while !self.stop_condition.is_met(generation, best.fitness) {
            generation = generation.saturating_add(1);
            let selection_scores: Vec<f64> = scored.iter().map(|s| -s.fitness).collect();
            let mut offspring = Vec::with_capacity(self.population_size);
            while offspring.len() < self.population_size {
                let (first, second) = self
                    .selection
                    .select_pair(&selection_scores, rng)
                    .ok_or(RealGaError::SelectionFailed)?;
                let (child_a, child_b) =
                    self.crossover
                        .crossover(&scored[first].genes, &scored[second].genes, rng);
                for child in [child_a, child_b] {
                    if offspring.len() == self.population_size {
                        break;
                    }
                    let mut child = self.mutation.mutate(&child, rng);
                    self.clamp(&mut child);
                    offspring.push(child);
                }
            }
            scored = self.score(offspring)?;
            evaluations += scored.len();
            record(&mut stats, &scored);
            let candidate = &scored[best_of(&scored)];
            if candidate.beats(&best) {
                best = candidate.clone();
            }
            debug!(
                generation,
                evaluations,
                best_fitness = best.fitness,
                "real ga generation complete"
            );
        }
        Ok(RealGaReport {
            best: best.evaluation.into_solution(best.genes),
            best_fitness: best.fitness,
            generations: generation,
            evaluations,
            stats,
        })
    }

    fn initialize_population<R: Rng>(&self, rng: &mut R) -> Result<Vec<Vec<f64>>, RealGaError> {
        (0..self.population_size)
            .map(|_| {
                sample_within(&self.lower_bounds, &self.upper_bounds, rng)
                    .map_err(RealGaError::from)
            })
            .collect()
    }

    fn clamp(&self, candidate: &mut [f64]) {
        for ((value, &lower), &upper) in candidate
            .iter_mut()
            .zip(self.lower_bounds.iter())
            .zip(self.upper_bounds.iter())
        {
            *value = value.clamp(lower, upper);
        }
    }

    fn score(&mut self, population: Vec<Vec<f64>>) -> Result<Vec<Scored>, RealGaError> {
        let evaluations = self.evaluator.evaluate_population(&population)?;
        Ok(population
            .into_iter()
            .zip(evaluations)
            .map(|(genes, evaluation)| {
                let fitness = self.scalarization.fitness(&evaluation);
                Scored {
                    genes,
                    evaluation,
                    fitness,
                }
            })
            .collect())
    }
}

fn best_of(scored: &[Scored]) -> usize {
    let mut best = 0;
    for (idx, candidate) in scored.iter().enumerate().skip(1) {
        if candidate.beats(&scored[best]) {
            best = idx;
        }
    }
    best
}

fn record(stats: &mut RunStats, scored: &[Scored]) {
    stats.record(
        scored.iter().map(|s| {
            (
                s.genes.as_slice(),
                s.evaluation.objectives.as_slice(),
                s.evaluation.is_feasible(),
            )
        }),
        first_front_size(scored),
    );
}

// Individuals no other member of the population constrained-dominates.
fn first_front_size(scored: &[Scored]) -> usize {
    scored
        .iter()
        .filter(|candidate| {
            let violation = candidate.evaluation.violation();
            !scored.iter().any(|other| {
                constrained_dominates(
                    &other.evaluation.objectives,
                    other.evaluation.violation(),
                    &candidate.evaluation.objectives,
                    violation,
                )
            })
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::SerialEvaluator;
    use crate::ops::{ConstrainedProblem, ProblemBounds, ProblemResult};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Bowl;

    impl ProblemBounds for Bowl {
        fn dimensions(&self) -> usize {
            2
        }

        fn lower_bounds(&self) -> &[f64] {
            &[-5.0, -5.0]
        }

        fn upper_bounds(&self) -> &[f64] {
            &[5.0, 5.0]
        }
    }

    impl ConstrainedProblem for Bowl {
        fn objectives(&self) -> usize {
            2
        }

        fn constraints(&self) -> usize {
            1
        }

        fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
            let (x, y) = (genes[0], genes[1]);
            Ok(Evaluation::new(
                vec![(x - 1.0).powi(2) + y * y, (x + 1.0).powi(2) + y * y],
                vec![x + 0.5],
            ))
        }
    }

    fn scalarization(weights: [f64; 2]) -> Scalarization {
        Scalarization::new(weights.to_vec(), vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()
    }

    #[test]
    fn scalarization_rejects_mismatched_lengths() {
        let err = Scalarization::new(vec![1.0, 0.0], vec![0.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            RealGaError::ScalarizationMismatch { expected: 2, found: 1 }
        ));
    }

    #[test]
    fn scalarization_rejects_negative_weight() {
        let err = Scalarization::new(vec![-1.0], vec![0.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, RealGaError::InvalidScalarization { .. }));
    }

    #[test]
    fn builder_rejects_wrong_weight_count() {
        let scalarization = Scalarization::new(vec![1.0], vec![0.0], vec![1.0]).unwrap();
        let result = RealGa::builder(SerialEvaluator::new(Bowl), scalarization).build();
        assert!(matches!(
            result,
            Err(RealGaError::ScalarizationMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn weights_steer_towards_matching_optimum() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut ga = RealGa::builder(SerialEvaluator::new(Bowl), scalarization([1.0, 0.0]))
            .population_size(30)
            .stop_condition(StopCondition::max_generations(40))
            .build()
            .unwrap();
        let report = ga.run(&mut rng).unwrap();
        assert!(report.best.is_feasible());
        assert!((report.best.variables[0] - 1.0).abs() < 0.3);
        assert_eq!(report.evaluations, 30 * 41);
        assert_eq!(report.stats.generations(), 41);
    }

    #[test]
    fn constraint_penalty_keeps_best_feasible() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ga = RealGa::builder(SerialEvaluator::new(Bowl), scalarization([0.0, 1.0]))
            .population_size(30)
            .stop_condition(StopCondition::max_generations(40))
            .build()
            .unwrap();
        let report = ga.run(&mut rng).unwrap();
        assert!(report.best.is_feasible());
        assert!((report.best.variables[0] + 0.5).abs() < 0.3);
    }

    #[test]
    fn stops_when_target_is_reached() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut ga = RealGa::builder(SerialEvaluator::new(Bowl), scalarization([1.0, 0.0]))
            .population_size(20)
            .stop_condition(
                StopCondition::target_fitness_below(100.0).or(StopCondition::max_generations(50)),
            )
            .build()
            .unwrap();
        let report = ga.run(&mut rng).unwrap();
        assert_eq!(report.generations, 0);
    }

    fn scored(objectives: [f64; 2], margin: f64) -> Scored {
        Scored {
            genes: vec![0.0, 0.0],
            evaluation: Evaluation::new(objectives.to_vec(), vec![margin]),
            fitness: 0.0,
        }
    }

    #[test]
    fn front_size_counts_only_non_dominated_individuals() {
        let population = [
            scored([1.0, 4.0], 0.0),
            scored([4.0, 1.0], 1.0),
            scored([2.0, 5.0], 0.5),
            scored([0.5, 0.5], -0.1),
        ];
        assert_eq!(first_front_size(&population), 2);

        let mut stats = RunStats::new();
        record(&mut stats, &population);
        assert_eq!(stats.feasible_count, vec![3]);
        assert_eq!(stats.front_size, vec![2]);
    }

    #[test]
    fn infeasible_population_front_is_least_violating() {
        let population = [scored([1.0, 1.0], -0.2), scored([0.0, 0.0], -0.5)];
        assert_eq!(first_front_size(&population), 1);
    }
}
