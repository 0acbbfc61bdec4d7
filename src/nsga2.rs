//! Constrained NSGA-II for real-coded designs.
//!
//! The [`Nsga2`] engine follows Deb et al. with the constrained-dominance
//! rule: feasible designs always rank ahead of infeasible ones, infeasible
//! designs are ordered by total violation, and feasible designs by Pareto
//! dominance. Offspring come from binary tournaments, bounded SBX and
//! polynomial mutation unless other operators are configured.
//!
//! The run length can be expressed either in generations or as an evaluation
//! budget, which is how the benchmark compares algorithms.

use crate::core::experiment::RunStats;
use crate::core::{sample_within, BoundsError, Solution};
use crate::evaluator::{EvaluationError, PopulationEvaluator};
use crate::ops::{
    random_index, CrossoverOperator, MutationOperator, OperatorError, PolynomialMutation,
    ProblemError, SimulatedBinaryCrossover,
};
use crate::pareto::constrained_dominates;
use rand::Rng;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

const DEFAULT_SBX_ETA: f64 = 15.0;
const DEFAULT_POLY_ETA: f64 = 20.0;
const DEFAULT_POPULATION: usize = 100;
const DEFAULT_GENERATIONS: usize = 100;

/// Report returned by [`Nsga2::run`].
///
/// # Examples
/// ```
/// use ibeam::{IBeamProblem, Nsga2, SerialEvaluator};
/// use rand::SeedableRng;
///
/// let evaluator = SerialEvaluator::new(IBeamProblem::new());
/// let mut engine = Nsga2::builder(evaluator)
///     .population_size(20)
///     .generations(5)
///     .build()
///     .unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let report = engine.run(&mut rng).unwrap();
/// assert!(!report.front.is_empty());
/// assert_eq!(report.evaluations, 20 * 6);
/// ```
#[derive(Debug, Clone)]
pub struct Nsga2Report {
    /// First non-dominated front of the final population.
    pub front: Vec<Solution>,
    /// Whole final population.
    pub population: Vec<Solution>,
    /// Number of generations executed.
    pub generations: usize,
    /// Number of evaluations consumed, initial population included.
    pub evaluations: usize,
    /// Per-generation statistics.
    pub stats: RunStats,
}

/// Errors produced by the [`Nsga2`] engine.
#[derive(Error, Debug)]
pub enum Nsga2Error {
    /// Population size must be at least two.
    #[error("population size must be at least two (received {0})")]
    InvalidPopulationSize(usize),
    /// Number of generations must be at least one.
    #[error("number of generations must be positive (received {0})")]
    InvalidGenerationCount(usize),
    /// The evaluation budget does not cover one generation after the initial
    /// population.
    #[error("evaluation budget {budget} is too small for population size {population_size}")]
    InsufficientBudget {
        /// Requested budget.
        budget: usize,
        /// Configured population size.
        population_size: usize,
    },
    /// An operator failed validation.
    #[error(transparent)]
    Operator(#[from] OperatorError),
    /// The problem reported inconsistent bounds.
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    /// The problem reported an error.
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// Population evaluation failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    /// The evaluator returned a different number of objectives than advertised.
    #[error("problem reported {found} objectives but advertised {expected}")]
    ObjectiveCountMismatch {
        /// Number of objectives advertised by the problem.
        expected: usize,
        /// Number of objectives returned by the evaluator.
        found: usize,
    },
}

enum RunLength {
    Generations(usize),
    Budget(usize),
}

/// Builder used to configure an [`Nsga2`] engine.
pub struct Nsga2Builder<E> {
    evaluator: E,
    population_size: usize,
    run_length: RunLength,
    crossover: Option<Box<dyn CrossoverOperator>>,
    mutation: Option<Box<dyn MutationOperator>>,
}

impl<E> Nsga2Builder<E>
where
    E: PopulationEvaluator,
{
    /// Configures the population size.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Runs for a fixed number of generations.
    #[must_use]
    pub fn generations(mut self, generations: usize) -> Self {
        self.run_length = RunLength::Generations(generations);
        self
    }

    /// Runs as many whole generations as fit into `evaluations`, the initial
    /// population included.
    #[must_use]
    pub fn max_evaluations(mut self, evaluations: usize) -> Self {
        self.run_length = RunLength::Budget(evaluations);
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

    /// Finalizes the builder into an [`Nsga2`] engine.
    ///
    /// # Errors
    /// Returns [`Nsga2Error`] when the configuration is invalid or when the
    /// default operators fail validation.
    pub fn build(self) -> Result<Nsga2<E>, Nsga2Error> {
        if self.population_size < 2 {
            return Err(Nsga2Error::InvalidPopulationSize(self.population_size));
        }
        let generations = match self.run_length {
            RunLength::Generations(generations) => generations,
            RunLength::Budget(budget) => {
                let generations =
                    budget.saturating_sub(self.population_size) / self.population_size;
                if generations == 0 {
                    return Err(Nsga2Error::InsufficientBudget {
                        budget,
                        population_size: self.population_size,
                    });
                }
                generations
            }
        };
        if generations == 0 {
            return Err(Nsga2Error::InvalidGenerationCount(0));
        }
        let evaluator = self.evaluator;
        evaluator.validate_bounds()?;
        let lower_bounds = evaluator.lower_bounds().to_vec();
        let upper_bounds = evaluator.upper_bounds().to_vec();
        let objectives = evaluator.objectives();
        if objectives == 0 {
            return Err(Nsga2Error::ObjectiveCountMismatch {
                expected: 1,
                found: 0,
            });
        }
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
        Ok(Nsga2 {
            evaluator,
            population_size: self.population_size,
            generations,
            crossover,
            mutation,
            lower_bounds,
            upper_bounds,
            objectives,
        })
    }
}

/// NSGA-II engine for constrained multi-objective real-coded optimization.
pub struct Nsga2<E> {
    evaluator: E,
    population_size: usize,
    generations: usize,
    crossover: Box<dyn CrossoverOperator>,
    mutation: Box<dyn MutationOperator>,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
    objectives: usize,
}

impl<E> Nsga2<E>
where
    E: PopulationEvaluator,
{
    /// Creates a builder used to configure the engine.
    #[must_use]
    pub fn builder(evaluator: E) -> Nsga2Builder<E> {
        Nsga2Builder {
            evaluator,
            population_size: DEFAULT_POPULATION,
            run_length: RunLength::Generations(DEFAULT_GENERATIONS),
            crossover: None,
            mutation: None,
        }
    }

    /// Number of generations the engine will run.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.generations
    }

    /// Runs the optimization for the configured number of generations.
    ///
    /// # Errors
    /// Returns [`Nsga2Error`] when population evaluation fails.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<Nsga2Report, Nsga2Error> {
        let mut stats = RunStats::new();
        let mut population = self.initialize_population(rng)?;
        let mut evaluations = self.evaluate_population(&mut population)?;
        let fronts = assign_ranks_and_crowding(&mut population);
        record(&mut stats, &population, fronts.first().map_or(0, Vec::len));
        for generation in 1..=self.generations {
            let mut offspring = self.generate_offspring(&population, rng);
            evaluations += self.evaluate_population(&mut offspring)?;
            let mut combined = population;
            combined.append(&mut offspring);
            population = self.reduce_population(combined);
            let front_size = population.iter().filter(|i| i.rank == 0).count();
            record(&mut stats, &population, front_size);
            debug!(
                generation,
                evaluations,
                front_size,
                feasible = stats.feasible_count.last().copied().unwrap_or(0),
                "nsga2 generation complete"
            );
        }
        assign_ranks_and_crowding(&mut population);
        let front = population
            .iter()
            .filter(|individual| individual.rank == 0)
            .map(IndividualState::to_solution)
            .collect();
        Ok(Nsga2Report {
            front,
            population: population.iter().map(IndividualState::to_solution).collect(),
            generations: self.generations,
            evaluations,
            stats,
        })
    }

    fn initialize_population<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<IndividualState>, Nsga2Error> {
        (0..self.population_size)
            .map(|_| {
                sample_within(&self.lower_bounds, &self.upper_bounds, rng)
                    .map(IndividualState::from_genes)
                    .map_err(Nsga2Error::from)
            })
            .collect()
    }

    fn evaluate_population(
        &mut self,
        population: &mut [IndividualState],
    ) -> Result<usize, Nsga2Error> {
        let genes: Vec<Vec<f64>> = population.iter().map(|i| i.genes.clone()).collect();
        let evaluations = self.evaluator.evaluate_population(&genes)?;
        for (individual, evaluation) in population.iter_mut().zip(evaluations) {
            if evaluation.objectives.len() != self.objectives {
                return Err(Nsga2Error::ObjectiveCountMismatch {
                    expected: self.objectives,
                    found: evaluation.objectives.len(),
                });
            }
            individual.violation = evaluation.violation();
            individual.objectives = evaluation.objectives;
            individual.constraints = evaluation.constraints;
        }
        Ok(genes.len())
    }

    fn generate_offspring<R: Rng>(
        &self,
        population: &[IndividualState],
        rng: &mut R,
    ) -> Vec<IndividualState> {
        let mut offspring = Vec::with_capacity(self.population_size);
        while offspring.len() < self.population_size {
            let parent_a = &population[binary_tournament(population, rng)];
            let parent_b = &population[binary_tournament(population, rng)];
            let (child_a, child_b) =
                self.crossover.crossover(&parent_a.genes, &parent_b.genes, rng);
            for child in [child_a, child_b] {
                if offspring.len() == self.population_size {
                    break;
                }
                let mut child = self.mutation.mutate(&child, rng);
                self.clamp(&mut child);
                offspring.push(IndividualState::from_genes(child));
            }
        }
        offspring
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

    fn reduce_population(&self, mut combined: Vec<IndividualState>) -> Vec<IndividualState> {
        let fronts = assign_ranks_and_crowding(&mut combined);
        let mut next = Vec::with_capacity(self.population_size);
        for mut front in fronts {
            let room = self.population_size - next.len();
            if room == 0 {
                break;
            }
            if front.len() > room {
                front.sort_by(|&a, &b| {
                    combined[b]
                        .crowding_distance
                        .total_cmp(&combined[a].crowding_distance)
                });
                front.truncate(room);
            }
            next.extend(front.into_iter().map(|idx| combined[idx].clone()));
        }
        next
    }
}

#[derive(Clone, Debug)]
struct IndividualState {
    genes: Vec<f64>,
    objectives: Vec<f64>,
    constraints: Vec<f64>,
    violation: f64,
    rank: usize,
    crowding_distance: f64,
}

impl IndividualState {
    fn from_genes(genes: Vec<f64>) -> Self {
        Self {
            genes,
            objectives: Vec::new(),
            constraints: Vec::new(),
            violation: 0.0,
            rank: 0,
            crowding_distance: 0.0,
        }
    }

    fn to_solution(&self) -> Solution {
        Solution::new(
            self.genes.clone(),
            self.objectives.clone(),
            self.constraints.clone(),
        )
    }

    fn constrained_dominates(&self, other: &Self) -> bool {
        constrained_dominates(
            &self.objectives,
            self.violation,
            &other.objectives,
            other.violation,
        )
    }
}

fn record(stats: &mut RunStats, population: &[IndividualState], front_size: usize) {
    stats.record(
        population.iter().map(|individual| {
            (
                individual.genes.as_slice(),
                individual.objectives.as_slice(),
                individual.violation <= 0.0,
            )
        }),
        front_size,
    );
}

fn assign_ranks_and_crowding(population: &mut [IndividualState]) -> Vec<Vec<usize>> {
    let fronts = fast_nondominated_sort(population);
    for front in &fronts {
        assign_crowding_distance(population, front);
    }
    fronts
}

fn fast_nondominated_sort(population: &mut [IndividualState]) -> Vec<Vec<usize>> {
    let size = population.len();
    let mut domination_counts = vec![0usize; size];
    let mut dominated = vec![Vec::new(); size];
    let mut current_front = Vec::new();
    for p in 0..size {
        for q in 0..size {
            if population[p].constrained_dominates(&population[q]) {
                dominated[p].push(q);
            } else if population[q].constrained_dominates(&population[p]) {
                domination_counts[p] += 1;
            }
        }
        if domination_counts[p] == 0 {
            population[p].rank = 0;
            current_front.push(p);
        }
    }
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    while !current_front.is_empty() {
        let rank = fronts.len();
        let mut next_front = Vec::new();
        for &p in &current_front {
            for &q in &dominated[p] {
                domination_counts[q] -= 1;
                if domination_counts[q] == 0 {
                    population[q].rank = rank + 1;
                    next_front.push(q);
                }
            }
        }
        fronts.push(current_front);
        current_front = next_front;
    }
    fronts
}

fn assign_crowding_distance(population: &mut [IndividualState], front: &[usize]) {
    if front.len() <= 2 {
        for &idx in front {
            population[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }
    for &idx in front {
        population[idx].crowding_distance = 0.0;
    }
    let objectives = population[front[0]].objectives.len();
    let mut sorted = front.to_vec();
    for obj_idx in 0..objectives {
        sorted.sort_by(|&a, &b| {
            population[a].objectives[obj_idx].total_cmp(&population[b].objectives[obj_idx])
        });
        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        population[first].crowding_distance = f64::INFINITY;
        population[last].crowding_distance = f64::INFINITY;
        let span = population[last].objectives[obj_idx] - population[first].objectives[obj_idx];
        if span.abs() < f64::EPSILON {
            continue;
        }
        for window in sorted.windows(3) {
            let (prev, current, next) = (window[0], window[1], window[2]);
            let distance = (population[next].objectives[obj_idx]
                - population[prev].objectives[obj_idx])
                / span;
            population[current].crowding_distance += distance;
        }
    }
}

fn binary_tournament<R: Rng>(population: &[IndividualState], rng: &mut R) -> usize {
    if population.len() == 1 {
        return 0;
    }
    let idx_a = random_index(population.len(), rng);
    let mut idx_b = random_index(population.len(), rng);
    while idx_a == idx_b {
        idx_b = random_index(population.len(), rng);
    }
    if crowded_comparison(&population[idx_a], &population[idx_b]) == Ordering::Greater {
        idx_b
    } else {
        idx_a
    }
}

fn crowded_comparison(a: &IndividualState, b: &IndividualState) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| b.crowding_distance.total_cmp(&a.crowding_distance))
}
