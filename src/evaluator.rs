//! Population evaluation backends.
//!
//! Engines never call a problem directly. They hand whole populations to a
//! [`PopulationEvaluator`], which either walks the batch on the calling thread
//! ([`SerialEvaluator`]) or splits it over a pool of blocking Tokio tasks sized
//! to the machine ([`PoolEvaluator`]). Results always come back in input
//! order, so the choice of backend never changes what an engine computes.

use crate::ops::{ConstrainedProblem, Evaluation, ProblemBounds, ProblemError, ProblemResult};
use futures::future::try_join_all;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Result type produced by [`PopulationEvaluator`] implementations.
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Errors reported by evaluation backends.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// The problem rejected a candidate.
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// A worker task failed or panicked before producing its results.
    #[error("evaluation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors that can occur while building a [`PoolEvaluator`].
#[derive(Error, Debug)]
pub enum PoolError {
    /// The requested worker count was zero.
    #[error("worker count must be at least one for pooled evaluation")]
    InvalidWorkers,
    /// Tokio runtime initialization failed.
    #[error("failed to initialize Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Evaluates populations of candidates for a constrained problem.
pub trait PopulationEvaluator: ProblemBounds {
    /// Number of objectives produced per candidate.
    fn objectives(&self) -> usize;

    /// Number of constraints produced per candidate.
    fn constraints(&self) -> usize;

    /// Evaluates every candidate, preserving order.
    ///
    /// # Errors
    /// Returns [`EvaluationError`] when the problem rejects a candidate or a
    /// worker fails.
    fn evaluate_population(&mut self, population: &[Vec<f64>]) -> EvaluationResult<Vec<Evaluation>>;
}

impl<E: PopulationEvaluator + ?Sized> PopulationEvaluator for &mut E {
    fn objectives(&self) -> usize {
        (**self).objectives()
    }

    fn constraints(&self) -> usize {
        (**self).constraints()
    }

    fn evaluate_population(
        &mut self,
        population: &[Vec<f64>],
    ) -> EvaluationResult<Vec<Evaluation>> {
        (**self).evaluate_population(population)
    }
}

/// Evaluates candidates one after another on the calling thread.
///
/// # Examples
/// ```
/// use ibeam::{IBeamProblem, PopulationEvaluator, SerialEvaluator};
///
/// let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
/// let evaluations = evaluator
///     .evaluate_population(&[vec![80.0, 50.0, 5.0, 5.0]])
///     .unwrap();
/// assert_eq!(evaluations[0].objectives[0], 850.0);
/// ```
#[derive(Debug, Clone)]
pub struct SerialEvaluator<P> {
    problem: P,
}

impl<P: ConstrainedProblem> SerialEvaluator<P> {
    /// Wraps a problem.
    #[must_use]
    pub fn new(problem: P) -> Self {
        Self { problem }
    }

    /// Returns the wrapped problem.
    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }
}

impl<P: ConstrainedProblem> ProblemBounds for SerialEvaluator<P> {
    fn dimensions(&self) -> usize {
        self.problem.dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        self.problem.lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        self.problem.upper_bounds()
    }
}

impl<P: ConstrainedProblem> PopulationEvaluator for SerialEvaluator<P> {
    fn objectives(&self) -> usize {
        self.problem.objectives()
    }

    fn constraints(&self) -> usize {
        self.problem.constraints()
    }

    fn evaluate_population(
        &mut self,
        population: &[Vec<f64>],
    ) -> EvaluationResult<Vec<Evaluation>> {
        let evaluations = population
            .iter()
            .map(|candidate| self.problem.evaluate(candidate))
            .collect::<ProblemResult<Vec<_>>>()?;
        Ok(evaluations)
    }
}

/// Spreads each population over blocking tasks on a multi-threaded runtime.
///
/// The population is cut into at most `workers` contiguous chunks; each chunk
/// is evaluated on its own blocking task and the chunks are stitched back
/// together in order.
pub struct PoolEvaluator<P>
where
    P: ConstrainedProblem + 'static,
{
    problem: Arc<P>,
    runtime: Runtime,
    workers: usize,
}

impl<P> PoolEvaluator<P>
where
    P: ConstrainedProblem + 'static,
{
    /// Creates a pool with one worker per available CPU core.
    ///
    /// # Errors
    /// Returns [`PoolError::Runtime`] when the Tokio runtime cannot be
    /// initialized.
    pub fn new(problem: P) -> Result<Self, PoolError> {
        Self::with_workers(problem, available_workers())
    }

    /// Creates a pool with the requested number of workers.
    ///
    /// # Errors
    /// Returns [`PoolError::InvalidWorkers`] when `workers` is zero or
    /// [`PoolError::Runtime`] if the Tokio runtime fails to initialize.
    pub fn with_workers(problem: P, workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::InvalidWorkers);
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .thread_name("ibeam-eval")
            .build()
            .map_err(PoolError::Runtime)?;
        debug!(workers, "started evaluation pool");
        Ok(Self {
            problem: Arc::new(problem),
            runtime,
            workers,
        })
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the shared problem.
    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }

    async fn evaluate_batch(&self, population: &[Vec<f64>]) -> EvaluationResult<Vec<Evaluation>> {
        if population.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = population.len().div_ceil(self.workers);
        let handles = population.chunks(chunk_size).map(|chunk| {
            let problem = Arc::clone(&self.problem);
            let chunk = chunk.to_vec();
            tokio::task::spawn_blocking(move || {
                chunk
                    .iter()
                    .map(|candidate| problem.evaluate(candidate))
                    .collect::<ProblemResult<Vec<_>>>()
            })
        });
        let mut evaluations = Vec::with_capacity(population.len());
        for chunk in try_join_all(handles).await? {
            evaluations.extend(chunk?);
        }
        Ok(evaluations)
    }
}

impl<P> ProblemBounds for PoolEvaluator<P>
where
    P: ConstrainedProblem + 'static,
{
    fn dimensions(&self) -> usize {
        self.problem.dimensions()
    }

    fn lower_bounds(&self) -> &[f64] {
        self.problem.lower_bounds()
    }

    fn upper_bounds(&self) -> &[f64] {
        self.problem.upper_bounds()
    }
}

impl<P> PopulationEvaluator for PoolEvaluator<P>
where
    P: ConstrainedProblem + 'static,
{
    fn objectives(&self) -> usize {
        self.problem.objectives()
    }

    fn constraints(&self) -> usize {
        self.problem.constraints()
    }

    fn evaluate_population(
        &mut self,
        population: &[Vec<f64>],
    ) -> EvaluationResult<Vec<Evaluation>> {
        self.runtime.block_on(self.evaluate_batch(population))
    }
}

/// Number of CPU cores available to the process, at least one.
#[must_use]
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::IBeamProblem;
    use crate::core::sample_within;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl ProblemBounds for Counting {
        fn dimensions(&self) -> usize {
            1
        }

        fn lower_bounds(&self) -> &[f64] {
            &[0.0]
        }

        fn upper_bounds(&self) -> &[f64] {
            &[1.0]
        }
    }

    impl ConstrainedProblem for Counting {
        fn objectives(&self) -> usize {
            1
        }

        fn constraints(&self) -> usize {
            0
        }

        fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
            self.validate_candidate_length(genes.len())?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Evaluation::new(vec![genes[0] * 2.0], vec![]))
        }
    }

    fn beam_population(size: usize) -> Vec<Vec<f64>> {
        let problem = IBeamProblem::new();
        let mut rng = StdRng::seed_from_u64(99);
        (0..size)
            .map(|_| {
                sample_within(problem.lower_bounds(), problem.upper_bounds(), &mut rng).unwrap()
            })
            .collect()
    }

    #[test]
    fn pool_matches_serial_order_and_values() {
        let population = beam_population(37);
        let mut serial = SerialEvaluator::new(IBeamProblem::new());
        let mut pool = PoolEvaluator::with_workers(IBeamProblem::new(), 4).unwrap();
        let expected = serial.evaluate_population(&population).unwrap();
        let actual = pool.evaluate_population(&population).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn pool_evaluates_every_candidate_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let problem = Counting {
            calls: Arc::clone(&calls),
        };
        let mut pool = PoolEvaluator::with_workers(problem, 3).unwrap();
        let population: Vec<Vec<f64>> = (0..10).map(|idx| vec![f64::from(idx)]).collect();
        let evaluations = pool.evaluate_population(&population).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(evaluations[9].objectives, vec![18.0]);
    }

    #[test]
    fn pool_surfaces_problem_errors() {
        let problem = Counting {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut pool = PoolEvaluator::with_workers(problem, 2).unwrap();
        let err = pool
            .evaluate_population(&[vec![0.5], vec![0.5, 0.5]])
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Problem(_)));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = PoolEvaluator::with_workers(IBeamProblem::new(), 0);
        assert!(matches!(result, Err(PoolError::InvalidWorkers)));
    }

    #[test]
    fn empty_population_is_a_no_op() {
        let mut pool = PoolEvaluator::with_workers(IBeamProblem::new(), 2).unwrap();
        assert!(pool.evaluate_population(&[]).unwrap().is_empty());
    }
}
