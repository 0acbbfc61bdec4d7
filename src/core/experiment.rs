//! Run metadata and per-generation statistics.
//!
//! Engines fill a [`RunStats`] as they iterate so the experiment report can
//! show how each algorithm converged, not only where it ended.

use serde::{Deserialize, Serialize};

/// Time-series metrics captured during an optimization run.
///
/// # Examples
/// ```
/// use ibeam::RunStats;
/// let stats = RunStats::new();
/// assert_eq!(stats.generations(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of feasible individuals in each generation.
    pub feasible_count: Vec<usize>,
    /// Size of the first non-dominated front in each generation.
    pub front_size: Vec<usize>,
    /// Per-objective minimum among feasible individuals, `None` when the
    /// generation had no feasible individual.
    pub best_objectives: Vec<Option<Vec<f64>>>,
    /// Spread of the decision variables in each generation.
    pub population_diversity: Vec<f64>,
}

impl RunStats {
    /// Creates an empty set of run statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of generations tracked by the stats object.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.feasible_count.len()
    }

    pub(crate) fn record<'a, I>(&mut self, individuals: I, front_size: usize)
    where
        I: IntoIterator<Item = (&'a [f64], &'a [f64], bool)>,
    {
        let mut feasible = 0;
        let mut best: Option<Vec<f64>> = None;
        let mut genes: Vec<&[f64]> = Vec::new();
        for (variables, objectives, is_feasible) in individuals {
            genes.push(variables);
            if !is_feasible {
                continue;
            }
            feasible += 1;
            match best.as_mut() {
                Some(best) => {
                    for (current, &value) in best.iter_mut().zip(objectives) {
                        *current = current.min(value);
                    }
                }
                None => best = Some(objectives.to_vec()),
            }
        }
        self.feasible_count.push(feasible);
        self.front_size.push(front_size);
        self.best_objectives.push(best);
        self.population_diversity
            .push(population_diversity_by(genes.len(), |idx| genes[idx]));
    }

    /// Appends the generations of another run after the ones already tracked.
    pub(crate) fn append(&mut self, mut other: RunStats) {
        self.feasible_count.append(&mut other.feasible_count);
        self.front_size.append(&mut other.front_size);
        self.best_objectives.append(&mut other.best_objectives);
        self.population_diversity
            .append(&mut other.population_diversity);
    }
}

/// Metadata describing an executed run.
///
/// # Examples
/// ```
/// use ibeam::ExperimentMetadata;
/// let metadata = ExperimentMetadata::new("NSGAII", 10, 1_100, Some(7));
/// assert_eq!(metadata.generations, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Name of the algorithm configuration.
    pub algorithm: String,
    /// Number of generations executed.
    pub generations: usize,
    /// Number of objective function evaluations consumed.
    pub evaluations: usize,
    /// Optional RNG seed recorded by the caller.
    pub rng_seed: Option<u64>,
}

impl ExperimentMetadata {
    /// Creates a new metadata record.
    #[must_use]
    pub fn new(
        algorithm: impl Into<String>,
        generations: usize,
        evaluations: usize,
        rng_seed: Option<u64>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            generations,
            evaluations,
            rng_seed,
        }
    }
}

/// Root-mean-square deviation of the genes around their per-dimension mean.
pub(crate) fn population_diversity_by<'a, F>(size: usize, mut at: F) -> f64
where
    F: FnMut(usize) -> &'a [f64],
{
    if size == 0 {
        return 0.0;
    }
    let dimensions = at(0).len();
    if dimensions == 0 {
        return 0.0;
    }
    let mut means = vec![0.0; dimensions];
    #[allow(clippy::cast_precision_loss)]
    let population_size = size as f64;
    for idx in 0..size {
        for (mean, value) in means.iter_mut().zip(at(idx)) {
            *mean += *value;
        }
    }
    for mean in &mut means {
        *mean /= population_size;
    }
    let mut total_variance = 0.0;
    for idx in 0..size {
        for (mean, value) in means.iter().zip(at(idx)) {
            let diff = value - mean;
            total_variance += (diff * diff) / population_size;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    {
        (total_variance / dimensions as f64).sqrt()
    }
}
