//! Dominance relations and front utilities.

use crate::core::Solution;
use std::cmp::Ordering;

/// Pareto dominance for minimized objectives.
///
/// `candidate` dominates `other` when it is no worse in every objective and
/// strictly better in at least one.
///
/// # Examples
/// ```
/// use ibeam::pareto::dominates;
/// assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
/// assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
/// ```
#[must_use]
pub fn dominates(candidate: &[f64], other: &[f64]) -> bool {
    let mut strictly_better = false;
    for (&a, &b) in candidate.iter().zip(other.iter()) {
        if a > b {
            return false;
        }
        if a < b {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Constrained dominance.
///
/// A feasible candidate beats an infeasible one, the smaller violation wins
/// between two infeasible candidates, and plain Pareto dominance decides
/// between two feasible ones.
#[must_use]
pub fn constrained_dominates(
    candidate: &[f64],
    candidate_violation: f64,
    other: &[f64],
    other_violation: f64,
) -> bool {
    match (candidate_violation > 0.0, other_violation > 0.0) {
        (false, true) => true,
        (true, false) => false,
        (true, true) => candidate_violation < other_violation,
        (false, false) => dominates(candidate, other),
    }
}

/// Indices of the solutions not constrained-dominated by any other.
#[must_use]
pub fn non_dominated_indices(solutions: &[Solution]) -> Vec<usize> {
    (0..solutions.len())
        .filter(|&idx| {
            let candidate = &solutions[idx];
            !solutions.iter().enumerate().any(|(other_idx, other)| {
                other_idx != idx
                    && constrained_dominates(
                        &other.objectives,
                        other.constraint_violation,
                        &candidate.objectives,
                        candidate.constraint_violation,
                    )
            })
        })
        .collect()
}

/// Keeps the feasible, non-dominated solutions and drops exact duplicates in
/// objective space.
///
/// # Examples
/// ```
/// use ibeam::pareto::pareto_front;
/// use ibeam::Solution;
///
/// let solutions = vec![
///     Solution::new(vec![0.0], vec![1.0, 3.0], vec![0.0]),
///     Solution::new(vec![1.0], vec![2.0, 2.0], vec![0.0]),
///     Solution::new(vec![2.0], vec![2.0, 4.0], vec![0.0]),
///     Solution::new(vec![3.0], vec![0.0, 0.0], vec![-1.0]),
/// ];
/// let front = pareto_front(&solutions);
/// assert_eq!(front.len(), 2);
/// ```
#[must_use]
pub fn pareto_front(solutions: &[Solution]) -> Vec<Solution> {
    let feasible = feasible_only(solutions);
    let mut front: Vec<Solution> = non_dominated_indices(&feasible)
        .into_iter()
        .map(|idx| feasible[idx].clone())
        .collect();
    sort_by_first_objective(&mut front);
    front.dedup_by(|a, b| a.objectives == b.objectives);
    front
}

/// Drops every solution that violates a constraint.
#[must_use]
pub fn feasible_only(solutions: &[Solution]) -> Vec<Solution> {
    solutions
        .iter()
        .filter(|solution| solution.is_feasible())
        .cloned()
        .collect()
}

/// Merges several fronts into one non-dominated front.
#[must_use]
pub fn merge_fronts<'a, I>(fronts: I) -> Vec<Solution>
where
    I: IntoIterator<Item = &'a [Solution]>,
{
    let pooled: Vec<Solution> = fronts.into_iter().flatten().cloned().collect();
    pareto_front(&pooled)
}

/// Orders solutions by their first objective, then their second.
pub fn sort_by_first_objective(solutions: &mut [Solution]) {
    solutions.sort_by(|a, b| {
        a.objectives
            .iter()
            .zip(b.objectives.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Area dominated by a two-objective front, bounded by `reference`.
///
/// Points that do not strictly dominate the reference contribute nothing.
///
/// # Examples
/// ```
/// use ibeam::pareto::hypervolume_2d;
/// let front = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
/// assert_eq!(hypervolume_2d(&front, [3.0, 3.0]), 3.0);
/// ```
#[must_use]
pub fn hypervolume_2d(points: &[Vec<f64>], reference: [f64; 2]) -> f64 {
    let mut inside: Vec<[f64; 2]> = points
        .iter()
        .filter(|point| point.len() >= 2 && point[0] < reference[0] && point[1] < reference[1])
        .map(|point| [point[0], point[1]])
        .collect();
    inside.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    let mut volume = 0.0;
    let mut ceiling = reference[1];
    for [x, y] in inside {
        if y < ceiling {
            volume += (reference[0] - x) * (ceiling - y);
            ceiling = y;
        }
    }
    volume
}

/// Component-wise maximum of the objective vectors, `None` for an empty set.
#[must_use]
pub fn nadir(solutions: &[Solution]) -> Option<Vec<f64>> {
    solutions.iter().map(|s| s.objectives.clone()).reduce(|mut acc, objectives| {
        for (current, value) in acc.iter_mut().zip(objectives) {
            *current = current.max(value);
        }
        acc
    })
}

/// Component-wise minimum of the objective vectors, `None` for an empty set.
#[must_use]
pub fn ideal(solutions: &[Solution]) -> Option<Vec<f64>> {
    solutions.iter().map(|s| s.objectives.clone()).reduce(|mut acc, objectives| {
        for (current, value) in acc.iter_mut().zip(objectives) {
            *current = current.min(value);
        }
        acc
    })
}
