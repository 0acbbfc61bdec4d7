//! Parent selection over scalar scores.

use crate::ops::{random_index, OperatorError};
use rand::RngCore;

/// Selects parents from a population according to their scores.
///
/// Scores are maximized.
///
/// # Examples
/// ```
/// use ibeam::ops::SelectionOperator;
/// use rand::thread_rng;
///
/// struct BestOnly;
///
/// impl SelectionOperator for BestOnly {
///     fn select_index(&self, scores: &[f64], _rng: &mut dyn rand::RngCore) -> Option<usize> {
///         scores
///             .iter()
///             .enumerate()
///             .max_by(|(_, a), (_, b)| a.total_cmp(b))
///             .map(|(idx, _)| idx)
///     }
/// }
///
/// let pair = BestOnly.select_pair(&[0.0, 10.0], &mut thread_rng()).unwrap();
/// assert_eq!(pair, (1, 1));
/// ```
pub trait SelectionOperator: Send + Sync {
    /// Returns the index of the candidate to use as a parent.
    fn select_index(&self, scores: &[f64], rng: &mut dyn RngCore) -> Option<usize>;

    /// Convenience helper that samples two parents.
    fn select_pair(&self, scores: &[f64], rng: &mut dyn RngCore) -> Option<(usize, usize)> {
        let first = self.select_index(scores, rng)?;
        let second = self.select_index(scores, rng)?;
        Some((first, second))
    }
}

/// k-tournament selection.
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    size: usize,
}

impl TournamentSelection {
    /// Creates a tournament selector of the provided size.
    ///
    /// # Errors
    /// Returns [`OperatorError::InvalidParameter`] when `size` is zero.
    pub fn new(size: usize) -> Result<Self, OperatorError> {
        if size == 0 {
            return Err(OperatorError::InvalidParameter {
                operator: "tournament selection",
                parameter: "size",
                value: 0.0,
            });
        }
        Ok(Self { size })
    }
}

impl SelectionOperator for TournamentSelection {
    fn select_index(&self, scores: &[f64], rng: &mut dyn RngCore) -> Option<usize> {
        if scores.is_empty() {
            return None;
        }
        (0..self.size.min(scores.len()))
            .map(|_| random_index(scores.len(), rng))
            .reduce(|best, idx| if scores[idx] > scores[best] { idx } else { best })
    }
}
