//! Writing experiment results to disk and to the log.

use crate::core::Solution;
use crate::experiment::ExperimentReport;
use crate::plot::{combined_figure, fronts_figure};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// File name of the per-algorithm grid.
pub const FRONTS_FILE: &str = "fronts.svg";
/// File name of the combined chart.
pub const COMBINED_FILE: &str = "combined.svg";
/// File name of the serialized report.
pub const RESULTS_FILE: &str = "results.json";

/// Errors raised while persisting results.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The report could not be serialized.
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Locations of the files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Per-algorithm grid.
    pub fronts: PathBuf,
    /// Combined chart.
    pub combined: PathBuf,
    /// Serialized report.
    pub results: PathBuf,
}

/// Writes both figures and `results.json` into `dir`, creating it if needed.
///
/// # Errors
/// Returns [`OutputError`] when the directory or a file cannot be written.
pub fn write_outputs(report: &ExperimentReport, dir: &Path) -> Result<OutputPaths, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let paths = OutputPaths {
        fronts: dir.join(FRONTS_FILE),
        combined: dir.join(COMBINED_FILE),
        results: dir.join(RESULTS_FILE),
    };
    write_file(&paths.fronts, &fronts_figure(report))?;
    write_file(&paths.combined, &combined_figure(report))?;
    save_to_json(report, &paths.results)?;
    info!(directory = %dir.display(), "results written");
    Ok(paths)
}

/// Serializes the report as pretty-printed JSON.
///
/// # Errors
/// Returns [`OutputError`] when serialization or the write fails.
pub fn save_to_json(report: &ExperimentReport, path: &Path) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(report)?;
    write_file(path, &json)
}

fn write_file(path: &Path, contents: &str) -> Result<(), OutputError> {
    fs::write(path, contents).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Designs with the smallest area and the smallest deflection, in that order.
///
/// # Examples
/// ```
/// use ibeam::report::extremes;
/// use ibeam::Solution;
///
/// let front = vec![
///     Solution::new(vec![1.0], vec![100.0, 0.5], vec![1.0]),
///     Solution::new(vec![2.0], vec![400.0, 0.01], vec![1.0]),
/// ];
/// let (lightest, stiffest) = extremes(&front).unwrap();
/// assert_eq!(lightest.variables, vec![1.0]);
/// assert_eq!(stiffest.variables, vec![2.0]);
/// ```
#[must_use]
pub fn extremes(front: &[Solution]) -> Option<(&Solution, &Solution)> {
    let by = |objective: usize| {
        front
            .iter()
            .filter(|s| s.objectives.len() > objective)
            .min_by(|a, b| a.objectives[objective].total_cmp(&b.objectives[objective]))
    };
    Some((by(0)?, by(1)?))
}

/// Logs one line per algorithm plus the merged front size.
pub fn log_summary(report: &ExperimentReport) {
    for result in &report.algorithms {
        match extremes(&result.front) {
            Some((lightest, stiffest)) => info!(
                algorithm = result.name(),
                front = result.front.len(),
                hypervolume = result.hypervolume,
                evaluations = result.metadata.evaluations,
                lightest = ?lightest.variables,
                lightest_area = lightest.objectives[0],
                stiffest = ?stiffest.variables,
                stiffest_deflection = stiffest.objectives[1],
                "front summary"
            ),
            None => warn!(
                algorithm = result.name(),
                evaluations = result.metadata.evaluations,
                "no feasible design found"
            ),
        }
    }
    info!(
        merged = report.merged_front.len(),
        reference = ?report.reference_point,
        "merged front"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::IBeamProblem;
    use crate::evaluator::SerialEvaluator;
    use crate::experiment::{AlgorithmSpec, Experiment};

    fn small_report() -> ExperimentReport {
        let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
        Experiment::new(vec![AlgorithmSpec::nsga2("NSGAII", 20)])
            .max_evaluations(200)
            .seed(4)
            .run(&mut evaluator)
            .unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ibeam-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_all_three_files() {
        let report = small_report();
        let dir = scratch_dir("outputs");
        let paths = write_outputs(&report, &dir.join("nested")).unwrap();
        for path in [&paths.fronts, &paths.combined, &paths.results] {
            assert!(path.exists(), "{} missing", path.display());
        }
        let json = fs::read_to_string(&paths.results).unwrap();
        let parsed: ExperimentReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.algorithms.len(), 1);
        assert_eq!(parsed.algorithms[0].front.len(), report.algorithms[0].front.len());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = scratch_dir("blocked");
        fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("file");
        fs::write(&blocker, "x").unwrap();
        let err = write_outputs(&small_report(), &blocker.join("sub")).unwrap_err();
        assert!(matches!(err, OutputError::CreateDir { .. }));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn extremes_of_empty_front_is_none() {
        assert!(extremes(&[]).is_none());
    }
}
