//! Runtime settings of the benchmark binary.
//!
//! Every setting has a default. `IBEAM_*` environment variables override them,
//! optionally loaded from a `.env` file in the working directory.

use crate::beam::BeamConstants;
use crate::evaluator::available_workers;
use crate::experiment::DEFAULT_MAX_EVALUATIONS;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable holding the evaluation budget per algorithm.
pub const ENV_NFE: &str = "IBEAM_NFE";
/// Environment variable holding the base RNG seed.
pub const ENV_SEED: &str = "IBEAM_SEED";
/// Environment variable holding the evaluation worker count.
pub const ENV_WORKERS: &str = "IBEAM_WORKERS";
/// Environment variable holding the output directory.
pub const ENV_OUTPUT_DIR: &str = "IBEAM_OUTPUT_DIR";
/// Environment variable overriding the vertical load `P`.
pub const ENV_LOAD_P: &str = "IBEAM_LOAD_P";
/// Environment variable overriding the lateral load `Q`.
pub const ENV_LOAD_Q: &str = "IBEAM_LOAD_Q";
/// Environment variable overriding the span `L`.
pub const ENV_SPAN: &str = "IBEAM_SPAN";
/// Environment variable selecting the section formulas.
pub const ENV_SECTION: &str = "IBEAM_SECTION";

/// Errors raised while reading the configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("{key}={value:?} is not a valid {expected}")]
    Parse {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Description of the expected type.
        expected: &'static str,
    },
    /// A variable parsed but is out of range.
    #[error("{key} must be {requirement} (received {value})")]
    OutOfRange {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Human readable requirement.
        requirement: &'static str,
    },
}

/// Settings of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    /// Evaluations granted to each algorithm.
    pub max_evaluations: usize,
    /// Base seed; unseeded runs draw from OS entropy.
    pub seed: Option<u64>,
    /// Number of evaluation workers.
    pub workers: usize,
    /// Directory receiving the figures and `results.json`.
    pub output_dir: PathBuf,
    /// Problem constants.
    pub constants: BeamConstants,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            seed: None,
            workers: available_workers(),
            output_dir: PathBuf::from("results"),
            constants: BeamConstants::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Reads the configuration from the process environment after loading a
    /// `.env` file when one exists.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Examples
    /// ```
    /// use ibeam::BenchmarkConfig;
    ///
    /// let config = BenchmarkConfig::from_lookup(|key| match key {
    ///     "IBEAM_NFE" => Some("2000".to_string()),
    ///     "IBEAM_LOAD_Q" => Some("500".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.max_evaluations, 2_000);
    /// assert_eq!(config.constants.lateral_load, 500.0);
    /// assert_eq!(config.seed, None);
    /// ```
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(nfe) = parse::<usize, _>(&lookup, ENV_NFE, "unsigned integer")? {
            if nfe == 0 {
                return Err(out_of_range(ENV_NFE, nfe, "positive"));
            }
            config.max_evaluations = nfe;
        }
        config.seed = parse::<u64, _>(&lookup, ENV_SEED, "unsigned integer")?;
        if let Some(workers) = parse::<usize, _>(&lookup, ENV_WORKERS, "unsigned integer")? {
            if workers == 0 {
                return Err(out_of_range(ENV_WORKERS, workers, "positive"));
            }
            config.workers = workers;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|dir| !dir.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        config.constants.vertical_load = positive(&lookup, ENV_LOAD_P)?
            .unwrap_or(config.constants.vertical_load);
        config.constants.lateral_load = non_negative(&lookup, ENV_LOAD_Q)?
            .unwrap_or(config.constants.lateral_load);
        config.constants.span = positive(&lookup, ENV_SPAN)?.unwrap_or(config.constants.span);
        if let Some(model) = parse(&lookup, ENV_SECTION, "section model")? {
            config.constants.section_model = model;
        }
        Ok(config)
    }
}

fn parse<T, F>(
    lookup: &F,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<T>().map(Some).map_err(|_| ConfigError::Parse {
        key,
        value: raw.clone(),
        expected,
    })
}

fn positive<F>(lookup: &F, key: &'static str) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse::<f64, _>(lookup, key, "number")? {
        Some(value) if !(value.is_finite() && value > 0.0) => {
            Err(out_of_range(key, value, "positive and finite"))
        }
        other => Ok(other),
    }
}

fn non_negative<F>(lookup: &F, key: &'static str) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse::<f64, _>(lookup, key, "number")? {
        Some(value) if !(value.is_finite() && value >= 0.0) => {
            Err(out_of_range(key, value, "non-negative and finite"))
        }
        other => Ok(other),
    }
}

fn out_of_range(
    key: &'static str,
    value: impl ToString,
    requirement: &'static str,
) -> ConfigError {
    ConfigError::OutOfRange {
        key,
        value: value.to_string(),
        requirement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::SectionModel;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = BenchmarkConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_evaluations, 10_000);
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.constants, BeamConstants::default());
        assert!(config.workers >= 1);
    }

    #[test]
    fn every_variable_is_read() {
        let config = BenchmarkConfig::from_lookup(lookup(&[
            (ENV_NFE, "500"),
            (ENV_SEED, " 42 "),
            (ENV_WORKERS, "3"),
            (ENV_OUTPUT_DIR, "/tmp/beam"),
            (ENV_LOAD_P, "650.5"),
            (ENV_LOAD_Q, "0"),
            (ENV_SPAN, "250"),
            (ENV_SECTION, "textbook"),
        ]))
        .unwrap();
        assert_eq!(config.max_evaluations, 500);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.workers, 3);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/beam"));
        assert_eq!(config.constants.vertical_load, 650.5);
        assert_eq!(config.constants.lateral_load, 0.0);
        assert_eq!(config.constants.span, 250.0);
        assert_eq!(config.constants.section_model, SectionModel::Textbook);
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = BenchmarkConfig::from_lookup(lookup(&[(ENV_SEED, "abc")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Parse {
                key: ENV_SEED,
                value: "abc".to_string(),
                expected: "unsigned integer",
            }
        );
    }

    #[test]
    fn unknown_section_model_is_reported() {
        let err = BenchmarkConfig::from_lookup(lookup(&[(ENV_SECTION, "exact")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { key: ENV_SECTION, .. }));
    }

    #[test]
    fn zero_budget_and_negative_span_are_rejected() {
        assert!(matches!(
            BenchmarkConfig::from_lookup(lookup(&[(ENV_NFE, "0")])),
            Err(ConfigError::OutOfRange { key: ENV_NFE, .. })
        ));
        assert!(matches!(
            BenchmarkConfig::from_lookup(lookup(&[(ENV_SPAN, "-3")])),
            Err(ConfigError::OutOfRange { key: ENV_SPAN, .. })
        ));
    }
}
