use anyhow::Context;
use ibeam::report::{log_summary, write_outputs};
use ibeam::{BenchmarkConfig, Experiment, IBeamProblem, PoolEvaluator};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = BenchmarkConfig::from_env().context("invalid benchmark configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        nfe = config.max_evaluations,
        seed = ?config.seed,
        workers = config.workers,
        constants = ?config.constants,
        "starting I-beam benchmark"
    );

    let problem = IBeamProblem::with_constants(config.constants);
    let mut evaluator = PoolEvaluator::with_workers(problem, config.workers)
        .context("failed to start the evaluation pool")?;

    let mut experiment = Experiment::default().max_evaluations(config.max_evaluations);
    if let Some(seed) = config.seed {
        experiment = experiment.seed(seed);
    }
    let report = experiment
        .run(&mut evaluator)
        .context("experiment failed")?;

    log_summary(&report);
    let paths = write_outputs(&report, &config.output_dir).with_context(|| {
        format!("failed to write results to {}", config.output_dir.display())
    })?;
    info!(
        fronts = %paths.fronts.display(),
        combined = %paths.combined.display(),
        results = %paths.results.display(),
        "done"
    );
    Ok(())
}
