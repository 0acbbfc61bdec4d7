#![warn(missing_docs)]

/*! Multi-objective design of a simply supported I-beam.

The crate poses the classic four-variable I-beam problem (minimize the
cross-sectional area and the mid-span deflection while keeping the combined
bending stress below the allowable stress) and compares several
evolutionary approaches on it under a shared evaluation budget:
constrained NSGA-II with different population sizes and operators, and
weighted-sum sweeps built on a penalized real-coded GA.

```
use ibeam::{AlgorithmSpec, Experiment, IBeamProblem, SerialEvaluator};

let mut evaluator = SerialEvaluator::new(IBeamProblem::new());
let report = Experiment::new(vec![AlgorithmSpec::nsga2("NSGAII", 20)])
    .max_evaluations(400)
    .seed(42)
    .run(&mut evaluator)
    .unwrap();
assert!(report.algorithms[0].front.iter().all(|s| s.is_feasible()));
```
!*/

pub mod beam;
pub mod config;
pub mod core;
pub mod evaluator;
pub mod experiment;
pub mod nsga2;
pub mod ops;
pub mod pareto;
pub mod plot;
pub mod real_ga;
pub mod report;
pub mod sweep;

pub use crate::beam::{
    BeamConstants, BeamDesign, BeamResponse, IBeamProblem, ParseSectionModelError, SectionModel,
};
pub use crate::config::{BenchmarkConfig, ConfigError};
pub use crate::core::experiment::{ExperimentMetadata, RunStats};
pub use crate::core::{BoundsError, Solution};
pub use crate::evaluator::{
    EvaluationError, PoolError, PoolEvaluator, PopulationEvaluator, SerialEvaluator,
};
pub use crate::experiment::{
    AlgorithmConfig, AlgorithmResult, AlgorithmSpec, CrossoverKind, Experiment, ExperimentError,
    ExperimentReport, MutationKind,
};
pub use crate::nsga2::{Nsga2, Nsga2Builder, Nsga2Error, Nsga2Report};
pub use crate::real_ga::{
    RealGa, RealGaBuilder, RealGaError, RealGaReport, Scalarization, StopCondition,
};
pub use crate::report::OutputError;
pub use crate::sweep::{SweepError, SweepReport, WeightedSumSweep};
