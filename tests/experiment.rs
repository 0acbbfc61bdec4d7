use ibeam::pareto::dominates;
use ibeam::{
    AlgorithmSpec, Experiment, ExperimentReport, IBeamProblem, PoolEvaluator, SerialEvaluator,
};

fn lineup() -> Vec<AlgorithmSpec> {
    vec![
        AlgorithmSpec::nsga2("NSGAII_30", 30),
        AlgorithmSpec::weighted_sum("WEIGHTED_3", 3),
    ]
}

fn fronts(report: &ExperimentReport) -> Vec<Vec<Vec<f64>>> {
    report
        .algorithms
        .iter()
        .map(|result| result.front.iter().map(|s| s.objectives.clone()).collect())
        .collect()
}

#[test]
fn seeded_experiments_are_reproducible() {
    let experiment = Experiment::new(lineup()).max_evaluations(1_500).seed(77);
    let first = experiment
        .run(&mut SerialEvaluator::new(IBeamProblem::new()))
        .unwrap();
    let second = experiment
        .run(&mut PoolEvaluator::with_workers(IBeamProblem::new(), 2).unwrap())
        .unwrap();
    assert_eq!(fronts(&first), fronts(&second));
    assert_eq!(first.merged_front, second.merged_front);
    assert_eq!(first.reference_point, second.reference_point);
    for (a, b) in first.algorithms.iter().zip(&second.algorithms) {
        assert_eq!(a.hypervolume, b.hypervolume);
        assert_eq!(a.metadata, b.metadata);
    }
}

#[test]
fn merged_front_dominates_every_algorithm_front() {
    let report = Experiment::new(lineup())
        .max_evaluations(1_500)
        .seed(3)
        .run(&mut SerialEvaluator::new(IBeamProblem::new()))
        .unwrap();
    assert!(!report.merged_front.is_empty());
    for merged in &report.merged_front {
        assert!(merged.is_feasible());
        for result in &report.algorithms {
            assert!(result.metadata.evaluations <= 1_500);
            for solution in &result.front {
                assert!(!dominates(&solution.objectives, &merged.objectives));
            }
        }
    }
    let reference = &report.reference_point;
    for result in &report.algorithms {
        for solution in &result.front {
            assert!(solution.objectives[0] < reference[0]);
            assert!(solution.objectives[1] < reference[1]);
        }
        if !result.front.is_empty() {
            assert!(result.hypervolume > 0.0);
        }
    }
}
