use ibeam::pareto::dominates;
use ibeam::{BeamConstants, IBeamProblem, Nsga2, PoolEvaluator, SectionModel, SerialEvaluator};
use rand::SeedableRng;

#[test]
fn beam_front_is_feasible_and_non_dominated() {
    for section_model in [SectionModel::Benchmark, SectionModel::Textbook] {
        assert_front_is_feasible_and_non_dominated(IBeamProblem::with_constants(BeamConstants {
            section_model,
            ..BeamConstants::default()
        }));
    }
}

fn assert_front_is_feasible_and_non_dominated(problem: IBeamProblem) {
    let mut engine = Nsga2::builder(SerialEvaluator::new(problem))
        .population_size(40)
        .max_evaluations(2_000)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(13);
    let report = engine.run(&mut rng).unwrap();
    assert!(!report.front.is_empty());
    assert_eq!(report.population.len(), 40);
    assert!(report.stats.generations() > 0);
    for (idx, solution) in report.front.iter().enumerate() {
        assert!(solution.is_feasible(), "solution {idx} violates the stress limit");
        for (other_idx, other) in report.front.iter().enumerate() {
            if idx == other_idx {
                continue;
            }
            assert!(
                !dominates(&other.objectives, &solution.objectives),
                "solution {other_idx} dominates {idx}: {:?} vs {:?}",
                other.objectives,
                solution.objectives,
            );
        }
    }
}

#[test]
fn evaluation_budget_is_respected() {
    for (population, budget) in [(40, 2_000), (30, 1_000), (50, 1_049)] {
        let mut engine = Nsga2::builder(SerialEvaluator::new(IBeamProblem::new()))
            .population_size(population)
            .max_evaluations(budget)
            .build()
            .unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let report = engine.run(&mut rng).unwrap();
        assert!(report.evaluations <= budget);
        assert!(report.evaluations + population > budget);
    }
}

#[test]
fn pooled_and_serial_runs_agree() {
    let run = |pooled: bool| {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        if pooled {
            let evaluator = PoolEvaluator::with_workers(IBeamProblem::new(), 3).unwrap();
            let mut engine = Nsga2::builder(evaluator)
                .population_size(24)
                .generations(10)
                .build()
                .unwrap();
            engine.run(&mut rng).unwrap().front
        } else {
            let mut engine = Nsga2::builder(SerialEvaluator::new(IBeamProblem::new()))
                .population_size(24)
                .generations(10)
                .build()
                .unwrap();
            engine.run(&mut rng).unwrap().front
        }
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn extreme_designs_approach_known_limits() {
    let mut engine = Nsga2::builder(SerialEvaluator::new(IBeamProblem::new()))
        .population_size(60)
        .max_evaluations(6_000)
        .build()
        .unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(5);
    let report = engine.run(&mut rng).unwrap();
    let min_deflection = report
        .front
        .iter()
        .map(|s| s.objectives[1])
        .fold(f64::INFINITY, f64::min);
    // The stiffest section in the box is the largest one.
    assert!(min_deflection < 0.02);
}
