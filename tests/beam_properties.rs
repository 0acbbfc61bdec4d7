use ibeam::core::sample_within;
use ibeam::ops::{ConstrainedProblem, ProblemBounds, ProblemError};
use ibeam::{BeamConstants, BeamDesign, IBeamProblem, SectionModel};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn corners(problem: &IBeamProblem) -> Vec<Vec<f64>> {
    let lower = problem.lower_bounds();
    let upper = problem.upper_bounds();
    (0..16_u32)
        .map(|mask| {
            (0..4)
                .map(|bit| if mask & (1 << bit) == 0 { lower[bit] } else { upper[bit] })
                .collect()
        })
        .collect()
}

#[test]
fn evaluation_is_deterministic() {
    let problem = IBeamProblem::new();
    let genes = [43.7, 21.2, 1.3, 3.9];
    let first = problem.evaluate(&genes).unwrap();
    for _ in 0..10 {
        assert_eq!(problem.evaluate(&genes).unwrap(), first);
    }
}

#[test]
fn objectives_are_finite_and_positive_inside_bounds() {
    let problem = IBeamProblem::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut candidates = corners(&problem);
    for _ in 0..2_000 {
        candidates.push(
            sample_within(problem.lower_bounds(), problem.upper_bounds(), &mut rng).unwrap(),
        );
    }
    for genes in candidates {
        let evaluation = problem.evaluate(&genes).unwrap();
        for value in &evaluation.objectives {
            assert!(value.is_finite() && *value > 0.0, "{genes:?} gave {value}");
        }
        assert!(evaluation.constraints[0].is_finite());
    }
}

#[test]
fn margin_is_zero_exactly_at_the_stress_limit() {
    let design = BeamDesign::new(50.0, 30.0, 2.0, 2.0);
    let stress = IBeamProblem::new().response(&design).bending_stress;
    let at_limit = IBeamProblem::with_constants(BeamConstants {
        allowable_stress: stress,
        ..BeamConstants::default()
    });
    let evaluation = at_limit.evaluate(&design.to_genes()).unwrap();
    assert!(evaluation.constraints[0] >= 0.0);
    assert!(evaluation.is_feasible());

    let just_below = IBeamProblem::with_constants(BeamConstants {
        allowable_stress: stress * (1.0 - 1e-9),
        ..BeamConstants::default()
    });
    assert!(!just_below.evaluate(&design.to_genes()).unwrap().is_feasible());
}

#[test]
fn bigger_sections_are_heavier_and_stiffer() {
    let problem = IBeamProblem::new();
    let small = problem.evaluate(&[30.0, 20.0, 1.0, 1.0]).unwrap();
    let large = problem.evaluate(&[60.0, 40.0, 2.0, 2.0]).unwrap();
    assert!(large.objectives[0] > small.objectives[0]);
    assert!(large.objectives[1] < small.objectives[1]);
}

#[test]
fn whole_box_is_feasible_under_default_loads() {
    let problem = IBeamProblem::new();
    let mut rng = StdRng::seed_from_u64(11);
    let mut candidates = corners(&problem);
    for _ in 0..500 {
        candidates.push(
            sample_within(problem.lower_bounds(), problem.upper_bounds(), &mut rng).unwrap(),
        );
    }
    for genes in candidates {
        assert!(problem.evaluate(&genes).unwrap().is_feasible(), "{genes:?}");
    }
    let smallest = problem.evaluate(problem.lower_bounds()).unwrap();
    let largest = problem.evaluate(problem.upper_bounds()).unwrap();
    assert!((smallest.objectives[0] - 25.38).abs() < 1e-9);
    assert!((largest.objectives[0] - 850.0).abs() < 1e-9);
}

#[test]
fn textbook_sections_fail_at_the_small_corner() {
    let problem = IBeamProblem::with_constants(BeamConstants {
        section_model: SectionModel::Textbook,
        ..BeamConstants::default()
    });
    assert!(!problem.evaluate(problem.lower_bounds()).unwrap().is_feasible());
    assert!(!problem.evaluate(&[30.0, 10.0, 0.9, 0.9]).unwrap().is_feasible());
    assert!(problem.evaluate(problem.upper_bounds()).unwrap().is_feasible());
}

#[test]
fn deflection_and_margin_follow_the_benchmark_formulas() {
    let problem = IBeamProblem::new();
    for (genes, deflection, margin) in [
        ([80.0, 50.0, 5.0, 5.0], 0.000_415_872_465_777_161_65, 15.997_904_566_265_689),
        ([30.0, 10.0, 0.9, 0.9], 0.106_146_553_297_288_81, 14.549_527_945_879_488),
        ([43.7, 21.2, 1.3, 3.9], 0.006_275_126_866_552_993, 15.961_767_738_320_741),
    ] {
        let evaluation = problem.evaluate(&genes).unwrap();
        assert!((evaluation.objectives[1] - deflection).abs() <= 1e-12, "{genes:?}");
        assert!((evaluation.constraints[0] - margin).abs() <= 1e-9, "{genes:?}");
    }
}

#[test]
fn wrong_gene_count_is_an_error() {
    let err = IBeamProblem::new().evaluate(&[80.0, 50.0, 5.0]).unwrap_err();
    assert_eq!(
        err,
        ProblemError::DimensionMismatch {
            expected: 4,
            found: 3
        }
    );
}
