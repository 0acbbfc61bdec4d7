//! I-beam cross-section design problem.
//!
//! A simply supported beam of span `L` carries a vertical load `P` and a
//! lateral load `Q` at mid-span. The cross-section is a doubly symmetric I
//! described by four variables:
//!
//! | gene | meaning            | bounds (cm) |
//! |------|--------------------|-------------|
//! | x1   | overall height     | 10 – 80     |
//! | x2   | flange width       | 10 – 50     |
//! | x3   | web thickness      | 0.9 – 5     |
//! | x4   | flange thickness   | 0.9 – 5     |
//!
//! Two objectives are minimized, the cross-sectional area and the vertical
//! mid-span deflection, subject to the combined bending stress staying below
//! the allowable stress.
//!
//! # Examples
//! ```
//! use ibeam::{BeamDesign, IBeamProblem};
//!
//! let problem = IBeamProblem::new();
//! let response = problem.response(&BeamDesign::new(80.0, 50.0, 5.0, 5.0));
//! assert!((response.area - 850.0).abs() < 1e-9);
//! assert!(response.is_feasible());
//! ```

use crate::ops::{ConstrainedProblem, Evaluation, ProblemBounds, ProblemError, ProblemResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const LOWER_BOUNDS: [f64; 4] = [10.0, 10.0, 0.9, 0.9];
const UPPER_BOUNDS: [f64; 4] = [80.0, 50.0, 5.0, 5.0];

/// Loads, geometry and material shared by every evaluation.
///
/// Units are kN and cm throughout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamConstants {
    /// Vertical load `P` (kN).
    pub vertical_load: f64,
    /// Lateral load `Q` (kN).
    pub lateral_load: f64,
    /// Span `L` (cm).
    pub span: f64,
    /// Elastic modulus `E` (kN/cm²).
    pub elastic_modulus: f64,
    /// Allowable bending stress `σa` (kN/cm²).
    pub allowable_stress: f64,
    /// Formulas used for `I`, `z_y` and `z_z`.
    #[serde(default)]
    pub section_model: SectionModel,
}

impl Default for BeamConstants {
    fn default() -> Self {
        Self {
            vertical_load: 600.0,
            lateral_load: 50.0,
            span: 200.0,
            elastic_modulus: 20_000.0,
            allowable_stress: 16.0,
            section_model: SectionModel::Benchmark,
        }
    }
}

impl BeamConstants {
    /// Bending moment about the strong axis, `(P/2)·(L/2)`.
    #[must_use]
    pub fn moment_y(&self) -> f64 {
        (self.vertical_load / 2.0) * (self.span / 2.0)
    }

    /// Bending moment about the weak axis, `(Q/2)·(L/2)`.
    #[must_use]
    pub fn moment_z(&self) -> f64 {
        (self.lateral_load / 2.0) * (self.span / 2.0)
    }
}

/// Named view over the four decision variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamDesign {
    /// Overall section height, x1.
    pub height: f64,
    /// Flange width, x2.
    pub flange_width: f64,
    /// Web thickness, x3.
    pub web_thickness: f64,
    /// Flange thickness, x4.
    pub flange_thickness: f64,
}

impl BeamDesign {
    /// Creates a design from its four dimensions.
    #[must_use]
    pub const fn new(
        height: f64,
        flange_width: f64,
        web_thickness: f64,
        flange_thickness: f64,
    ) -> Self {
        Self {
            height,
            flange_width,
            web_thickness,
            flange_thickness,
        }
    }

    /// Reads a design from a gene slice ordered `x1..x4`.
    ///
    /// # Errors
    /// Returns [`ProblemError::DimensionMismatch`] unless exactly four genes
    /// are provided.
    pub fn from_genes(genes: &[f64]) -> ProblemResult<Self> {
        match *genes {
            [x1, x2, x3, x4] => Ok(Self::new(x1, x2, x3, x4)),
            _ => Err(ProblemError::DimensionMismatch {
                expected: 4,
                found: genes.len(),
            }),
        }
    }

    /// Returns the genes ordered `x1..x4`.
    #[must_use]
    pub fn to_genes(&self) -> Vec<f64> {
        vec![
            self.height,
            self.flange_width,
            self.web_thickness,
            self.flange_thickness,
        ]
    }

    /// Clear height of the web between the flanges, `x1 - 2·x4`.
    #[must_use]
    pub fn web_height(&self) -> f64 {
        self.height - 2.0 * self.flange_thickness
    }

    /// Cross-sectional area, `2·x2·x4 + x3·(x1 - 2·x4)`.
    #[must_use]
    pub fn area(&self) -> f64 {
        2.0 * self.flange_width * self.flange_thickness + self.web_thickness * self.web_height()
    }

    // Flange contribution shared by the inertia and the strong-axis modulus.
    fn flange_term(&self) -> f64 {
        let x1 = self.height;
        let x4 = self.flange_thickness;
        2.0 * self.flange_width * x4 * (4.0 * x4 * x4 + 3.0 * x1 * self.web_height())
    }
}

/// Error returned when a section model name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown section model {0:?} (expected \"benchmark\" or \"textbook\")")]
pub struct ParseSectionModelError(String);

/// Closed-form expressions used for the section properties.
///
/// [`SectionModel::Benchmark`] reproduces the published formulation of the
/// problem, grouping included, so fronts are comparable with results reported
/// for it. [`SectionModel::Textbook`] uses the properties of a doubly
/// symmetric I-section; its deflections are an order of magnitude larger and
/// the small corner of the box becomes infeasible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionModel {
    /// Formulation of the benchmark problem.
    #[default]
    Benchmark,
    /// Textbook I-section properties.
    Textbook,
}

impl SectionModel {
    /// Second moment of area about the strong axis.
    ///
    /// Benchmark: `(x3·(x1 - 2·x4))³/12 + 2·x2·x4·(4·x4² + 3·x1·(x1 - 2·x4))`.
    #[must_use]
    pub fn moment_of_inertia(self, design: &BeamDesign) -> f64 {
        match self {
            Self::Benchmark => {
                (design.web_thickness * design.web_height()).powi(3) / 12.0 + design.flange_term()
            }
            Self::Textbook => {
                (design.web_thickness * design.web_height().powi(3) + design.flange_term()) / 12.0
            }
        }
    }

    /// Section modulus about the strong axis.
    ///
    /// Benchmark: `(x1/6)·(x3·(x1 - x4)³ + 2·x2·x4·(4·x4² + 3·x1·(x1 - 2·x4)))`.
    #[must_use]
    pub fn section_modulus_y(self, design: &BeamDesign) -> f64 {
        let x1 = design.height;
        let numerator =
            design.web_thickness * (x1 - design.flange_thickness).powi(3) + design.flange_term();
        match self {
            Self::Benchmark => x1 / 6.0 * numerator,
            Self::Textbook => numerator / (6.0 * x1),
        }
    }

    /// Section modulus about the weak axis.
    ///
    /// Benchmark: `(x2/6)·(x1 - x4)·x3³ + 2·x4·x2³`.
    #[must_use]
    pub fn section_modulus_z(self, design: &BeamDesign) -> f64 {
        let x2 = design.flange_width;
        let x4 = design.flange_thickness;
        let web = (design.height - x4) * design.web_thickness.powi(3);
        let flanges = 2.0 * x4 * x2.powi(3);
        match self {
            Self::Benchmark => x2 / 6.0 * web + flanges,
            Self::Textbook => (web + flanges) / (6.0 * x2),
        }
    }
}

impl FromStr for SectionModel {
    type Err = ParseSectionModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benchmark" => Ok(Self::Benchmark),
            "textbook" => Ok(Self::Textbook),
            _ => Err(ParseSectionModelError(s.to_string())),
        }
    }
}

/// Every engineering quantity computed for one design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamResponse {
    /// Cross-sectional area (cm²), first objective.
    pub area: f64,
    /// Second moment of area (cm⁴).
    pub moment_of_inertia: f64,
    /// Mid-span vertical deflection (cm), second objective.
    pub deflection: f64,
    /// Strong-axis section modulus (cm³).
    pub section_modulus_y: f64,
    /// Weak-axis section modulus (cm³).
    pub section_modulus_z: f64,
    /// Strong-axis bending moment (kN·cm).
    pub moment_y: f64,
    /// Weak-axis bending moment (kN·cm).
    pub moment_z: f64,
    /// Combined bending stress `M_y/z_y + M_z/z_z` (kN/cm²).
    pub bending_stress: f64,
    /// `σa - bending_stress`; the design is feasible when this is `>= 0`.
    pub stress_margin: f64,
}

impl BeamResponse {
    /// Whether the stress constraint is satisfied.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.stress_margin >= 0.0
    }
}

/// The I-beam design problem: four variables, two objectives, one constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct IBeamProblem {
    constants: BeamConstants,
}

impl Default for IBeamProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl IBeamProblem {
    /// Creates the problem with the default loads and material.
    #[must_use]
    pub fn new() -> Self {
        Self::with_constants(BeamConstants::default())
    }

    /// Creates the problem with custom loads, span or material.
    #[must_use]
    pub fn with_constants(constants: BeamConstants) -> Self {
        Self { constants }
    }

    /// Returns the constants used by every evaluation.
    #[must_use]
    pub fn constants(&self) -> &BeamConstants {
        &self.constants
    }

    /// Computes the full response of a design without any validity checks.
    #[must_use]
    pub fn response(&self, design: &BeamDesign) -> BeamResponse {
        let c = &self.constants;
        let moment_of_inertia = c.section_model.moment_of_inertia(design);
        let section_modulus_y = c.section_model.section_modulus_y(design);
        let section_modulus_z = c.section_model.section_modulus_z(design);
        let moment_y = c.moment_y();
        let moment_z = c.moment_z();
        let bending_stress = moment_y / section_modulus_y + moment_z / section_modulus_z;
        BeamResponse {
            area: design.area(),
            moment_of_inertia,
            deflection: (c.vertical_load * c.span.powi(3))
                / (48.0 * c.elastic_modulus * moment_of_inertia),
            section_modulus_y,
            section_modulus_z,
            moment_y,
            moment_z,
            bending_stress,
            stress_margin: c.allowable_stress - bending_stress,
        }
    }

    fn check_section(response: &BeamResponse) -> ProblemResult<()> {
        let properties = [
            ("moment of inertia", response.moment_of_inertia),
            ("section modulus z_y", response.section_modulus_y),
            ("section modulus z_z", response.section_modulus_z),
        ];
        for (quantity, value) in properties {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProblemError::DegenerateSection { quantity, value });
            }
        }
        Ok(())
    }
}

impl ProblemBounds for IBeamProblem {
    fn dimensions(&self) -> usize {
        LOWER_BOUNDS.len()
    }

    fn lower_bounds(&self) -> &[f64] {
        &LOWER_BOUNDS
    }

    fn upper_bounds(&self) -> &[f64] {
        &UPPER_BOUNDS
    }
}

impl ConstrainedProblem for IBeamProblem {
    fn objectives(&self) -> usize {
        2
    }

    fn constraints(&self) -> usize {
        1
    }

    fn evaluate(&self, genes: &[f64]) -> ProblemResult<Evaluation> {
        let design = BeamDesign::from_genes(genes)?;
        let response = self.response(&design);
        Self::check_section(&response)?;
        Ok(Evaluation::new(
            vec![response.area, response.deflection],
            vec![response.stress_margin],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
    }

    fn textbook() -> IBeamProblem {
        IBeamProblem::with_constants(BeamConstants {
            section_model: SectionModel::Textbook,
            ..BeamConstants::default()
        })
    }

    #[test]
    fn largest_section_matches_hand_calculation() {
        let problem = IBeamProblem::new();
        let response = problem.response(&BeamDesign::new(80.0, 50.0, 5.0, 5.0));
        assert!(close(response.area, 850.0));
        assert!(close(response.moment_of_inertia, 12_022_916.666_666_666));
        assert!(close(response.deflection, 0.000_415_872_465_777_161_65));
        assert!(close(response.section_modulus_y, 140_791_666.666_666_66));
        assert!(close(response.section_modulus_z, 1_328_125.0));
        assert!(close(response.stress_margin, 15.997_904_566_265_689));
    }

    #[test]
    fn textbook_section_matches_hand_calculation() {
        let response = textbook().response(&BeamDesign::new(80.0, 50.0, 5.0, 5.0));
        assert!(close(response.area, 850.0));
        assert!(close(response.moment_of_inertia, 847_083.333_333_333_4));
        assert!(close(response.deflection, 0.005_902_606_984_751_598));
        assert!(close(response.section_modulus_y, 21_998.697_916_666_668));
        assert!(close(response.section_modulus_z, 4_197.916_666_666_667));
        assert!(close(response.stress_margin, 14.040_749_425_182_689));
    }

    #[test]
    fn moments_follow_loads_and_span() {
        let constants = BeamConstants::default();
        assert!(close(constants.moment_y(), 30_000.0));
        assert!(close(constants.moment_z(), 2_500.0));
    }

    #[test]
    fn slender_section_is_feasible_only_in_benchmark_model() {
        let genes = [30.0, 10.0, 0.9, 0.9];
        let benchmark = IBeamProblem::new().evaluate(&genes).unwrap();
        assert!(close(benchmark.objectives[0], 43.38));
        assert!(close(benchmark.objectives[1], 0.106_146_553_297_288_81));
        assert!(close(benchmark.constraints[0], 14.549_527_945_879_488));
        assert!(benchmark.is_feasible());

        let corrected = textbook().evaluate(&genes).unwrap();
        assert!(close(corrected.objectives[0], 43.38));
        assert!(!corrected.is_feasible());
    }

    #[test]
    fn smallest_section_needs_the_heavier_lateral_load_to_fail() {
        let genes = [10.0, 10.0, 0.9, 0.9];
        let evaluation = IBeamProblem::new().evaluate(&genes).unwrap();
        assert!(close(evaluation.objectives[0], 25.38));
        assert!(close(evaluation.objectives[1], 1.106_239_819_465_767_7));
        assert!(close(evaluation.constraints[0], 11.134_280_596_737_12));

        let heavy = IBeamProblem::with_constants(BeamConstants {
            lateral_load: 500.0,
            ..BeamConstants::default()
        });
        let evaluation = heavy.evaluate(&genes).unwrap();
        assert!(close(evaluation.constraints[0], -1.289_406_902_796_990_6));
        assert!(!evaluation.is_feasible());

        let evaluation = textbook().evaluate(&genes).unwrap();
        assert!(close(evaluation.objectives[1], 12.042_023_772_881_65));
        assert!(!evaluation.is_feasible());
    }

    #[test]
    fn vanishing_web_still_evaluates() {
        let design = BeamDesign::new(10.0, 10.0, 5.0, 5.0);
        assert!(design.web_height().abs() < f64::EPSILON);
        let evaluation = IBeamProblem::new().evaluate(&design.to_genes()).unwrap();
        assert!(close(evaluation.objectives[0], 100.0));
        assert!(close(evaluation.objectives[1], 0.5));
        let evaluation = textbook().evaluate(&design.to_genes()).unwrap();
        assert!(close(evaluation.objectives[1], 6.0));
    }

    #[test]
    fn section_model_names_parse() {
        assert_eq!(" Textbook ".parse(), Ok(SectionModel::Textbook));
        assert_eq!("benchmark".parse(), Ok(SectionModel::Benchmark));
        assert!("exact".parse::<SectionModel>().is_err());
    }

    #[test]
    fn degenerate_section_is_reported() {
        let problem = IBeamProblem::new();
        let err = problem.evaluate(&[10.0, 10.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ProblemError::DegenerateSection { .. }));
    }

    #[test]
    fn wrong_gene_count_is_rejected() {
        let err = BeamDesign::from_genes(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ProblemError::DimensionMismatch {
                expected: 4,
                found: 3
            }
        );
    }
}
