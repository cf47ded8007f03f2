//! Seismic margin formula engine.
//!
//! Closed-form algebra over stress inputs already computed by external
//! analysis tools or entered by analysts. Two formula pairs, one per
//! earthquake scenario:
//!
//! ```text
//! sigma_alt_1 = (σ₁)₁ + (σ₁)s₁ * (M₁ - 1)
//! sigma_alt_2 = (σ₂)₂ + (σ₂)s₂ * (M₁ - 1)
//! ```
//!
//! Each of the four outputs is evaluated independently: partial inputs for
//! one scenario never block the other, and a missing input for one output
//! never blocks its sibling. A derived value is never fabricated from
//! partial data — any missing input yields `None` for that output alone.

pub mod fields;

use serde::Serialize;

/// Formula inputs for one element, as read from SRTN_EK_SEISM_DATA.
/// All nullable by design; the evaluator decides what is computable.
#[derive(Debug, Default, Clone, PartialEq, sqlx::FromRow)]
pub struct StressState {
    pub sigma_s_1_pz: Option<f64>,
    pub sigma_s_2_pz: Option<f64>,
    pub sigma_s_s1_pz: Option<f64>,
    pub sigma_s_s2_pz: Option<f64>,
    pub m1_pz: Option<f64>,
    pub sigma_s_1_mrz: Option<f64>,
    pub sigma_s_2_mrz: Option<f64>,
    pub sigma_s_s1_mrz: Option<f64>,
    pub sigma_s_s2_mrz: Option<f64>,
    pub m1_mrz: Option<f64>,
}

/// One computed output together with its destination column.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedValue {
    pub column: &'static str,
    pub value: f64,
}

/// `sigma_alt = base + sensitivity * (m1 - 1)`, or `None` unless every
/// input is present.
pub fn sigma_alt(base: Option<f64>, sensitivity: Option<f64>, m1: Option<f64>) -> Option<f64> {
    match (base, sensitivity, m1) {
        (Some(b), Some(s), Some(m)) => Some(b + s * (m - 1.0)),
        _ => None,
    }
}

/// Evaluate everything computable from `state`. The result holds only the
/// outputs whose full input triple was present; an empty result means the
/// caller should report a successful no-op, not an error.
pub fn evaluate(state: &StressState) -> Vec<ComputedValue> {
    let candidates = [
        (
            "SIGMA_S_ALT_1_PZ",
            sigma_alt(state.sigma_s_1_pz, state.sigma_s_s1_pz, state.m1_pz),
        ),
        (
            "SIGMA_S_ALT_2_PZ",
            sigma_alt(state.sigma_s_2_pz, state.sigma_s_s2_pz, state.m1_pz),
        ),
        (
            "SIGMA_S_ALT_1_MRZ",
            sigma_alt(state.sigma_s_1_mrz, state.sigma_s_s1_mrz, state.m1_mrz),
        ),
        (
            "SIGMA_S_ALT_2_MRZ",
            sigma_alt(state.sigma_s_2_mrz, state.sigma_s_s2_mrz, state.m1_mrz),
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(column, value)| value.map(|value| ComputedValue { column, value }))
        .collect()
}

// Missing-input labels are the domain symbols engineers see in the UI,
// not column names. The mapping is load-bearing for the frontend.
pub const LABEL_SIGMA_1_1: &str = "(σ₁)₁";
pub const LABEL_SIGMA_1_S1: &str = "(σ₁)s₁";
pub const LABEL_SIGMA_2_2: &str = "(σ₂)₂";
pub const LABEL_SIGMA_2_S2: &str = "(σ₂)s₂";
pub const LABEL_M1: &str = "M₁";

/// Missing-input report for one sigma-alt output.
#[derive(Debug, Serialize)]
pub struct OutputRequirements {
    pub can_calculate: bool,
    pub missing_fields: Vec<&'static str>,
}

/// Requirements for both outputs of one earthquake scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioRequirements {
    pub sigma_alt_1: OutputRequirements,
    pub sigma_alt_2: OutputRequirements,
}

/// Full precondition report, mirroring the evaluator without mutating.
#[derive(Debug, Serialize)]
pub struct RequirementsReport {
    pub pz: ScenarioRequirements,
    pub mrz: ScenarioRequirements,
}

fn output_requirements(
    base: Option<f64>,
    base_label: &'static str,
    sensitivity: Option<f64>,
    sensitivity_label: &'static str,
    m1: Option<f64>,
) -> OutputRequirements {
    let mut missing = Vec::new();
    if base.is_none() {
        missing.push(base_label);
    }
    if sensitivity.is_none() {
        missing.push(sensitivity_label);
    }
    if m1.is_none() {
        missing.push(LABEL_M1);
    }
    OutputRequirements {
        can_calculate: missing.is_empty(),
        missing_fields: missing,
    }
}

/// What is missing before each of the four outputs can run.
pub fn check_requirements(state: &StressState) -> RequirementsReport {
    RequirementsReport {
        pz: ScenarioRequirements {
            sigma_alt_1: output_requirements(
                state.sigma_s_1_pz,
                LABEL_SIGMA_1_1,
                state.sigma_s_s1_pz,
                LABEL_SIGMA_1_S1,
                state.m1_pz,
            ),
            sigma_alt_2: output_requirements(
                state.sigma_s_2_pz,
                LABEL_SIGMA_2_2,
                state.sigma_s_s2_pz,
                LABEL_SIGMA_2_S2,
                state.m1_pz,
            ),
        },
        mrz: ScenarioRequirements {
            sigma_alt_1: output_requirements(
                state.sigma_s_1_mrz,
                LABEL_SIGMA_1_1,
                state.sigma_s_s1_mrz,
                LABEL_SIGMA_1_S1,
                state.m1_mrz,
            ),
            sigma_alt_2: output_requirements(
                state.sigma_s_2_mrz,
                LABEL_SIGMA_2_2,
                state.sigma_s_s2_mrz,
                LABEL_SIGMA_2_S2,
                state.m1_mrz,
            ),
        },
    }
}
