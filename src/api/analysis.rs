//! Margin-calculation endpoints: sigma-alt evaluation, precondition
//! checks, and the field-mapped save/read pairs for stress inputs,
//! moment-analysis results, and K coefficients.
//!
//! Every mutating handler runs inside one transaction committed only after
//! all writes succeed; precondition failures (missing element, empty
//! request) are rejected before any write happens.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::margin::fields::{append_invalidations, push_number, ColumnWrite, FieldValue};
use crate::margin::{self, RequirementsReport};
use crate::store::elements;
use crate::types::EarthquakeType;

#[derive(Debug, Deserialize)]
pub struct EkIdQuery {
    pub ek_id: i64,
}

/// `{success, message, updated_fields}` — the shape of every numeric
/// field-mapped save. `updated_fields` echoes exactly the fields the
/// request supplied, keyed by storage column.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
    pub updated_fields: BTreeMap<&'static str, f64>,
}

fn updated_number_fields(writes: &[ColumnWrite]) -> BTreeMap<&'static str, f64> {
    writes
        .iter()
        .filter_map(|w| match &w.value {
            Some(FieldValue::Number(v)) => Some((w.column, *v)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sigma-alt calculation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CalculateSigmaAltRequest {
    pub ek_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub success: bool,
    pub message: String,
    pub calculated_values: BTreeMap<&'static str, f64>,
}

/// POST /api/calculate-sigma-alt — evaluate and persist whatever sigma-alt
/// outputs are computable. Insufficient inputs is a successful no-op.
pub async fn calculate_sigma_alt(
    State(state): State<AppState>,
    Json(req): Json<CalculateSigmaAltRequest>,
) -> ApiResult<Json<CalculationResponse>> {
    let stress = elements::stress_state(&state.db, req.ek_id).await?;
    let computed = margin::evaluate(&stress);

    if computed.is_empty() {
        return Ok(Json(CalculationResponse {
            success: true,
            message: "No calculations performed - insufficient data for both PZ and MRZ"
                .to_string(),
            calculated_values: BTreeMap::new(),
        }));
    }

    let writes: Vec<ColumnWrite> = computed
        .iter()
        .map(|c| ColumnWrite::number(c.column, c.value))
        .collect();

    let mut tx = state.db.begin().await?;
    elements::update_columns(&mut tx, req.ek_id, &writes).await?;
    tx.commit().await?;

    let calculated_values: BTreeMap<&'static str, f64> =
        computed.into_iter().map(|c| (c.column, c.value)).collect();
    info!(
        ek_id = req.ek_id,
        outputs = calculated_values.len(),
        "sigma-alt values calculated"
    );

    Ok(Json(CalculationResponse {
        success: true,
        message: format!(
            "Successfully calculated sigma alt values for EK_ID {}",
            req.ek_id
        ),
        calculated_values,
    }))
}

#[derive(Debug, Serialize)]
pub struct CheckRequirementsResponse {
    pub success: bool,
    pub ek_id: i64,
    pub requirements: RequirementsReport,
}

/// GET /api/check-calculation-requirements — pure precondition mirror of
/// the calculator; reports per-output readiness and the missing-input
/// labels the UI renders.
pub async fn check_calculation_requirements(
    State(state): State<AppState>,
    Query(q): Query<EkIdQuery>,
) -> ApiResult<Json<CheckRequirementsResponse>> {
    let stress = elements::stress_state(&state.db, q.ek_id).await?;
    Ok(Json(CheckRequirementsResponse {
        success: true,
        ek_id: q.ek_id,
        requirements: margin::check_requirements(&stress),
    }))
}

// ---------------------------------------------------------------------------
// Stress inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveStressInputsRequest {
    pub ek_id: i64,
    pub first_nat_freq_x: Option<f64>,
    pub first_nat_freq_y: Option<f64>,
    pub first_nat_freq_z: Option<f64>,
    pub sigma_dop: Option<f64>,
    pub hclpf: Option<f64>,
    pub sigma_1: Option<f64>,
    pub sigma_2: Option<f64>,
    pub sigma_1_1_pz: Option<f64>,
    pub sigma_1_2_pz: Option<f64>,
    pub sigma_1_s1_pz: Option<f64>,
    pub sigma_2_s2_pz: Option<f64>,
    pub sigma_1_1_mrz: Option<f64>,
    pub sigma_1_2_mrz: Option<f64>,
    pub sigma_1_s1_mrz: Option<f64>,
    pub sigma_2_s2_mrz: Option<f64>,
}

impl SaveStressInputsRequest {
    /// Request-field → storage-column map for the raw stress inputs.
    fn writes(&self) -> Vec<ColumnWrite> {
        let mut writes = Vec::new();
        push_number(&mut writes, "FIRST_NAT_FREQ_X", self.first_nat_freq_x);
        push_number(&mut writes, "FIRST_NAT_FREQ_Y", self.first_nat_freq_y);
        push_number(&mut writes, "FIRST_NAT_FREQ_Z", self.first_nat_freq_z);
        push_number(&mut writes, "SIGMA_DOP", self.sigma_dop);
        push_number(&mut writes, "HCLPF", self.hclpf);
        push_number(&mut writes, "SIGMA_1", self.sigma_1);
        push_number(&mut writes, "SIGMA_2", self.sigma_2);
        push_number(&mut writes, "SIGMA_S_1_PZ", self.sigma_1_1_pz);
        push_number(&mut writes, "SIGMA_S_2_PZ", self.sigma_1_2_pz);
        push_number(&mut writes, "SIGMA_S_S1_PZ", self.sigma_1_s1_pz);
        push_number(&mut writes, "SIGMA_S_S2_PZ", self.sigma_2_s2_pz);
        push_number(&mut writes, "SIGMA_S_1_MRZ", self.sigma_1_1_mrz);
        push_number(&mut writes, "SIGMA_S_2_MRZ", self.sigma_1_2_mrz);
        push_number(&mut writes, "SIGMA_S_S1_MRZ", self.sigma_1_s1_mrz);
        push_number(&mut writes, "SIGMA_S_S2_MRZ", self.sigma_2_s2_mrz);
        writes
    }
}

/// POST /api/save-stress-inputs — upsert the raw inputs and NULL every
/// sigma-alt column whose input set was touched, in the same transaction.
/// The new values make the old derived fields stale the instant they land.
pub async fn save_stress_inputs(
    State(state): State<AppState>,
    Json(req): Json<SaveStressInputsRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let mut writes = req.writes();
    if writes.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one stress input value must be provided".to_string(),
        ));
    }
    elements::require(&state.db, req.ek_id).await?;

    let updated_fields = updated_number_fields(&writes);
    let invalidated = append_invalidations(&mut writes);

    let mut tx = state.db.begin().await?;
    elements::update_columns(&mut tx, req.ek_id, &writes).await?;
    tx.commit().await?;

    info!(
        ek_id = req.ek_id,
        fields = updated_fields.len(),
        invalidated,
        "stress inputs saved"
    );

    Ok(Json(UpdateResponse {
        success: true,
        message: format!("Successfully updated stress inputs for EK_ID {}", req.ek_id),
        updated_fields,
    }))
}

#[derive(Debug, Serialize)]
pub struct StressInputsResponse {
    pub success: bool,
    pub ek_id: i64,
    pub stress_values: BTreeMap<&'static str, f64>,
}

/// GET /api/get-stress-inputs — readback of the raw inputs, non-null
/// fields only, keyed by storage column.
pub async fn get_stress_inputs(
    State(state): State<AppState>,
    Query(q): Query<EkIdQuery>,
) -> ApiResult<Json<StressInputsResponse>> {
    type Row = (
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    );
    let row: Row = sqlx::query_as(
        "SELECT FIRST_NAT_FREQ_X, FIRST_NAT_FREQ_Y, FIRST_NAT_FREQ_Z, SIGMA_DOP, HCLPF, \
                SIGMA_1, SIGMA_2, \
                SIGMA_S_1_PZ, SIGMA_S_2_PZ, SIGMA_S_S1_PZ, SIGMA_S_S2_PZ, \
                SIGMA_S_1_MRZ, SIGMA_S_2_MRZ, SIGMA_S_S1_MRZ, SIGMA_S_S2_MRZ \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(q.ek_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::element_not_found(q.ek_id))?;

    let pairs = [
        ("FIRST_NAT_FREQ_X", row.0),
        ("FIRST_NAT_FREQ_Y", row.1),
        ("FIRST_NAT_FREQ_Z", row.2),
        ("SIGMA_DOP", row.3),
        ("HCLPF", row.4),
        ("SIGMA_1", row.5),
        ("SIGMA_2", row.6),
        ("SIGMA_S_1_PZ", row.7),
        ("SIGMA_S_2_PZ", row.8),
        ("SIGMA_S_S1_PZ", row.9),
        ("SIGMA_S_S2_PZ", row.10),
        ("SIGMA_S_1_MRZ", row.11),
        ("SIGMA_S_2_MRZ", row.12),
        ("SIGMA_S_S1_MRZ", row.13),
        ("SIGMA_S_S2_MRZ", row.14),
    ];
    let stress_values = pairs
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect();

    Ok(Json(StressInputsResponse {
        success: true,
        ek_id: q.ek_id,
        stress_values,
    }))
}

// ---------------------------------------------------------------------------
// Moment-analysis results (M1/M2)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveAnalysisResultRequest {
    pub ek_id: i64,
    pub spectrum_type: String,
    pub m1: Option<f64>,
    pub m2: Option<f64>,
}

/// POST /api/save-analysis-result — save M1/M2 for one earthquake
/// scenario. An M1 write makes both sigma-alt outputs of that scenario
/// stale, so they are NULLed in the same transaction.
pub async fn save_analysis_result(
    State(state): State<AppState>,
    Json(req): Json<SaveAnalysisResultRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let earthquake_type = EarthquakeType::parse(&req.spectrum_type)?;
    let (m1_column, m2_column) = match earthquake_type {
        EarthquakeType::Mrz => ("M1_MRZ", "M2_MRZ"),
        EarthquakeType::Pz => ("M1_PZ", "M2_PZ"),
    };

    let mut writes = Vec::new();
    push_number(&mut writes, m1_column, req.m1);
    push_number(&mut writes, m2_column, req.m2);
    if writes.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one of m1 or m2 must be provided".to_string(),
        ));
    }
    elements::require(&state.db, req.ek_id).await?;

    let updated_fields = updated_number_fields(&writes);
    let invalidated = append_invalidations(&mut writes);

    let mut tx = state.db.begin().await?;
    elements::update_columns(&mut tx, req.ek_id, &writes).await?;
    tx.commit().await?;

    info!(
        ek_id = req.ek_id,
        spectrum_type = earthquake_type.as_str(),
        invalidated,
        "analysis results saved"
    );

    Ok(Json(UpdateResponse {
        success: true,
        message: format!(
            "Successfully updated analysis results for EK_ID {} ({})",
            req.ek_id,
            earthquake_type.as_str()
        ),
        updated_fields,
    }))
}

#[derive(Debug, Serialize)]
pub struct AnalysisResultsResponse {
    pub success: bool,
    pub ek_id: i64,
    pub analysis_values: BTreeMap<&'static str, f64>,
}

/// GET /api/get-analysis-results — M1/M2 readback, non-null fields only.
pub async fn get_analysis_results(
    State(state): State<AppState>,
    Query(q): Query<EkIdQuery>,
) -> ApiResult<Json<AnalysisResultsResponse>> {
    let row: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT M1_PZ, M2_PZ, M1_MRZ, M2_MRZ FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(q.ek_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::element_not_found(q.ek_id))?;

    let pairs = [
        ("M1_PZ", row.0),
        ("M2_PZ", row.1),
        ("M1_MRZ", row.2),
        ("M2_MRZ", row.3),
    ];
    let analysis_values = pairs
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect();

    Ok(Json(AnalysisResultsResponse {
        success: true,
        ek_id: q.ek_id,
        analysis_values,
    }))
}

#[derive(Debug, Serialize)]
pub struct CalculationResultsResponse {
    pub success: bool,
    pub ek_id: i64,
    pub calculated_values: BTreeMap<&'static str, f64>,
}

/// GET /api/get-calculation-results — persisted sigma-alt values,
/// non-null fields only. Empty right after any upstream input is resaved.
pub async fn get_calculation_results(
    State(state): State<AppState>,
    Query(q): Query<EkIdQuery>,
) -> ApiResult<Json<CalculationResultsResponse>> {
    let row: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT SIGMA_S_ALT_1_PZ, SIGMA_S_ALT_2_PZ, SIGMA_S_ALT_1_MRZ, SIGMA_S_ALT_2_MRZ \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(q.ek_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::element_not_found(q.ek_id))?;

    let pairs = [
        ("SIGMA_S_ALT_1_PZ", row.0),
        ("SIGMA_S_ALT_2_PZ", row.1),
        ("SIGMA_S_ALT_1_MRZ", row.2),
        ("SIGMA_S_ALT_2_MRZ", row.3),
    ];
    let calculated_values = pairs
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect();

    Ok(Json(CalculationResultsResponse {
        success: true,
        ek_id: q.ek_id,
        calculated_values,
    }))
}

// ---------------------------------------------------------------------------
// K coefficients
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveKResultsRequest {
    pub ek_id: i64,
    pub k1_pz: Option<f64>,
    pub k1_mrz: Option<f64>,
    pub k3_pz: Option<f64>,
    pub k3_mrz: Option<f64>,
    pub k2_value: Option<f64>,
    pub n_pz: Option<f64>,
    pub n_mrz: Option<f64>,
}

impl SaveKResultsRequest {
    fn writes(&self) -> Vec<ColumnWrite> {
        let mut writes = Vec::new();
        push_number(&mut writes, "K1_PZ", self.k1_pz);
        push_number(&mut writes, "K1_MRZ", self.k1_mrz);
        push_number(&mut writes, "K3_PZ", self.k3_pz);
        push_number(&mut writes, "K3_MRZ", self.k3_mrz);
        push_number(&mut writes, "K2_", self.k2_value);
        push_number(&mut writes, "N_PZ", self.n_pz);
        push_number(&mut writes, "N_MRZ", self.n_mrz);
        writes
    }
}

/// POST /api/save-k-results — pure field-mapped upsert of the K
/// coefficients and N exponents; no formula involved.
pub async fn save_k_results(
    State(state): State<AppState>,
    Json(req): Json<SaveKResultsRequest>,
) -> ApiResult<Json<UpdateResponse>> {
    let writes = req.writes();
    if writes.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one K coefficient value must be provided".to_string(),
        ));
    }
    elements::require(&state.db, req.ek_id).await?;

    let updated_fields = updated_number_fields(&writes);

    let mut tx = state.db.begin().await?;
    elements::update_columns(&mut tx, req.ek_id, &writes).await?;
    tx.commit().await?;

    info!(
        ek_id = req.ek_id,
        fields = updated_fields.len(),
        "K coefficient results saved"
    );

    Ok(Json(UpdateResponse {
        success: true,
        message: format!(
            "Successfully updated K coefficient results for EK_ID {}",
            req.ek_id
        ),
        updated_fields,
    }))
}

#[derive(Debug, Serialize)]
pub struct KResultsResponse {
    pub success: bool,
    pub ek_id: i64,
    #[serde(flatten)]
    pub k_values: BTreeMap<&'static str, f64>,
    pub calculated: bool,
}

/// GET /api/get-k-results/{ek_id} — K coefficient readback, non-null
/// fields only, plus `k_min_*` aliases and a `calculated` flag.
pub async fn get_k_results(
    State(state): State<AppState>,
    Path(ek_id): Path<i64>,
) -> ApiResult<Json<KResultsResponse>> {
    type Row = (
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    );
    let row: Row = sqlx::query_as(
        "SELECT K1_PZ, K1_MRZ, K3_PZ, K3_MRZ, K2_, N_PZ, N_MRZ \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(ek_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::element_not_found(ek_id))?;

    let (k1_pz, k1_mrz, k3_pz, k3_mrz, k2_value, n_pz, n_mrz) = row;
    let calculated = [k1_pz, k1_mrz, k3_pz, k3_mrz, k2_value, n_pz, n_mrz]
        .iter()
        .any(Option::is_some);

    let pairs = [
        ("k1_pz", k1_pz),
        ("k1_mrz", k1_mrz),
        ("k3_pz", k3_pz),
        ("k3_mrz", k3_mrz),
        ("k2_value", k2_value),
        ("n_pz", n_pz),
        ("n_mrz", n_mrz),
        // K1 is the governing (minimum) coefficient of its scenario
        ("k_min_pz", k1_pz),
        ("k_min_mrz", k1_mrz),
    ];
    let k_values = pairs
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();

    Ok(Json(KResultsResponse {
        success: true,
        ek_id,
        k_values,
        calculated,
    }))
}
