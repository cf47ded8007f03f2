//! Load-change analysis endpoints.
//!
//! Pressure/temperature derating ratios arrive already computed from the
//! analysis tooling; this component's job is validated, idempotent
//! persistence over a statically declared field map — no formulas.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::margin::fields::{push_number, push_text, ColumnWrite, FieldValue};
use crate::store::elements;

#[derive(Debug, Deserialize)]
pub struct SaveLoadAnalysisRequest {
    pub element_id: i64,
    pub material: Option<String>,
    pub doc_code_analytics: Option<String>,
    pub doc_code_operation: Option<String>,
    pub sigma_alt_dop: Option<f64>,
    pub p1_pz: Option<f64>,
    pub temp1_pz: Option<f64>,
    pub p2_pz: Option<f64>,
    pub temp2_pz: Option<f64>,
    pub sigma_dop_a_pz: Option<f64>,
    pub ratio_e_pz: Option<f64>,
    pub p1_mrz: Option<f64>,
    pub temp1_mrz: Option<f64>,
    pub p2_mrz: Option<f64>,
    pub temp2_mrz: Option<f64>,
    pub sigma_dop_a_mrz: Option<f64>,
    pub ratio_e_mrz: Option<f64>,
    pub delta_t_pz: Option<f64>,
    pub ratio_p_pz: Option<f64>,
    pub delta_t_mrz: Option<f64>,
    pub ratio_p_mrz: Option<f64>,
    pub ration_sigma_dop_pz: Option<f64>,
    pub ration_sigma_dop_mrz: Option<f64>,
    pub m1_alt_pz: Option<f64>,
    pub m1_alt_mrz: Option<f64>,
    pub k1_alt_pz: Option<f64>,
    pub k1_alt_mrz: Option<f64>,
}

impl SaveLoadAnalysisRequest {
    /// Request-field → storage-column map for the load-analysis parameter set.
    fn writes(&self) -> Vec<ColumnWrite> {
        let mut writes = Vec::new();
        push_text(&mut writes, "MAT_NAME", self.material.as_ref());
        push_text(&mut writes, "DOC_1", self.doc_code_analytics.as_ref());
        push_text(&mut writes, "DOC_2", self.doc_code_operation.as_ref());
        push_number(&mut writes, "SIGMA_ALT_DOP", self.sigma_alt_dop);
        push_number(&mut writes, "P1_PZ", self.p1_pz);
        push_number(&mut writes, "TEMP1_PZ", self.temp1_pz);
        push_number(&mut writes, "P2_PZ", self.p2_pz);
        push_number(&mut writes, "TEMP2_PZ", self.temp2_pz);
        push_number(&mut writes, "SIGMA_DOP_A_PZ", self.sigma_dop_a_pz);
        push_number(&mut writes, "RATIO_E_PZ", self.ratio_e_pz);
        push_number(&mut writes, "P1_MRZ", self.p1_mrz);
        push_number(&mut writes, "TEMP1_MRZ", self.temp1_mrz);
        push_number(&mut writes, "P2_MRZ", self.p2_mrz);
        push_number(&mut writes, "TEMP2_MRZ", self.temp2_mrz);
        push_number(&mut writes, "SIGMA_DOP_A_MRZ", self.sigma_dop_a_mrz);
        push_number(&mut writes, "RATIO_E_MRZ", self.ratio_e_mrz);
        push_number(&mut writes, "DELTA_T_PZ", self.delta_t_pz);
        push_number(&mut writes, "RATIO_P_PZ", self.ratio_p_pz);
        push_number(&mut writes, "DELTA_T_MRZ", self.delta_t_mrz);
        push_number(&mut writes, "RATIO_P_MRZ", self.ratio_p_mrz);
        push_number(&mut writes, "RATION_SIGMA_DOP_PZ", self.ration_sigma_dop_pz);
        push_number(
            &mut writes,
            "RATION_SIGMA_DOP_MRZ",
            self.ration_sigma_dop_mrz,
        );
        push_number(&mut writes, "M1_ALT_PZ", self.m1_alt_pz);
        push_number(&mut writes, "M1_ALT_MRZ", self.m1_alt_mrz);
        push_number(&mut writes, "K1_ALT_PZ", self.k1_alt_pz);
        push_number(&mut writes, "K1_ALT_MRZ", self.k1_alt_mrz);
        writes
    }
}

#[derive(Debug, Serialize)]
pub struct SaveLoadAnalysisResponse {
    pub success: bool,
    pub message: String,
    pub updated_fields: BTreeMap<&'static str, serde_json::Value>,
}

/// POST /api/save-load-analysis-params — idempotent upsert of the
/// load-change parameter set for one element.
pub async fn save_load_analysis_params(
    State(state): State<AppState>,
    Json(req): Json<SaveLoadAnalysisRequest>,
) -> ApiResult<Json<SaveLoadAnalysisResponse>> {
    let writes = req.writes();
    if writes.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one load analysis parameter must be provided".to_string(),
        ));
    }
    elements::require(&state.db, req.element_id).await?;

    let updated_fields: BTreeMap<&'static str, serde_json::Value> = writes
        .iter()
        .filter_map(|w| match &w.value {
            Some(FieldValue::Number(v)) => Some((w.column, json!(v))),
            Some(FieldValue::Text(s)) => Some((w.column, json!(s))),
            None => None,
        })
        .collect();

    let mut tx = state.db.begin().await?;
    elements::update_columns(&mut tx, req.element_id, &writes).await?;
    tx.commit().await?;

    info!(
        ek_id = req.element_id,
        fields = updated_fields.len(),
        "load analysis parameters saved"
    );

    Ok(Json(SaveLoadAnalysisResponse {
        success: true,
        message: format!(
            "Successfully saved load analysis parameters for EK_ID {}",
            req.element_id
        ),
        updated_fields,
    }))
}

/// Readback row for the load-analysis parameter set.
#[derive(Debug, sqlx::FromRow)]
struct LoadAnalysisRow {
    mat_name: Option<String>,
    doc_1: Option<String>,
    doc_2: Option<String>,
    sigma_alt_dop: Option<f64>,
    p1_pz: Option<f64>,
    temp1_pz: Option<f64>,
    p2_pz: Option<f64>,
    temp2_pz: Option<f64>,
    sigma_dop_a_pz: Option<f64>,
    ratio_e_pz: Option<f64>,
    p1_mrz: Option<f64>,
    temp1_mrz: Option<f64>,
    p2_mrz: Option<f64>,
    temp2_mrz: Option<f64>,
    sigma_dop_a_mrz: Option<f64>,
    ratio_e_mrz: Option<f64>,
    delta_t_pz: Option<f64>,
    ratio_p_pz: Option<f64>,
    delta_t_mrz: Option<f64>,
    ratio_p_mrz: Option<f64>,
    ration_sigma_dop_pz: Option<f64>,
    ration_sigma_dop_mrz: Option<f64>,
    m1_alt_pz: Option<f64>,
    m1_alt_mrz: Option<f64>,
    k1_alt_pz: Option<f64>,
    k1_alt_mrz: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct LoadAnalysisParamsResponse {
    pub success: bool,
    pub data: BTreeMap<&'static str, serde_json::Value>,
}

/// GET /api/get-load-analysis-params/{ek_id} — full parameter readback,
/// non-null fields only, keyed by storage column.
pub async fn get_load_analysis_params(
    State(state): State<AppState>,
    Path(ek_id): Path<i64>,
) -> ApiResult<Json<LoadAnalysisParamsResponse>> {
    let row: LoadAnalysisRow = sqlx::query_as(
        "SELECT MAT_NAME AS mat_name, DOC_1 AS doc_1, DOC_2 AS doc_2, \
                SIGMA_ALT_DOP AS sigma_alt_dop, \
                P1_PZ AS p1_pz, TEMP1_PZ AS temp1_pz, P2_PZ AS p2_pz, TEMP2_PZ AS temp2_pz, \
                SIGMA_DOP_A_PZ AS sigma_dop_a_pz, RATIO_E_PZ AS ratio_e_pz, \
                P1_MRZ AS p1_mrz, TEMP1_MRZ AS temp1_mrz, P2_MRZ AS p2_mrz, TEMP2_MRZ AS temp2_mrz, \
                SIGMA_DOP_A_MRZ AS sigma_dop_a_mrz, RATIO_E_MRZ AS ratio_e_mrz, \
                DELTA_T_PZ AS delta_t_pz, RATIO_P_PZ AS ratio_p_pz, \
                DELTA_T_MRZ AS delta_t_mrz, RATIO_P_MRZ AS ratio_p_mrz, \
                RATION_SIGMA_DOP_PZ AS ration_sigma_dop_pz, \
                RATION_SIGMA_DOP_MRZ AS ration_sigma_dop_mrz, \
                M1_ALT_PZ AS m1_alt_pz, M1_ALT_MRZ AS m1_alt_mrz, \
                K1_ALT_PZ AS k1_alt_pz, K1_ALT_MRZ AS k1_alt_mrz \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(ek_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::element_not_found(ek_id))?;

    let mut data = BTreeMap::new();
    let text_pairs = [
        ("MAT_NAME", &row.mat_name),
        ("DOC_1", &row.doc_1),
        ("DOC_2", &row.doc_2),
    ];
    for (column, value) in text_pairs {
        if let Some(v) = value {
            data.insert(column, json!(v));
        }
    }
    let number_pairs = [
        ("SIGMA_ALT_DOP", row.sigma_alt_dop),
        ("P1_PZ", row.p1_pz),
        ("TEMP1_PZ", row.temp1_pz),
        ("P2_PZ", row.p2_pz),
        ("TEMP2_PZ", row.temp2_pz),
        ("SIGMA_DOP_A_PZ", row.sigma_dop_a_pz),
        ("RATIO_E_PZ", row.ratio_e_pz),
        ("P1_MRZ", row.p1_mrz),
        ("TEMP1_MRZ", row.temp1_mrz),
        ("P2_MRZ", row.p2_mrz),
        ("TEMP2_MRZ", row.temp2_mrz),
        ("SIGMA_DOP_A_MRZ", row.sigma_dop_a_mrz),
        ("RATIO_E_MRZ", row.ratio_e_mrz),
        ("DELTA_T_PZ", row.delta_t_pz),
        ("RATIO_P_PZ", row.ratio_p_pz),
        ("DELTA_T_MRZ", row.delta_t_mrz),
        ("RATIO_P_MRZ", row.ratio_p_mrz),
        ("RATION_SIGMA_DOP_PZ", row.ration_sigma_dop_pz),
        ("RATION_SIGMA_DOP_MRZ", row.ration_sigma_dop_mrz),
        ("M1_ALT_PZ", row.m1_alt_pz),
        ("M1_ALT_MRZ", row.m1_alt_mrz),
        ("K1_ALT_PZ", row.k1_alt_pz),
        ("K1_ALT_MRZ", row.k1_alt_mrz),
    ];
    for (column, value) in number_pairs {
        if let Some(v) = value {
            data.insert(column, json!(v));
        }
    }

    Ok(Json(LoadAnalysisParamsResponse {
        success: true,
        data,
    }))
}
