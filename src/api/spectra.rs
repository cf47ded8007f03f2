//! Spectrum matching and retrieval endpoints.
//!
//! Two retrieval shapes share one wire format: characteristics sets return
//! the full per-axis curve, requirements sets a single representative
//! value at the element's own natural frequency. Both distinguish a
//! missing element (404) from missing data (200 with an empty frequency
//! array).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::error::{ApiError, ApiResult};
use crate::store::spectra::{NewAccelSet, SetSearch};
use crate::store::{elements, spectra};
use crate::types::{Axis, EarthquakeType, CALC_TYPE_DETERMINISTIC};

/// Per-axis spectral response. Axis keys of the scenario that was not
/// requested are omitted entirely; within the requested scenario an absent
/// plot serializes as an explicit null — hence the nested `Option`.
#[derive(Debug, Default, Serialize)]
pub struct SpectralDataResponse {
    pub frequency: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrz_x: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrz_y: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrz_z: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pz_x: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pz_y: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pz_z: Option<Option<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pga: Option<f64>,
}

impl SpectralDataResponse {
    /// "No data yet": valid, distinct from a missing element.
    fn empty() -> Self {
        Self::default()
    }

    fn set_axis(&mut self, earthquake_type: EarthquakeType, axis: Axis, values: Option<Vec<f64>>) {
        let slot = match (earthquake_type, axis) {
            (EarthquakeType::Mrz, Axis::X) => &mut self.mrz_x,
            (EarthquakeType::Mrz, Axis::Y) => &mut self.mrz_y,
            (EarthquakeType::Mrz, Axis::Z) => &mut self.mrz_z,
            (EarthquakeType::Pz, Axis::X) => &mut self.pz_x,
            (EarthquakeType::Pz, Axis::Y) => &mut self.pz_y,
            (EarthquakeType::Pz, Axis::Z) => &mut self.pz_z,
        };
        *slot = Some(values);
    }
}

// ---------------------------------------------------------------------------
// Characteristics: full curves
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SpectralDataQuery {
    pub ek_id: i64,
    pub calc_type: String,
    pub spectrum_type: String,
}

/// GET /api/spectral-data — full per-axis curves of the characteristics
/// set matching the element's location. The element must exist; a missing
/// set is an empty (valid) response.
pub async fn get_spectral_data(
    State(state): State<AppState>,
    Query(q): Query<SpectralDataQuery>,
) -> ApiResult<Json<SpectralDataResponse>> {
    let earthquake_type = EarthquakeType::parse(&q.spectrum_type)?;
    let loc = elements::location(&state.db, q.ek_id).await?;

    let Some(set) =
        spectra::find_characteristics_set(&state.db, &loc, earthquake_type.as_str(), &q.calc_type)
            .await?
    else {
        return Ok(Json(SpectralDataResponse::empty()));
    };

    let mut response = SpectralDataResponse::default();
    let mut base_freq: Vec<f64> = Vec::new();
    for axis in Axis::ALL {
        let points = spectra::get_points(&state.db, set.plot_for(axis)).await?;
        let (freqs, accels): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        if freqs.len() > base_freq.len() {
            base_freq = freqs;
        }
        let values = if accels.is_empty() { None } else { Some(accels) };
        response.set_axis(earthquake_type, axis, values);
    }
    response.frequency = base_freq;

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Requirements: single value at the element's natural frequency
// ---------------------------------------------------------------------------

fn default_earthquake_type() -> String {
    EarthquakeType::Mrz.as_str().to_string()
}

fn default_calc_type() -> String {
    CALC_TYPE_DETERMINISTIC.to_string()
}

#[derive(Debug, Deserialize)]
pub struct SeismRequirementsQuery {
    pub ek_id: i64,
    pub dempf: f64,
    #[serde(default = "default_earthquake_type")]
    pub spectr_earthq_type: String,
    #[serde(default = "default_calc_type")]
    pub calc_type: String,
}

/// GET /api/seism-requirements — the requirements set carries the design
/// envelope; the caller gets one value per axis, looked up at the
/// element's own natural frequency.
pub async fn get_seism_requirements(
    State(state): State<AppState>,
    Query(q): Query<SeismRequirementsQuery>,
) -> ApiResult<Json<SpectralDataResponse>> {
    let earthquake_type = EarthquakeType::parse(&q.spectr_earthq_type)?;
    let loc = elements::location(&state.db, q.ek_id).await?;

    let Some(natural_frequency) = loc.f_mu else {
        return Ok(Json(SpectralDataResponse::empty()));
    };
    let Some(set) = spectra::find_requirements_set(
        &state.db,
        &loc,
        q.dempf,
        earthquake_type.as_str(),
        &q.calc_type,
    )
    .await?
    else {
        return Ok(Json(SpectralDataResponse::empty()));
    };

    let mut response = SpectralDataResponse {
        frequency: vec![natural_frequency],
        pga: set.pga,
        ..SpectralDataResponse::default()
    };
    for axis in Axis::ALL {
        let value = spectra::point_at(&state.db, set.plot_for(axis), natural_frequency).await?;
        response.set_axis(earthquake_type, axis, value.map(|v| vec![v]));
    }

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Explicit set search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FindReqAccelSetRequest {
    pub plant_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub lev1: Option<f64>,
    pub lev2: Option<f64>,
    pub earthq_type: Option<String>,
    pub calc_type: Option<String>,
    pub set_type: Option<String>,
    pub dempf: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FindReqAccelSetResponse {
    pub set_id: Option<i64>,
    /// Elements registered at the location — the blast radius the caller
    /// should warn about before overwriting.
    pub found_ek: i64,
}

/// POST /api/find-req-accel-set — exact-attribute set lookup. A null field
/// matches only a null stored field; the most recently created match wins.
pub async fn find_req_accel_set(
    State(state): State<AppState>,
    Json(req): Json<FindReqAccelSetRequest>,
) -> ApiResult<Json<FindReqAccelSetResponse>> {
    if let Some(raw) = &req.earthq_type {
        EarthquakeType::parse(raw)?;
    }

    let search = SetSearch {
        plant_id: req.plant_id,
        unit_id: req.unit_id,
        building: req.building.clone(),
        room: req.room.clone(),
        lev1: req.lev1,
        lev2: req.lev2,
        dempf: req.dempf,
        earthquake_type: req.earthq_type.clone(),
        calc_type: req.calc_type.clone(),
        set_type: req.set_type.clone(),
    };
    let set_id = spectra::find_set(&state.db, &search).await?;
    let found_ek = elements::count_at_location(
        &state.db,
        req.plant_id,
        req.unit_id,
        req.building.as_deref(),
    )
    .await?;

    Ok(Json(FindReqAccelSetResponse { set_id, found_ek }))
}

// ---------------------------------------------------------------------------
// Soft clear
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ClearAccelSetRequest {
    pub set_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ClearAccelSetResponse {
    pub clear_result: String,
}

/// POST /api/clear-accel-set-arrays — detach the X/Y/Z plots from a set.
/// The plot and point rows survive; re-assignment undoes the clear.
pub async fn clear_accel_set_arrays(
    State(state): State<AppState>,
    Json(req): Json<ClearAccelSetRequest>,
) -> ApiResult<Json<ClearAccelSetResponse>> {
    let mut tx = state.db.begin().await?;
    spectra::clear_axes(&mut tx, req.set_id).await?;
    tx.commit().await?;

    info!(set_id = req.set_id, "acceleration set arrays cleared");
    Ok(Json(ClearAccelSetResponse {
        clear_result: "success".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Structured ingestion
// ---------------------------------------------------------------------------

/// One damping sheet of already-parsed spectrum columns. Excel parsing is
/// the caller's job; this endpoint only persists.
#[derive(Debug, Deserialize)]
pub struct SpectrumSheet {
    pub dempf: Option<f64>,
    pub frequency: Vec<f64>,
    pub mrz_x: Option<Vec<f64>>,
    pub mrz_y: Option<Vec<f64>>,
    pub mrz_z: Option<Vec<f64>>,
    pub pz_x: Option<Vec<f64>>,
    pub pz_y: Option<Vec<f64>>,
    pub pz_z: Option<Vec<f64>>,
}

impl SpectrumSheet {
    fn axis_series(&self, earthquake_type: EarthquakeType, axis: Axis) -> Option<&Vec<f64>> {
        match (earthquake_type, axis) {
            (EarthquakeType::Mrz, Axis::X) => self.mrz_x.as_ref(),
            (EarthquakeType::Mrz, Axis::Y) => self.mrz_y.as_ref(),
            (EarthquakeType::Mrz, Axis::Z) => self.mrz_z.as_ref(),
            (EarthquakeType::Pz, Axis::X) => self.pz_x.as_ref(),
            (EarthquakeType::Pz, Axis::Y) => self.pz_y.as_ref(),
            (EarthquakeType::Pz, Axis::Z) => self.pz_z.as_ref(),
        }
    }

    fn has_scenario(&self, earthquake_type: EarthquakeType) -> bool {
        Axis::ALL
            .iter()
            .any(|axis| self.axis_series(earthquake_type, *axis).is_some())
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveAccelDataRequest {
    pub plant_id: Option<i64>,
    pub plant_name: Option<String>,
    pub unit_id: Option<i64>,
    pub unit_name: Option<String>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub lev: Option<String>,
    pub lev1: Option<f64>,
    pub lev2: Option<f64>,
    pub set_type: String,
    pub calc_type: String,
    pub pga: Option<f64>,
    pub sheets: Vec<SpectrumSheet>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreatedRecords {
    pub sets: Vec<i64>,
    pub plots: Vec<i64>,
    pub points: usize,
    pub mrz_set_id: Option<i64>,
    pub pz_set_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SaveAccelDataResponse {
    pub success: bool,
    pub message: String,
    pub created: CreatedRecords,
    pub mrz_set_id: Option<i64>,
    pub pz_set_id: Option<i64>,
}

/// POST /api/save-accel-data — create one set per sheet and earthquake
/// scenario present, with plots per supplied axis and points zipped to the
/// shorter of the frequency/acceleration arrays. All-or-nothing: one
/// transaction covers every created row.
pub async fn save_accel_data(
    State(state): State<AppState>,
    Json(req): Json<SaveAccelDataRequest>,
) -> ApiResult<Json<SaveAccelDataResponse>> {
    if req.sheets.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one spectrum sheet must be provided".to_string(),
        ));
    }

    let mut created = CreatedRecords::default();
    let mut tx = state.db.begin().await?;

    for sheet in &req.sheets {
        for earthquake_type in [EarthquakeType::Mrz, EarthquakeType::Pz] {
            if !sheet.has_scenario(earthquake_type) {
                continue;
            }

            let set_id = spectra::create_set(
                &mut tx,
                &NewAccelSet {
                    set_type: req.set_type.clone(),
                    calc_type: req.calc_type.clone(),
                    earthquake_type: Some(earthquake_type.as_str().to_string()),
                    building: req.building.clone(),
                    room: req.room.clone(),
                    lev: req.lev.clone(),
                    lev1: req.lev1,
                    lev2: req.lev2,
                    dempf: sheet.dempf,
                    pga: req.pga,
                    plant_id: req.plant_id,
                    plant_name: req.plant_name.clone(),
                    unit_id: req.unit_id,
                    unit_name: req.unit_name.clone(),
                },
            )
            .await?;
            created.sets.push(set_id);
            match earthquake_type {
                EarthquakeType::Mrz => created.mrz_set_id = Some(set_id),
                EarthquakeType::Pz => created.pz_set_id = Some(set_id),
            }

            let mut axis_plots = [None, None, None];
            for (slot, axis) in axis_plots.iter_mut().zip(Axis::ALL) {
                let Some(series) = sheet.axis_series(earthquake_type, axis) else {
                    continue;
                };
                let name = format!(
                    "{}_{}",
                    earthquake_type.as_str(),
                    axis.as_str().to_lowercase()
                );
                let plot_id = spectra::create_plot(&mut tx, axis, &name).await?;
                created.plots.push(plot_id);
                *slot = Some(plot_id);

                let count = sheet.frequency.len().min(series.len());
                for i in 0..count {
                    spectra::add_point(&mut tx, plot_id, sheet.frequency[i], series[i]).await?;
                }
                created.points += count;
            }
            spectra::assign_plots(&mut tx, set_id, axis_plots[0], axis_plots[1], axis_plots[2])
                .await?;
        }
    }

    tx.commit().await?;

    info!(
        sets = created.sets.len(),
        plots = created.plots.len(),
        points = created.points,
        "acceleration data saved"
    );

    let (mrz_set_id, pz_set_id) = (created.mrz_set_id, created.pz_set_id);
    Ok(Json(SaveAccelDataResponse {
        success: true,
        message: "Data saved successfully".to_string(),
        created,
        mrz_set_id,
        pz_set_id,
    }))
}

// ---------------------------------------------------------------------------
// Damping factors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DampingFactorsQuery {
    pub ek_id: i64,
    pub spectr_earthq_type: String,
    pub calc_type: String,
}

#[derive(Debug, Serialize)]
pub struct DampingFactorsResponse {
    pub damping_factors: Vec<f64>,
}

/// GET /api/damping-factors — distinct damping factors with spectra at the
/// element's location; used to populate the damping selector.
pub async fn get_damping_factors(
    State(state): State<AppState>,
    Query(q): Query<DampingFactorsQuery>,
) -> ApiResult<Json<DampingFactorsResponse>> {
    let earthquake_type = EarthquakeType::parse(&q.spectr_earthq_type)?;
    let loc = elements::location(&state.db, q.ek_id).await?;
    let damping_factors =
        spectra::distinct_damping(&state.db, &loc, earthquake_type.as_str(), &q.calc_type).await?;
    Ok(Json(DampingFactorsResponse { damping_factors }))
}
