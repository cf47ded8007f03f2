//! HTTP surface: route registration and shared state.

pub mod analysis;
pub mod load_analysis;
pub mod spectra;

use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

/// Build the complete API router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Margin calculation engine
        .route("/calculate-sigma-alt", post(analysis::calculate_sigma_alt))
        .route(
            "/check-calculation-requirements",
            get(analysis::check_calculation_requirements),
        )
        .route("/save-stress-inputs", post(analysis::save_stress_inputs))
        .route("/get-stress-inputs", get(analysis::get_stress_inputs))
        .route("/save-analysis-result", post(analysis::save_analysis_result))
        .route("/get-analysis-results", get(analysis::get_analysis_results))
        .route(
            "/get-calculation-results",
            get(analysis::get_calculation_results),
        )
        .route("/save-k-results", post(analysis::save_k_results))
        .route("/get-k-results/{ek_id}", get(analysis::get_k_results))
        // Spectrum matching and retrieval
        .route("/spectral-data", get(spectra::get_spectral_data))
        .route("/seism-requirements", get(spectra::get_seism_requirements))
        .route("/find-req-accel-set", post(spectra::find_req_accel_set))
        .route(
            "/clear-accel-set-arrays",
            post(spectra::clear_accel_set_arrays),
        )
        .route("/save-accel-data", post(spectra::save_accel_data))
        .route("/damping-factors", get(spectra::get_damping_factors))
        // Load-change analysis
        .route(
            "/save-load-analysis-params",
            post(load_analysis::save_load_analysis_params),
        )
        .route(
            "/get-load-analysis-params/{ek_id}",
            get(load_analysis::get_load_analysis_params),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
