//! Seisqual: seismic qualification data service
//!
//! Backend for nuclear power plant seismic qualification data: equipment
//! records, acceleration response spectra, and the derived structural
//! margin calculations (sigma-alt, K coefficients) that turn raw
//! stress/frequency inputs into qualification verdicts.
//!
//! ## Architecture
//!
//! - **Margin engine** (`margin`): closed-form sigma-alt formulas,
//!   precondition checks, and the derived-field dependency contract
//! - **Spectrum store** (`store::spectra`): acceleration sets, per-axis
//!   plots, ordered point series, attribute-matched set lookup
//! - **API** (`api`): axum HTTP surface over both subsystems

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod margin;
pub mod store;
pub mod types;

// Re-export the pieces embedders touch most
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use types::{Axis, EarthquakeType};
