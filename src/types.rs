//! Shared domain vocabulary: earthquake scenarios, spectrum axes, set-type
//! tags. String values are stored and transmitted verbatim from the legacy
//! schema, so the regulator-facing vocabulary survives the reimplementation.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

/// Spectrum set classification: seismic requirements (design envelope).
pub const SET_TYPE_REQUIREMENTS: &str = "ВИМОГИ";
/// Spectrum set classification: measured/computed floor characteristics.
pub const SET_TYPE_CHARACTERISTICS: &str = "ХАРАКТЕРИСТИКИ";

/// Default calculation type when a query does not specify one.
pub const CALC_TYPE_DETERMINISTIC: &str = "ДЕТЕРМІНІСТИЧНИЙ";

/// Earthquake scenario. МРЗ is the design-basis (maximum) earthquake,
/// ПЗ the operating-basis earthquake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarthquakeType {
    #[serde(rename = "МРЗ")]
    Mrz,
    #[serde(rename = "ПЗ")]
    Pz,
}

impl EarthquakeType {
    /// Parse a wire value, rejecting anything outside {МРЗ, ПЗ} before any
    /// database work happens.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "МРЗ" => Ok(Self::Mrz),
            "ПЗ" => Ok(Self::Pz),
            other => Err(ApiError::BadRequest(format!(
                "Invalid spectrum type '{other}'. Must be МРЗ or ПЗ"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mrz => "МРЗ",
            Self::Pz => "ПЗ",
        }
    }
}

/// Spectrum axis. Every acceleration set owns at most one plot per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }
}
