//! Acceleration-spectrum store: sets, plots, and ordered point series.
//!
//! Sets reference their per-axis plots through nullable columns; elements
//! reference sets only by attribute match at query time. Both kinds of
//! looseness are deliberate — spectra are shared across every element at
//! the same location, and clearing a set detaches its plots without
//! destroying the point data.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{ApiError, ApiResult};
use crate::store::elements::ElementLocation;
use crate::types::{Axis, SET_TYPE_CHARACTERISTICS, SET_TYPE_REQUIREMENTS};

/// Attributes of a new acceleration set. Everything except the set-type
/// and calculation-type tags may be null.
#[derive(Debug, Clone, Default)]
pub struct NewAccelSet {
    pub set_type: String,
    pub calc_type: String,
    pub earthquake_type: Option<String>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub lev: Option<String>,
    pub lev1: Option<f64>,
    pub lev2: Option<f64>,
    pub dempf: Option<f64>,
    pub pga: Option<f64>,
    pub plant_id: Option<i64>,
    pub plant_name: Option<String>,
    pub unit_id: Option<i64>,
    pub unit_name: Option<String>,
}

/// Plot references resolved for one matched set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SetPlots {
    pub accel_set_id: i64,
    pub x_plot_id: Option<i64>,
    pub y_plot_id: Option<i64>,
    pub z_plot_id: Option<i64>,
    pub pga: Option<f64>,
}

impl SetPlots {
    pub fn plot_for(&self, axis: Axis) -> Option<i64> {
        match axis {
            Axis::X => self.x_plot_id,
            Axis::Y => self.y_plot_id,
            Axis::Z => self.z_plot_id,
        }
    }
}

pub async fn create_set(
    tx: &mut Transaction<'_, Sqlite>,
    set: &NewAccelSet,
) -> ApiResult<i64> {
    let result = sqlx::query(
        "INSERT INTO SRTN_ACCEL_SET (SET_TYPE, CALC_TYPE, SPECTR_EARTHQ_TYPE, BUILDING, ROOM, \
                                     LEV, LEV1, LEV2, DEMPF, PGA, PLANT_ID, PLANT_NAME, \
                                     UNIT_ID, UNIT_NAME) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&set.set_type)
    .bind(&set.calc_type)
    .bind(&set.earthquake_type)
    .bind(&set.building)
    .bind(&set.room)
    .bind(&set.lev)
    .bind(set.lev1)
    .bind(set.lev2)
    .bind(set.dempf)
    .bind(set.pga)
    .bind(set.plant_id)
    .bind(&set.plant_name)
    .bind(set.unit_id)
    .bind(&set.unit_name)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn create_plot(
    tx: &mut Transaction<'_, Sqlite>,
    axis: Axis,
    name: &str,
) -> ApiResult<i64> {
    let result = sqlx::query("INSERT INTO SRTN_ACCEL_PLOT (AXIS, NAME) VALUES (?, ?)")
        .bind(axis.as_str())
        .bind(name)
        .execute(&mut **tx)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Attach per-axis plot references to a set (absent axes stay NULL).
pub async fn assign_plots(
    tx: &mut Transaction<'_, Sqlite>,
    set_id: i64,
    x_plot_id: Option<i64>,
    y_plot_id: Option<i64>,
    z_plot_id: Option<i64>,
) -> ApiResult<()> {
    sqlx::query(
        "UPDATE SRTN_ACCEL_SET SET X_PLOT_ID = ?, Y_PLOT_ID = ?, Z_PLOT_ID = ? \
         WHERE ACCEL_SET_ID = ?",
    )
    .bind(x_plot_id)
    .bind(y_plot_id)
    .bind(z_plot_id)
    .bind(set_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Append one (frequency, acceleration) pair. Points are append-only;
/// there is no update-in-place.
pub async fn add_point(
    tx: &mut Transaction<'_, Sqlite>,
    plot_id: i64,
    freq: f64,
    accel: f64,
) -> ApiResult<()> {
    sqlx::query("INSERT INTO SRTN_ACCEL_POINT (PLOT_ID, FREQ, ACCEL) VALUES (?, ?, ?)")
        .bind(plot_id)
        .bind(freq)
        .bind(accel)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Full point series of one plot, ascending by frequency (insertion order
/// breaks ties). Empty when the plot reference is null or has no points.
pub async fn get_points(pool: &SqlitePool, plot_id: Option<i64>) -> ApiResult<Vec<(f64, f64)>> {
    let Some(plot_id) = plot_id else {
        return Ok(Vec::new());
    };
    let points: Vec<(f64, f64)> = sqlx::query_as(
        "SELECT FREQ, ACCEL FROM SRTN_ACCEL_POINT WHERE PLOT_ID = ? ORDER BY FREQ, POINT_ID",
    )
    .bind(plot_id)
    .fetch_all(pool)
    .await?;
    Ok(points)
}

/// Acceleration at one exact frequency, as stored. Requirements sets carry
/// a single representative value per frequency of interest.
pub async fn point_at(
    pool: &SqlitePool,
    plot_id: Option<i64>,
    freq: f64,
) -> ApiResult<Option<f64>> {
    let Some(plot_id) = plot_id else {
        return Ok(None);
    };
    let accel: Option<f64> =
        sqlx::query_scalar("SELECT ACCEL FROM SRTN_ACCEL_POINT WHERE PLOT_ID = ? AND FREQ = ?")
            .bind(plot_id)
            .bind(freq)
            .fetch_optional(pool)
            .await?;
    Ok(accel)
}

/// Resolve the "ХАРАКТЕРИСТИКИ" set for an element's location. When several
/// match, the most recently created one wins.
pub async fn find_characteristics_set(
    pool: &SqlitePool,
    loc: &ElementLocation,
    earthquake_type: &str,
    calc_type: &str,
) -> ApiResult<Option<SetPlots>> {
    let set: Option<SetPlots> = sqlx::query_as(
        "SELECT ACCEL_SET_ID AS accel_set_id, X_PLOT_ID AS x_plot_id, \
                Y_PLOT_ID AS y_plot_id, Z_PLOT_ID AS z_plot_id, PGA AS pga \
         FROM SRTN_ACCEL_SET \
         WHERE ((? IS NULL AND PLANT_ID IS NULL) OR PLANT_ID = ?) \
           AND ((? IS NULL AND UNIT_ID IS NULL) OR UNIT_ID = ?) \
           AND ((? IS NULL AND BUILDING IS NULL) OR BUILDING = ?) \
           AND ((? IS NULL AND ROOM IS NULL) OR ROOM = ?) \
           AND ((? IS NULL AND LEV IS NULL) OR LEV = ?) \
           AND SPECTR_EARTHQ_TYPE = ? \
           AND CALC_TYPE = ? \
           AND SET_TYPE = ? \
         ORDER BY ACCEL_SET_ID DESC \
         LIMIT 1",
    )
    .bind(loc.plant_id)
    .bind(loc.plant_id)
    .bind(loc.unit_id)
    .bind(loc.unit_id)
    .bind(&loc.building)
    .bind(&loc.building)
    .bind(&loc.room)
    .bind(&loc.room)
    .bind(&loc.lev)
    .bind(&loc.lev)
    .bind(earthquake_type)
    .bind(calc_type)
    .bind(SET_TYPE_CHARACTERISTICS)
    .fetch_optional(pool)
    .await?;
    Ok(set)
}

/// Resolve the "ВИМОГИ" set for an element's location and damping factor.
/// Requirements sets are keyed by damping but not by elevation.
pub async fn find_requirements_set(
    pool: &SqlitePool,
    loc: &ElementLocation,
    dempf: f64,
    earthquake_type: &str,
    calc_type: &str,
) -> ApiResult<Option<SetPlots>> {
    let set: Option<SetPlots> = sqlx::query_as(
        "SELECT ACCEL_SET_ID AS accel_set_id, X_PLOT_ID AS x_plot_id, \
                Y_PLOT_ID AS y_plot_id, Z_PLOT_ID AS z_plot_id, PGA AS pga \
         FROM SRTN_ACCEL_SET \
         WHERE ((? IS NULL AND PLANT_ID IS NULL) OR PLANT_ID = ?) \
           AND ((? IS NULL AND UNIT_ID IS NULL) OR UNIT_ID = ?) \
           AND ((? IS NULL AND BUILDING IS NULL) OR BUILDING = ?) \
           AND ((? IS NULL AND ROOM IS NULL) OR ROOM = ?) \
           AND DEMPF = ? \
           AND SPECTR_EARTHQ_TYPE = ? \
           AND CALC_TYPE = ? \
           AND SET_TYPE = ? \
         ORDER BY ACCEL_SET_ID DESC \
         LIMIT 1",
    )
    .bind(loc.plant_id)
    .bind(loc.plant_id)
    .bind(loc.unit_id)
    .bind(loc.unit_id)
    .bind(&loc.building)
    .bind(&loc.building)
    .bind(&loc.room)
    .bind(&loc.room)
    .bind(dempf)
    .bind(earthquake_type)
    .bind(calc_type)
    .bind(SET_TYPE_REQUIREMENTS)
    .fetch_optional(pool)
    .await?;
    Ok(set)
}

/// Search attributes for the explicit find endpoint. Every field is
/// exact-match; a null field matches only a null stored field — there are
/// no wildcard semantics.
#[derive(Debug, Clone, Default)]
pub struct SetSearch {
    pub plant_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub lev1: Option<f64>,
    pub lev2: Option<f64>,
    pub dempf: Option<f64>,
    pub earthquake_type: Option<String>,
    pub calc_type: Option<String>,
    pub set_type: Option<String>,
}

/// Exact-attribute lookup; highest id (most recently created) wins.
pub async fn find_set(pool: &SqlitePool, search: &SetSearch) -> ApiResult<Option<i64>> {
    let set_id: Option<i64> = sqlx::query_scalar(
        "SELECT ACCEL_SET_ID FROM SRTN_ACCEL_SET \
         WHERE ((? IS NULL AND PLANT_ID IS NULL) OR PLANT_ID = ?) \
           AND ((? IS NULL AND UNIT_ID IS NULL) OR UNIT_ID = ?) \
           AND ((? IS NULL AND BUILDING IS NULL) OR BUILDING = ?) \
           AND ((? IS NULL AND ROOM IS NULL) OR ROOM = ?) \
           AND ((? IS NULL AND LEV1 IS NULL) OR LEV1 = ?) \
           AND ((? IS NULL AND LEV2 IS NULL) OR LEV2 = ?) \
           AND ((? IS NULL AND DEMPF IS NULL) OR DEMPF = ?) \
           AND ((? IS NULL AND SPECTR_EARTHQ_TYPE IS NULL) OR SPECTR_EARTHQ_TYPE = ?) \
           AND ((? IS NULL AND CALC_TYPE IS NULL) OR CALC_TYPE = ?) \
           AND ((? IS NULL AND SET_TYPE IS NULL) OR SET_TYPE = ?) \
         ORDER BY ACCEL_SET_ID DESC \
         LIMIT 1",
    )
    .bind(search.plant_id)
    .bind(search.plant_id)
    .bind(search.unit_id)
    .bind(search.unit_id)
    .bind(&search.building)
    .bind(&search.building)
    .bind(&search.room)
    .bind(&search.room)
    .bind(search.lev1)
    .bind(search.lev1)
    .bind(search.lev2)
    .bind(search.lev2)
    .bind(search.dempf)
    .bind(search.dempf)
    .bind(&search.earthquake_type)
    .bind(&search.earthquake_type)
    .bind(&search.calc_type)
    .bind(&search.calc_type)
    .bind(&search.set_type)
    .bind(&search.set_type)
    .fetch_optional(pool)
    .await?;
    Ok(set_id)
}

pub async fn set_exists(pool: &SqlitePool, set_id: i64) -> ApiResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM SRTN_ACCEL_SET WHERE ACCEL_SET_ID = ?")
            .bind(set_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Soft clear: detach the X/Y/Z plot references without deleting the plot
/// or point rows. Reversible by re-assignment. A missing set is reported,
/// not silently ignored.
pub async fn clear_axes(tx: &mut Transaction<'_, Sqlite>, set_id: i64) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE SRTN_ACCEL_SET SET X_PLOT_ID = NULL, Y_PLOT_ID = NULL, Z_PLOT_ID = NULL \
         WHERE ACCEL_SET_ID = ?",
    )
    .bind(set_id)
    .execute(&mut **tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "Acceleration set {set_id} not found"
        )));
    }
    Ok(())
}

/// Distinct damping factors available for an element's plant/unit/building
/// under one earthquake scenario and calculation type.
pub async fn distinct_damping(
    pool: &SqlitePool,
    loc: &ElementLocation,
    earthquake_type: &str,
    calc_type: &str,
) -> ApiResult<Vec<f64>> {
    let factors: Vec<f64> = sqlx::query_scalar(
        "SELECT DISTINCT DEMPF FROM SRTN_ACCEL_SET \
         WHERE ((? IS NULL AND PLANT_ID IS NULL) OR PLANT_ID = ?) \
           AND ((? IS NULL AND UNIT_ID IS NULL) OR UNIT_ID = ?) \
           AND ((? IS NULL AND BUILDING IS NULL) OR BUILDING = ?) \
           AND SPECTR_EARTHQ_TYPE = ? \
           AND CALC_TYPE = ? \
           AND DEMPF IS NOT NULL \
         ORDER BY DEMPF",
    )
    .bind(loc.plant_id)
    .bind(loc.plant_id)
    .bind(loc.unit_id)
    .bind(loc.unit_id)
    .bind(&loc.building)
    .bind(&loc.building)
    .bind(earthquake_type)
    .bind(calc_type)
    .fetch_all(pool)
    .await?;
    Ok(factors)
}
