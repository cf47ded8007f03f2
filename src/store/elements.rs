//! Reads and writes on the equipment seismic-data table.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{ApiError, ApiResult};
use crate::margin::fields::{ColumnWrite, FieldValue};
use crate::margin::StressState;

/// Location attributes used to resolve spectra for an element, plus the
/// characteristic natural frequency used by single-point lookups.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ElementLocation {
    pub plant_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub lev: Option<String>,
    pub f_mu: Option<f64>,
}

pub async fn exists(pool: &SqlitePool, ek_id: i64) -> ApiResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?")
            .bind(ek_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Existence precondition, checked before any mutation.
pub async fn require(pool: &SqlitePool, ek_id: i64) -> ApiResult<()> {
    if exists(pool, ek_id).await? {
        Ok(())
    } else {
        Err(ApiError::element_not_found(ek_id))
    }
}

pub async fn location(pool: &SqlitePool, ek_id: i64) -> ApiResult<ElementLocation> {
    sqlx::query_as(
        "SELECT PLANT_ID AS plant_id, UNIT_ID AS unit_id, BUILDING AS building, \
                ROOM AS room, LEV AS lev, F_MU AS f_mu \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(ek_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::element_not_found(ek_id))
}

/// The ten sigma-alt formula inputs for one element.
pub async fn stress_state(pool: &SqlitePool, ek_id: i64) -> ApiResult<StressState> {
    sqlx::query_as(
        "SELECT SIGMA_S_1_PZ AS sigma_s_1_pz, SIGMA_S_2_PZ AS sigma_s_2_pz, \
                SIGMA_S_S1_PZ AS sigma_s_s1_pz, SIGMA_S_S2_PZ AS sigma_s_s2_pz, \
                M1_PZ AS m1_pz, \
                SIGMA_S_1_MRZ AS sigma_s_1_mrz, SIGMA_S_2_MRZ AS sigma_s_2_mrz, \
                SIGMA_S_S1_MRZ AS sigma_s_s1_mrz, SIGMA_S_S2_MRZ AS sigma_s_s2_mrz, \
                M1_MRZ AS m1_mrz \
         FROM SRTN_EK_SEISM_DATA WHERE EK_ID = ?",
    )
    .bind(ek_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::element_not_found(ek_id))
}

/// Apply column writes as one UPDATE inside the caller's transaction.
/// Column names come from compile-time mapping tables; only values are
/// bound. Zero affected rows is a not-found failure, which rolls the
/// surrounding transaction back.
pub async fn update_columns(
    tx: &mut Transaction<'_, Sqlite>,
    ek_id: i64,
    writes: &[ColumnWrite],
) -> ApiResult<()> {
    let set_clause = writes
        .iter()
        .map(|w| format!("{} = ?", w.column))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE SRTN_EK_SEISM_DATA SET {set_clause} WHERE EK_ID = ?");

    let mut query = sqlx::query(&sql);
    for write in writes {
        query = match &write.value {
            Some(FieldValue::Number(v)) => query.bind(*v),
            Some(FieldValue::Text(s)) => query.bind(s.clone()),
            None => query.bind(Option::<f64>::None),
        };
    }

    let result = query.bind(ek_id).execute(&mut **tx).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "No rows updated for EK_ID {ek_id}"
        )));
    }
    Ok(())
}

/// Number of equipment elements registered at a plant/unit/building —
/// the blast radius a caller should warn about before overwriting spectra.
pub async fn count_at_location(
    pool: &SqlitePool,
    plant_id: Option<i64>,
    unit_id: Option<i64>,
    building: Option<&str>,
) -> ApiResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM SRTN_EK_SEISM_DATA \
         WHERE ((? IS NULL AND PLANT_ID IS NULL) OR PLANT_ID = ?) \
           AND ((? IS NULL AND UNIT_ID IS NULL) OR UNIT_ID = ?) \
           AND ((? IS NULL AND BUILDING IS NULL) OR BUILDING = ?)",
    )
    .bind(plant_id)
    .bind(plant_id)
    .bind(unit_id)
    .bind(unit_id)
    .bind(building)
    .bind(building)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
