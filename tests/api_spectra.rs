//! Spectrum matching and retrieval API tests.
//!
//! Same in-process harness as the analysis tests: axum app over an
//! in-memory SQLite pool, driven with `tower::ServiceExt::oneshot()`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use seisqual::api::{build_router, AppState};
use seisqual::types::{CALC_TYPE_DETERMINISTIC, SET_TYPE_CHARACTERISTICS, SET_TYPE_REQUIREMENTS};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    seisqual::db::run_migrations(&pool).await.unwrap();
    pool
}

/// Element at plant 1 / unit 1 / building 10UBA / room А201, f_mu = 5 Hz.
async fn seed_element(pool: &SqlitePool) -> i64 {
    sqlx::query(
        "INSERT INTO SRTN_EK_SEISM_DATA \
         (IDEN, NAME, PLANT_ID, PLANT_NAME, UNIT_ID, UNIT_NAME, BUILDING, ROOM, LEV, F_MU) \
         VALUES ('10KBA10AA001', 'Засувка', 1, 'ЮУАЕС', 1, 'Енергоблок 1', '10UBA', 'А201', '12.0', 5.0)",
    )
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Percent-encode a query value (the Cyrillic domain tags are not valid
/// URI characters as-is).
fn enc(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Ingest one МРЗ sheet at the seeded element's location. Frequencies are
/// deliberately out of order; retrieval must sort them.
async fn ingest_mrz_sheet(app: &Router, set_type: &str, dempf: f64) -> Value {
    let (status, body) = post(
        app,
        "/api/save-accel-data",
        json!({
            "plant_id": 1, "plant_name": "ЮУАЕС",
            "unit_id": 1, "unit_name": "Енергоблок 1",
            "building": "10UBA", "room": "А201", "lev": "12.0",
            "set_type": set_type,
            "calc_type": CALC_TYPE_DETERMINISTIC,
            "pga": 0.12,
            "sheets": [{
                "dempf": dempf,
                "frequency": [10.0, 1.0, 5.0],
                "mrz_x": [30.0, 10.0, 20.0]
            }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn spectral_data_uri(ek_id: i64, spectrum_type: &str) -> String {
    format!(
        "/api/spectral-data?ek_id={ek_id}&calc_type={}&spectrum_type={}",
        enc(CALC_TYPE_DETERMINISTIC),
        enc(spectrum_type)
    )
}

#[tokio::test]
async fn test_spectral_data_missing_element_vs_missing_set() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    // Unknown element is a hard 404
    let (status, body) = get(&app, &spectral_data_uri(777, "МРЗ")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Element with EK_ID 777 not found");

    // Known element with no matching set is "no data yet", not an error
    let (status, body) = get(&app, &spectral_data_uri(ek_id, "МРЗ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frequency"], json!([]));
}

#[tokio::test]
async fn test_spectral_data_rejects_unknown_spectrum_type() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    let (status, _) = get(&app, &spectral_data_uri(ek_id, "SSE")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingested_curve_round_trips_sorted_by_frequency() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    let created = ingest_mrz_sheet(&app, SET_TYPE_CHARACTERISTICS, 2.0).await;
    assert!(created["mrz_set_id"].is_i64());
    assert!(created["pz_set_id"].is_null());
    assert_eq!(created["created"]["points"], 3);

    let (status, body) = get(&app, &spectral_data_uri(ek_id, "МРЗ")).await;
    assert_eq!(status, StatusCode::OK);
    // Points were fed as (10,30), (1,10), (5,20); retrieval orders by FREQ
    assert_eq!(body["frequency"], json!([1.0, 5.0, 10.0]));
    assert_eq!(body["mrz_x"], json!([10.0, 20.0, 30.0]));
    // Axes without a plot are explicit nulls; the other scenario's keys are absent
    assert_eq!(body["mrz_y"], Value::Null);
    assert!(body.get("pz_x").is_none());
}

#[tokio::test]
async fn test_requirements_set_is_invisible_to_spectral_data() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    // A requirements set at the same location must not satisfy a
    // characteristics lookup
    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;
    let (status, body) = get(&app, &spectral_data_uri(ek_id, "МРЗ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frequency"], json!([]));
}

#[tokio::test]
async fn test_seism_requirements_single_point_at_natural_frequency() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;

    let uri = format!(
        "/api/seism-requirements?ek_id={ek_id}&dempf=2.0&spectr_earthq_type={}&calc_type={}",
        enc("МРЗ"),
        enc(CALC_TYPE_DETERMINISTIC)
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    // The element's own natural frequency (5 Hz) selects one value per axis
    assert_eq!(body["frequency"], json!([5.0]));
    assert_eq!(body["mrz_x"], json!([20.0]));
    assert_eq!(body["mrz_y"], Value::Null);
    assert_eq!(body["pga"], 0.12);

    // A damping factor with no stored set yields an empty result
    let uri = format!(
        "/api/seism-requirements?ek_id={ek_id}&dempf=4.0&spectr_earthq_type={}&calc_type={}",
        enc("МРЗ"),
        enc(CALC_TYPE_DETERMINISTIC)
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frequency"], json!([]));
}

#[tokio::test]
async fn test_find_req_accel_set_prefers_most_recent_match() {
    let pool = test_pool().await;
    seed_element(&pool).await;
    seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    let first = ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;
    let second = ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;
    let first_id = first["mrz_set_id"].as_i64().unwrap();
    let second_id = second["mrz_set_id"].as_i64().unwrap();
    assert!(second_id > first_id);

    let search = json!({
        "plant_id": 1, "unit_id": 1, "building": "10UBA", "room": "А201",
        "earthq_type": "МРЗ",
        "calc_type": CALC_TYPE_DETERMINISTIC,
        "set_type": SET_TYPE_REQUIREMENTS,
        "dempf": 2.0
    });
    let (status, body) = post(&app, "/api/find-req-accel-set", search).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set_id"], second_id);
    // Blast radius: both elements registered at the location are counted
    assert_eq!(body["found_ek"], 2);
}

#[tokio::test]
async fn test_find_req_accel_set_null_matches_only_null() {
    let pool = test_pool().await;
    seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;

    // Stored room is 'А201'; a null room in the search must not match it
    let search = json!({
        "plant_id": 1, "unit_id": 1, "building": "10UBA",
        "earthq_type": "МРЗ",
        "calc_type": CALC_TYPE_DETERMINISTIC,
        "set_type": SET_TYPE_REQUIREMENTS,
        "dempf": 2.0
    });
    let (status, body) = post(&app, "/api/find-req-accel-set", search).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set_id"], Value::Null);
    assert_eq!(body["found_ek"], 1);
}

#[tokio::test]
async fn test_clear_accel_set_arrays_is_a_soft_clear() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool.clone() });

    let created = ingest_mrz_sheet(&app, SET_TYPE_CHARACTERISTICS, 2.0).await;
    let set_id = created["mrz_set_id"].as_i64().unwrap();

    let (status, body) = post(
        &app,
        "/api/clear-accel-set-arrays",
        json!({"set_id": set_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clear_result"], "success");

    // The set still matches but carries no curves any more
    let (status, body) = get(&app, &spectral_data_uri(ek_id, "МРЗ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frequency"], json!([]));
    assert_eq!(body["mrz_x"], Value::Null);

    // Point rows survive the clear: only the set's references were dropped
    let points: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM SRTN_ACCEL_POINT")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(points, 3);
}

#[tokio::test]
async fn test_clear_accel_set_arrays_unknown_set() {
    let pool = test_pool().await;
    let app = build_router(AppState { db: pool });

    let (status, body) = post(&app, "/api/clear-accel-set-arrays", json!({"set_id": 555})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Acceleration set 555 not found");
}

#[tokio::test]
async fn test_save_accel_data_rejects_empty_sheets() {
    let pool = test_pool().await;
    let app = build_router(AppState { db: pool });

    let (status, _) = post(
        &app,
        "/api/save-accel-data",
        json!({
            "set_type": SET_TYPE_CHARACTERISTICS,
            "calc_type": CALC_TYPE_DETERMINISTIC,
            "sheets": []
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_damping_factors_are_distinct_and_sorted() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 4.0).await;
    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;
    ingest_mrz_sheet(&app, SET_TYPE_REQUIREMENTS, 2.0).await;

    let uri = format!(
        "/api/damping-factors?ek_id={ek_id}&spectr_earthq_type={}&calc_type={}",
        enc("МРЗ"),
        enc(CALC_TYPE_DETERMINISTIC)
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["damping_factors"], json!([2.0, 4.0]));
}
