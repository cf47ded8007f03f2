//! Load-change analysis API tests: validated, idempotent persistence of
//! the precomputed pressure/temperature parameter set.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use seisqual::api::{build_router, AppState};
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

async fn seed_element(pool: &SqlitePool) -> i64 {
    sqlx::query(
        "INSERT INTO SRTN_EK_SEISM_DATA (IDEN, NAME, PLANT_ID, UNIT_ID, BUILDING) \
         VALUES ('20KBA10AA002', 'Клапан', 1, 1, '20UBA')",
    )
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
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

#[tokio::test]
async fn test_save_and_read_back_parameters() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    let (status, body) = post(
        &app,
        "/api/save-load-analysis-params",
        json!({
            "element_id": ek_id,
            "material": "Сталь 20",
            "doc_code_analytics": "РД-123",
            "p1_pz": 10.0, "p2_pz": 12.5,
            "ratio_p_pz": 1.25,
            "m1_alt_mrz": 2.1, "k1_alt_mrz": 1.4
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    // updated_fields holds exactly the supplied fields, column-keyed
    assert_eq!(
        body["updated_fields"],
        json!({
            "MAT_NAME": "Сталь 20",
            "DOC_1": "РД-123",
            "P1_PZ": 10.0, "P2_PZ": 12.5,
            "RATIO_P_PZ": 1.25,
            "M1_ALT_MRZ": 2.1, "K1_ALT_MRZ": 1.4
        })
    );

    let (status, body) = get(&app, &format!("/api/get-load-analysis-params/{ek_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["MAT_NAME"], "Сталь 20");
    assert_eq!(body["data"]["RATIO_P_PZ"], 1.25);
    // Never-written parameters are omitted from the readback
    assert!(body["data"].get("TEMP1_PZ").is_none());
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    let params = json!({"element_id": ek_id, "ratio_p_mrz": 1.1, "delta_t_mrz": 15.0});
    let (_, first) = post(&app, "/api/save-load-analysis-params", params.clone()).await;
    let (_, second) = post(&app, "/api/save-load-analysis-params", params).await;
    assert_eq!(first["updated_fields"], second["updated_fields"]);

    let (_, body) = get(&app, &format!("/api/get-load-analysis-params/{ek_id}")).await;
    assert_eq!(body["data"]["RATIO_P_MRZ"], 1.1);
    assert_eq!(body["data"]["DELTA_T_MRZ"], 15.0);
}

#[tokio::test]
async fn test_preconditions() {
    let pool = test_pool().await;
    let ek_id = seed_element(&pool).await;
    let app = build_router(AppState { db: pool });

    // Unknown element: 404 before any write
    let (status, body) = post(
        &app,
        "/api/save-load-analysis-params",
        json!({"element_id": 9001, "p1_pz": 1.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Element with EK_ID 9001 not found");

    // Zero usable fields: 400, distinct from not-found
    let (status, body) = post(
        &app,
        "/api/save-load-analysis-params",
        json!({"element_id": ek_id}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "At least one load analysis parameter must be provided"
    );

    let (status, _) = get(&app, "/api/get-load-analysis-params/9001").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
