//! Integration tests for the web target endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use forestview_types::{LandView, ProcessKind, ProcessView, SummaryView, ViewState};
use forestview_web::router::build_router;
use forestview_web::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn process(id: &str, kind: ProcessKind, progress: f64) -> ProcessView {
    ProcessView {
        id: id.to_owned(),
        name: format!("{id}-worker"),
        kind,
        ram_allocated: 1_000_000_000,
        progress,
    }
}

fn three_lands() -> ViewState {
    let gb = 1_000_000_000;
    ViewState {
        lands: vec![
            LandView {
                id: "land-a".to_owned(),
                hostname: "alpha".to_owned(),
                ram_total: 16 * gb,
                ram_allocated: 8 * gb,
                trees: vec![process("tree-1", ProcessKind::Tree, 0.25)],
                nims: vec![process("nim-1", ProcessKind::Nim, 1.0)],
                ..LandView::default()
            },
            LandView {
                id: "land-b".to_owned(),
                hostname: "beta".to_owned(),
                ram_total: 32 * gb,
                ram_allocated: 12 * gb,
                is_manaland: true,
                treehouses: vec![process("th-1", ProcessKind::Treehouse, 0.5)],
                ..LandView::default()
            },
            LandView {
                id: "land-c".to_owned(),
                hostname: "gamma".to_owned(),
                ram_total: 8 * gb,
                ram_allocated: 3 * gb,
                ..LandView::default()
            },
        ],
        summary: SummaryView {
            total_lands: 3,
            total_manalands: 1,
            total_trees: 1,
            total_treehouses: 1,
            total_nims: 1,
            total_ram: 56 * gb,
            allocated_ram: 23 * gb,
        },
    }
}

async fn populated_state() -> Arc<AppState> {
    let state = Arc::new(AppState::new());
    state.publish(Arc::new(three_lands())).await;
    state
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_viewmodel_before_first_update_is_empty() {
    let router = build_router(Arc::new(AppState::new()), None);

    let response = router
        .oneshot(Request::get("/api/viewmodel").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["lands"].as_array().unwrap().len(), 0);
    assert_eq!(json["summary"]["land_count"], 0);
    assert_eq!(json["summary"]["occupancy"], 0.0);
}

#[tokio::test]
async fn test_viewmodel_serves_wire_document() {
    let router = build_router(populated_state().await, None);

    let response = router
        .oneshot(Request::get("/api/viewmodel").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("application/json"));
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );

    let json = body_to_json(response.into_body()).await;
    let lands = json["lands"].as_array().unwrap();
    assert_eq!(lands.len(), 3);
    assert_eq!(lands[0]["hostname"], "alpha");
    assert_eq!(lands[0]["trees"][0]["type"], "tree");
    assert_eq!(lands[0]["nims"][0]["type"], "nim");
    assert_eq!(lands[1]["treehouses"][0]["type"], "treehouse");
    assert_eq!(lands[1]["is_manaland"], true);

    let summary = &json["summary"];
    assert_eq!(summary["land_count"], 3);
    assert_eq!(summary["manaland_count"], 1);
    let occupancy = summary["occupancy"].as_f64().unwrap();
    assert!((occupancy - 23.0 / 56.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_viewmodel_lays_out_lands_on_grid() {
    let router = build_router(populated_state().await, None);

    let response = router
        .oneshot(Request::get("/api/viewmodel").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    let lands = json["lands"].as_array().unwrap();
    // Three lands -> 2x2 grid; lands after the first fill row-major.
    assert_eq!(lands[0]["grid_x"], 0);
    assert_eq!(lands[0]["grid_y"], 0);
    assert_eq!(lands[1]["grid_x"], 1);
    assert_eq!(lands[1]["grid_y"], 0);
    assert_eq!(lands[2]["grid_x"], 0);
    assert_eq!(lands[2]["grid_y"], 1);
}

#[tokio::test]
async fn test_health() {
    let router = build_router(Arc::new(AppState::new()), None);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "ok");
}

#[tokio::test]
async fn test_index_returns_status_page() {
    let router = build_router(populated_state().await, None);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));

    let html = body_to_string(response.into_body()).await;
    assert!(html.contains("<strong>Lands:</strong> 3"));
    assert!(html.contains("/api/viewmodel"));
}

#[tokio::test]
async fn test_unknown_path_without_assets_is_404() {
    let router = build_router(Arc::new(AppState::new()), None);

    let response = router
        .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir_serves_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>client</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('forest');").unwrap();

    let router = build_router(populated_state().await, Some(dir.path()));

    let response = router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "<html>client</html>");

    let response = router
        .clone()
        .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // API routes still win over the asset directory.
    let response = router
        .oneshot(Request::get("/api/viewmodel").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["summary"]["land_count"], 3);
}
