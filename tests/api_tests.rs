//! API integration tests
//! Requests go through the full router with `tower::ServiceExt::oneshot`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sheetwise::api::{build_router, AppState};
use sheetwise::config::Settings;
use sheetwise::excel::ExcelExporter;
use sheetwise::types::{CellValue, Table};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let settings = Settings {
        result_dir: dir.path().join("results"),
        ..Settings::default()
    };
    build_router(Arc::new(AppState::new(settings)))
}

fn write_sheet(dir: &Path, name: &str, rows: Vec<Vec<CellValue>>) -> PathBuf {
    let path = dir.join(name);
    let table = Table::from_rows("Sheet1", rows).unwrap();
    ExcelExporter::new().write_table(&table, &path, false).unwrap();
    path
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(app(&dir), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["request_id"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn test_version_lists_features() {
    let dir = TempDir::new().unwrap();
    let (_, body) = get(app(&dir), "/version").await;
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    let features = body["data"]["features"].as_array().unwrap();
    assert!(features.contains(&json!("pivot")));
    assert!(features.contains(&json!("vlookup")));
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = TempDir::new().unwrap();
    let (_, body) = get(app(&dir), "/").await;
    assert_eq!(body["data"]["name"], "Sheetwise API Server");
    assert_eq!(body["data"]["endpoints"].as_array().unwrap().len(), 8);
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKBOOK INSPECTION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_sheets_and_columns() {
    let dir = TempDir::new().unwrap();
    let file = write_sheet(
        dir.path(),
        "data.xlsx",
        vec![vec!["name".into(), "qty".into()], vec!["a".into(), 2.into()]],
    );

    let (status, body) = post(app(&dir), "/api/v1/sheets", json!({ "file_path": file })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sheets"], json!(["Sheet1"]));

    let (_, body) = post(app(&dir), "/api/v1/columns", json!({ "file_path": file })).await;
    assert_eq!(body["data"]["headers"], json!(["name", "qty"]));
    assert_eq!(body["data"]["columns"], json!(["A", "B"]));

    let (_, body) = post(
        app(&dir),
        "/api/v1/column-type",
        json!({ "file_path": file, "column": "B" }),
    )
    .await;
    assert_eq!(body["data"]["kind"], "numeric");
    assert_eq!(body["data"]["is_numeric"], true);
}

#[tokio::test]
async fn test_disallowed_extension_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();

    let (status, body) = post(app(&dir), "/api/v1/sheets", json!({ "file_path": path })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("不支持的文件格式"));
    assert!(body.get("data").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// JOBS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_vlookup_partial_match() {
    let dir = TempDir::new().unwrap();
    let main = write_sheet(
        dir.path(),
        "main.xlsx",
        vec![
            vec!["A".into(), 1.into()],
            vec!["B".into(), 2.into()],
            vec!["A".into(), 3.into()],
        ],
    );
    let lookup = write_sheet(dir.path(), "lookup.xlsx", vec![vec!["A".into(), "x".into()]]);

    let (status, body) = post(
        app(&dir),
        "/api/v1/vlookup",
        json!({
            "main_file": main,
            "lookup_file": lookup,
            "main_columns": ["A"],
            "lookup_match_columns": ["A"],
            "return_columns": ["B"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["match_report"]["matched"], 2);
    assert_eq!(body["data"]["match_report"]["unmatched_examples"], json!(["B"]));
    assert!(body["data"]["message"].as_str().unwrap().contains("66.7%"));
    let output = body["data"]["output_path"].as_str().unwrap();
    assert!(Path::new(output).starts_with(dir.path().join("results")));
    assert!(Path::new(output).exists());
}

#[tokio::test]
async fn test_vlookup_no_match_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let main = write_sheet(dir.path(), "main.xlsx", vec![vec!["A".into()]]);
    let lookup = write_sheet(dir.path(), "lookup.xlsx", vec![vec!["Z".into(), "x".into()]]);

    let (status, body) = post(
        app(&dir),
        "/api/v1/vlookup",
        json!({
            "main_file": main,
            "lookup_file": lookup,
            "main_columns": ["A"],
            "lookup_match_columns": ["A"],
            "return_columns": ["B"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "未找到任何匹配的数据，请检查匹配条件是否正确");
}

#[tokio::test]
async fn test_pivot_job() {
    let dir = TempDir::new().unwrap();
    let file = write_sheet(
        dir.path(),
        "sales.xlsx",
        vec![
            vec!["region".into(), "amount".into()],
            vec!["East".into(), 10.into()],
            vec!["East".into(), 20.into()],
            vec!["West".into(), 5.into()],
        ],
    );
    let output = dir.path().join("pivot.xlsx");

    let (status, body) = post(
        app(&dir),
        "/api/v1/pivot",
        json!({
            "file": file,
            "rows": ["A"],
            "values": [{ "column": "B", "aggfunc": "sum" }],
            "output": output
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows"], 3);
    assert!(body["data"].get("match_report").is_none());
    assert!(output.exists());
}

#[tokio::test]
async fn test_pivot_unsupported_aggregation() {
    let dir = TempDir::new().unwrap();
    let file = write_sheet(
        dir.path(),
        "sales.xlsx",
        vec![vec!["region".into(), "rep".into()], vec!["East".into(), "ann".into()]],
    );

    let (status, body) = post(
        app(&dir),
        "/api/v1/pivot",
        json!({ "file": file, "rows": ["A"], "values": [{ "column": "B", "aggfunc": "mean" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "列 'rep' 是非数值类型，只支持计数操作");
}

#[tokio::test]
async fn test_concatenate_job() {
    let dir = TempDir::new().unwrap();
    let file = write_sheet(
        dir.path(),
        "people.xlsx",
        vec![vec!["Li".into(), "Wei".into()], vec!["Zhang".into(), "San".into()]],
    );

    let (status, body) = post(
        app(&dir),
        "/api/v1/concatenate",
        json!({
            "file": file,
            "parts": [
                { "column": "A", "separator": "-" },
                { "column": "B" }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows"], 2);
    assert_eq!(body["data"]["message"], "列合并完成");
}
