//! API request handlers
//!
//! Engine work reads and writes workbooks, so every operation runs on the
//! blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::Settings;
use crate::core::columns::ColumnRef;
use crate::core::pivot::ColumnKind;
use crate::error::SheetResult;
use crate::excel::ColumnInfo;
use crate::service::{self, ConcatJob, JobReport, PivotJob, VlookupJob};

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

/// Run `job` on the blocking pool. Engine errors are the caller's fault (400);
/// a panicked task is ours (500).
async fn run_blocking<T, F>(state: Arc<AppState>, job: F) -> Reply<T>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Settings) -> SheetResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || job(&state.settings)).await {
        Ok(Ok(data)) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Ok(Err(e)) => {
            warn!(error = %e, "request failed");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err(format!("处理请求时出错: {}", e))),
        ),
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Sheetwise API Server".to_string(),
        version: state.version.clone(),
        description: "Spreadsheet lookup, pivot and concatenation service".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("POST", "/api/v1/sheets", "List worksheets of a workbook"),
            EndpointInfo::new("POST", "/api/v1/columns", "Headers and letters of a worksheet"),
            EndpointInfo::new("POST", "/api/v1/column-type", "Check whether a column is numeric"),
            EndpointInfo::new("POST", "/api/v1/vlookup", "Composite-key lookup between two sheets"),
            EndpointInfo::new("POST", "/api/v1/pivot", "Pivot aggregation with styled output"),
            EndpointInfo::new("POST", "/api/v1/concatenate", "Join columns into a new column"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["sheets", "columns", "column-type", "vlookup", "pivot", "concatenate"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }))
}

#[derive(Deserialize)]
pub struct SheetsRequest {
    pub file_path: PathBuf,
}

#[derive(Serialize)]
pub struct SheetsResponse {
    pub sheets: Vec<String>,
}

/// POST /api/v1/sheets
pub async fn sheets(State(state): State<Arc<AppState>>, Json(req): Json<SheetsRequest>) -> Reply<SheetsResponse> {
    run_blocking(state, move |settings| {
        let sheets = service::list_sheets(settings, &req.file_path)?;
        Ok(SheetsResponse { sheets })
    })
    .await
}

#[derive(Deserialize)]
pub struct ColumnsRequest {
    pub file_path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
}

/// POST /api/v1/columns
pub async fn columns(State(state): State<Arc<AppState>>, Json(req): Json<ColumnsRequest>) -> Reply<ColumnInfo> {
    run_blocking(state, move |settings| {
        service::column_info(settings, &req.file_path, req.sheet.as_deref())
    })
    .await
}

#[derive(Deserialize)]
pub struct ColumnTypeRequest {
    pub file_path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    pub column: ColumnRef,
}

#[derive(Serialize)]
pub struct ColumnTypeResponse {
    pub column: String,
    pub kind: ColumnKind,
    pub is_numeric: bool,
}

/// POST /api/v1/column-type
pub async fn column_type(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ColumnTypeRequest>,
) -> Reply<ColumnTypeResponse> {
    run_blocking(state, move |settings| {
        let kind = service::probe_column(settings, &req.file_path, req.sheet.as_deref(), &req.column)?;
        Ok(ColumnTypeResponse {
            column: req.column.to_string(),
            kind,
            is_numeric: kind == ColumnKind::Numeric,
        })
    })
    .await
}

/// POST /api/v1/vlookup
pub async fn vlookup(State(state): State<Arc<AppState>>, Json(job): Json<VlookupJob>) -> Reply<JobReport> {
    run_blocking(state, move |settings| service::run_vlookup(settings, &job)).await
}

/// POST /api/v1/pivot
pub async fn pivot(State(state): State<Arc<AppState>>, Json(job): Json<PivotJob>) -> Reply<JobReport> {
    run_blocking(state, move |settings| service::run_pivot(settings, &job)).await
}

/// POST /api/v1/concatenate
pub async fn concatenate(State(state): State<Arc<AppState>>, Json(job): Json<ConcatJob>) -> Reply<JobReport> {
    run_blocking(state, move |settings| service::run_concatenate(settings, &job)).await
}
