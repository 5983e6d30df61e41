//! File-level operations shared by the CLI and the HTTP API.
//!
//! Each job names its input workbook(s) and sheet(s), runs one engine, and
//! writes the result workbook. Validation against [`Settings`] happens before
//! any engine work.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Settings;
use crate::core::columns::{ColumnRef, TableRole};
use crate::core::concatenate::{concatenate, ConcatPart};
use crate::core::lookup::{lookup, LookupRequest, MatchReport};
use crate::core::pivot::{column_kind, pivot, ColumnKind, PivotRequest};
use crate::error::{SheetError, SheetResult};
use crate::excel::{ColumnInfo, ExcelExporter, ExcelImporter, HeaderMode};
use crate::types::Table;

/// Main workbook joined against a lookup workbook (possibly the same file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlookupJob {
    pub main_file: PathBuf,
    #[serde(default)]
    pub main_sheet: Option<String>,
    pub lookup_file: PathBuf,
    #[serde(default)]
    pub lookup_sheet: Option<String>,
    #[serde(flatten)]
    pub request: LookupRequest,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotJob {
    pub file: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(flatten)]
    pub request: PivotRequest,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatJob {
    pub file: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    pub parts: Vec<ConcatPart>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// What a finished job reports back.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub message: String,
    pub output_path: PathBuf,
    /// Body rows written (pivot: groups plus the totals row).
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_report: Option<MatchReport>,
}

/// Names of the worksheets in `path`.
pub fn list_sheets(settings: &Settings, path: &Path) -> SheetResult<Vec<String>> {
    settings.check_file(path)?;
    ExcelImporter::new(path).sheet_names()
}

/// First-row headers and letters of one sheet.
pub fn column_info(settings: &Settings, path: &Path, sheet: Option<&str>) -> SheetResult<ColumnInfo> {
    settings.check_file(path)?;
    let importer = ExcelImporter::new(path);
    let sheet = resolve_sheet(&importer, sheet)?;
    importer.column_info(&sheet)
}

/// Whether a column (of a sheet with a header row) is numeric.
pub fn probe_column(settings: &Settings, path: &Path, sheet: Option<&str>, column: &ColumnRef) -> SheetResult<ColumnKind> {
    let table = load(settings, path, sheet, HeaderMode::FirstRow)?;
    let idx = column.resolve(&table, TableRole::Source)?;
    Ok(column_kind(&table, idx))
}

pub fn run_vlookup(settings: &Settings, job: &VlookupJob) -> SheetResult<JobReport> {
    let main = load(settings, &job.main_file, job.main_sheet.as_deref(), HeaderMode::None)?;
    let lookup_table = if job.lookup_file == job.main_file && job.lookup_sheet == job.main_sheet {
        main.clone()
    } else {
        load(settings, &job.lookup_file, job.lookup_sheet.as_deref(), HeaderMode::None)?
    };

    let outcome = lookup(&main, &lookup_table, &job.request)?;
    let report = &outcome.report;
    if report.matched < report.total {
        warn!(
            unmatched = report.total - report.matched,
            examples = ?report.unmatched_examples,
            "lookup left rows unmatched"
        );
    }

    let output_path = output_path(settings, job.output.as_deref(), "vlookup_result")?;
    ExcelExporter::new().write_table(&outcome.table, &output_path, false)?;
    info!(
        total = report.total,
        matched = report.matched,
        output = %output_path.display(),
        "vlookup finished"
    );

    Ok(JobReport {
        message: outcome.summary(),
        output_path,
        rows: outcome.table.row_count(),
        match_report: Some(outcome.report),
    })
}

pub fn run_pivot(settings: &Settings, job: &PivotJob) -> SheetResult<JobReport> {
    let table = load(settings, &job.file, job.sheet.as_deref(), HeaderMode::FirstRow)?;
    let outcome = pivot(&table, &job.request, &settings.totals_label)?;

    let output_path = output_path(settings, job.output.as_deref(), "pivot_result")?;
    ExcelExporter::new().write_pivot(&outcome, &output_path)?;
    info!(
        groups = outcome.table.row_count().saturating_sub(1),
        values = outcome.columns.len(),
        output = %output_path.display(),
        "pivot finished"
    );

    Ok(JobReport {
        message: "数据透视表生成成功".to_string(),
        output_path,
        rows: outcome.table.row_count(),
        match_report: None,
    })
}

pub fn run_concatenate(settings: &Settings, job: &ConcatJob) -> SheetResult<JobReport> {
    if job.parts.is_empty() {
        return Err(SheetError::Config("请至少选择一个要合并的列".to_string()));
    }
    let table = load(settings, &job.file, job.sheet.as_deref(), HeaderMode::None)?;
    let result = concatenate(&table, &job.parts)?;

    let output_path = output_path(settings, job.output.as_deref(), "concat_result")?;
    ExcelExporter::new().write_table(&result, &output_path, false)?;
    info!(rows = result.row_count(), output = %output_path.display(), "concatenate finished");

    Ok(JobReport {
        message: "列合并完成".to_string(),
        output_path,
        rows: result.row_count(),
        match_report: None,
    })
}

fn resolve_sheet(importer: &ExcelImporter, sheet: Option<&str>) -> SheetResult<String> {
    let names = importer.sheet_names()?;
    match sheet {
        Some(name) if names.iter().any(|n| n == name) => Ok(name.to_string()),
        Some(name) => Err(SheetError::Import(format!("找不到工作表 '{}'", name))),
        None => names
            .into_iter()
            .next()
            .ok_or_else(|| SheetError::Import("文件中没有工作表".to_string())),
    }
}

fn load(settings: &Settings, path: &Path, sheet: Option<&str>, header: HeaderMode) -> SheetResult<Table> {
    settings.check_file(path)?;
    let importer = ExcelImporter::new(path);
    let sheet = resolve_sheet(&importer, sheet)?;
    let table = importer.read_table(&sheet, header)?;
    settings.check_rows(&table)?;
    Ok(table)
}

fn output_path(settings: &Settings, requested: Option<&Path>, prefix: &str) -> SheetResult<PathBuf> {
    match requested {
        Some(path) => Ok(path.to_path_buf()),
        None => settings.result_path(prefix),
    }
}
