//! Workbook reader: a worksheet → [`Table`].

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use serde::Serialize;
use tracing::debug;

use crate::core::columns::index_to_letter;
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, Row, Table};

/// Whether the first sheet row carries column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Every row is data; columns are named A, B, C, …
    #[default]
    None,
    /// The first row supplies column names.
    FirstRow,
}

/// Header names and letters of a sheet, for column pickers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub headers: Vec<String>,
    pub columns: Vec<String>,
}

/// Excel reader for xlsx/xlsm/xls/ods workbooks
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> SheetResult<calamine::Sheets<std::io::BufReader<std::fs::File>>> {
        open_workbook_auto(&self.path)
            .map_err(|e| SheetError::Import(format!("无法打开 {}: {}", self.path.display(), e)))
    }

    /// All worksheet names, in workbook order.
    pub fn sheet_names(&self) -> SheetResult<Vec<String>> {
        let workbook = self.open()?;
        let names = workbook.sheet_names().to_vec();
        if names.is_empty() {
            return Err(SheetError::Import("文件中没有工作表".to_string()));
        }
        Ok(names)
    }

    fn range(&self, sheet: &str) -> SheetResult<Range<Data>> {
        let mut workbook = self.open()?;
        workbook
            .worksheet_range(sheet)
            .map_err(|e| SheetError::Import(format!("读取工作表 '{}' 失败: {}", sheet, e)))
    }

    /// Read one worksheet as a table.
    pub fn read_table(&self, sheet: &str, header: HeaderMode) -> SheetResult<Table> {
        let range = self.range(sheet)?;
        let mut rows = Self::rows_of(&range);
        debug!(
            path = %self.path.display(),
            sheet,
            rows = rows.len(),
            "read worksheet"
        );

        match header {
            HeaderMode::None => Table::from_rows(sheet, rows),
            HeaderMode::FirstRow => {
                if rows.is_empty() {
                    return Table::with_header(sheet, Vec::new(), Vec::new());
                }
                let header_row = rows.remove(0);
                let names = header_row
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| Self::header_name(idx, cell))
                    .collect();
                Table::with_header(sheet, names, rows)
            }
        }
    }

    /// First-row headers and the matching column letters.
    pub fn column_info(&self, sheet: &str) -> SheetResult<ColumnInfo> {
        let range = self.range(sheet)?;
        let rows = Self::rows_of(&range);
        let headers: Vec<String> = rows
            .first()
            .map(|r| r.iter().map(|c| c.display().trim().to_string()).collect())
            .unwrap_or_default();
        let columns = (0..headers.len()).map(index_to_letter).collect();
        Ok(ColumnInfo { headers, columns })
    }

    /// Rows of the used range, left-padded so index 0 is always column A.
    fn rows_of(range: &Range<Data>) -> Vec<Row> {
        let offset = range.start().map_or(0, |(_, col)| col as usize);
        range
            .rows()
            .map(|cells| {
                std::iter::repeat(CellValue::Empty)
                    .take(offset)
                    .chain(cells.iter().map(Self::convert_cell))
                    .collect()
            })
            .collect()
    }

    fn header_name(idx: usize, cell: &CellValue) -> String {
        match cell {
            CellValue::Empty => format!("Unnamed: {}", idx),
            other => other.display(),
        }
    }

    /// Convert a calamine cell. Booleans become text, errors become empty,
    /// dates keep their serial number.
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) | Data::Empty => CellValue::Empty,
        }
    }
}
