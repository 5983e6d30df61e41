//! Workbook writer: tables and styled pivot results → .xlsx

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use crate::core::pivot::PivotOutcome;
use crate::core::presentation::{Align, CellStyle, Layout};
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, Table};

/// Excel writer for engine results
pub struct ExcelExporter {
    sheet_name: Option<String>,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcelExporter {
    /// Writer using the workbook's default sheet name.
    pub fn new() -> Self {
        Self { sheet_name: None }
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    fn new_sheet<'a>(&self, workbook: &'a mut Workbook) -> SheetResult<&'a mut Worksheet> {
        let worksheet = workbook.add_worksheet();
        if let Some(name) = &self.sheet_name {
            worksheet
                .set_name(name)
                .map_err(|e| SheetError::Export(format!("Failed to set worksheet name: {}", e)))?;
        }
        Ok(worksheet)
    }

    fn save(workbook: &mut Workbook, output_path: &Path) -> SheetResult<()> {
        workbook
            .save(output_path)
            .map_err(|e| SheetError::Export(format!("Failed to save Excel file: {}", e)))?;
        debug!(path = %output_path.display(), "saved workbook");
        Ok(())
    }

    /// Write a plain table. With `include_header` false the sheet starts with
    /// the first data row, mirroring a headerless read.
    pub fn write_table(&self, table: &Table, output_path: &Path, include_header: bool) -> SheetResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = self.new_sheet(&mut workbook)?;
        let plain = Format::new();

        let mut first_row = 0;
        if include_header {
            for (col, name) in table.columns.iter().enumerate() {
                let (row, col) = cell_pos(0, col)?;
                worksheet
                    .write_string(row, col, name)
                    .map_err(|e| SheetError::Export(format!("Failed to write header: {}", e)))?;
            }
            first_row = 1;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                write_cell(worksheet, first_row + row_idx, col_idx, value, &plain)?;
            }
        }

        Self::save(&mut workbook, output_path)
    }

    /// Write a rendered pivot with borders, bold header and totals, merged
    /// label runs and fitted column widths.
    pub fn write_pivot(&self, outcome: &PivotOutcome, output_path: &Path) -> SheetResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = self.new_sheet(&mut workbook)?;
        let table = &outcome.table;
        let layout = &outcome.layout;

        for (col, name) in table.columns.iter().enumerate() {
            let format = format_for(layout.style_for(0, col));
            write_cell(worksheet, 0, col, &CellValue::Text(name.clone()), &format)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let sheet_row = row_idx + 1;
            for (col, value) in row.iter().enumerate() {
                if covered_by_merge(layout, sheet_row, col) {
                    continue;
                }
                let format = format_for(layout.style_for(sheet_row, col));
                write_cell(worksheet, sheet_row, col, value, &format)?;
            }
        }

        for merge in &layout.merges {
            let format = format_for(layout.style_for(merge.first_row, merge.column));
            let value = &table.rows[merge.first_row - 1][merge.column];
            let (first_row, col) = cell_pos(merge.first_row, merge.column)?;
            let (last_row, _) = cell_pos(merge.last_row, merge.column)?;
            worksheet
                .merge_range(first_row, col, last_row, col, &value.display(), &format)
                .map_err(|e| SheetError::Export(format!("Failed to merge cells: {}", e)))?;
            // merge_range stores text; keep numeric labels numeric
            if let CellValue::Number(_) = value {
                write_cell(worksheet, merge.first_row, merge.column, value, &format)?;
            }
        }

        for (col, width) in layout.column_widths.iter().enumerate() {
            let (_, col) = cell_pos(0, col)?;
            worksheet
                .set_column_width(col, *width)
                .map_err(|e| SheetError::Export(format!("Failed to set column width: {}", e)))?;
        }

        debug!(
            rows = table.row_count(),
            merges = layout.merges.len(),
            "wrote pivot worksheet"
        );
        Self::save(&mut workbook, output_path)
    }
}

/// Cells of a merged run are written by `merge_range`, not cell by cell.
fn covered_by_merge(layout: &Layout, row: usize, col: usize) -> bool {
    layout
        .merges
        .iter()
        .any(|m| m.column == col && (m.first_row..=m.last_row).contains(&row))
}

fn cell_pos(row: usize, col: usize) -> SheetResult<(u32, u16)> {
    let row = u32::try_from(row).map_err(|_| SheetError::Export(format!("Row {} out of range", row)))?;
    let col = u16::try_from(col).map_err(|_| SheetError::Export(format!("Column {} out of range", col)))?;
    Ok((row, col))
}

fn format_for(style: CellStyle) -> Format {
    let mut format = Format::new().set_border(FormatBorder::Thin);
    if style.bold {
        format = format.set_bold();
    }
    format = match style.align {
        Align::General => format,
        Align::Left => format.set_align(FormatAlign::Left),
        Align::Center => format.set_align(FormatAlign::Center),
        Align::Right => format.set_align(FormatAlign::Right),
    };
    if style.vertical_center {
        format = format.set_align(FormatAlign::VerticalCenter);
    }
    format
}

fn write_cell(worksheet: &mut Worksheet, row: usize, col: usize, value: &CellValue, format: &Format) -> SheetResult<()> {
    let (row, col) = cell_pos(row, col)?;
    let result = match value {
        CellValue::Number(n) if n.is_finite() => worksheet.write_number_with_format(row, col, *n, format),
        CellValue::Text(s) if !s.is_empty() => worksheet.write_string_with_format(row, col, s, format),
        _ => worksheet.write_blank(row, col, format),
    };
    result
        .map(|_| ())
        .map_err(|e| SheetError::Export(format!("Failed to write cell ({}, {}): {}", row, col, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pivot::{pivot, AggFunc, PivotRequest, ValueSpec, DEFAULT_TOTALS_LABEL};
    use tempfile::TempDir;

    fn sales() -> Table {
        Table::with_header(
            "sales",
            vec!["region".into(), "amount".into()],
            vec![
                vec!["East".into(), 10.into()],
                vec!["East".into(), 20.into()],
                vec!["West".into(), 5.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_covered_by_merge() {
        let table = Table::with_header(
            "p",
            vec!["k".into(), "v".into()],
            vec![
                vec!["East".into(), "1".into()],
                vec!["East".into(), "2".into()],
                vec!["总计".into(), "3".into()],
            ],
        )
        .unwrap();
        let layout = Layout::for_pivot(&table, 1);
        assert!(covered_by_merge(&layout, 1, 0));
        assert!(covered_by_merge(&layout, 2, 0));
        assert!(!covered_by_merge(&layout, 2, 1));
        assert!(!covered_by_merge(&layout, 3, 0));
    }

    #[test]
    fn test_cell_pos_rejects_wide_column() {
        assert!(cell_pos(0, 70_000).is_err());
        assert_eq!(cell_pos(3, 2).unwrap(), (3, 2));
    }

    #[test]
    fn test_write_table_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.xlsx");
        ExcelExporter::new().write_table(&sales(), &path, false).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_write_pivot_creates_file() {
        let request = PivotRequest {
            rows: vec!["A".into()],
            cols: vec![],
            values: vec![ValueSpec::new("B", AggFunc::Sum)],
        };
        let outcome = pivot(&sales(), &request, DEFAULT_TOTALS_LABEL).unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pivot.xlsx");
        ExcelExporter::new()
            .with_sheet_name("透视")
            .write_pivot(&outcome, &path)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_to_nonexistent_directory_fails() {
        let path = Path::new("/nonexistent/dir/output.xlsx");
        let result = ExcelExporter::new().write_table(&sales(), path, true);
        assert!(matches!(result, Err(SheetError::Export(_))));
    }
}
