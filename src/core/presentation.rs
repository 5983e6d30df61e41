//! Presentation pass for pivot results: number formatting, label merges,
//! per-cell styling hints and column widths.
//!
//! Nothing here touches a workbook. The writer turns these hints into formats.

use serde::Serialize;

use crate::types::Table;

/// Marker in an aggregated column name that selects two-decimal formatting.
pub const MEAN_MARKER: &str = "(mean)";

/// Format one aggregated value for display.
///
/// Columns whose name contains `(mean)` get two decimals; every other column is
/// cast to an integer first (truncating toward zero) and shown without decimals.
/// Both use thousands separators. A missing value renders empty.
pub fn format_aggregate(column_name: &str, value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_nan() => String::new(),
        Some(v) if column_name.contains(MEAN_MARKER) => format_decimal(v, 2),
        Some(v) => format_integer(v.trunc() as i64),
    }
}

/// `1234567` → `"1,234,567"`.
pub fn format_integer(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let grouped = group_thousands(&digits);
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Fixed decimals with a grouped integer part: `1234.5` → `"1,234.50"`.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let mut out = format!("{}{}", sign, group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A vertical run of identical label cells, in sheet coordinates
/// (row 0 is the header row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeRange {
    pub column: usize,
    pub first_row: usize,
    pub last_row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    General,
    Left,
    Center,
    Right,
}

/// Styling hint for one cell of the rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    pub bold: bool,
    pub align: Align,
    pub vertical_center: bool,
}

impl CellStyle {
    const fn plain(align: Align) -> Self {
        Self {
            bold: false,
            align,
            vertical_center: false,
        }
    }
}

/// Everything the writer needs besides the cell values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Leading label columns (row labels, then column labels).
    pub label_columns: usize,
    /// Body rows including the trailing totals row.
    pub body_rows: usize,
    pub merges: Vec<MergeRange>,
    pub column_widths: Vec<f64>,
}

impl Layout {
    /// Compute merges and widths for a rendered pivot table whose last row is
    /// the totals row.
    pub fn for_pivot(table: &Table, label_columns: usize) -> Self {
        Self {
            label_columns,
            body_rows: table.row_count(),
            merges: merge_ranges(table, label_columns),
            column_widths: column_widths(table),
        }
    }

    pub fn totals_row(&self) -> usize {
        self.body_rows
    }

    fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRange> {
        self.merges
            .iter()
            .find(|m| m.column == col && (m.first_row..=m.last_row).contains(&row))
    }

    /// Style for the cell at sheet coordinates (`row` 0 = header).
    pub fn style_for(&self, row: usize, col: usize) -> CellStyle {
        if row == 0 {
            return CellStyle {
                bold: true,
                align: Align::Center,
                vertical_center: false,
            };
        }
        if row == self.totals_row() {
            return CellStyle {
                bold: true,
                align: Align::General,
                vertical_center: false,
            };
        }
        if col < self.label_columns {
            return match self.merge_at(row, col) {
                Some(_) => CellStyle {
                    bold: false,
                    align: Align::Left,
                    vertical_center: true,
                },
                None => CellStyle::plain(Align::Left),
            };
        }
        CellStyle::plain(Align::Right)
    }
}

/// Runs of at least two equal rendered values in each label column, skipping
/// the header and the trailing totals row.
pub fn merge_ranges(table: &Table, label_columns: usize) -> Vec<MergeRange> {
    let data_rows = table.row_count().saturating_sub(1);
    let mut merges = Vec::new();

    for col in 0..label_columns.min(table.width()) {
        let mut start = 0;
        while start < data_rows {
            let value = table.rows[start][col].display();
            let mut end = start;
            while end + 1 < data_rows && table.rows[end + 1][col].display() == value {
                end += 1;
            }
            if end > start {
                merges.push(MergeRange {
                    column: col,
                    first_row: start + 1,
                    last_row: end + 1,
                });
            }
            start = end + 1;
        }
    }

    merges
}

/// Longest rendered value per column (header included) plus two.
pub fn column_widths(table: &Table) -> Vec<f64> {
    (0..table.width())
        .map(|col| {
            let header = table.columns[col].chars().count();
            let longest = table
                .column(col)
                .map(|v| v.display().chars().count())
                .max()
                .unwrap_or(0);
            (header.max(longest) + 2) as f64
        })
        .collect()
}
