use std::fmt;

use crate::error::{SheetError, SheetResult};

//==============================================================================
// Cell values
//==============================================================================

/// A single spreadsheet cell: text, number, or nothing at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Null in the spreadsheet sense: an empty cell or a NaN number.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(_) => false,
        }
    }

    /// Null, or text that is nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            other => other.is_null(),
        }
    }

    /// Numeric coercion shared by standardization, the pivot numeric check
    /// and concatenation. Only finite numbers count.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => n.is_finite().then_some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Text shown to a user: numbers without a trailing `.0`, empty for null.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) if n.is_nan() => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// Shortest round-trip rendering; integral values drop the fraction and `-0` becomes `0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

pub type Row = Vec<CellValue>;

//==============================================================================
// Tables
//==============================================================================

/// An ordered set of rows sharing one column count.
///
/// `columns` holds the column names: the header row when the sheet was read with
/// one, otherwise the column letters.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Headerless table; columns are named by their letters.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> SheetResult<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let columns = (0..width)
            .map(crate::core::columns::index_to_letter)
            .collect();
        Self::with_header(name, columns, rows)
    }

    /// Table whose column names come from a header row.
    pub fn with_header(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Row>,
    ) -> SheetResult<Self> {
        let table = Self {
            name: name.into(),
            columns,
            rows,
        };
        table.check_shape()?;
        Ok(table)
    }

    /// Every row must be exactly as wide as the header.
    pub fn check_shape(&self) -> SheetResult<()> {
        let width = self.width();
        match self.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            Some((idx, row)) => Err(SheetError::MalformedTable(format!(
                "第 {} 行有 {} 列，应为 {} 列",
                idx + 1,
                row.len(),
                width
            ))),
            None => Ok(()),
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn push_row(&mut self, row: Row) -> SheetResult<()> {
        if row.len() != self.width() {
            return Err(SheetError::MalformedTable(format!(
                "新行有 {} 列，应为 {} 列",
                row.len(),
                self.width()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a trailing column; `values` must have one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<CellValue>) -> SheetResult<()> {
        if values.len() != self.rows.len() {
            return Err(SheetError::MalformedTable(format!(
                "新列有 {} 行，应为 {} 行",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }
}
