//! Column concatenation: join selected columns of every row into one new
//! trailing column, with a separator placed before or after each value.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::columns::{index_to_letter, ColumnRef, TableRole};
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, Table};

/// One column taking part in the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatPart {
    pub column: ColumnRef,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub separator_before: bool,
}

impl ConcatPart {
    pub fn new(column: impl Into<ColumnRef>, separator: &str, separator_before: bool) -> Self {
        Self {
            column: column.into(),
            separator: Some(separator.to_string()),
            separator_before,
        }
    }
}

impl FromStr for ConcatPart {
    type Err = SheetError;

    /// `"A"`, `"A:-"` or `"C:#:before"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.splitn(3, ':');
        let column = fields.next().unwrap_or_default().trim();
        if column.is_empty() {
            return Err(SheetError::InvalidColumn(s.to_string()));
        }
        let separator = fields.next().unwrap_or_default();
        let separator_before = match fields.next().map(str::trim) {
            None | Some("after") => false,
            Some("before") => true,
            Some(other) => {
                return Err(SheetError::Config(format!(
                    "分隔符位置应为 before 或 after，实际为 '{}'",
                    other
                )))
            }
        };
        Ok(Self::new(column, separator, separator_before))
    }
}

/// Render one column for joining. A column whose every cell is a number is
/// shown as integers (truncated); anything else as trimmed text.
fn render_column(table: &Table, column: usize) -> Vec<String> {
    let all_numeric = table.column(column).all(|v| v.as_number().is_some());
    table
        .column(column)
        .map(|value| match value.as_number() {
            Some(n) if all_numeric => format!("{}", n.trunc() as i64),
            _ => value.display().trim().to_string(),
        })
        .collect()
}

/// Append the joined column to a copy of `table`.
pub fn concatenate(table: &Table, parts: &[ConcatPart]) -> SheetResult<Table> {
    table.check_shape()?;
    let mut rendered = Vec::with_capacity(parts.len());
    for part in parts {
        let idx = part.column.resolve(table, TableRole::Source)?;
        rendered.push(render_column(table, idx));
    }

    let joined = (0..table.row_count())
        .map(|row| {
            let mut out = String::new();
            for (part, values) in parts.iter().zip(&rendered) {
                let value = &values[row];
                if value.is_empty() {
                    continue;
                }
                let separator = part.separator.as_deref().unwrap_or("");
                if part.separator_before {
                    out.push_str(separator);
                }
                out.push_str(value);
                if !part.separator_before {
                    out.push_str(separator);
                }
            }
            CellValue::Text(out)
        })
        .collect();

    let mut result = table.clone();
    let name = index_to_letter(result.width());
    result.push_column(name, joined)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::from_rows(
            "people",
            vec![
                vec!["Li".into(), " Wei ".into(), 3.0.into()],
                vec!["Zhang".into(), CellValue::Empty, 4.7.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_separator_after_value() {
        let result = concatenate(&people(), &[ConcatPart::new("A", "-", false), ConcatPart::new("B", "", false)]).unwrap();
        assert_eq!(result.cell(0, 3), Some(&CellValue::from("Li-Wei")));
        assert_eq!(result.cell(1, 3), Some(&CellValue::from("Zhang-")));
    }

    #[test]
    fn test_separator_before_value() {
        let result = concatenate(&people(), &[ConcatPart::new("A", "", false), ConcatPart::new("C", "#", true)]).unwrap();
        assert_eq!(result.cell(0, 3), Some(&CellValue::from("Li#3")));
        assert_eq!(result.cell(1, 3), Some(&CellValue::from("Zhang#4")));
    }

    #[test]
    fn test_result_appends_one_column() {
        let result = concatenate(&people(), &[ConcatPart::new("A", "", false)]).unwrap();
        assert_eq!(result.width(), 4);
        assert_eq!(result.columns[3], "D");
    }

    #[test]
    fn test_part_from_str() {
        assert_eq!("A".parse::<ConcatPart>().unwrap(), ConcatPart::new("A", "", false));
        assert_eq!("B:-".parse::<ConcatPart>().unwrap(), ConcatPart::new("B", "-", false));
        assert_eq!("C:#:before".parse::<ConcatPart>().unwrap(), ConcatPart::new("C", "#", true));
        assert!("C:#:middle".parse::<ConcatPart>().is_err());
        assert!(":-".parse::<ConcatPart>().is_err());
    }

    #[test]
    fn test_ragged_table_rejected() {
        let mut ragged = people();
        ragged.rows[1].pop();
        let result = concatenate(&ragged, &[ConcatPart::new("A", "", false)]);
        assert!(matches!(result, Err(SheetError::MalformedTable(_))));
    }

    #[test]
    fn test_out_of_range_column() {
        let err = concatenate(&people(), &[ConcatPart::new("E", "", false)]).unwrap_err();
        assert!(matches!(err, SheetError::ColumnOutOfRange { .. }));
    }
}
