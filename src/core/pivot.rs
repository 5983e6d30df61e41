//! Pivot engine: group by label columns, aggregate value columns, append a
//! totals row and hand the result to the presentation pass.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::columns::{resolve_all, ColumnRef, TableRole};
use super::presentation::{format_aggregate, Layout};
use super::standardize::standardize;
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, Row, Table};

/// Default label written into the first label cell of the totals row.
pub const DEFAULT_TOTALS_LABEL: &str = "总计";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Mean,
    Count,
    Max,
    Min,
}

impl AggFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::Max => "max",
            AggFunc::Min => "min",
        }
    }

    /// Apply to the non-null numbers of one group.
    fn apply(&self, values: &[f64], group_len: usize) -> Option<f64> {
        match self {
            AggFunc::Count => Some(group_len as f64),
            AggFunc::Sum => Some(values.iter().sum()),
            AggFunc::Mean if values.is_empty() => None,
            AggFunc::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            AggFunc::Max => values.iter().copied().reduce(f64::max),
            AggFunc::Min => values.iter().copied().reduce(f64::min),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFunc {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "mean" => Ok(AggFunc::Mean),
            "count" => Ok(AggFunc::Count),
            "max" => Ok(AggFunc::Max),
            "min" => Ok(AggFunc::Min),
            other => Err(SheetError::UnknownAggregation(other.to_string())),
        }
    }
}

/// One value column and the function applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub column: ColumnRef,
    #[serde(alias = "func")]
    pub aggfunc: AggFunc,
}

impl ValueSpec {
    pub fn new(column: impl Into<ColumnRef>, aggfunc: AggFunc) -> Self {
        Self {
            column: column.into(),
            aggfunc,
        }
    }
}

impl FromStr for ValueSpec {
    type Err = SheetError;

    /// `"B:sum"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, func) = s
            .split_once(':')
            .ok_or_else(|| SheetError::Config(format!("值字段格式应为 列:函数，实际为 '{}'", s)))?;
        Ok(Self::new(ColumnRef::ByLetter(column.trim().to_string()), func.parse()?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PivotRequest {
    pub rows: Vec<ColumnRef>,
    #[serde(default)]
    pub cols: Vec<ColumnRef>,
    pub values: Vec<ValueSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// A column is numeric when every non-null cell passes the numeric coercion.
pub fn column_kind(table: &Table, column: usize) -> ColumnKind {
    let numeric = table
        .column(column)
        .filter(|v| !v.is_blank())
        .all(|v| v.as_number().is_some());
    if numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

/// An output column of the pivot: `"{source name}({func})"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedColumn {
    pub name: String,
    pub source: usize,
    pub func: AggFunc,
    /// False for text columns, which only support `count`.
    pub numeric: bool,
}

/// One bucket: the original label values plus one value per aggregated column.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub labels: Vec<CellValue>,
    pub values: Vec<Option<f64>>,
}

/// Aggregated, not yet formatted, pivot.
#[derive(Debug, Clone)]
pub struct PivotTable {
    pub label_names: Vec<String>,
    pub columns: Vec<AggregatedColumn>,
    pub rows: Vec<PivotRow>,
    pub totals: PivotRow,
}

impl PivotTable {
    /// Formatted table: header from the names, group rows, then the totals row.
    pub fn render(&self, name: &str) -> SheetResult<Table> {
        let header: Vec<String> = self
            .label_names
            .iter()
            .cloned()
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect();

        let rows = self
            .rows
            .iter()
            .chain(std::iter::once(&self.totals))
            .map(|row| self.render_row(row))
            .collect();

        Table::with_header(name, header, rows)
    }

    fn render_row(&self, row: &PivotRow) -> Row {
        row.labels
            .iter()
            .cloned()
            .chain(
                self.columns
                    .iter()
                    .zip(&row.values)
                    .map(|(col, value)| CellValue::Text(format_aggregate(&col.name, *value))),
            )
            .collect()
    }
}

/// Rendered pivot plus the hints the writer needs.
#[derive(Debug, Clone)]
pub struct PivotOutcome {
    pub table: Table,
    pub layout: Layout,
    pub columns: Vec<AggregatedColumn>,
}

fn rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Number(n) if !n.is_nan() => 0,
        CellValue::Text(_) => 1,
        _ => 2,
    }
}

/// Numbers before text before blanks; numbers numerically, text by code point.
fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) if !x.is_nan() && !y.is_nan() => x.total_cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_labels(a: &[CellValue], b: &[CellValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_cells(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Group and aggregate without formatting.
pub fn aggregate(table: &Table, request: &PivotRequest, totals_label: &str) -> SheetResult<PivotTable> {
    table.check_shape()?;
    if request.rows.is_empty() {
        return Err(SheetError::MissingRowLabels);
    }
    if request.values.is_empty() {
        return Err(SheetError::MissingValueColumns);
    }

    let mut label_columns = resolve_all(&request.rows, table, TableRole::Source)?;
    label_columns.extend(resolve_all(&request.cols, table, TableRole::Source)?);

    let mut columns = Vec::with_capacity(request.values.len());
    for spec in &request.values {
        let source = spec.column.resolve(table, TableRole::Source)?;
        let source_name = &table.columns[source];
        let numeric = column_kind(table, source) == ColumnKind::Numeric;
        if !numeric && spec.aggfunc != AggFunc::Count {
            return Err(SheetError::UnsupportedAggregation {
                column: source_name.clone(),
            });
        }
        columns.push(AggregatedColumn {
            name: format!("{}({})", source_name, spec.aggfunc),
            source,
            func: spec.aggfunc,
            numeric,
        });
    }

    debug!(?label_columns, value_columns = columns.len(), rows = table.row_count(), "resolved pivot columns");

    // Group key: standardized labels. Display labels come from the first row seen.
    let mut group_of: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<CellValue>, Vec<usize>)> = Vec::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let key: Vec<String> = label_columns.iter().map(|&c| standardize(&row[c])).collect();
        let slot = *group_of.entry(key).or_insert_with(|| {
            let labels = label_columns.iter().map(|&c| row[c].clone()).collect();
            groups.push((labels, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row_idx);
    }
    groups.sort_by(|a, b| compare_labels(&a.0, &b.0));
    debug!(groups = groups.len(), "grouped pivot rows");

    let rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|(labels, members)| {
            let values = columns
                .iter()
                .map(|col| {
                    let numbers: Vec<f64> = if col.numeric {
                        members
                            .iter()
                            .filter_map(|&r| table.rows[r][col.source].as_number())
                            .collect()
                    } else {
                        Vec::new()
                    };
                    col.func.apply(&numbers, members.len())
                })
                .collect();
            PivotRow { labels, values }
        })
        .collect();

    // Totals sum the per-group values as displayed, whatever the function.
    let totals_values = (0..columns.len())
        .map(|i| Some(rows.iter().filter_map(|r| r.values[i]).sum::<f64>()))
        .collect();
    let totals_labels = (0..label_columns.len())
        .map(|i| {
            if i == 0 {
                CellValue::from(totals_label)
            } else {
                CellValue::from("")
            }
        })
        .collect();

    Ok(PivotTable {
        label_names: label_columns.iter().map(|&c| table.columns[c].clone()).collect(),
        columns,
        rows,
        totals: PivotRow {
            labels: totals_labels,
            values: totals_values,
        },
    })
}

/// Full pivot: aggregate, format, and compute presentation hints.
pub fn pivot(table: &Table, request: &PivotRequest, totals_label: &str) -> SheetResult<PivotOutcome> {
    let aggregated = aggregate(table, request, totals_label)?;
    let rendered = aggregated.render("Sheet1")?;
    let layout = Layout::for_pivot(&rendered, aggregated.label_names.len());

    Ok(PivotOutcome {
        table: rendered,
        layout,
        columns: aggregated.columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Table {
        Table::with_header(
            "sales",
            vec!["region".into(), "amount".into(), "rep".into()],
            vec![
                vec!["East".into(), 10.into(), "ann".into()],
                vec!["East".into(), 20.into(), "bob".into()],
                vec!["West".into(), 5.into(), "cy".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_agg_func_parse() {
        assert_eq!("MEAN".parse::<AggFunc>().unwrap(), AggFunc::Mean);
        assert!(matches!("median".parse::<AggFunc>(), Err(SheetError::UnknownAggregation(_))));
    }

    #[test]
    fn test_value_spec_parse() {
        let spec: ValueSpec = "b:max".parse().unwrap();
        assert_eq!(spec, ValueSpec::new("b", AggFunc::Max));
        assert!("B".parse::<ValueSpec>().is_err());
    }

    #[test]
    fn test_apply_ignores_missing_numbers() {
        assert_eq!(AggFunc::Sum.apply(&[], 3), Some(0.0));
        assert_eq!(AggFunc::Mean.apply(&[], 3), None);
        assert_eq!(AggFunc::Count.apply(&[1.0], 3), Some(3.0));
        assert_eq!(AggFunc::Max.apply(&[1.0, 4.0, 2.0], 3), Some(4.0));
        assert_eq!(AggFunc::Min.apply(&[1.0, 4.0, 2.0], 3), Some(1.0));
    }

    #[test]
    fn test_column_kind() {
        let table = sales();
        assert_eq!(column_kind(&table, 1), ColumnKind::Numeric);
        assert_eq!(column_kind(&table, 2), ColumnKind::Text);
    }

    #[test]
    fn test_nulls_do_not_make_column_text() {
        let table = Table::with_header(
            "t",
            vec!["v".into()],
            vec![vec![1.into()], vec![CellValue::Empty], vec!["2.5".into()]],
        )
        .unwrap();
        assert_eq!(column_kind(&table, 0), ColumnKind::Numeric);
    }

    #[test]
    fn test_aggregate_groups_and_totals() {
        let request = PivotRequest {
            rows: vec!["A".into()],
            cols: vec![],
            values: vec![ValueSpec::new("B", AggFunc::Sum)],
        };
        let pivot = aggregate(&sales(), &request, DEFAULT_TOTALS_LABEL).unwrap();
        assert_eq!(pivot.columns[0].name, "amount(sum)");
        assert_eq!(pivot.rows.len(), 2);
        assert_eq!(pivot.rows[0].labels, vec![CellValue::from("East")]);
        assert_eq!(pivot.rows[0].values, vec![Some(30.0)]);
        assert_eq!(pivot.rows[1].values, vec![Some(5.0)]);
        assert_eq!(pivot.totals.values, vec![Some(35.0)]);
        assert_eq!(pivot.totals.labels, vec![CellValue::from("总计")]);
    }

    #[test]
    fn test_count_allowed_on_text_column() {
        let request = PivotRequest {
            rows: vec!["A".into()],
            cols: vec![],
            values: vec![ValueSpec::new("C", AggFunc::Count)],
        };
        let pivot = aggregate(&sales(), &request, DEFAULT_TOTALS_LABEL).unwrap();
        assert!(!pivot.columns[0].numeric);
        assert_eq!(pivot.rows[0].values, vec![Some(2.0)]);
        assert_eq!(pivot.totals.values, vec![Some(3.0)]);
    }

    #[test]
    fn test_labels_standardize_into_one_group() {
        let table = Table::with_header(
            "t",
            vec!["k".into(), "v".into()],
            vec![
                vec![CellValue::from(" 5 "), 1.into()],
                vec![CellValue::Number(5.0), 2.into()],
            ],
        )
        .unwrap();
        let request = PivotRequest {
            rows: vec!["A".into()],
            cols: vec![],
            values: vec![ValueSpec::new("B", AggFunc::Sum)],
        };
        let pivot = aggregate(&table, &request, DEFAULT_TOTALS_LABEL).unwrap();
        assert_eq!(pivot.rows.len(), 1);
        assert_eq!(pivot.rows[0].labels, vec![CellValue::from(" 5 ")]);
    }

    #[test]
    fn test_groups_sorted_numbers_before_text() {
        assert_eq!(
            compare_cells(&CellValue::Number(9.0), &CellValue::Number(10.0)),
            Ordering::Less
        );
        assert_eq!(compare_cells(&CellValue::Number(1.0), &"a".into()), Ordering::Less);
        assert_eq!(compare_cells(&CellValue::Empty, &"a".into()), Ordering::Greater);
    }
}
