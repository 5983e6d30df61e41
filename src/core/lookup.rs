//! VLOOKUP engine: composite-key joins between a main table and a lookup table.
//!
//! The lookup table is indexed once by its composite keys; every main-table row
//! is then mapped through the index and the return values are appended as new
//! trailing columns. Misses append empty strings.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::columns::{index_to_letter, resolve_all, ColumnRef, TableRole};
use super::standardize::{build_key, CompositeKey};
use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, Table};

/// Maximum number of unmatched keys quoted in the summary.
pub const MAX_UNMATCHED_EXAMPLES: usize = 5;

/// How many key columns take part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Only the first listed column.
    #[default]
    Single,
    /// Every listed column, joined in order.
    Multi,
}

/// How many return columns are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    #[default]
    Single,
    Multi,
}

impl FromStr for MatchMode {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(MatchMode::Single),
            "multi" | "multiple" => Ok(MatchMode::Multi),
            other => Err(SheetError::Config(format!("未知的匹配类型 '{}'", other))),
        }
    }
}

impl FromStr for ReturnMode {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(ReturnMode::Single),
            "multi" | "multiple" => Ok(ReturnMode::Multi),
            other => Err(SheetError::Config(format!("未知的返回类型 '{}'", other))),
        }
    }
}

/// Column configuration for one VLOOKUP invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub main_match_type: MatchMode,
    pub main_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub lookup_match_type: MatchMode,
    pub lookup_match_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub return_type: ReturnMode,
    pub return_columns: Vec<ColumnRef>,
}

impl LookupRequest {
    /// Single-column key, single return column.
    pub fn single(main_key: &str, lookup_key: &str, return_column: &str) -> Self {
        Self {
            main_match_type: MatchMode::Single,
            main_columns: vec![main_key.into()],
            lookup_match_type: MatchMode::Single,
            lookup_match_columns: vec![lookup_key.into()],
            return_type: ReturnMode::Single,
            return_columns: vec![return_column.into()],
        }
    }
}

/// What the index yields for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(CellValue),
    Multi(BTreeMap<usize, CellValue>),
}

impl Payload {
    fn value_for(&self, column: usize) -> Option<&CellValue> {
        match self {
            Payload::Single(value) => Some(value),
            Payload::Multi(values) => values.get(&column),
        }
    }
}

/// Composite key → return payload, built once over the lookup table.
#[derive(Debug, Default)]
pub struct LookupIndex {
    entries: HashMap<CompositeKey, Payload>,
}

impl LookupIndex {
    /// Index every lookup row whose return payload has no null component.
    /// When a key repeats, the later row wins.
    pub fn build(table: &Table, key_columns: &[usize], return_columns: &[usize], mode: ReturnMode) -> Self {
        let mut entries = HashMap::with_capacity(table.row_count());

        for row in &table.rows {
            let key = build_key(row, key_columns);
            let payload = match mode {
                ReturnMode::Single => {
                    let Some(value) = return_columns.first().and_then(|&c| row.get(c)) else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    Payload::Single(value.clone())
                }
                ReturnMode::Multi => {
                    let values: BTreeMap<usize, CellValue> = return_columns
                        .iter()
                        .filter_map(|&c| row.get(c).map(|v| (c, v.clone())))
                        .collect();
                    if values.values().any(CellValue::is_null) {
                        continue;
                    }
                    Payload::Multi(values)
                }
            };
            entries.insert(key, payload);
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.entries.get(key)
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Match statistics for one VLOOKUP invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub total: usize,
    pub matched: usize,
    /// Distinct unmatched keys, in first-seen order, capped at [`MAX_UNMATCHED_EXAMPLES`].
    pub unmatched_examples: Vec<String>,
    pub unmatched_distinct: usize,
}

impl MatchReport {
    /// Percentage of main rows that found a partner.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }

    /// Human-readable summary sentence.
    pub fn summary(&self) -> String {
        let mut message = format!(
            "匹配完成：共 {} 条数据，成功匹配 {} 条（{:.1}%）",
            self.total,
            self.matched,
            self.match_rate()
        );

        if !self.unmatched_examples.is_empty() {
            let mut examples = self.unmatched_examples.join("、");
            if self.unmatched_distinct > MAX_UNMATCHED_EXAMPLES {
                examples.push_str(" 等");
            }
            message.push_str(&format!("\n未匹配的值示例：{}", examples));
        }

        message
    }
}

/// Augmented main table plus its statistics.
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub table: Table,
    pub report: MatchReport,
}

impl LookupOutcome {
    pub fn summary(&self) -> String {
        self.report.summary()
    }
}

fn key_columns(mode: MatchMode, resolved: Vec<usize>) -> Vec<usize> {
    match mode {
        MatchMode::Single => resolved.into_iter().take(1).collect(),
        MatchMode::Multi => resolved,
    }
}

/// Run a VLOOKUP. `main` and `lookup` may be the same table.
pub fn lookup(main: &Table, lookup: &Table, request: &LookupRequest) -> SheetResult<LookupOutcome> {
    main.check_shape()?;
    lookup.check_shape()?;
    if request.main_columns.is_empty() || request.lookup_match_columns.is_empty() {
        return Err(SheetError::MissingKeyColumns);
    }
    if request.return_columns.is_empty() {
        return Err(SheetError::MissingReturnColumns);
    }

    let main_keys = key_columns(
        request.main_match_type,
        resolve_all(&request.main_columns, main, TableRole::Main)?,
    );
    let lookup_keys = key_columns(
        request.lookup_match_type,
        resolve_all(&request.lookup_match_columns, lookup, TableRole::Lookup)?,
    );
    let mut return_columns = resolve_all(&request.return_columns, lookup, TableRole::Lookup)?;
    if request.return_type == ReturnMode::Single {
        return_columns.truncate(1);
    }

    if main_keys.len() != lookup_keys.len() {
        return Err(SheetError::KeyArity {
            main: main_keys.len(),
            lookup: lookup_keys.len(),
        });
    }

    debug!(
        ?main_keys,
        ?lookup_keys,
        ?return_columns,
        main_rows = main.row_count(),
        lookup_rows = lookup.row_count(),
        "resolved lookup columns"
    );

    let index = LookupIndex::build(lookup, &lookup_keys, &return_columns, request.return_type);
    debug!(entries = index.len(), "built lookup index");

    let mut appended: Vec<Vec<CellValue>> = vec![Vec::with_capacity(main.row_count()); return_columns.len()];
    let mut matched = 0;
    let mut seen_unmatched = HashSet::new();
    let mut unmatched_examples = Vec::new();

    for row in &main.rows {
        let key = build_key(row, &main_keys);
        match index.get(&key) {
            Some(payload) => {
                matched += 1;
                for (out, &col) in appended.iter_mut().zip(&return_columns) {
                    out.push(payload.value_for(col).cloned().unwrap_or_else(|| CellValue::from("")));
                }
            }
            None => {
                for out in appended.iter_mut() {
                    out.push(CellValue::from(""));
                }
                if seen_unmatched.insert(key.clone()) && unmatched_examples.len() < MAX_UNMATCHED_EXAMPLES {
                    unmatched_examples.push(key);
                }
            }
        }
    }

    if matched == 0 {
        return Err(SheetError::NoMatchFound);
    }

    let mut table = main.clone();
    for values in appended {
        let name = index_to_letter(table.width());
        table.push_column(name, values)?;
    }

    Ok(LookupOutcome {
        table,
        report: MatchReport {
            total: main.row_count(),
            matched,
            unmatched_examples,
            unmatched_distinct: seen_unmatched.len(),
        },
    })
}
