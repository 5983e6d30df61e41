//! Value standardization and composite keys.
//!
//! Two cells a person would call equal (`5`, `5.0`, `" 5 "`) standardize to the
//! same string. Keys are built from standardized values joined by [`KEY_SEPARATOR`].

use crate::types::{format_number, CellValue};

/// Joins the parts of a multi-column key.
pub const KEY_SEPARATOR: char = '|';

/// Join/group identity built from one or more standardized columns.
pub type CompositeKey = String;

/// Canonical comparison string for a cell. Pure and total.
pub fn standardize(value: &CellValue) -> String {
    match value {
        v if v.is_null() => String::new(),
        CellValue::Number(n) => standardize_text(&format_number(*n)),
        CellValue::Text(s) => standardize_text(s),
        CellValue::Empty => String::new(),
    }
}

/// Standardize raw text: numbers get their canonical form, anything else has
/// its whitespace trimmed and internal runs collapsed to one space.
pub fn standardize_text(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => format_number(n),
        _ => trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Build the key for one row from the given columns, in order.
///
/// A single column yields the bare standardized value.
pub fn build_key(row: &[CellValue], columns: &[usize]) -> CompositeKey {
    let mut key = String::new();
    for (i, &col) in columns.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        if let Some(value) = row.get(col) {
            key.push_str(&standardize(value));
        }
    }
    key
}
