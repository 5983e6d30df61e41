//! Column addressing: spreadsheet letters ⇄ zero-based indices.
//!
//! Letters use bijective base-26 (A=1 … Z=26, AA=27, …), so index = value − 1.
//! The scheme is the same for every operation; "AA" is always index 26.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SheetError, SheetResult};
use crate::types::Table;

/// Which table a column reference belongs to; shown in range errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Main,
    Lookup,
    Source,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableRole::Main => "主表",
            TableRole::Lookup => "查找表",
            TableRole::Source => "数据表",
        })
    }
}

/// A column as named at the boundary: by letter (`"C"`) or by index (`2`).
///
/// Resolved once into a validated index; the engines only ever see indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    ByIndex(usize),
    ByLetter(String),
}

impl ColumnRef {
    pub fn resolve(&self, table: &Table, role: TableRole) -> SheetResult<usize> {
        let index = match self {
            ColumnRef::ByIndex(idx) => *idx,
            ColumnRef::ByLetter(letter) => letter_to_index(letter)?,
        };
        validate_index(table, index, role, &self.to_string())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::ByIndex(idx) => f.write_str(&index_to_letter(*idx)),
            ColumnRef::ByLetter(letter) => f.write_str(&letter.trim().to_uppercase()),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(letter: &str) -> Self {
        ColumnRef::ByLetter(letter.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(idx: usize) -> Self {
        ColumnRef::ByIndex(idx)
    }
}

/// Convert a column letter (case-insensitive) to a zero-based index.
pub fn letter_to_index(letter: &str) -> SheetResult<usize> {
    let trimmed = letter.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SheetError::InvalidColumn(letter.to_string()));
    }

    let mut value: usize = 0;
    for c in trimmed.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| SheetError::InvalidColumn(letter.to_string()))?;
    }
    Ok(value - 1)
}

/// Convert zero-based index to column letter (0→A, 25→Z, 26→AA, 702→AAA).
pub fn index_to_letter(index: usize) -> String {
    let mut result = String::new();
    let mut num = index;

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

/// Check `index` against the table's column count.
pub fn validate_index(table: &Table, index: usize, role: TableRole, label: &str) -> SheetResult<usize> {
    let width = table.width();
    if index >= width {
        return Err(SheetError::ColumnOutOfRange {
            role: role.to_string(),
            column: label.to_string(),
            width,
            last: if width == 0 {
                "A".to_string()
            } else {
                index_to_letter(width - 1)
            },
        });
    }
    Ok(index)
}

/// Resolve a list of references against one table.
pub fn resolve_all(refs: &[ColumnRef], table: &Table, role: TableRole) -> SheetResult<Vec<usize>> {
    refs.iter().map(|r| r.resolve(table, role)).collect()
}
