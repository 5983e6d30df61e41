//! Sheetwise - spreadsheet table transformations
//!
//! Turns worksheets into in-memory tables and runs one of three engines over
//! them, then writes the result workbook.
//!
//! # Features
//!
//! - VLOOKUP joins on single or composite keys with value standardization
//!   (`"5"`, `"5.0"` and `5` match; whitespace is collapsed)
//! - Pivot aggregation (sum, mean, count, max, min) with a totals row,
//!   merged label cells and formatted numbers
//! - Column concatenation with per-column separators
//! - Spreadsheet column letters (A … Z, AA …) as the addressing scheme
//! - CLI and HTTP API sharing one service layer
//!
//! # Example
//!
//! ```
//! use sheetwise::core::lookup::{lookup, LookupRequest};
//! use sheetwise::types::Table;
//!
//! let main = Table::from_rows("main", vec![vec!["k1".into()], vec!["k2".into()]])?;
//! let prices = Table::from_rows("prices", vec![vec!["k1".into(), 100.into()]])?;
//!
//! let outcome = lookup(&main, &prices, &LookupRequest::single("A", "A", "B"))?;
//! assert_eq!(outcome.report.matched, 1);
//! println!("{}", outcome.summary());
//! # Ok::<(), sheetwise::error::SheetError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use error::{SheetError, SheetResult};
pub use types::{CellValue, Row, Table};
