//! Workbook I/O
//!
//! - Import: worksheet (.xlsx/.xlsm/.xls/.ods) → [`crate::types::Table`]
//! - Export: table or pivot result → .xlsx

mod exporter;
mod importer;

pub use exporter::ExcelExporter;
pub use importer::{ColumnInfo, ExcelImporter, HeaderMode};
