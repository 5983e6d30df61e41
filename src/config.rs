//! Runtime settings, passed explicitly into every operation.
//!
//! Defaults cover a standalone deployment; a YAML file may override any field:
//!
//! ```yaml
//! result_dir: /var/lib/sheetwise/results
//! max_rows: 50000
//! totals_label: Total
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::pivot::DEFAULT_TOTALS_LABEL;
use crate::error::{SheetError, SheetResult};
use crate::types::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the (external) upload collaborator stores incoming files.
    pub upload_dir: PathBuf,
    /// Where result workbooks are written when no output path is given.
    pub result_dir: PathBuf,
    /// Lower-case extensions accepted as input.
    pub allowed_extensions: Vec<String>,
    pub max_file_bytes: u64,
    pub max_rows: usize,
    pub totals_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            result_dir: PathBuf::from("results"),
            allowed_extensions: ["xlsx", "xlsm", "xls", "ods"].iter().map(|s| s.to_string()).collect(),
            max_file_bytes: 16 * 1024 * 1024,
            max_rows: 100_000,
            totals_label: DEFAULT_TOTALS_LABEL.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from a YAML file; missing fields keep their defaults.
    pub fn load(path: &Path) -> SheetResult<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> SheetResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.allowed_extensions.iter().any(|a| *a == e))
    }

    /// Reject inputs with a disallowed extension, missing files, or files over
    /// the size limit.
    pub fn check_file(&self, path: &Path) -> SheetResult<()> {
        if !self.is_allowed(path) {
            return Err(SheetError::Config(format!(
                "不支持的文件格式: {}",
                path.display()
            )));
        }
        let meta = fs::metadata(path)
            .map_err(|_| SheetError::Config(format!("未找到文件: {}", path.display())))?;
        if meta.len() > self.max_file_bytes {
            return Err(SheetError::Config(format!(
                "文件大小超过限制（{} 字节，上限 {} 字节）",
                meta.len(),
                self.max_file_bytes
            )));
        }
        Ok(())
    }

    /// Reject tables over the row limit before any engine work starts.
    pub fn check_rows(&self, table: &Table) -> SheetResult<()> {
        if table.row_count() > self.max_rows {
            return Err(SheetError::Config(format!(
                "数据行数超过限制（{} 行，上限 {} 行）",
                table.row_count(),
                self.max_rows
            )));
        }
        Ok(())
    }

    /// `result_dir/{prefix}_{YYYYmmdd_HHMMSS}.xlsx`, creating the directory.
    pub fn result_path(&self, prefix: &str) -> SheetResult<PathBuf> {
        fs::create_dir_all(&self.result_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Ok(self.result_dir.join(format!("{}_{}.xlsx", prefix, timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_file_bytes, 16 * 1024 * 1024);
        assert_eq!(settings.max_rows, 100_000);
        assert_eq!(settings.totals_label, "总计");
        assert!(settings.allowed_extensions.contains(&"xlsx".to_string()));
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheetwise.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "max_rows: 10\ntotals_label: Total").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.max_rows, 10);
        assert_eq!(settings.totals_label, "Total");
        assert_eq!(settings.result_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_is_allowed_case_insensitive() {
        let settings = Settings::default();
        assert!(settings.is_allowed(Path::new("data/Report.XLSX")));
        assert!(!settings.is_allowed(Path::new("data/report.pdf")));
        assert!(!settings.is_allowed(Path::new("data/report")));
    }

    #[test]
    fn test_check_file_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.xlsx");
        fs::write(&path, vec![b'x'; 64]).unwrap();

        let settings = Settings {
            max_file_bytes: 10,
            ..Settings::default()
        };
        assert!(matches!(settings.check_file(&path), Err(SheetError::Config(_))));
        assert!(Settings::default().check_file(&path).is_ok());
        assert!(Settings::default().check_file(&dir.path().join("missing.xlsx")).is_err());
    }

    #[test]
    fn test_check_rows() {
        let table = Table::from_rows("t", vec![vec![1.into()], vec![2.into()]]).unwrap();
        let settings = Settings {
            max_rows: 1,
            ..Settings::default()
        };
        assert!(settings.check_rows(&table).is_err());
        assert!(Settings::default().check_rows(&table).is_ok());
    }

    #[test]
    fn test_result_path_under_result_dir() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            result_dir: dir.path().join("out"),
            ..Settings::default()
        };
        let path = settings.result_path("pivot").unwrap();
        assert!(path.starts_with(dir.path().join("out")));
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("pivot_"));
        assert!(dir.path().join("out").is_dir());
    }
}
