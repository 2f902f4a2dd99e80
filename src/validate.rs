//! Structural checks over a directory of localisation tables.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::is_table_file;
use crate::error::{LocError, Result};
use crate::table::loader::split_records;
use crate::table::TableSchema;

/// Findings for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Problems that make the file unusable
    pub errors: Vec<String>,
    /// Problems the tools tolerate
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Findings for a directory.
#[derive(Debug, Clone, Default)]
pub struct DirReport {
    pub dir: PathBuf,
    pub files: Vec<FileReport>,
    /// Set when the directory itself does not exist
    pub missing: bool,
}

impl DirReport {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| !f.errors.is_empty())
    }

    pub fn has_warnings(&self) -> bool {
        self.missing || self.files.iter().any(|f| !f.warnings.is_empty())
    }

    pub fn checked(&self) -> usize {
        self.files.len()
    }

    /// Collapse the errors into one `MalformedTable` naming the first bad file.
    pub fn into_result(self) -> Result<Self> {
        let bad: Vec<&FileReport> = self.files.iter().filter(|f| !f.errors.is_empty()).collect();
        match bad.first() {
            None => Ok(self),
            Some(first) => Err(LocError::malformed(
                &first.path,
                bad.iter()
                    .flat_map(|f| {
                        let name = file_name(&f.path);
                        f.errors.iter().map(move |e| format!("{}: {}", name, e))
                    })
                    .collect(),
            )),
        }
    }
}

/// Check one table file.
///
/// Errors: unreadable file, header different from the required columns, rows with too many
/// fields, duplicate keys. Warnings: rows with a blank key (reported by file line).
pub fn validate_table_file(path: &Path, schema: &TableSchema) -> FileReport {
    let mut report = FileReport {
        path: path.to_path_buf(),
        ..Default::default()
    };
    let content = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            report.errors.push(format!("failed to read file ({})", e));
            return report;
        }
    };
    let Some((columns, records)) = split_records(&content) else {
        report.errors.push("missing header row".to_string());
        return report;
    };

    if columns != schema.required_columns {
        report.errors.push(format!(
            "columns are expected {:?}, but received {:?}",
            schema.required_columns, columns
        ));
    }
    let Some(key_idx) = columns.iter().position(|c| *c == schema.key_column) else {
        return report;
    };

    let mut blank_lines = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let line = i + 2;
        if record.len() > columns.len() {
            report.errors.push(format!(
                "line {}: expected {} fields, found {}",
                line,
                columns.len(),
                record.len()
            ));
        }
        let key = record.get(key_idx).map(String::as_str).unwrap_or("");
        if key.trim().is_empty() {
            blank_lines.push(line.to_string());
        } else if !seen.insert(key) && !duplicates.contains(&key) {
            duplicates.push(key);
        }
    }
    if !blank_lines.is_empty() {
        report
            .warnings
            .push(format!("empty key in the strings {}", blank_lines.join(", ")));
    }
    if !duplicates.is_empty() {
        report
            .errors
            .push(format!("key duplicates: {}", duplicates.join(", ")));
    }
    debug!(
        path = %path.display(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated"
    );
    report
}

/// Check every `*.loc.tsv` in `dir`, sorted by name. A missing directory is only a warning.
pub fn validate_dir(dir: &Path, schema: &TableSchema) -> Result<DirReport> {
    let mut report = DirReport {
        dir: dir.to_path_buf(),
        ..Default::default()
    };
    if !dir.exists() {
        warn!(dir = %dir.display(), "directory does not exist");
        report.missing = true;
        return Ok(report);
    }
    for path in table_files(dir)? {
        report.files.push(validate_table_file(&path, schema));
    }
    Ok(report)
}

/// `*.loc.tsv` files directly inside `dir`, sorted by name.
pub fn table_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| LocError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LocError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_table_file(&file_name(&path)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
