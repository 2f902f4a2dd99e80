//! Ordered in-memory localisation tables.
//!
//! A [`Table`] keeps rows in file order and an index from key to row position. Rows whose
//! key is blank are kept so files round-trip unchanged, but they are not part of the key set.

pub mod loader;
pub mod writer;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::constants::{KEY_COLUMN, TEXT_COLUMN, TOOLTIP_COLUMN};
use crate::error::{LocError, Result};

pub use loader::{load_table, parse_table};
pub use writer::{append_table, render_table, write_table};

/// Column layout the tools expect from a localisation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Column holding the unique row key
    pub key_column: String,
    /// Column holding the (source or translated) text
    pub text_column: String,
    /// Header a valid table must have, in order
    pub required_columns: Vec<String>,
    /// Columns whose translated values survive reconciliation
    pub translated_columns: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            key_column: KEY_COLUMN.to_string(),
            text_column: TEXT_COLUMN.to_string(),
            required_columns: vec![
                KEY_COLUMN.to_string(),
                TEXT_COLUMN.to_string(),
                TOOLTIP_COLUMN.to_string(),
            ],
            translated_columns: vec![TEXT_COLUMN.to_string()],
        }
    }
}

impl TableSchema {
    /// Default schema with a different required header.
    pub fn with_required_columns(columns: Vec<String>) -> Result<Self> {
        let schema = Self {
            required_columns: columns,
            ..Self::default()
        };
        for needed in [&schema.key_column, &schema.text_column] {
            if !schema.required_columns.contains(needed) {
                return Err(LocError::Config(format!(
                    "required columns {:?} must include '{}'",
                    schema.required_columns, needed
                )));
            }
        }
        Ok(schema)
    }

    /// Required columns absent from `table`.
    pub fn missing_columns(&self, table: &Table) -> Vec<String> {
        self.required_columns
            .iter()
            .filter(|c| table.column_index(c).is_none())
            .cloned()
            .collect()
    }

    /// Fail with `MalformedTable` when a required column is missing.
    pub fn check(&self, table: &Table) -> Result<()> {
        let missing = self.missing_columns(table);
        if missing.is_empty() {
            return Ok(());
        }
        Err(LocError::malformed(
            table.origin(),
            missing
                .into_iter()
                .map(|c| format!("missing required column '{}'", c))
                .collect(),
        ))
    }
}

/// One table row; `cells` always has one entry per header column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    key_idx: usize,
    rows: Vec<Row>,
    index: HashMap<String, usize>,
    origin: PathBuf,
}

impl Table {
    /// Empty table with the given header. The key column must be part of it.
    pub fn new(columns: Vec<String>, key_column: &str) -> Result<Self> {
        let key_idx = columns
            .iter()
            .position(|c| c == key_column)
            .ok_or_else(|| LocError::MissingColumn(key_column.to_string()))?;
        Ok(Self {
            columns,
            key_idx,
            rows: Vec::new(),
            index: HashMap::new(),
            origin: PathBuf::new(),
        })
    }

    /// Build a table from raw records, collecting every structural problem.
    ///
    /// Short records are padded with empty cells; long records and repeated keys are
    /// reported together as one `MalformedTable`.
    pub fn from_records(
        columns: Vec<String>,
        key_column: &str,
        records: Vec<Vec<String>>,
        origin: &Path,
    ) -> Result<Self> {
        let mut table = Self::new(columns, key_column).map_err(|_| {
            LocError::malformed(origin, vec![format!("missing required column '{}'", key_column)])
        })?;
        table.origin = origin.to_path_buf();

        let width = table.columns.len();
        let mut problems = Vec::new();
        let mut duplicates: Vec<String> = Vec::new();
        for (i, mut cells) in records.into_iter().enumerate() {
            // +2: header line and 1-based numbering
            let line = i + 2;
            if cells.len() > width {
                problems.push(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    width,
                    cells.len()
                ));
                continue;
            }
            cells.resize(width, String::new());
            let key = cells[table.key_idx].clone();
            if !is_blank(&key) && table.index.contains_key(&key) {
                if !duplicates.contains(&key) {
                    duplicates.push(key);
                }
                continue;
            }
            table.push_unchecked(Row { cells });
        }
        if !duplicates.is_empty() {
            problems.push(format!("key duplicates: {}", duplicates.join(", ")));
        }
        if problems.is_empty() {
            Ok(table)
        } else {
            Err(LocError::malformed(origin, problems))
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn key_column(&self) -> &str {
        &self.columns[self.key_idx]
    }

    /// File the table was read from (empty for tables built in memory).
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: impl Into<PathBuf>) {
        self.origin = origin.into();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_key<'a>(&self, row: &'a Row) -> &'a str {
        &row.cells[self.key_idx]
    }

    /// Keys in row order, blank keys excluded.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.cells[self.key_idx].as_str())
            .filter(|k| !is_blank(k))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Cell of `key` in column `column`.
    pub fn value(&self, key: &str, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.get(key).map(|r| r.cells[col].as_str())
    }

    /// Append a row, rejecting a repeated key or a wrong width.
    pub fn push_row(&mut self, cells: Vec<String>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(LocError::malformed(
                &self.origin,
                vec![format!(
                    "row has {} fields, header has {}",
                    cells.len(),
                    self.columns.len()
                )],
            ));
        }
        let key = &cells[self.key_idx];
        if !is_blank(key) && self.index.contains_key(key) {
            return Err(LocError::malformed(
                &self.origin,
                vec![format!("key duplicates: {}", key)],
            ));
        }
        self.push_unchecked(Row { cells });
        Ok(())
    }

    /// Overwrite one cell. The key column cannot be changed this way.
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        debug_assert_ne!(column, self.key_idx, "key cells are immutable");
        if column != self.key_idx {
            self.rows[row].cells[column] = value;
        }
    }

    fn push_unchecked(&mut self, row: Row) {
        let key = &row.cells[self.key_idx];
        if !is_blank(key) {
            self.index.insert(key.clone(), self.rows.len());
        }
        self.rows.push(row);
    }

    /// Key to text map over indexed rows, used as a lookup dictionary.
    pub fn text_map(&self, column: &str) -> Option<HashMap<String, String>> {
        let col = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .filter(|r| !is_blank(&r.cells[self.key_idx]))
                .map(|r| (r.cells[self.key_idx].clone(), r.cells[col].clone()))
                .collect(),
        )
    }
}

/// Keys made only of whitespace do not identify a row.
pub fn is_blank(key: &str) -> bool {
    key.trim().is_empty()
}

#[cfg(test)]
pub(crate) fn table_from(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_records(
        columns.iter().map(|c| c.to_string()).collect(),
        columns[0],
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
        Path::new("test.loc.tsv"),
    )
    .expect("valid test table")
}
