//! Batch translation of repeated source strings.
//!
//! `extract` collapses rows with identical source text into one group so each distinct
//! string is translated once; `apply` fans the group translations back out to every key.
//! Source texts are compared exactly: case and whitespace matter.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::constants::{
    DEDUP_KEYS_COLUMN, DEDUP_KEY_SEPARATOR, DEDUP_TEXT_COLUMN, DEDUP_TRANSLATE_COLUMN,
};
use crate::error::{LocError, Result};
use crate::table::{is_blank, Table};

/// One row handed to the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupEntry {
    pub key: String,
    /// Text the group is formed on
    pub source: String,
    /// Existing translation, empty when untranslated
    pub translated: String,
}

/// Source text to its single translation, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupTable {
    entries: Vec<(String, String)>,
    by_source: HashMap<String, usize>,
}

impl DedupTable {
    /// Add a group; `false` when the source text is already present.
    pub fn insert(&mut self, source: String, translated: String) -> bool {
        if self.by_source.contains_key(&source) {
            return false;
        }
        self.by_source.insert(source.clone(), self.entries.len());
        self.entries.push((source, translated));
        true
    }

    pub fn translation(&self, source: &str) -> Option<&str> {
        self.by_source
            .get(source)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Replace the translation of an existing group.
    pub fn set_translation(&mut self, source: &str, translated: String) -> bool {
        match self.by_source.get(source) {
            Some(&i) => {
                self.entries[i].1 = translated;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source text to the keys sharing it, plus the reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupIndex {
    groups: Vec<(String, Vec<String>)>,
    by_source: HashMap<String, usize>,
    source_of: HashMap<String, String>,
}

impl GroupIndex {
    /// Record `key` under `source`. A key already indexed is rejected.
    pub fn add(&mut self, source: &str, key: &str) -> bool {
        if self.source_of.contains_key(key) {
            return false;
        }
        let slot = match self.by_source.get(source) {
            Some(&i) => i,
            None => {
                self.by_source.insert(source.to_string(), self.groups.len());
                self.groups.push((source.to_string(), Vec::new()));
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.push(key.to_string());
        self.source_of.insert(key.to_string(), source.to_string());
        true
    }

    /// Source text of the group holding `key`.
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.source_of.get(key).map(String::as_str)
    }

    pub fn keys_for(&self, source: &str) -> Option<&[String]> {
        self.by_source
            .get(source)
            .map(|&i| self.groups[i].1.as_slice())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(s, k)| (s.as_str(), k.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Result of [`extract_dedup`]: the table a translator edits and the index used to apply it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupExtract {
    pub table: DedupTable,
    pub index: GroupIndex,
}

impl DedupExtract {
    /// Dedup file layout: `text`, `translate`, `keys` (comma-joined, original order).
    pub fn to_table(&self) -> Result<Table> {
        let columns = vec![
            DEDUP_TEXT_COLUMN.to_string(),
            DEDUP_TRANSLATE_COLUMN.to_string(),
            DEDUP_KEYS_COLUMN.to_string(),
        ];
        let mut table = Table::new(columns, DEDUP_TEXT_COLUMN)?;
        let separator = DEDUP_KEY_SEPARATOR.to_string();
        for (source, translated) in self.table.entries() {
            let keys = self.index.keys_for(source).unwrap_or(&[]);
            if let Some(bad) = keys.iter().find(|k| !is_indexable(k.as_str())) {
                return Err(unindexable_key(Path::new(""), bad));
            }
            table.push_row(vec![
                source.to_string(),
                translated.to_string(),
                keys.join(separator.as_str()),
            ])?;
        }
        Ok(table)
    }

    /// Read back a dedup file produced by [`DedupExtract::to_table`].
    pub fn from_table(table: &Table) -> Result<Self> {
        let text = column(table, DEDUP_TEXT_COLUMN)?;
        let translate = column(table, DEDUP_TRANSLATE_COLUMN)?;
        let keys = column(table, DEDUP_KEYS_COLUMN)?;

        let mut out = DedupExtract::default();
        let mut problems = Vec::new();
        for row in table.rows() {
            let source = &row.cells[text];
            if !out.table.insert(source.clone(), row.cells[translate].clone()) {
                problems.push(format!("source text repeated: {:?}", source));
                continue;
            }
            for key in row.cells[keys]
                .split(DEDUP_KEY_SEPARATOR)
                .map(str::trim)
                .filter(|k| !k.is_empty())
            {
                if !out.index.add(source, key) {
                    problems.push(format!("key listed in more than one group: {}", key));
                }
            }
        }
        if problems.is_empty() {
            Ok(out)
        } else {
            Err(LocError::malformed(table.origin(), problems))
        }
    }
}

/// Group `entries` by exact source text.
///
/// Groups keep first-occurrence order. A group's translation is the first non-empty
/// translation among its rows in input order, or empty when none is translated.
pub fn extract_dedup(entries: &[DedupEntry]) -> DedupExtract {
    let mut out = DedupExtract::default();
    for entry in entries {
        if !out.index.add(&entry.source, &entry.key) {
            continue;
        }
        if !out.table.insert(entry.source.clone(), entry.translated.clone()) {
            let current = out.table.translation(&entry.source).unwrap_or("");
            if current.is_empty() && !entry.translated.is_empty() {
                out.table
                    .set_translation(&entry.source, entry.translated.clone());
            }
        }
    }
    debug!(
        rows = entries.len(),
        groups = out.table.len(),
        "dedup groups extracted"
    );
    out
}

/// Outcome of [`apply_dedup`].
#[derive(Debug, Clone)]
pub struct Applied {
    pub table: Table,
    /// Cells whose value changed
    pub updated: usize,
}

/// Write every group translation back into `target_column` of `original`.
///
/// Each key is resolved through `index` to its source text and then through `dedup` to the
/// translation. Keys that cannot be resolved are collected and reported together as
/// `UnknownGroup`; nothing is returned in that case. An empty group translation leaves the
/// cell unchanged. Rows are never added, dropped or reordered.
pub fn apply_dedup(
    dedup: &DedupTable,
    index: &GroupIndex,
    original: &Table,
    target_column: &str,
) -> Result<Applied> {
    let target = original
        .column_index(target_column)
        .ok_or_else(|| LocError::MissingColumn(target_column.to_string()))?;

    let mut table = original.clone();
    let mut unknown = Vec::new();
    let mut updated = 0;
    for (i, row) in original.rows().iter().enumerate() {
        let key = original.row_key(row);
        if is_blank(key) {
            continue;
        }
        let translated = index
            .source_of(key)
            .and_then(|source| dedup.translation(source));
        match translated {
            Some(t) if !t.is_empty() && t != row.cells[target] => {
                table.set_cell(i, target, t.to_string());
                updated += 1;
            }
            Some(_) => {}
            None => unknown.push(key.to_string()),
        }
    }

    if !unknown.is_empty() {
        return Err(LocError::UnknownGroup { keys: unknown });
    }
    Ok(Applied { table, updated })
}

/// Entries from a table carrying both the source and the translated text.
pub fn entries_from_columns(
    table: &Table,
    source_column: &str,
    translated_column: &str,
) -> Result<Vec<DedupEntry>> {
    let source = column(table, source_column)?;
    let translated = column(table, translated_column)?;
    collect_entries(table, |_, row| {
        (row.cells[source].clone(), row.cells[translated].clone())
    })
}

/// Entries from a translation table read against its upstream table.
///
/// The source is the upstream text of each key; a translation equal to it counts as
/// untranslated. Keys missing upstream use their own text as source.
pub fn entries_against_upstream(
    translation: &Table,
    upstream: &Table,
    text_column: &str,
) -> Result<Vec<DedupEntry>> {
    let text = column(translation, text_column)?;
    column(upstream, text_column)?;
    collect_entries(translation, |key, row| {
        let current = row.cells[text].clone();
        match upstream.value(key, text_column) {
            Some(up) if up == current => (current, String::new()),
            Some(up) => (up.to_string(), current),
            None => (current, String::new()),
        }
    })
}

/// Entries from a lone table: every text is a source, nothing is translated yet.
pub fn entries_from_text(table: &Table, text_column: &str) -> Result<Vec<DedupEntry>> {
    let text = column(table, text_column)?;
    collect_entries(table, |_, row| (row.cells[text].clone(), String::new()))
}

fn collect_entries<F>(table: &Table, mut pick: F) -> Result<Vec<DedupEntry>>
where
    F: FnMut(&str, &crate::table::Row) -> (String, String),
{
    let mut entries = Vec::with_capacity(table.len());
    for row in table.rows() {
        let key = table.row_key(row);
        if is_blank(key) {
            continue;
        }
        if !is_indexable(key) {
            return Err(unindexable_key(table.origin(), key));
        }
        let (source, translated) = pick(key, row);
        entries.push(DedupEntry {
            key: key.to_string(),
            source,
            translated,
        });
    }
    Ok(entries)
}

fn column(table: &Table, name: &str) -> Result<usize> {
    table.column_index(name).ok_or_else(|| {
        LocError::malformed(
            table.origin(),
            vec![format!("missing required column '{}'", name)],
        )
    })
}

/// Keys are read back from the `keys` column split on the separator and trimmed, so they
/// must survive that unchanged.
fn is_indexable(key: &str) -> bool {
    !key.contains(DEDUP_KEY_SEPARATOR) && key.trim() == key
}

fn unindexable_key(origin: &Path, key: &str) -> LocError {
    LocError::malformed(
        origin,
        vec![format!(
            "key {:?} contains '{}' or surrounding whitespace and cannot be listed in a dedup file",
            key, DEDUP_KEY_SEPARATOR
        )],
    )
}
