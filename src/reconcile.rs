//! Reconciles a translation table with its upstream table.
//!
//! The output always follows upstream row order: keys new upstream appear at their upstream
//! position, not appended at the end. The header is upstream's header. For keys present on both
//! sides the schema's translated columns keep the translation's value, every other column is
//! refreshed from upstream. Translation rows whose key left upstream move to the archive table
//! in their original order.

use tracing::debug;

use crate::error::Result;
use crate::table::{is_blank, Table, TableSchema};

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Fill empty translated cells with the upstream text
    pub fill_empty: bool,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Updated translation table
    pub table: Table,
    /// Rows removed from the translation, translation header
    pub archived: Table,
    /// Keys added from upstream, upstream order
    pub added: Vec<String>,
    /// Keys moved to the archive, translation order
    pub removed: Vec<String>,
    /// Cells filled from upstream because the translation was empty
    pub filled: usize,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || self.filled > 0
    }
}

/// Reconcile `translation` against `upstream`.
///
/// Both tables are checked against `schema` before anything else; a missing required column
/// fails with `MalformedTable`. Duplicate keys cannot reach this point because [`Table`]
/// rejects them on construction.
pub fn reconcile(
    upstream: &Table,
    translation: &Table,
    schema: &TableSchema,
    options: &ReconcileOptions,
) -> Result<Reconciliation> {
    schema.check(upstream)?;
    schema.check(translation)?;

    // For each upstream column, the translation column it is taken from (if any)
    let carried: Vec<Option<usize>> = upstream
        .columns()
        .iter()
        .map(|c| {
            if schema.translated_columns.contains(c) {
                translation.column_index(c)
            } else {
                None
            }
        })
        .collect();

    let mut table = Table::new(upstream.columns().to_vec(), &schema.key_column)?;
    table.set_origin(translation.origin());
    let mut added = Vec::new();
    let mut filled = 0;

    for row in upstream.rows() {
        let key = upstream.row_key(row);
        if is_blank(key) {
            continue;
        }
        let cells = match translation.get(key) {
            Some(existing) => row
                .cells
                .iter()
                .zip(&carried)
                .map(|(up, from)| match from {
                    Some(idx) => {
                        let kept = &existing.cells[*idx];
                        if kept.is_empty() && !up.is_empty() && options.fill_empty {
                            filled += 1;
                            up.clone()
                        } else {
                            kept.clone()
                        }
                    }
                    None => up.clone(),
                })
                .collect(),
            None => {
                added.push(key.to_string());
                row.cells.clone()
            }
        };
        table.push_row(cells)?;
    }

    let mut archived = Table::new(translation.columns().to_vec(), &schema.key_column)?;
    archived.set_origin(translation.origin());
    let mut removed = Vec::new();
    for row in translation.rows() {
        let key = translation.row_key(row);
        if is_blank(key) || upstream.contains_key(key) {
            continue;
        }
        removed.push(key.to_string());
        archived.push_row(row.cells.clone())?;
    }

    debug!(
        added = added.len(),
        removed = removed.len(),
        filled,
        "reconciled {}",
        translation.origin().display()
    );
    Ok(Reconciliation {
        table,
        archived,
        added,
        removed,
        filled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocError;
    use crate::table::table_from;
    use std::collections::HashSet;

    const COLS: &[&str] = &["key", "text", "tooltip"];

    fn upstream() -> Table {
        table_from(
            COLS,
            &[&["a", "Hello", ""], &["b", "World", ""], &["c", "Bye", ""]],
        )
    }

    fn translation() -> Table {
        table_from(
            COLS,
            &[&["a", "Bonjour", ""], &["b", "Monde", ""], &["d", "Old", ""]],
        )
    }

    fn texts(t: &Table) -> Vec<(&str, &str)> {
        t.keys().map(|k| (k, t.value(k, "text").unwrap())).collect()
    }

    #[test]
    fn test_adds_new_archives_removed_keeps_translations() {
        let r = reconcile(&upstream(), &translation(), &TableSchema::default(), &Default::default())
            .unwrap();
        assert_eq!(
            texts(&r.table),
            vec![("a", "Bonjour"), ("b", "Monde"), ("c", "Bye")]
        );
        assert_eq!(texts(&r.archived), vec![("d", "Old")]);
        assert_eq!(r.added, vec!["c"]);
        assert_eq!(r.removed, vec!["d"]);
        assert!(r.has_changes());
    }

    #[test]
    fn test_new_keys_follow_upstream_position() {
        let up = table_from(
            COLS,
            &[
                &["n1", "New", ""],
                &["a", "Hello", ""],
                &["n2", "Two", ""],
                &["b", "World", ""],
            ],
        );
        let tr = table_from(COLS, &[&["b", "Monde", ""], &["a", "Bonjour", ""]]);
        let r = reconcile(&up, &tr, &TableSchema::default(), &Default::default()).unwrap();
        assert_eq!(r.table.keys().collect::<Vec<_>>(), vec!["n1", "a", "n2", "b"]);
    }

    #[test]
    fn test_is_idempotent() {
        let schema = TableSchema::default();
        let first = reconcile(&upstream(), &translation(), &schema, &Default::default()).unwrap();
        let second = reconcile(&upstream(), &first.table, &schema, &Default::default()).unwrap();
        assert_eq!(second.table.rows(), first.table.rows());
        assert!(second.added.is_empty());
        assert!(second.removed.is_empty());
        assert!(!second.has_changes());
    }

    #[test]
    fn test_no_orphans_and_archive_complete() {
        let up = upstream();
        let tr = translation();
        let r = reconcile(&up, &tr, &TableSchema::default(), &Default::default()).unwrap();
        assert!(r.table.keys().all(|k| up.contains_key(k)));

        let before: HashSet<&str> = tr.keys().collect();
        let after: HashSet<&str> = r.table.keys().collect();
        let gone: Vec<&str> = tr.keys().filter(|k| !after.contains(k)).collect();
        let archived: Vec<&str> = r.archived.keys().collect();
        assert_eq!(gone, archived);
        assert!(archived.iter().all(|k| before.contains(k)));
    }

    #[test]
    fn test_metadata_columns_follow_upstream() {
        let up = table_from(COLS, &[&["a", "Hello", "new tip"]]);
        let tr = table_from(COLS, &[&["a", "Bonjour", "old tip"]]);
        let r = reconcile(&up, &tr, &TableSchema::default(), &Default::default()).unwrap();
        assert_eq!(r.table.value("a", "text"), Some("Bonjour"));
        assert_eq!(r.table.value("a", "tooltip"), Some("new tip"));
    }

    #[test]
    fn test_empty_translation_kept_unless_fill_requested() {
        let up = table_from(COLS, &[&["a", "Hello", ""]]);
        let tr = table_from(COLS, &[&["a", "", ""]]);
        let schema = TableSchema::default();

        let kept = reconcile(&up, &tr, &schema, &Default::default()).unwrap();
        assert_eq!(kept.table.value("a", "text"), Some(""));
        assert_eq!(kept.filled, 0);

        let filled = reconcile(&up, &tr, &schema, &ReconcileOptions { fill_empty: true }).unwrap();
        assert_eq!(filled.table.value("a", "text"), Some("Hello"));
        assert_eq!(filled.filled, 1);
    }

    #[test]
    fn test_missing_columns_fail_before_merging() {
        let tr = table_from(&["key", "text"], &[&["a", "Bonjour"]]);
        let err = reconcile(&upstream(), &tr, &TableSchema::default(), &Default::default())
            .unwrap_err();
        assert!(matches!(err, LocError::MalformedTable { .. }));
    }

    #[test]
    fn test_blank_keys_are_dropped() {
        let up = table_from(COLS, &[&["", "", ""], &["a", "Hello", ""]]);
        let tr = table_from(COLS, &[&["a", "Bonjour", ""], &["  ", "stray", ""]]);
        let r = reconcile(&up, &tr, &TableSchema::default(), &Default::default()).unwrap();
        assert_eq!(r.table.len(), 1);
        assert!(r.archived.is_empty());
    }
}
