//! Translation progress per table file.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::constants::{is_service_key, PLACEHOLDER_TEXTS};
use crate::error::Result;
use crate::table::{load_table, Table, TableSchema};
use crate::validate::{file_name, table_files};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProgress {
    pub name: String,
    pub total: usize,
    pub translated: usize,
}

impl FileProgress {
    pub fn untranslated(&self) -> usize {
        self.total - self.translated
    }

    /// Rounded percentage; an empty file counts as 0%.
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.translated * 100 + self.total / 2) / self.total
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressReport {
    pub files: Vec<FileProgress>,
}

impl ProgressReport {
    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.total).sum()
    }

    pub fn translated(&self) -> usize {
        self.files.iter().map(|f| f.translated).sum()
    }

    /// Overall percentage with two decimals, `None` when nothing was counted.
    pub fn overall_percent(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let pct = self.translated() as f64 / total as f64 * 100.0;
        Some((pct * 100.0).round() / 100.0)
    }

    /// Text table listing incomplete files, then a summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let width = self.files.iter().map(|f| f.name.len()).max().unwrap_or(4) + 2;
        let _ = writeln!(out, "{:<width$}  Total  Done  Todo  %", "File");
        for f in &self.files {
            let pct = f.percent();
            if pct < 100 && f.untranslated() > 0 {
                let bar = "█".repeat(pct / 10);
                let _ = writeln!(
                    out,
                    "{:<width$}  {:5}  {:4}  {:4}  {:3}% {}",
                    f.name,
                    f.total,
                    f.translated,
                    f.untranslated(),
                    pct,
                    bar
                );
            }
        }
        match self.overall_percent() {
            Some(pct) => {
                let _ = writeln!(out, "\n=== SUMMARY ===");
                let _ = writeln!(
                    out,
                    "Translated {} lines from {} ({}% of the total).",
                    self.translated(),
                    self.total(),
                    pct
                );
            }
            None => {
                let _ = writeln!(out, "\nNo data to count.");
            }
        }
        out
    }
}

/// Count one upstream/translation pair.
///
/// Rows with a blank key, blank text, a service key or a placeholder text are not counted.
/// A row is translated when the translation has its key with a different text.
pub fn file_progress(
    name: &str,
    upstream: &Table,
    translation: Option<&Table>,
    schema: &TableSchema,
) -> FileProgress {
    let Some(translation) = translation else {
        return FileProgress {
            name: name.to_string(),
            total: 0,
            translated: 0,
        };
    };
    let counted = |t: &Table| -> HashMap<String, String> {
        t.text_map(&schema.text_column)
            .unwrap_or_default()
            .into_iter()
            .filter(|(k, v)| {
                !is_service_key(k)
                    && !v.trim().is_empty()
                    && !PLACEHOLDER_TEXTS.contains(&v.as_str())
            })
            .collect()
    };
    let translated_texts = counted(translation);
    let upstream_texts = counted(upstream);

    let mut total = 0;
    let mut translated = 0;
    for key in upstream.keys() {
        let Some(up) = upstream_texts.get(key) else {
            continue;
        };
        total += 1;
        if translated_texts.get(key).is_some_and(|tr| tr != up) {
            translated += 1;
        }
    }
    FileProgress {
        name: name.to_string(),
        total,
        translated,
    }
}

/// Progress for every upstream table under `upstream_dir`.
pub fn progress_report(
    upstream_dir: &Path,
    translation_dir: &Path,
    schema: &TableSchema,
) -> Result<ProgressReport> {
    let mut report = ProgressReport::default();
    if !upstream_dir.exists() {
        return Ok(report);
    }
    for path in table_files(upstream_dir)? {
        let name = file_name(&path);
        let upstream = load_table(&path, schema)?;
        let trg_path = translation_dir.join(&name);
        let translation = if trg_path.exists() {
            Some(load_table(&trg_path, schema)?)
        } else {
            None
        };
        report
            .files
            .push(file_progress(&name, &upstream, translation.as_ref(), schema));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::table_from;

    const COLS: &[&str] = &["key", "text", "tooltip"];

    #[test]
    fn test_counts_only_changed_rows() {
        let up = table_from(
            COLS,
            &[
                &["#Loc;1;text/db/names.loc", "", ""],
                &["a", "Hello", ""],
                &["b", "World", ""],
                &["c", "PLACEHOLDER", ""],
                &["d", "", ""],
                &["e", "Bye", ""],
            ],
        );
        let tr = table_from(
            COLS,
            &[&["a", "Bonjour", ""], &["b", "World", ""], &["e", "", ""]],
        );
        let p = file_progress("names.loc.tsv", &up, Some(&tr), &TableSchema::default());
        assert_eq!(p.total, 3);
        assert_eq!(p.translated, 1);
        assert_eq!(p.untranslated(), 2);
        assert_eq!(p.percent(), 33);
    }

    #[test]
    fn test_missing_translation_counts_zero() {
        let up = table_from(COLS, &[&["a", "Hello", ""]]);
        let p = file_progress("x.loc.tsv", &up, None, &TableSchema::default());
        assert_eq!((p.total, p.translated), (0, 0));
    }

    #[test]
    fn test_render_lists_incomplete_files_only() {
        let report = ProgressReport {
            files: vec![
                FileProgress { name: "done.loc.tsv".into(), total: 2, translated: 2 },
                FileProgress { name: "half.loc.tsv".into(), total: 4, translated: 2 },
            ],
        };
        let text = report.render();
        assert!(text.contains("half.loc.tsv"));
        assert!(!text.contains("done.loc.tsv"));
        assert!(text.contains("Translated 4 lines from 6 (66.67% of the total)."));
    }
}
