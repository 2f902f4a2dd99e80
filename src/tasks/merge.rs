use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use super::{persist_if_changed, require_dir};
use crate::config::Config;
use crate::constants::{table_stem, ARCHIVE_STAMP_FORMAT};
use crate::error::Result;
use crate::reconcile::{reconcile, ReconcileOptions};
use crate::table::{append_table, load_table, Table, TableSchema};
use crate::validate::{file_name, table_files, validate_dir};

#[derive(Debug, Clone, Default)]
pub struct MergeParams {
    /// Report what would change without writing anything
    pub dry_run: bool,
    /// Fill empty translated cells with the upstream text
    pub fill_empty: bool,
}

/// Outcome for one upstream table.
#[derive(Debug, Clone)]
pub struct FileMerge {
    pub name: String,
    pub added: usize,
    pub removed: usize,
    pub filled: usize,
    /// The translation file did not exist before this run
    pub created: bool,
    /// The translation file content changed
    pub written: bool,
    /// Archive receiving the removed rows
    pub archive: Option<PathBuf>,
}

impl FileMerge {
    pub fn has_changes(&self) -> bool {
        self.written || self.archive.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub files: Vec<FileMerge>,
    pub dry_run: bool,
}

impl MergeResult {
    pub fn added(&self) -> usize {
        self.files.iter().map(|f| f.added).sum()
    }

    pub fn removed(&self) -> usize {
        self.files.iter().map(|f| f.removed).sum()
    }

    pub fn filled(&self) -> usize {
        self.files.iter().map(|f| f.filled).sum()
    }

    pub fn changed(&self) -> impl Iterator<Item = &FileMerge> {
        self.files.iter().filter(|f| f.has_changes())
    }
}

/// Bring every translation table in line with its upstream table.
///
/// Both trees are validated up front and nothing is written when any table is malformed.
/// Rows removed upstream are appended to `<obsolete_dir>/<stem>.<timestamp>.tsv`; all files
/// of one run share the timestamp.
pub fn merge(config: &Config, params: &MergeParams) -> Result<MergeResult> {
    let schema = &config.schema;
    require_dir(&config.upstream_db, "UPSTREAM_DB")?;

    for dir in [&config.upstream_db, &config.translation_db] {
        let report = validate_dir(dir, schema)?;
        for file in report.files.iter().filter(|f| !f.warnings.is_empty()) {
            for warning in &file.warnings {
                warn!(file = %file_name(&file.path), "{}", warning);
            }
        }
        report.into_result()?;
    }

    let stamp = Local::now().format(ARCHIVE_STAMP_FORMAT).to_string();
    let options = ReconcileOptions {
        fill_empty: params.fill_empty,
    };
    let mut result = MergeResult {
        files: Vec::new(),
        dry_run: params.dry_run,
    };

    for src_path in table_files(&config.upstream_db)? {
        let name = file_name(&src_path);
        let span = info_span!("merge", file = %name);
        let _enter = span.enter();

        let upstream = load_table(&src_path, schema)?;
        let trg_path = config.translation_db.join(&name);
        let created = !trg_path.exists();
        let translation = if created {
            empty_like(&upstream, &trg_path, schema)?
        } else {
            load_table(&trg_path, schema)?
        };

        let rec = reconcile(&upstream, &translation, schema, &options)?;

        // Removed rows must be archived before they disappear from the translation
        let archive = if rec.archived.is_empty() {
            None
        } else {
            let path = archive_path(&config.obsolete_dir, &name, &stamp);
            if !params.dry_run {
                append_table(&path, &rec.archived)?;
            }
            Some(path)
        };
        let written = persist_if_changed(&trg_path, &rec.table, params.dry_run)?;

        if written || rec.has_changes() {
            info!(
                added = rec.added.len(),
                removed = rec.removed.len(),
                filled = rec.filled,
                dry_run = params.dry_run,
                "translation reconciled"
            );
        }
        result.files.push(FileMerge {
            name,
            added: rec.added.len(),
            removed: rec.removed.len(),
            filled: rec.filled,
            created,
            written,
            archive,
        });
    }
    Ok(result)
}

/// `<obsolete_dir>/names.loc.20240101T120000.tsv` for `names.loc.tsv`.
pub fn archive_path(obsolete_dir: &Path, name: &str, stamp: &str) -> PathBuf {
    obsolete_dir.join(format!("{}.{}.tsv", table_stem(name), stamp))
}

fn empty_like(upstream: &Table, origin: &Path, schema: &TableSchema) -> Result<Table> {
    let mut table = Table::new(upstream.columns().to_vec(), &schema.key_column)?;
    table.set_origin(origin);
    Ok(table)
}
