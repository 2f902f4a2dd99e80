use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use super::{persist_if_changed, require_dir};
use crate::config::Config;
use crate::error::Result;
use crate::fill::fill_untranslated;
use crate::table::{load_table, Table, TableSchema};
use crate::validate::{file_name, table_files};

#[derive(Debug, Clone, Default)]
pub struct FillParams {
    /// Restrict the run to these table file names
    pub files: Vec<String>,
    /// Directory receiving the filled tables; defaults to the translation tree
    pub target: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FillResult {
    /// (file name, rows filled, file created)
    pub files: Vec<(String, usize, bool)>,
    /// Files skipped because one of the trees lacks them
    pub skipped: Vec<String>,
}

impl FillResult {
    pub fn updated(&self) -> usize {
        self.files.iter().map(|(_, n, _)| n).sum()
    }
}

/// Copy finished translations from `PATCH_DB` into untranslated rows of the translation tree.
pub fn merge_patch(config: &Config, params: &FillParams) -> Result<FillResult> {
    let schema = &config.schema;
    let patch_db = config.require_patch_db()?;
    let target_dir = target_dir(config, params);
    require_dir(&target_dir, "TRANSLATION_DB")?;
    require_dir(patch_db, "PATCH_DB")?;

    let mut result = FillResult::default();
    for trg_path in selected(&target_dir, &params.files)? {
        let name = file_name(&trg_path);
        let span = info_span!("merge_patch", file = %name);
        let _enter = span.enter();

        let up_path = config.upstream_db.join(&name);
        let patch_path = patch_db.join(&name);
        if !trg_path.exists() || !up_path.exists() || !patch_path.exists() {
            warn!("missing in one of the trees, skipped");
            result.skipped.push(name);
            continue;
        }

        let upstream = texts(&load_table(&up_path, schema)?, schema);
        let donor = texts(&load_table(&patch_path, schema)?, schema);
        let mut translation = load_table(&trg_path, schema)?;
        let filled = fill_untranslated(&mut translation, &upstream, &donor, &schema.text_column)?;
        if filled > 0 {
            persist_if_changed(&trg_path, &translation, params.dry_run)?;
            info!(filled, "patch translations merged");
        }
        result.files.push((name, filled, false));
    }
    Ok(result)
}

/// Spread a master localisation table over per-file tables shaped like the upstream tree.
///
/// A missing target file starts as a copy of its upstream file.
pub fn split_master(config: &Config, params: &FillParams) -> Result<FillResult> {
    let schema = &config.schema;
    let master_path = config.require_split_loc_file()?;
    require_dir(&config.upstream_db, "UPSTREAM_DB")?;
    let target_dir = target_dir(config, params);

    let donor = texts(&load_table(master_path, schema)?, schema);
    let mut result = FillResult::default();
    for up_path in selected(&config.upstream_db, &params.files)? {
        let name = file_name(&up_path);
        let span = info_span!("split_master", file = %name);
        let _enter = span.enter();

        if !up_path.exists() {
            warn!("no upstream reference, skipped");
            result.skipped.push(name);
            continue;
        }
        let upstream = load_table(&up_path, schema)?;
        let trg_path = target_dir.join(&name);
        let created = !trg_path.exists();
        let mut translation = if created {
            let mut copy = upstream.clone();
            copy.set_origin(&trg_path);
            copy
        } else {
            load_table(&trg_path, schema)?
        };

        let filled = fill_untranslated(
            &mut translation,
            &texts(&upstream, schema),
            &donor,
            &schema.text_column,
        )?;
        if filled > 0 || created {
            persist_if_changed(&trg_path, &translation, params.dry_run)?;
            info!(filled, created, "master texts distributed");
        }
        result.files.push((name, filled, created));
    }
    Ok(result)
}

fn target_dir(config: &Config, params: &FillParams) -> PathBuf {
    params
        .target
        .as_ref()
        .map(|t| config.resolve(t))
        .unwrap_or_else(|| config.translation_db.clone())
}

/// Every table of `dir`, or only the named ones.
fn selected(dir: &Path, files: &[String]) -> Result<Vec<PathBuf>> {
    if files.is_empty() {
        table_files(dir)
    } else {
        Ok(files.iter().map(|f| dir.join(f)).collect())
    }
}

fn texts(table: &Table, schema: &TableSchema) -> HashMap<String, String> {
    table.text_map(&schema.text_column).unwrap_or_default()
}
