//! Command-level operations: load tables from the configured trees, run the pure algorithms
//! and persist the results. Each command takes a `*Params` struct and returns a `*Result`
//! summary that the binaries print.

pub mod dedup;
pub mod fill;
pub mod maintenance;
pub mod merge;

pub use dedup::{
    dedup_apply, dedup_extract, DedupApplyParams, DedupApplyResult, DedupExtractParams,
    DedupExtractResult,
};
pub use fill::{merge_patch, split_master, FillParams, FillResult};
pub use maintenance::{
    patch_lua_file, sync_repos, sync_translation, unescape_files, PatchLuaParams, PatchLuaResult,
    UnescapeParams, UnescapeResult,
};
pub use merge::{merge, FileMerge, MergeParams, MergeResult};

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{LocError, Result};
use crate::table::{render_table, writer::write_atomic, Table};

/// Persist `table` to `path` unless the file already holds exactly this content.
///
/// Returns whether the file was (or, with `dry_run`, would have been) written.
pub(crate) fn persist_if_changed(path: &Path, table: &Table, dry_run: bool) -> Result<bool> {
    let rendered = render_table(table)?;
    let current = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(LocError::io(path, e)),
    };
    if current.as_deref() == Some(rendered.as_bytes()) {
        return Ok(false);
    }
    if dry_run {
        debug!(path = %path.display(), "[dry-run] would write");
    } else {
        write_atomic(path, rendered.as_bytes())?;
        debug!(path = %path.display(), rows = table.len(), "table written");
    }
    Ok(true)
}

/// Fail with a configuration error when `dir` is not an existing directory.
pub(crate) fn require_dir(dir: &Path, what: &str) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(LocError::Config(format!(
            "{} does not exist: {}",
            what,
            dir.display()
        )))
    }
}
