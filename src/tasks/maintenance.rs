use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{persist_if_changed, require_dir};
use crate::config::Config;
use crate::error::{LocError, Result};
use crate::lua_patch::{load_text_dir, patch_lua, LuaSources};
use crate::repos::{GitCli, RepoOutcome, RepoRunner};
use crate::sync::{sync_tree, SyncAction};
use crate::table::{load_table, writer::write_atomic, TableSchema};
use crate::unescape::unescape_column;
use crate::validate::{file_name, table_files};

#[derive(Debug, Clone, Default)]
pub struct UnescapeParams {
    /// Files or directories to fix; the whole translation tree when empty
    pub paths: Vec<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UnescapeResult {
    /// (file name, rows changed)
    pub files: Vec<(String, usize)>,
    /// Files without a text column
    pub skipped: Vec<String>,
    /// Given paths that do not exist
    pub missing: Vec<PathBuf>,
}

/// Undo doubled quotes in the text column of translation tables.
///
/// Directories are expanded to their `*.loc.tsv` files, sorted by name. Paths that do not
/// exist are reported and skipped.
pub fn unescape_files(config: &Config, params: &UnescapeParams) -> Result<UnescapeResult> {
    let mut result = UnescapeResult::default();
    let paths = if params.paths.is_empty() {
        require_dir(&config.translation_db, "TRANSLATION_DB")?;
        table_files(&config.translation_db)?
    } else {
        let mut paths = Vec::new();
        for path in params.paths.iter().map(|p| config.resolve(p)) {
            if path.is_dir() {
                paths.extend(table_files(&path)?);
            } else if path.exists() {
                paths.push(path);
            } else {
                warn!(path = %path.display(), "path does not exist, skipped");
                result.missing.push(path);
            }
        }
        paths
    };

    // Only the key column is required so tables of any layout can be processed
    let schema = TableSchema {
        required_columns: vec![config.schema.key_column.clone()],
        ..config.schema.clone()
    };

    for path in paths {
        let name = file_name(&path);
        let mut table = load_table(&path, &schema)?;
        match unescape_column(&mut table, &schema.text_column) {
            None => {
                debug!(file = %name, "no text column, skipped");
                result.skipped.push(name);
            }
            Some(changed) => {
                if changed > 0 {
                    persist_if_changed(&path, &table, params.dry_run)?;
                    info!(file = %name, changed, "quotes unescaped");
                }
                result.files.push((name, changed));
            }
        }
    }
    Ok(result)
}

/// Mirror `src` (default: the project root) into `dst` (default: the configured `DST`).
pub fn sync_translation(
    config: &Config,
    src: Option<PathBuf>,
    dst: Option<PathBuf>,
    dry_run: bool,
) -> Result<Vec<SyncAction>> {
    let src = src
        .map(|s| config.resolve(s))
        .unwrap_or_else(|| config.project_root.clone());
    let dst = match dst {
        Some(d) => config.resolve(d),
        None => config
            .dst
            .clone()
            .ok_or_else(|| LocError::Config("DST not set in .env or environment".to_string()))?,
    };
    sync_tree(&src, &dst, dry_run)
}

#[derive(Debug, Clone, Default)]
pub struct PatchLuaParams {
    /// Name of the Lua table to patch
    pub table: String,
    /// Key prefix joined to each Lua key with `_`
    pub prefix: String,
    /// Lua file; defaults to `PATH_LUA_FILE`
    pub lua_file: Option<PathBuf>,
    /// Translated tables; defaults to the translation tree
    pub translated_dir: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct PatchLuaResult {
    pub lua_file: PathBuf,
    pub replaced: usize,
}

/// Substitute translated texts into one table of a Lua source file.
pub fn patch_lua_file(config: &Config, params: &PatchLuaParams) -> Result<PatchLuaResult> {
    let schema = &config.schema;
    let lua_file = params
        .lua_file
        .as_ref()
        .map(|p| config.resolve(p))
        .unwrap_or_else(|| config.lua_file.clone());
    let translated_dir = params
        .translated_dir
        .as_ref()
        .map(|p| config.resolve(p))
        .unwrap_or_else(|| config.translation_db.clone());

    require_dir(&translated_dir, "translated tables")?;
    require_dir(&config.dir_up2, "DIR_UP2")?;
    let source = fs::read_to_string(&lua_file).map_err(|e| LocError::io(&lua_file, e))?;

    let sources = LuaSources {
        translated: load_text_dir(&translated_dir, schema)?,
        upstream: load_text_dir(&config.dir_up2, schema)?,
        secondary: match &config.dir_up1 {
            Some(dir) if dir.is_dir() => Some(load_text_dir(dir, schema)?),
            _ => None,
        },
    };

    let (patched, replaced) = patch_lua(&source, &params.table, &params.prefix, &sources)?;
    if replaced > 0 && !params.dry_run {
        write_atomic(&lua_file, patched.as_bytes())?;
    }
    info!(lua = %lua_file.display(), table = %params.table, replaced, "lua table patched");
    Ok(PatchLuaResult { lua_file, replaced })
}

/// Clone or fast-forward every repository listed in the repos file.
pub fn sync_repos(config: &Config, dry_run: bool) -> Result<Vec<(String, RepoOutcome)>> {
    let repos = config.load_repos()?;
    if repos.is_empty() {
        debug!(file = %config.repos_file.display(), "no repositories configured");
    }
    RepoRunner::new(GitCli::default(), dry_run).sync_all(&repos)
}
