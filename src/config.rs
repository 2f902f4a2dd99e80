use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LocError, Result};
use crate::repos::RepoSpec;
use crate::table::TableSchema;

// Defaults used when a key is absent from both the `.env` file and the environment
const DEFAULT_UPSTREAM_DB: &str = "_upstream/en/text/db";
const DEFAULT_TRANSLATION_DB: &str = "translation/text/db";
const DEFAULT_OBSOLETE_DIR: &str = "_obsolete";
const DEFAULT_TEMP_DIR: &str = "_temp";
const DEFAULT_DIR_UP2: &str = "_upstream/en/text/db";
const DEFAULT_LUA_FILE: &str = "lua_scripts/frontend_strings.lua";
const DEFAULT_REPOS_FILE: &str = "repos.toml";

/// Every variable the tools understand. Anything else in `.env` is ignored.
const KNOWN_KEYS: &[&str] = &[
    "UPSTREAM_DB",
    "TRANSLATION_DB",
    "PATCH_DB",
    "OBSOLETE_DIR",
    "TEMP_DIR",
    "DIR_UP1",
    "DIR_UP2",
    "PATH_LUA_FILE",
    "SPLIT_LOC_FILE",
    "DST",
    "REPOS_FILE",
    "REQUIRED_COLUMNS",
];

/// Resolved project configuration, built once at startup and passed to each command.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub env_file: PathBuf,
    /// Upstream (source language) tables, e.g. `_upstream/en/text/db`
    pub upstream_db: PathBuf,
    /// Maintained translation tables, e.g. `translation/text/db`
    pub translation_db: PathBuf,
    /// Optional tree of finished translations from another release
    pub patch_db: Option<PathBuf>,
    /// Where reconciliation archives removed rows
    pub obsolete_dir: PathBuf,
    /// Scratch area for dedup files
    pub temp_dir: PathBuf,
    /// Secondary upstream consulted by the Lua patcher
    pub dir_up1: Option<PathBuf>,
    /// Primary upstream consulted by the Lua patcher
    pub dir_up2: PathBuf,
    pub lua_file: PathBuf,
    /// Master localisation file split into per-file tables
    pub split_loc_file: Option<PathBuf>,
    /// Sync destination (usually the game's mod directory)
    pub dst: Option<PathBuf>,
    pub repos_file: PathBuf,
    pub schema: TableSchema,
}

impl Config {
    /// Load configuration for `project_root`.
    ///
    /// Values come from `env_file` (default `<project_root>/.env`) first and fall back to the
    /// process environment, then to built-in defaults. The process environment is never
    /// modified.
    pub fn load(project_root: &Path, env_file: Option<&Path>) -> Result<Self> {
        let root = absolute(project_root)?;
        let env_path = env_file
            .map(|p| resolve_path(&root, p))
            .unwrap_or_else(|| root.join(".env"));

        let mut vars: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| KNOWN_KEYS.contains(&k.as_str()))
            .collect();
        vars.extend(read_env_file(&env_path)?);

        Self::from_vars(root, env_path, &vars)
    }

    /// Build a configuration from an explicit variable map.
    pub fn from_vars(
        project_root: PathBuf,
        env_file: PathBuf,
        vars: &HashMap<String, String>,
    ) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let path_or =
            |key: &str, default: &str| resolve_path(&project_root, get(key).unwrap_or(default));
        let opt_path = |key: &str| get(key).map(|v| resolve_path(&project_root, v));

        let schema = match get("REQUIRED_COLUMNS") {
            Some(cols) => TableSchema::with_required_columns(
                cols.split(',').map(|c| c.trim().to_string()).collect(),
            )?,
            None => TableSchema::default(),
        };

        let config = Config {
            upstream_db: path_or("UPSTREAM_DB", DEFAULT_UPSTREAM_DB),
            translation_db: path_or("TRANSLATION_DB", DEFAULT_TRANSLATION_DB),
            patch_db: opt_path("PATCH_DB"),
            obsolete_dir: path_or("OBSOLETE_DIR", DEFAULT_OBSOLETE_DIR),
            temp_dir: path_or("TEMP_DIR", DEFAULT_TEMP_DIR),
            dir_up1: opt_path("DIR_UP1"),
            dir_up2: path_or("DIR_UP2", DEFAULT_DIR_UP2),
            lua_file: path_or("PATH_LUA_FILE", DEFAULT_LUA_FILE),
            split_loc_file: opt_path("SPLIT_LOC_FILE"),
            dst: opt_path("DST"),
            repos_file: path_or("REPOS_FILE", DEFAULT_REPOS_FILE),
            schema,
            project_root: project_root.clone(),
            env_file,
        };
        debug!(?config, "configuration resolved");
        Ok(config)
    }

    pub fn require_patch_db(&self) -> Result<&Path> {
        self.patch_db
            .as_deref()
            .ok_or_else(|| LocError::Config("PATCH_DB not set in .env or environment".to_string()))
    }

    pub fn require_split_loc_file(&self) -> Result<&Path> {
        self.split_loc_file.as_deref().ok_or_else(|| {
            LocError::Config("SPLIT_LOC_FILE not set in .env or environment".to_string())
        })
    }

    /// Resolve a user-supplied path against the project root.
    pub fn resolve(&self, value: impl AsRef<Path>) -> PathBuf {
        resolve_path(&self.project_root, value)
    }

    /// Load the repository list used by `repos`.
    pub fn load_repos(&self) -> Result<Vec<RepoSpec>> {
        let content = fs::read_to_string(&self.repos_file)
            .map_err(|e| LocError::io(&self.repos_file, e))?;
        let file: ReposFile = toml::from_str(&content)?;
        Ok(file
            .repo
            .into_iter()
            .map(|mut r| {
                r.path = self.resolve(&r.path);
                r
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ReposFile {
    #[serde(default)]
    repo: Vec<RepoSpec>,
}

/// Absolute paths are kept, relative ones are joined onto `root`. `~` is expanded.
pub fn resolve_path(root: &Path, value: impl AsRef<Path>) -> PathBuf {
    let value = value.as_ref();
    let expanded = match value.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => value.to_path_buf(),
        },
        Err(_) => value.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().map_err(|e| LocError::io(".", e))?;
    Ok(cwd.join(path))
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let iter = dotenv::from_path_iter(path)
        .map_err(|e| LocError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let mut vars = HashMap::new();
    for item in iter {
        let (k, v) =
            item.map_err(|e| LocError::Config(format!("Bad line in {}: {}", path.display(), e)))?;
        vars.insert(k, v);
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_resolve_against_root() {
        let root = PathBuf::from("/proj");
        let cfg = Config::from_vars(root.clone(), root.join(".env"), &HashMap::new()).unwrap();
        assert_eq!(cfg.upstream_db, PathBuf::from("/proj/_upstream/en/text/db"));
        assert_eq!(cfg.translation_db, PathBuf::from("/proj/translation/text/db"));
        assert_eq!(cfg.obsolete_dir, PathBuf::from("/proj/_obsolete"));
        assert!(cfg.patch_db.is_none());
        assert!(cfg.dst.is_none());
        assert!(cfg.require_patch_db().is_err());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let root = PathBuf::from("/proj");
        let cfg = Config::from_vars(
            root.clone(),
            root.join(".env"),
            &vars(&[("PATCH_DB", "_upstream/ru/text/db"), ("DST", "/games/mod")]),
        )
        .unwrap();
        assert_eq!(cfg.require_patch_db().unwrap(), Path::new("/proj/_upstream/ru/text/db"));
        assert_eq!(cfg.dst, Some(PathBuf::from("/games/mod")));
    }

    #[test]
    fn test_required_columns_from_vars() {
        let root = PathBuf::from("/proj");
        let cfg = Config::from_vars(
            root.clone(),
            root.join(".env"),
            &vars(&[("REQUIRED_COLUMNS", "key, text")]),
        )
        .unwrap();
        assert_eq!(cfg.schema.required_columns, vec!["key", "text"]);
    }

    #[test]
    fn test_env_file_is_read_without_touching_environment() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "OBSOLETE_DIR=\"archive\"\n# comment\n").unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert!(cfg.obsolete_dir.ends_with("archive"));
        assert!(std::env::var("OBSOLETE_DIR").is_err());
    }
}
