//! Mirror a translation tree into a destination directory.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{SYNC_IGNORE_NAMES, SYNC_IGNORE_SUFFIXES};
use crate::error::{LocError, Result};

/// One filesystem action taken (or planned, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    RemoveDir(PathBuf),
    CopyDir { from: PathBuf, to: PathBuf },
    CopyFile { from: PathBuf, to: PathBuf },
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::RemoveDir(p) => write!(f, "rmtree {}", p.display()),
            SyncAction::CopyDir { from, to } => {
                write!(f, "copytree {} -> {}", from.display(), to.display())
            }
            SyncAction::CopyFile { from, to } => {
                write!(f, "copy {} -> {}", from.display(), to.display())
            }
        }
    }
}

pub fn should_ignore(name: &str) -> bool {
    SYNC_IGNORE_NAMES.contains(&name) || SYNC_IGNORE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Copy `src` into `dst`.
///
/// Directories of `dst` named like a non-ignored entry of `src` are removed first so stale
/// files disappear; everything else in `dst` (such as `.git`) is left alone. Ignored names
/// are never copied.
/// With `dry_run` nothing is touched and the planned actions are returned.
pub fn sync_tree(src: &Path, dst: &Path, dry_run: bool) -> Result<Vec<SyncAction>> {
    if !src.is_dir() {
        return Err(LocError::Config(format!(
            "Source folder does not exist: {}",
            src.display()
        )));
    }
    if !dst.is_dir() {
        return Err(LocError::Config(format!(
            "Target folder does not exist: {}. Create it or change DST.",
            dst.display()
        )));
    }

    let mut actions = Vec::new();
    let mut names: Vec<String> = fs::read_dir(src)
        .map_err(|e| LocError::io(src, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.retain(|n| !should_ignore(n));
    names.sort();

    // Clear matching directories
    for name in &names {
        let target = dst.join(name);
        if target.is_dir() {
            actions.push(SyncAction::RemoveDir(target));
        }
    }
    // Copy
    for name in &names {
        let from = src.join(name);
        let to = dst.join(name);
        if from.is_dir() {
            actions.push(SyncAction::CopyDir { from, to });
        } else {
            actions.push(SyncAction::CopyFile { from, to });
        }
    }

    if dry_run {
        for action in &actions {
            debug!("[dry-run] {}", action);
        }
        return Ok(actions);
    }
    for action in &actions {
        apply(action)?;
        info!("{}", action);
    }
    Ok(actions)
}

fn apply(action: &SyncAction) -> Result<()> {
    match action {
        SyncAction::RemoveDir(p) => fs::remove_dir_all(p).map_err(|e| LocError::io(p, e)),
        SyncAction::CopyDir { from, to } => copy_dir(from, to),
        SyncAction::CopyFile { from, to } => {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| LocError::io(parent, e))?;
            }
            fs::copy(from, to).map_err(|e| LocError::io(from, e))?;
            Ok(())
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).map_err(|e| LocError::io(to, e))?;
    for entry in fs::read_dir(from).map_err(|e| LocError::io(from, e))? {
        let entry = entry.map_err(|e| LocError::io(from, e))?;
        let name = entry.file_name();
        if should_ignore(&name.to_string_lossy()) {
            continue;
        }
        let src = entry.path();
        let dst = to.join(&name);
        if src.is_dir() {
            copy_dir(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).map_err(|e| LocError::io(&src, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_rules() {
        assert!(should_ignore(".git"));
        assert!(should_ignore("notes.bak"));
        assert!(should_ignore("draft~"));
        assert!(!should_ignore("text"));
    }

    #[test]
    fn test_sync_replaces_matching_dirs_and_keeps_others() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("text/db")).unwrap();
        fs::write(src.path().join("text/db/a.loc.tsv"), "new").unwrap();
        fs::write(src.path().join("text/db/skip.tmp"), "tmp").unwrap();
        fs::write(src.path().join(".env"), "DST=x").unwrap();
        fs::write(src.path().join("readme.md"), "hi").unwrap();

        fs::create_dir_all(dst.path().join("text/db")).unwrap();
        fs::write(dst.path().join("text/db/stale.loc.tsv"), "old").unwrap();
        fs::create_dir_all(dst.path().join(".git")).unwrap();

        let planned = sync_tree(src.path(), dst.path(), true).unwrap();
        assert!(planned.contains(&SyncAction::RemoveDir(dst.path().join("text"))));
        assert!(dst.path().join("text/db/stale.loc.tsv").exists());

        sync_tree(src.path(), dst.path(), false).unwrap();
        assert_eq!(fs::read_to_string(dst.path().join("text/db/a.loc.tsv")).unwrap(), "new");
        assert!(!dst.path().join("text/db/stale.loc.tsv").exists());
        assert!(!dst.path().join("text/db/skip.tmp").exists());
        assert!(!dst.path().join(".env").exists());
        assert!(dst.path().join("readme.md").exists());
        assert!(dst.path().join(".git").exists());
    }

    #[test]
    fn test_missing_destination_fails() {
        let src = tempfile::tempdir().unwrap();
        assert!(sync_tree(src.path(), Path::new("/no/such/dst"), true).is_err());
    }
}
