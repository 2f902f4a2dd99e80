use anyhow::Result;
use locsync::config::Config;
use locsync::error::LocError;
use locsync::tasks::{merge, MergeParams};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const HEADER: &str = "key\ttext\ttooltip\n";

fn config(root: &Path) -> Result<Config> {
    Ok(Config::from_vars(
        root.to_path_buf(),
        root.join(".env"),
        &HashMap::new(),
    )?)
}

fn write(path: &Path, rows: &str) -> Result<()> {
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, format!("{HEADER}{rows}"))?;
    Ok(())
}

fn archives(root: &Path) -> Result<Vec<String>> {
    let dir = root.join("_obsolete");
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    Ok(names)
}

#[test]
fn test_merge_adds_new_keys_and_archives_removed_ones() -> Result<()> {
    let root = tempdir()?;
    let cfg = config(root.path())?;
    write(
        &cfg.upstream_db.join("names.loc.tsv"),
        "a\tHello\t\nb\tWorld\ttip\nc\tCat\t\n",
    )?;
    write(
        &cfg.translation_db.join("names.loc.tsv"),
        "a\tBonjour\t\nb\tMonde\t\nd\tChien\t\n",
    )?;

    let result = merge(&cfg, &MergeParams::default())?;
    assert_eq!(result.files.len(), 1);
    assert_eq!((result.added(), result.removed()), (1, 1));

    let merged = fs::read_to_string(cfg.translation_db.join("names.loc.tsv"))?;
    assert_eq!(
        merged,
        format!("{HEADER}a\tBonjour\t\nb\tMonde\ttip\nc\tCat\t\n")
    );

    let names = archives(root.path())?;
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("names.loc.") && names[0].ends_with(".tsv"));
    let archived = fs::read_to_string(root.path().join("_obsolete").join(&names[0]))?;
    assert_eq!(archived, format!("{HEADER}d\tChien\t\n"));
    Ok(())
}

#[test]
fn test_second_merge_changes_nothing() -> Result<()> {
    let root = tempdir()?;
    let cfg = config(root.path())?;
    write(&cfg.upstream_db.join("names.loc.tsv"), "a\tHello\t\nb\tWorld\t\n")?;
    write(&cfg.translation_db.join("names.loc.tsv"), "a\tBonjour\t\nz\tOld\t\n")?;

    merge(&cfg, &MergeParams::default())?;
    let first = fs::read_to_string(cfg.translation_db.join("names.loc.tsv"))?;
    let archived_after_first = archives(root.path())?;

    let again = merge(&cfg, &MergeParams::default())?;
    assert_eq!(again.changed().count(), 0);
    assert_eq!(fs::read_to_string(cfg.translation_db.join("names.loc.tsv"))?, first);
    assert_eq!(archives(root.path())?, archived_after_first);
    Ok(())
}

#[test]
fn test_missing_translation_file_is_created_from_upstream() -> Result<()> {
    let root = tempdir()?;
    let cfg = config(root.path())?;
    write(&cfg.upstream_db.join("towns.loc.tsv"), "t1\tRome\t\n")?;

    let result = merge(&cfg, &MergeParams::default())?;
    assert!(result.files[0].created);
    assert_eq!(
        fs::read_to_string(cfg.translation_db.join("towns.loc.tsv"))?,
        format!("{HEADER}t1\tRome\t\n")
    );
    Ok(())
}

#[test]
fn test_dry_run_reports_without_writing() -> Result<()> {
    let root = tempdir()?;
    let cfg = config(root.path())?;
    write(&cfg.upstream_db.join("names.loc.tsv"), "a\tHello\t\nb\tWorld\t\n")?;
    let original = "a\tBonjour\t\nx\tGone\t\n";
    write(&cfg.translation_db.join("names.loc.tsv"), original)?;

    let result = merge(
        &cfg,
        &MergeParams {
            dry_run: true,
            ..Default::default()
        },
    )?;
    assert_eq!((result.added(), result.removed()), (1, 1));
    assert!(result.files[0].archive.is_some());
    assert_eq!(
        fs::read_to_string(cfg.translation_db.join("names.loc.tsv"))?,
        format!("{HEADER}{original}")
    );
    assert!(archives(root.path())?.is_empty());
    Ok(())
}

#[test]
fn test_malformed_translation_aborts_before_writing() -> Result<()> {
    let root = tempdir()?;
    let cfg = config(root.path())?;
    write(&cfg.upstream_db.join("a.loc.tsv"), "k\tText\t\nn\tNew\t\n")?;
    write(&cfg.translation_db.join("a.loc.tsv"), "k\tTexte\t\n")?;
    write(&cfg.translation_db.join("b.loc.tsv"), "dup\tOne\t\ndup\tTwo\t\n")?;

    let err = merge(&cfg, &MergeParams::default()).unwrap_err();
    assert!(matches!(err, LocError::MalformedTable { .. }));
    assert_eq!(
        fs::read_to_string(cfg.translation_db.join("a.loc.tsv"))?,
        format!("{HEADER}k\tTexte\t\n")
    );
    Ok(())
}

#[test]
fn test_failed_archive_leaves_translation_untouched() -> Result<()> {
    let root = tempdir()?;
    // A regular file where the archive directory's parent should be
    fs::write(root.path().join("blocker"), "not a directory")?;
    let vars: HashMap<String, String> =
        [("OBSOLETE_DIR".to_string(), "blocker/_obsolete".to_string())].into();
    let cfg = Config::from_vars(root.path().to_path_buf(), root.path().join(".env"), &vars)?;
    write(&cfg.upstream_db.join("names.loc.tsv"), "a\tHello\t\n")?;
    let original = "a\tBonjour\t\nd\tOld\t\n";
    write(&cfg.translation_db.join("names.loc.tsv"), original)?;

    let err = merge(&cfg, &MergeParams::default()).unwrap_err();
    assert!(matches!(err, LocError::Io { .. }));
    assert_eq!(
        fs::read_to_string(cfg.translation_db.join("names.loc.tsv"))?,
        format!("{HEADER}{original}")
    );
    Ok(())
}
