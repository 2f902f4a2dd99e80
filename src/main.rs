use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use locsync::config::Config;
use locsync::logging;
use locsync::repos::RepoOutcome;
use locsync::report::progress_report;
use locsync::tasks::{
    self, DedupApplyParams, DedupExtractParams, FillParams, MergeParams, PatchLuaParams,
    UnescapeParams,
};
use locsync::validate::{file_name, validate_dir, DirReport};

#[derive(Parser)]
#[command(name = "locsync")]
#[command(about = "Keep translation tables in sync with upstream localisation files")]
#[command(version)]
struct Cli {
    /// Project root holding the `.env` file and the table trees
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Alternative `.env` file (defaults to <project-root>/.env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every translation table against its upstream table
    Merge {
        #[arg(long)]
        dry_run: bool,
        /// Fill empty translated cells with the upstream text
        #[arg(long)]
        fill_empty: bool,
    },
    /// Collapse repeated texts for translation and write them back
    Dedup {
        #[command(subcommand)]
        action: DedupAction,
    },
    /// Check table structure in the upstream and translation trees (or the given dirs)
    Validate { dirs: Vec<PathBuf> },
    /// Print translation progress per file
    Report,
    /// Take finished translations from PATCH_DB for untranslated rows
    MergePatch {
        /// Only these table files (names, not paths)
        files: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Distribute SPLIT_LOC_FILE over per-file tables shaped like upstream
    SplitMaster {
        files: Vec<String>,
        /// Directory receiving the tables (defaults to TRANSLATION_DB)
        #[arg(long)]
        target: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Undo doubled quotes in the text column
    Unescape {
        /// Files to fix (defaults to every table in TRANSLATION_DB)
        paths: Vec<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy the project into the mod directory
    Sync {
        /// Source directory (defaults to the project root)
        #[arg(long)]
        src: Option<PathBuf>,
        /// Destination (overrides DST)
        #[arg(long)]
        dst: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Insert translated strings into a table of a Lua file
    PatchLua {
        /// Lua table name, e.g. REGIONS_NAMES_LOCALISATION
        #[arg(long)]
        table: String,
        /// Key prefix, joined to each Lua key with '_'
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long)]
        lua_file: Option<PathBuf>,
        /// Translated tables (defaults to TRANSLATION_DB)
        #[arg(long)]
        translated_dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Clone or fast-forward the repositories listed in REPOS_FILE
    Repos {
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum DedupAction {
    /// Write <TEMP_DIR>/<stem>._dedup.tsv with one row per distinct text
    Extract {
        input: PathBuf,
        /// Upstream table; its texts become the group sources
        #[arg(long)]
        upstream: Option<PathBuf>,
        /// Column of the input holding the source text
        #[arg(long, conflicts_with = "upstream")]
        source_column: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the translate column of a dedup file back into its table
    Apply {
        dedup_file: PathBuf,
        target: PathBuf,
        /// Column receiving the translations (defaults to text)
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn print_dir_report(name: &str, report: &DirReport) {
    println!("🔍 Checking TSV in {} ({})...", name, report.dir.display());
    if report.missing {
        println!("⚠️  Directory {} does not exist", name);
        return;
    }
    if !report.has_errors() && !report.has_warnings() {
        println!("✅ {} files OK", report.checked());
        return;
    }
    for file in &report.files {
        if file.is_clean() {
            continue;
        }
        let marker = if file.errors.is_empty() { "⚠️ " } else { "❌" };
        println!("{} {}:", marker, file_name(&file.path));
        for problem in file.errors.iter().chain(&file.warnings) {
            println!("   • {}", problem);
        }
    }
}

fn dry_run_banner(dry_run: bool) {
    if dry_run {
        println!("🧪 Dry run: no files will be written\n");
    }
}

fn main() -> Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.project_root, cli.env_file.as_deref()).with_context(|| {
        format!("Failed to load configuration for {}", cli.project_root.display())
    })?;
    info!(root = %config.project_root.display(), "configuration loaded");

    match cli.command {
        Commands::Merge { dry_run, fill_empty } => {
            println!("🔄 Merging upstream into translation tables...");
            dry_run_banner(dry_run);
            let result = tasks::merge(&config, &MergeParams { dry_run, fill_empty })
                .context("Merge aborted")?;
            let mut changed = 0;
            for file in result.changed() {
                changed += 1;
                let created = if file.created { " (created)" } else { "" };
                println!(
                    "✓ {}{}: +{} new, -{} removed, ~{} filled",
                    file.name, created, file.added, file.removed, file.filled
                );
                if let Some(archive) = &file.archive {
                    println!("   archived to {}", archive.display());
                }
            }
            if changed == 0 {
                println!("✅ All files are up to date");
            }
            println!("\n=== Merge completed ===");
            println!("Processed files : {}", result.files.len());
            println!("New keys added  : {}", result.added());
            println!("Keys archived   : {}", result.removed());
            println!("Rows filled     : {}", result.filled());
        }
        Commands::Dedup { action } => match action {
            DedupAction::Extract { input, upstream, source_column, dry_run } => {
                dry_run_banner(dry_run);
                let result = tasks::dedup_extract(
                    &config,
                    &DedupExtractParams { input, upstream, source_column, dry_run },
                )?;
                if dry_run {
                    println!("[dry-run] would create {}", result.output.display());
                } else {
                    println!("✅ Created {}", result.output.display());
                }
                println!("   Rows          : {}", result.rows);
                println!("   Groups        : {}", result.groups);
                println!("   Translated    : {}", result.translated);
            }
            DedupAction::Apply { dedup_file, target, column, dry_run } => {
                dry_run_banner(dry_run);
                let result = tasks::dedup_apply(
                    &config,
                    &DedupApplyParams { dedup_file, target, column, dry_run },
                )?;
                if result.updated == 0 {
                    println!("–  Nothing to apply to {}", result.target.display());
                } else {
                    println!(
                        "✅ Updated {}: translated {} lines.",
                        result.target.display(),
                        result.updated
                    );
                }
            }
        },
        Commands::Validate { dirs } => {
            let targets: Vec<(String, PathBuf)> = if dirs.is_empty() {
                vec![
                    ("UPSTREAM_DB".to_string(), config.upstream_db.clone()),
                    ("TRANSLATION_DB".to_string(), config.translation_db.clone()),
                ]
            } else {
                dirs.iter()
                    .map(|d| (d.display().to_string(), config.resolve(d)))
                    .collect()
            };
            let mut failed = false;
            for (name, dir) in &targets {
                let report = validate_dir(dir, &config.schema)?;
                print_dir_report(name, &report);
                failed |= report.has_errors();
            }
            if failed {
                error!("validation found errors");
                bail!("validation failed");
            }
            println!("✅ All files are valid");
        }
        Commands::Report => {
            let report =
                progress_report(&config.upstream_db, &config.translation_db, &config.schema)?;
            print!("{}", report.render());
        }
        Commands::MergePatch { files, dry_run } => {
            println!("🩹 Merging translations from PATCH_DB...");
            dry_run_banner(dry_run);
            let result = tasks::merge_patch(&config, &FillParams { files, target: None, dry_run })?;
            for (name, filled, _) in result.files.iter().filter(|(_, n, _)| *n > 0) {
                println!("✓ {}: {} rows updated", name, filled);
            }
            for name in &result.skipped {
                println!("⚠️  {}: missing in one of the trees, skipped", name);
            }
            println!("Total updated rows: {}", result.updated());
        }
        Commands::SplitMaster { files, target, dry_run } => {
            println!("✂️  Splitting master localisation...");
            dry_run_banner(dry_run);
            let result = tasks::split_master(&config, &FillParams { files, target, dry_run })?;
            for (name, filled, created) in &result.files {
                if *created {
                    println!("✅ {}: created, updated {} lines.", name, filled);
                } else if *filled > 0 {
                    println!("✅ {}: updated {} lines.", name, filled);
                } else {
                    println!("–  {}: no update required.", name);
                }
            }
            for name in &result.skipped {
                println!("⚠️  {}: no upstream reference, skipped", name);
            }
        }
        Commands::Unescape { paths, dry_run } => {
            dry_run_banner(dry_run);
            let result = tasks::unescape_files(&config, &UnescapeParams { paths, dry_run })?;
            for (name, changed) in &result.files {
                if *changed > 0 {
                    println!("✓ {}: {} rows unescaped", name, changed);
                }
            }
            for name in &result.skipped {
                println!("–  {}: no text column, skipped", name);
            }
            for path in &result.missing {
                println!("⚠️  {}: not found, skipped", path.display());
            }
        }
        Commands::Sync { src, dst, dry_run } => {
            dry_run_banner(dry_run);
            let actions = tasks::sync_translation(&config, src, dst, dry_run)?;
            let prefix = if dry_run { "[dry-run] " } else { "" };
            for action in &actions {
                println!("{}{}", prefix, action);
            }
            println!("✅ Sync finished: {} actions", actions.len());
        }
        Commands::PatchLua { table, prefix, lua_file, translated_dir, dry_run } => {
            dry_run_banner(dry_run);
            let result = tasks::patch_lua_file(
                &config,
                &PatchLuaParams { table, prefix, lua_file, translated_dir, dry_run },
            )?;
            println!("✅ {}: replaced {} strings", result.lua_file.display(), result.replaced);
        }
        Commands::Repos { dry_run } => {
            dry_run_banner(dry_run);
            let outcomes = tasks::sync_repos(&config, dry_run)?;
            for (name, outcome) in &outcomes {
                match outcome {
                    RepoOutcome::Cloned => println!("📥 {}: cloned", name),
                    RepoOutcome::UpToDate => println!("✅ {}: up to date", name),
                    RepoOutcome::FastForwarded { from, to } => {
                        println!("⏩ {}: {} -> {}", name, short(from), short(to))
                    }
                    RepoOutcome::Ahead => {
                        println!("⚠️  {}: local commits not on origin, left as is", name)
                    }
                    RepoOutcome::Planned(plan) => println!("[dry-run] {}: {}", name, plan),
                }
            }
        }
    }
    Ok(())
}

fn short(rev: &str) -> &str {
    rev.get(..8).unwrap_or(rev)
}
