use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use locsync::table::TableSchema;
use locsync::validate::{file_name, validate_dir};

/// Validate every `*.loc.tsv` table in a directory. Exits 1 when any file has errors.
#[derive(Parser, Debug)]
#[command(name = "validate-tsv", version, about = "Validate localisation tables in a directory")]
struct Cli {
    /// Directory holding the tables
    dir: PathBuf,

    /// Required header, comma-separated (defaults to key,text,tooltip)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let schema = if args.columns.is_empty() {
        TableSchema::default()
    } else {
        TableSchema::with_required_columns(args.columns.clone())
            .context("Invalid --columns")?
    };

    let report = validate_dir(&args.dir, &schema)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;
    if report.missing {
        eprintln!("warning: {} does not exist", args.dir.display());
        return Ok(());
    }

    for file in &report.files {
        for warning in &file.warnings {
            eprintln!("warning: {}: {}", file_name(&file.path), warning);
        }
    }
    if !report.has_errors() {
        println!("valid ({} files)", report.checked());
        return Ok(());
    }

    eprintln!("invalid:");
    for file in report.files.iter().filter(|f| !f.errors.is_empty()) {
        for error in &file.errors {
            eprintln!("- {}: {}", file_name(&file.path), error);
        }
    }
    std::process::exit(1)
}
