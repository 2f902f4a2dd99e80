use std::path::{Path, PathBuf};
use tracing::info;

use super::persist_if_changed;
use crate::config::Config;
use crate::constants::{
    table_stem, DEDUP_KEYS_COLUMN, DEDUP_SUFFIX, DEDUP_TEXT_COLUMN, DEDUP_TRANSLATE_COLUMN,
};
use crate::dedup::{
    apply_dedup, entries_against_upstream, entries_from_columns, entries_from_text, extract_dedup,
    DedupExtract,
};
use crate::error::Result;
use crate::table::{load_table, TableSchema};
use crate::validate::file_name;

#[derive(Debug, Clone, Default)]
pub struct DedupExtractParams {
    /// Table to deduplicate
    pub input: PathBuf,
    /// Upstream version of `input`; its texts become the group sources
    pub upstream: Option<PathBuf>,
    /// Column of `input` holding the source text, when it carries one
    pub source_column: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct DedupExtractResult {
    pub output: PathBuf,
    pub rows: usize,
    pub groups: usize,
    /// Groups that already carry a translation
    pub translated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DedupApplyParams {
    pub dedup_file: PathBuf,
    /// Table receiving the translations
    pub target: PathBuf,
    /// Column written to; defaults to the schema's text column
    pub column: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct DedupApplyResult {
    pub target: PathBuf,
    pub updated: usize,
    pub written: bool,
}

/// Layout of a `._dedup.tsv` file, keyed by the source text.
pub fn dedup_schema() -> TableSchema {
    TableSchema {
        key_column: DEDUP_TEXT_COLUMN.to_string(),
        text_column: DEDUP_TRANSLATE_COLUMN.to_string(),
        required_columns: vec![
            DEDUP_TEXT_COLUMN.to_string(),
            DEDUP_TRANSLATE_COLUMN.to_string(),
            DEDUP_KEYS_COLUMN.to_string(),
        ],
        translated_columns: Vec::new(),
    }
}

/// `<temp_dir>/names.loc._dedup.tsv` for `names.loc.tsv`.
pub fn dedup_path(temp_dir: &Path, input: &Path) -> PathBuf {
    let name = file_name(input);
    temp_dir.join(format!("{}{}", table_stem(&name), DEDUP_SUFFIX))
}

/// Group the rows of one table by source text and write the dedup file to the temp dir.
pub fn dedup_extract(config: &Config, params: &DedupExtractParams) -> Result<DedupExtractResult> {
    let schema = &config.schema;
    let input = config.resolve(&params.input);
    let table = load_table(&input, schema)?;

    let entries = match (&params.upstream, &params.source_column) {
        (Some(upstream), _) => {
            let upstream = load_table(&config.resolve(upstream), schema)?;
            entries_against_upstream(&table, &upstream, &schema.text_column)?
        }
        (None, Some(source)) => entries_from_columns(&table, source, &schema.text_column)?,
        (None, None) => entries_from_text(&table, &schema.text_column)?,
    };

    let extract = extract_dedup(&entries);
    let output = dedup_path(&config.temp_dir, &input);
    persist_if_changed(&output, &extract.to_table()?, params.dry_run)?;

    let translated = extract
        .table
        .entries()
        .filter(|(_, t)| !t.is_empty())
        .count();
    info!(
        input = %input.display(),
        rows = entries.len(),
        groups = extract.table.len(),
        "dedup file extracted"
    );
    Ok(DedupExtractResult {
        output,
        rows: entries.len(),
        groups: extract.table.len(),
        translated,
    })
}

/// Write the translations of a dedup file back into the table it was extracted from.
///
/// Every key of the target must resolve to a group; otherwise nothing is written and the
/// unresolved keys are reported together.
pub fn dedup_apply(config: &Config, params: &DedupApplyParams) -> Result<DedupApplyResult> {
    let dedup_file = config.resolve(&params.dedup_file);
    let target = config.resolve(&params.target);

    let dedup_table = load_table(&dedup_file, &dedup_schema())?;
    let extract = DedupExtract::from_table(&dedup_table)?;
    let original = load_table(&target, &config.schema)?;

    let column = params
        .column
        .as_deref()
        .unwrap_or(&config.schema.text_column);
    let applied = apply_dedup(&extract.table, &extract.index, &original, column)?;
    let written =
        applied.updated > 0 && persist_if_changed(&target, &applied.table, params.dry_run)?;

    info!(target = %target.display(), updated = applied.updated, "dedup applied");
    Ok(DedupApplyResult {
        target,
        updated: applied.updated,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_path_uses_table_stem() {
        let p = dedup_path(Path::new("/p/_temp"), Path::new("/p/db/names.loc.tsv"));
        assert_eq!(p, PathBuf::from("/p/_temp/names.loc._dedup.tsv"));
    }

    #[test]
    fn test_dedup_schema_is_keyed_by_text() {
        let schema = dedup_schema();
        assert_eq!(schema.key_column, "text");
        assert!(schema.translated_columns.is_empty());
    }
}
