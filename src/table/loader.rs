use std::fs;
use std::path::Path;
use tracing::debug;

use super::{Table, TableSchema};
use crate::error::{LocError, Result};

/// Read a tab-separated table and check it against `schema`.
///
/// Fields are taken verbatim (no quote processing), matching how the game tools write
/// them. Blank lines are skipped and `\r\n` endings are accepted.
pub fn load_table(path: &Path, schema: &TableSchema) -> Result<Table> {
    let bytes = fs::read(path).map_err(|e| LocError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);
    let table = parse_table(&content, path, schema)?;
    debug!(path = %path.display(), rows = table.len(), "table loaded");
    Ok(table)
}

/// Parse table text; `origin` is used for error messages only.
pub fn parse_table(content: &str, origin: &Path, schema: &TableSchema) -> Result<Table> {
    let (columns, records) = split_records(content)
        .ok_or_else(|| LocError::malformed(origin, vec!["missing header row".to_string()]))?;
    let table = Table::from_records(columns, &schema.key_column, records, origin)?;
    schema.check(&table)?;
    Ok(table)
}

/// Header and records of a TSV document, or `None` when there is no header.
pub(crate) fn split_records(content: &str) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty());

    let header = lines.next()?;
    let columns = split_fields(header);
    let records = lines.map(split_fields).collect();
    Some((columns, records))
}

fn split_fields(line: &str) -> Vec<String> {
    line.split('\t').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_crlf_and_bom() {
        let content = "\u{feff}key\ttext\ttooltip\r\na\tHello\t\r\n\r\nb\t\"quoted\"\ttip\r\n";
        let t = parse_table(content, Path::new("x.loc.tsv"), &TableSchema::default()).unwrap();
        assert_eq!(t.columns(), &["key", "text", "tooltip"]);
        assert_eq!(t.value("a", "text"), Some("Hello"));
        assert_eq!(t.value("b", "text"), Some("\"quoted\""));
        assert_eq!(t.value("b", "tooltip"), Some("tip"));
    }

    #[test]
    fn test_empty_file_is_malformed() {
        let err = parse_table("", Path::new("x.loc.tsv"), &TableSchema::default()).unwrap_err();
        assert!(matches!(err, LocError::MalformedTable { .. }));
    }

    #[test]
    fn test_missing_key_column_is_malformed() {
        let schema = TableSchema::default();
        let err = parse_table("id\ttext\ttooltip\n", Path::new("x.loc.tsv"), &schema).unwrap_err();
        assert!(matches!(err, LocError::MalformedTable { .. }));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_table(Path::new("/nonexistent/x.loc.tsv"), &TableSchema::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/x.loc.tsv"));
    }
}
