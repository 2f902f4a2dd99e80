use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use super::Table;
use crate::error::{LocError, Result};

/// Serialize a table: header first, rows in table order, `\n` after every line.
pub fn render_table(table: &Table) -> Result<String> {
    let mut out = String::new();
    push_line(&mut out, table.columns(), table)?;
    for row in table.rows() {
        push_line(&mut out, &row.cells, table)?;
    }
    Ok(out)
}

/// Write `table` to `path`, replacing any existing file atomically.
///
/// The data goes to a temporary file in the destination directory first; the original is
/// left untouched unless the whole table was written.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let content = render_table(table)?;
    write_atomic(path, content.as_bytes())?;
    debug!(path = %path.display(), rows = table.len(), "table written");
    Ok(())
}

/// Append the rows of `table` to `path`, creating it (with header) when absent.
///
/// An existing file must carry the same header.
pub fn append_table(path: &Path, table: &Table) -> Result<()> {
    let rendered = render_table(table)?;
    if !path.exists() {
        return write_atomic(path, rendered.as_bytes());
    }

    let mut existing = fs::read_to_string(path).map_err(|e| LocError::io(path, e))?;
    let header = existing.lines().next().unwrap_or("");
    let expected = table.columns().join("\t");
    if header.trim_end_matches('\r') != expected {
        return Err(LocError::malformed(
            path,
            vec![format!(
                "cannot append rows with header '{}' to a file with header '{}'",
                expected, header
            )],
        ));
    }
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    // Skip our own header line
    if let Some((_, rows)) = rendered.split_once('\n') {
        existing.push_str(rows);
    }
    write_atomic(path, existing.as_bytes())
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| LocError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| LocError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| LocError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| LocError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| LocError::io(path, e.error))?;
    Ok(())
}

fn push_line(out: &mut String, cells: &[String], table: &Table) -> Result<()> {
    if let Some(bad) = cells.iter().find(|c| c.contains(['\t', '\n', '\r'])) {
        return Err(LocError::malformed(
            table.origin(),
            vec![format!("field cannot be written as TSV: {:?}", bad)],
        ));
    }
    out.push_str(&cells.join("\t"));
    out.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{load_table, table_from, TableSchema};

    #[test]
    fn test_write_then_load_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db/names.loc.tsv");
        let t = table_from(
            &["key", "text", "tooltip"],
            &[&["b", "  spaced ", ""], &["", "", ""], &["a", "Hello", "tip"]],
        );
        write_table(&path, &t).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "key\ttext\ttooltip\nb\t  spaced \t\n\t\t\na\tHello\ttip\n");

        let back = load_table(&path, &TableSchema::default()).unwrap();
        assert_eq!(back.rows(), t.rows());
    }

    #[test]
    fn test_failed_render_leaves_original_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.loc.tsv");
        fs::write(&path, "key\ttext\ttooltip\n").unwrap();

        let mut t = table_from(&["key", "text", "tooltip"], &[&["a", "x", ""]]);
        t.set_cell(0, 1, "bad\tvalue".to_string());
        assert!(write_table(&path, &t).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "key\ttext\ttooltip\n");
    }

    #[test]
    fn test_append_keeps_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tsv");
        append_table(&path, &table_from(&["key", "text"], &[&["a", "1"]])).unwrap();
        append_table(&path, &table_from(&["key", "text"], &[&["b", "2"]])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "key\ttext\na\t1\nb\t2\n");

        let err = append_table(&path, &table_from(&["key", "other"], &[&["c", "3"]])).unwrap_err();
        assert!(matches!(err, LocError::MalformedTable { .. }));
    }
}
