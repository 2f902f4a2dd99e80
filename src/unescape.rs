//! Undo spreadsheet-style quote escaping in the text column.

use crate::table::Table;

/// `"Translated ""word"" string"` -> `Translated "word" string`.
///
/// One pair of enclosing quotes is removed when the whole field is wrapped, then `""` is
/// collapsed until no doubled quote remains.
pub fn unescape_field(field: &str) -> String {
    let mut s = if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        field[1..field.len() - 1].to_string()
    } else {
        field.to_string()
    };
    while s.contains("\"\"") {
        s = s.replace("\"\"", "\"");
    }
    s
}

/// Unescape every cell of `column`. Returns the number of changed rows, or `None` when the
/// table has no such column.
pub fn unescape_column(table: &mut Table, column: &str) -> Option<usize> {
    let col = table.column_index(column)?;
    let updates: Vec<(usize, String)> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let fixed = unescape_field(&row.cells[col]);
            (fixed != row.cells[col]).then_some((i, fixed))
        })
        .collect();
    let count = updates.len();
    for (i, value) in updates {
        table.set_cell(i, col, value);
    }
    Some(count)
}
