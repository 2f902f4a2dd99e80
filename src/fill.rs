//! Fill untranslated rows from a donor dictionary.
//!
//! Used both for merging a finished translation from another release (`PATCH_DB`) and for
//! splitting a master localisation file into per-file tables.

use std::collections::HashMap;

use crate::constants::is_service_key;
use crate::error::{LocError, Result};
use crate::table::Table;

/// Replace untranslated texts of `translation` with donor texts, in place.
///
/// A row is untranslated when its text is empty or equal to the upstream text of the same
/// key. The donor text is used only when it is non-empty and differs from upstream. Service
/// rows and rows without a key are left alone. Returns the number of updated rows.
pub fn fill_untranslated(
    translation: &mut Table,
    upstream: &HashMap<String, String>,
    donor: &HashMap<String, String>,
    text_column: &str,
) -> Result<usize> {
    let text = translation
        .column_index(text_column)
        .ok_or_else(|| LocError::MissingColumn(text_column.to_string()))?;

    let mut updates = Vec::new();
    for (i, row) in translation.rows().iter().enumerate() {
        let key = translation.row_key(row);
        if is_service_key(key) {
            continue;
        }
        let Some(candidate) = donor.get(key).filter(|t| !t.is_empty()) else {
            continue;
        };
        let original = upstream.get(key).map(String::as_str).unwrap_or("");
        let current = row.cells[text].as_str();
        let untranslated = current == original || current.is_empty();
        if candidate != original && untranslated && candidate != current {
            updates.push((i, candidate.clone()));
        }
    }

    let count = updates.len();
    for (i, value) in updates {
        translation.set_cell(i, text, value);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::table_from;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_only_untranslated_rows_take_donor_text() {
        let mut tr = table_from(
            &["key", "text", "tooltip"],
            &[
                &["#Loc;1;text/db/names.loc", "", ""],
                &["a", "Hello", ""],
                &["b", "", ""],
                &["c", "Mine", ""],
                &["d", "Same", ""],
                &["e", "Bye", ""],
            ],
        );
        let upstream = map(&[
            ("a", "Hello"),
            ("b", "World"),
            ("c", "Cat"),
            ("d", "Same"),
            ("e", "Bye"),
        ]);
        let donor = map(&[
            ("#Loc;1;text/db/names.loc", "service"),
            ("a", "Bonjour"),
            ("b", "Monde"),
            ("c", "Chat"),
            ("d", "Same"),
            ("e", ""),
        ]);
        let n = fill_untranslated(&mut tr, &upstream, &donor, "text").unwrap();
        assert_eq!(n, 2);
        assert_eq!(tr.value("a", "text"), Some("Bonjour"));
        assert_eq!(tr.value("b", "text"), Some("Monde"));
        assert_eq!(tr.value("c", "text"), Some("Mine"));
        assert_eq!(tr.value("d", "text"), Some("Same"));
        assert_eq!(tr.value("e", "text"), Some("Bye"));
        assert_eq!(tr.rows()[0].cells[1], "");
    }
}
