//! Substitute translated strings into a table of a Lua source file.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LocError, Result};
use crate::table::{load_table, TableSchema};
use crate::validate::table_files;

/// Entry of a Lua table: `key = "Text"` or `["key"] = "Text"`.
const ROW_PATTERN: &str =
    r#"(?P<lhs>(\[\s*"(?P<kq>[^"]+)"\s*\])|(?P<kp>[A-Za-z0-9_]+))\s*=\s*"(?P<txt>[^"]*)""#;

/// Text dictionaries consulted while patching.
#[derive(Debug, Default)]
pub struct LuaSources {
    /// Translated texts by key
    pub translated: HashMap<String, String>,
    /// Primary upstream texts by key
    pub upstream: HashMap<String, String>,
    /// Optional secondary upstream texts by key
    pub secondary: Option<HashMap<String, String>>,
}

impl LuaSources {
    fn replacement(&self, key: &str) -> Option<&str> {
        let new = self.translated.get(key).filter(|t| !t.is_empty())?;
        if self.upstream.get(key) == Some(new) {
            return None;
        }
        if let Some(secondary) = &self.secondary {
            if secondary.get(key) == Some(new) {
                return None;
            }
        }
        if new.contains(['"', '\n']) {
            warn!(key, "translation contains a quote or newline, not inserted into Lua");
            return None;
        }
        Some(new.as_str())
    }
}

/// Patch the first table named `table_name` in `source`.
///
/// Each entry key is looked up as `<prefix>_<key>` (or as `key` when `prefix` is empty).
/// An entry is replaced when a non-empty translation exists that differs from both upstream
/// texts. Returns the new source and the number of replaced entries; the source is returned
/// unchanged when the table is absent.
pub fn patch_lua(
    source: &str,
    table_name: &str,
    prefix: &str,
    sources: &LuaSources,
) -> Result<(String, usize)> {
    let table_re = Regex::new(&format!(
        r"(?ms)^[ \t]*{}\s*=\s*\{{(?P<body>.*?)^[ \t]*\}}",
        regex::escape(table_name)
    ))
    .map_err(|e| LocError::Config(format!("bad table name {:?}: {}", table_name, e)))?;
    let row_re = Regex::new(ROW_PATTERN)
        .map_err(|e| LocError::Config(format!("bad row pattern: {}", e)))?;

    let Some(body) = table_re.captures(source).and_then(|c| c.name("body")) else {
        debug!(table_name, "table not found");
        return Ok((source.to_string(), 0));
    };

    let mut updated = 0;
    let patched_body = row_re.replace_all(body.as_str(), |m: &Captures| {
        let lua_key = m
            .name("kq")
            .or_else(|| m.name("kp"))
            .map(|k| k.as_str())
            .unwrap_or("");
        let full_key = if prefix.is_empty() {
            lua_key.to_string()
        } else {
            format!("{}_{}", prefix, lua_key)
        };
        match sources.replacement(&full_key) {
            Some(new) if new != &m["txt"] => {
                updated += 1;
                format!("{} = \"{}\"", &m["lhs"], new)
            }
            _ => m[0].to_string(),
        }
    });

    let mut out = String::with_capacity(source.len());
    out.push_str(&source[..body.start()]);
    out.push_str(&patched_body);
    out.push_str(&source[body.end()..]);
    Ok((out, updated))
}

/// Merge the texts of every table under `dir` into one dictionary.
pub fn load_text_dir(dir: &Path, schema: &TableSchema) -> Result<HashMap<String, String>> {
    let mut texts = HashMap::new();
    for path in table_files(dir)? {
        let table = load_table(&path, schema)?;
        if let Some(map) = table.text_map(&schema.text_column) {
            texts.extend(map);
        }
    }
    Ok(texts)
}
