/// File naming and column constants shared by every command.

// Table files handled by the tools
pub const TABLE_SUFFIX: &str = ".loc.tsv";
pub const DEDUP_SUFFIX: &str = "._dedup.tsv";

// Default column layout of a localisation table
pub const KEY_COLUMN: &str = "key";
pub const TEXT_COLUMN: &str = "text";
pub const TOOLTIP_COLUMN: &str = "tooltip";

// Dedup file columns
pub const DEDUP_TEXT_COLUMN: &str = "text";
pub const DEDUP_TRANSLATE_COLUMN: &str = "translate";
pub const DEDUP_KEYS_COLUMN: &str = "keys";
pub const DEDUP_KEY_SEPARATOR: char = ',';

/// Service rows such as `#Loc;1;text/db/names.loc` are never edited or counted.
pub const SERVICE_KEY_PREFIX: &str = "#Loc;";

/// Texts that mark a row as intentionally untranslatable in progress reports.
pub const PLACEHOLDER_TEXTS: &[&str] = &["PLACEHOLDER", "placeholder", "text_rejected"];

// Entries never copied into a sync destination
pub const SYNC_IGNORE_NAMES: &[&str] = &[
    ".git",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    ".env",
    ".pre-commit-config.yaml",
    "run",
    ".DS_Store",
    "Thumbs.db",
];
pub const SYNC_IGNORE_SUFFIXES: &[&str] = &[".tmp", ".bak", ".swp", "~"];

/// Timestamp format embedded in archive file names.
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// True for service rows and rows without a key.
pub fn is_service_key(key: &str) -> bool {
    key.trim().is_empty() || key.starts_with(SERVICE_KEY_PREFIX)
}

/// True when a file name looks like a localisation table.
pub fn is_table_file(name: &str) -> bool {
    name.ends_with(TABLE_SUFFIX)
}

/// `names.loc.tsv` -> `names.loc`
pub fn table_stem(name: &str) -> &str {
    name.strip_suffix(".tsv").unwrap_or(name)
}
