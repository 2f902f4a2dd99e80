use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocError {
    /// Structural problems found while loading or validating a table.
    /// Raised before any set operation runs.
    #[error("Malformed table {}: {}", path.display(), problems.join("; "))]
    MalformedTable {
        path: PathBuf,
        problems: Vec<String>,
    },

    /// Keys whose dedup group could not be resolved during apply.
    #[error("No dedup group for {} key(s): {}", keys.len(), keys.join(", "))]
    UnknownGroup { keys: Vec<String> },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Version control failed for {repo}: {message}")]
    Vcs { repo: String, message: String },

    #[error("{repo}: local branch {branch} has diverged from origin/{branch}")]
    Divergent { repo: String, branch: String },
}

impl LocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LocError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, problems: Vec<String>) -> Self {
        LocError::MalformedTable {
            path: path.into(),
            problems,
        }
    }
}

pub type Result<T> = std::result::Result<T, LocError>;
