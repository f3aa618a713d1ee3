use std::path::PathBuf;
use thiserror::Error;

/// Raised when a freshly extracted table cannot be reconciled with the
/// persisted one because their identities disagree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Table {field} not equal! Existing: {existing}, new: {new}")]
    Conflict {
        field: &'static str,
        existing: String,
        new: String,
    },
}

/// Errors raised while reading or writing a frontmatter document.
#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Frontmatter header has no 'title'; the document cannot be identified")]
    MissingIdentity,
    #[error("Invalid frontmatter header: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the reconciling persister.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{source}\nFile name: {}", path.display())]
    Conflict {
        path: PathBuf,
        #[source]
        source: MergeError,
    },
    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
    #[error("Table '{identity}' has an empty {field}; it cannot be placed in the output tree")]
    IncompleteIdentity {
        identity: String,
        field: &'static str,
    },
    #[error("Failed to encode table '{identity}': {source}")]
    Encode {
        identity: String,
        #[source]
        source: FrontmatterError,
    },
}

/// Errors raised by the stale-record pruner.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid tables path pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Failed to scan tables path: {0}")]
    Glob(#[from] glob::GlobError),
}
