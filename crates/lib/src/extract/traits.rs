use crate::model::TableMetadata;
use async_trait::async_trait;
use thiserror::Error;

/// A generic error type for all extractor plugins.
///
/// Each plugin maps its own errors (HTTP failures, malformed schemas, SQL
/// errors) into these variants so the run orchestrator can report them
/// uniformly.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed source schema: {0}")]
    SchemaFormat(String),

    #[error("Unsupported source schema: {0}")]
    SchemaType(String),

    #[error("Invalid pivot configuration: {0}")]
    PivotConfig(String),

    #[error("Invalid extractor configuration: {0}")]
    Config(String),

    #[error("Failed to fetch metadata from the source: {0}")]
    Fetch(String),

    #[error("Failed to parse metadata from the source: {0}")]
    Parse(String),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

/// The contract every metadata source implements.
///
/// An extractor is built from its connection configuration, initialised once,
/// then drained with [`Extractor::extract`] until it returns `Ok(None)`. The
/// sequence is finite and cannot be restarted; calling `extract` after the end
/// keeps returning `Ok(None)`. Calling `extract` before `init` initialises
/// lazily.
#[async_trait]
pub trait Extractor: Send {
    /// Fetches or loads whatever the extractor needs to produce its tables.
    async fn init(&mut self) -> Result<(), ExtractError>;

    /// Produces the next table, or `None` once the sequence is exhausted.
    async fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError>;

    /// A short, unique label used in logs, e.g. `carte.extractor.glue`.
    fn scope(&self) -> String;
}
