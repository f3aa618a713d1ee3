//! # Carte
//!
//! Extracts table metadata from data catalogs into a tree of Markdown
//! documents that people can edit, and keeps that tree in sync with the
//! sources without losing their edits.
//!
//! The crate holds the parts every source shares: the canonical [`model`],
//! the [`frontmatter`] document codec, the reconciling [`loader`], the stale
//! record [`publisher`] and the [`extract::Extractor`] contract implemented by
//! the source plugins.

pub mod constants;
pub mod errors;
pub mod extract;
pub mod frontmatter;
pub mod loader;
pub mod model;
pub mod publisher;

pub use errors::{FrontmatterError, LoadError, MergeError, PublishError};
pub use extract::{ExtractError, Extractor};
pub use loader::{CarteLoader, LoaderConfig, PersistedTable};
pub use model::{
    ColumnMetadata, DescriptionMetadata, JobMetadata, Record, SourceColumn, SourceTable,
    TableMetadata, TableTag, TableType,
};
