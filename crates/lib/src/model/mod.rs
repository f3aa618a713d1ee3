//! # Metadata Model
//!
//! Canonical entities shared by every extractor, the frontmatter codec and
//! the persister.

pub mod record;
pub mod source;
pub mod table;

pub use record::{JobMetadata, Record};
pub use source::{description_text, DescriptionMetadata, SourceColumn, SourceTable};
pub use table::{ColumnMetadata, TableMetadata, TableTag, TableType};
