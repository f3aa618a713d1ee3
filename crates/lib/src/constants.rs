//! # Shared Constants
//!
//! Fixed properties of the on-disk format shared by the persister, the pruner
//! and the command line.

/// Separator line opening and closing the frontmatter header.
pub const FRONTMATTER_SEPARATOR: &str = "---\n";

/// Extension of every persisted table document.
pub const TABLE_FILE_EXTENSION: &str = "md";

/// Name of the run manifest inside the output directory.
pub const MANIFESTS_FILE: &str = "manifests";

/// Default output directory for table documents, relative to the base directory.
pub const TABLES_OUTPUT_PATH: &str = "content/tables";
