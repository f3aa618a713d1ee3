//! # Canonical Table Model
//!
//! The single table/column/tag representation every extractor produces and
//! every persisted document decodes into, together with the rules for
//! reconciling a freshly extracted table with its hand-edited counterpart.

use crate::errors::MergeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a table is a physical table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    #[default]
    Table,
    View,
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableType::Table => write!(f, "table"),
            TableType::View => write!(f, "view"),
        }
    }
}

/// A single column of a table.
///
/// `column_type` always comes from the source schema. `description` and
/// `example_value` are curated by hand in the persisted document and survive
/// re-extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMetadata {
    pub name: String,
    pub column_type: String,
    pub description: Option<String>,
    /// Enumerated allowed values, in declaration order.
    pub values: Option<Vec<String>>,
    pub example_value: Option<String>,
}

impl ColumnMetadata {
    /// Creates a column with only a name and a type.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_example(mut self, example_value: impl Into<String>) -> Self {
        self.example_value = Some(example_value.into());
        self
    }
}

/// A free-form key/value label attached to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTag {
    pub key: String,
    pub value: String,
}

impl TableTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The canonical description of one table.
///
/// Identity is the `(connection, database, name)` triple, which is also the
/// relative path of the persisted document. An empty `connection` or
/// `database` means the value was absent from the source it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableMetadata {
    pub name: String,
    pub connection: String,
    pub database: String,
    pub location: Option<String>,
    /// Long-form, human-curated text stored as the document body.
    pub description: Option<String>,
    pub columns: Vec<ColumnMetadata>,
    pub tags: Vec<TableTag>,
    pub table_type: TableType,
}

impl TableMetadata {
    /// Creates an empty table with the given identity.
    pub fn new(
        connection: impl Into<String>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            connection: connection.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// The identity string `connection/database/name`, used both as the
    /// document path (without extension) and as the manifest entry.
    pub fn identity(&self) -> String {
        format!("{}/{}/{}", self.connection, self.database, self.name)
    }

    /// Returns the column with the given name, if present.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the value of the tag with the given key, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Reconciles this freshly extracted table with the version already on disk.
    ///
    /// Source-of-truth fields (`connection`, `location`, `table_type`, column
    /// types) come from `self`. Curated fields (descriptions, examples, enum
    /// values the source no longer provides) come from `existing`. Columns that
    /// only exist in `existing` are dropped; tags are unioned with `self` taking
    /// precedence. Neither input is modified.
    ///
    /// Fails with [`MergeError::Conflict`] if `existing` carries a different
    /// name or database, which means the document was moved or corrupted.
    pub fn merge_with_existing(&self, existing: &TableMetadata) -> Result<TableMetadata, MergeError> {
        if !existing.name.is_empty() && existing.name != self.name {
            return Err(MergeError::Conflict {
                field: "name",
                existing: existing.name.clone(),
                new: self.name.clone(),
            });
        }
        if !existing.database.is_empty() && existing.database != self.database {
            return Err(MergeError::Conflict {
                field: "database",
                existing: existing.database.clone(),
                new: self.database.clone(),
            });
        }

        // An empty extracted description counts as "none provided".
        let description = match self.description.as_deref() {
            Some(text) if !text.is_empty() => self.description.clone(),
            _ => existing.description.clone(),
        };

        Ok(TableMetadata {
            name: self.name.clone(),
            connection: self.connection.clone(),
            database: self.database.clone(),
            location: self.location.clone(),
            description,
            columns: self.merge_columns(existing),
            tags: self.merge_tags(existing),
            table_type: self.table_type,
        })
    }

    fn merge_columns(&self, existing: &TableMetadata) -> Vec<ColumnMetadata> {
        let mut merged: Vec<ColumnMetadata> = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let merged_column = match existing.column(&column.name) {
                Some(old) => ColumnMetadata {
                    name: column.name.clone(),
                    column_type: column.column_type.clone(),
                    description: old.description.clone(),
                    values: if column.values.is_none() {
                        old.values.clone()
                    } else {
                        column.values.clone()
                    },
                    example_value: old.example_value.clone(),
                },
                None => column.clone(),
            };

            // Names are unique; a repeated name replaces the earlier entry in place.
            match merged.iter_mut().find(|c| c.name == merged_column.name) {
                Some(slot) => *slot = merged_column,
                None => merged.push(merged_column),
            }
        }

        merged
    }

    fn merge_tags(&self, existing: &TableMetadata) -> Vec<TableTag> {
        let mut merged: Vec<TableTag> = Vec::new();
        for tag in existing.tags.iter().chain(self.tags.iter()) {
            match merged.iter_mut().find(|t| t.key == tag.key) {
                Some(slot) => slot.value = tag.value.clone(),
                None => merged.push(tag.clone()),
            }
        }
        merged
    }
}
