//! Generic relational-catalog records and their adaptation into the
//! canonical model.
//!
//! SQL catalog collaborators describe tables in their own shape: a
//! `cluster`/`schema`/`name` triple and descriptions that may carry more than
//! their text. Only the text payload survives the conversion.

use super::table::{ColumnMetadata, TableMetadata, TableType};

/// A description as reported by a catalog, possibly annotated with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptionMetadata {
    pub text: Option<String>,
    pub source: Option<String>,
}

impl DescriptionMetadata {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            source: None,
        }
    }
}

/// Pulls the text payload out of an optional description.
pub fn description_text(description: Option<&DescriptionMetadata>) -> Option<String> {
    description.and_then(|d| d.text.clone())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceColumn {
    pub name: String,
    pub column_type: String,
    pub description: Option<DescriptionMetadata>,
    pub sort_order: i32,
}

/// A table as produced by a generic SQL catalog extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceTable {
    /// The connection the table was read through (e.g. `postgres-prod`).
    pub database: String,
    /// The catalog (database) name inside the server.
    pub cluster: String,
    pub schema: String,
    pub name: String,
    pub description: Option<DescriptionMetadata>,
    pub columns: Vec<SourceColumn>,
    pub is_view: bool,
}

impl SourceTable {
    /// `<database>://<cluster>.<schema>/<name>`
    pub fn table_key(&self) -> String {
        format!(
            "{}://{}.{}/{}",
            self.database, self.cluster, self.schema, self.name
        )
    }
}

impl From<&SourceColumn> for ColumnMetadata {
    fn from(column: &SourceColumn) -> Self {
        ColumnMetadata {
            name: column.name.clone(),
            column_type: column.column_type.clone(),
            description: description_text(column.description.as_ref()),
            ..Default::default()
        }
    }
}

impl TableMetadata {
    /// Adapts a generic catalog table. The catalog's connection becomes the
    /// `connection` and its cluster (the catalog name) the `database`; the
    /// schema only appears in the location.
    pub fn from_source_table(table: &SourceTable) -> Self {
        let mut columns: Vec<&SourceColumn> = table.columns.iter().collect();
        columns.sort_by_key(|c| c.sort_order);

        TableMetadata {
            name: table.name.clone(),
            connection: table.database.clone(),
            database: table.cluster.clone(),
            location: Some(table.table_key()),
            description: description_text(table.description.as_ref()),
            columns: columns.into_iter().map(ColumnMetadata::from).collect(),
            tags: Vec::new(),
            table_type: if table.is_view {
                TableType::View
            } else {
                TableType::Table
            },
        }
    }
}
