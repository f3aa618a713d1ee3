//! # Frontmatter Codec
//!
//! Persists a [`TableMetadata`] as a Markdown document: a YAML header between
//! two `---` lines holding everything extracted from the source, followed by a
//! free-text body holding the long-form description.
//!
//! ```text
//! ---
//! title: orders
//! connection: glue
//! ...
//! ---
//! Free text written by people.
//! ```

use crate::constants::FRONTMATTER_SEPARATOR;
use crate::errors::FrontmatterError;
use crate::model::{ColumnMetadata, TableMetadata, TableTag, TableType};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

// --- Header Layout ---

#[derive(Serialize, Deserialize, Debug, Default)]
struct TableHeader {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    connection: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    columns: Vec<ColumnHeader>,
    #[serde(default)]
    tags: Vec<TagHeader>,
    #[serde(default)]
    table_type: TableType,
}

#[derive(Serialize, Deserialize, Debug)]
struct ColumnHeader {
    name: String,
    #[serde(rename = "type", default)]
    column_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    // Hand-edited examples and enum values are often written unquoted.
    #[serde(default)]
    example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

#[derive(Serialize, Deserialize, Debug)]
struct TagHeader {
    key: String,
    value: Value,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Renders a YAML scalar as the literal string it denotes. `null` is absence.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

impl From<&ColumnMetadata> for ColumnHeader {
    fn from(column: &ColumnMetadata) -> Self {
        Self {
            name: column.name.clone(),
            column_type: non_empty(&column.column_type),
            description: column.description.clone(),
            example: column.example_value.clone().map(Value::String),
            values: column
                .values
                .as_ref()
                .map(|values| values.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<ColumnHeader> for ColumnMetadata {
    fn from(header: ColumnHeader) -> Self {
        Self {
            name: header.name,
            column_type: header.column_type.unwrap_or_default(),
            description: header.description,
            values: header
                .values
                .map(|values| values.iter().filter_map(scalar_to_string).collect()),
            example_value: header.example.as_ref().and_then(scalar_to_string),
        }
    }
}

impl From<&TableMetadata> for TableHeader {
    fn from(table: &TableMetadata) -> Self {
        Self {
            title: Some(table.name.clone()),
            connection: non_empty(&table.connection),
            location: table.location.clone(),
            database: non_empty(&table.database),
            columns: table.columns.iter().map(ColumnHeader::from).collect(),
            tags: table
                .tags
                .iter()
                .map(|tag| TagHeader {
                    key: tag.key.clone(),
                    value: Value::String(tag.value.clone()),
                })
                .collect(),
            table_type: table.table_type,
        }
    }
}

// --- Public API ---

/// Encodes a table as a frontmatter document.
pub fn encode(table: &TableMetadata) -> Result<String, FrontmatterError> {
    let header = serde_yaml::to_string(&TableHeader::from(table))?;

    let mut document = String::with_capacity(header.len() + 64);
    document.push_str(FRONTMATTER_SEPARATOR);
    document.push_str(&header);
    document.push_str(FRONTMATTER_SEPARATOR);
    if let Some(description) = &table.description {
        document.push_str(description.trim());
    }
    document.push('\n');
    Ok(document)
}

/// Splits a document into its header and body, without parsing either.
///
/// Anything before the opening separator is ignored. A missing header yields
/// an empty header; a missing body yields an empty body.
pub fn split(document: &str) -> (&str, &str) {
    let mut parts = document.splitn(3, FRONTMATTER_SEPARATOR);
    let _preamble = parts.next();
    let header = parts.next().unwrap_or_default();
    let body = parts.next().unwrap_or_default();
    (header, body)
}

/// Decodes a frontmatter document back into a table.
///
/// Fails with [`FrontmatterError::MissingIdentity`] when the header has no
/// `title`, the minimum needed to identify the record.
pub fn decode(document: &str) -> Result<TableMetadata, FrontmatterError> {
    let (header_text, body) = split(document);

    let header: TableHeader = if header_text.trim().is_empty() {
        TableHeader::default()
    } else {
        serde_yaml::from_str::<Option<TableHeader>>(header_text)?.unwrap_or_default()
    };

    let name = header.title.ok_or(FrontmatterError::MissingIdentity)?;
    let body = body.trim();

    Ok(TableMetadata {
        name,
        connection: header.connection.unwrap_or_default(),
        database: header.database.unwrap_or_default(),
        location: header.location,
        description: non_empty(body),
        columns: header.columns.into_iter().map(ColumnMetadata::from).collect(),
        tags: header
            .tags
            .into_iter()
            .map(|tag| TableTag {
                value: scalar_to_string(&tag.value).unwrap_or_default(),
                key: tag.key,
            })
            .collect(),
        table_type: header.table_type,
    })
}

/// Reads and decodes the document at `path`.
pub fn read_file(path: &Path) -> Result<TableMetadata, FrontmatterError> {
    let document = fs::read_to_string(path)?;
    decode(&document)
}

/// Encodes `table` and writes it to `path`, replacing any previous content.
pub fn write_file(path: &Path, table: &TableMetadata) -> Result<(), FrontmatterError> {
    let document = encode(table)?;
    fs::write(path, document)?;
    Ok(())
}
