//! # `carte-json-schema`: JSON Schema Extractor
//!
//! Turns a single JSON Schema document into table metadata, as a
//! self-contained plugin for `carte`. A schema maps to one table, or, when a
//! pivot column is configured, to one table per `oneOf` variant.
//!
//! All tables are derived once, in `init`; `extract` only hands them out.

pub mod merge;
pub mod source;

use anyhow::anyhow;
use async_trait::async_trait;
use carte::extract::{ExtractError, Extractor};
use carte::{ColumnMetadata, TableMetadata, TableTag, TableType};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

pub use merge::deep_merge;
pub use source::{load_schema, SchemaLocation};

const DESCRIPTION_KEY: &str = "description";
const DEFAULT_TABLE_NAME: &str = "schema";

/// Custom error types for the JSON Schema extraction process.
#[derive(Error, Debug)]
pub enum JsonSchemaError {
    #[error("Failed to read schema file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read schema from object storage: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Invalid S3 schema path: '{0}'")]
    InvalidS3Path(String),
    #[error("Schema is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    SchemaType(String),
    #[error("{0}")]
    PivotConfig(String),
    #[error("Invalid {option} regular expression: {source}")]
    InvalidRegex {
        option: &'static str,
        source: regex::Error,
    },
}

/// A helper to convert the specific `JsonSchemaError` into the generic `carte::extract::ExtractError`.
impl From<JsonSchemaError> for ExtractError {
    fn from(err: JsonSchemaError) -> Self {
        match err {
            JsonSchemaError::Io { .. } | JsonSchemaError::ObjectStore(_) => {
                ExtractError::Fetch(err.to_string())
            }
            JsonSchemaError::InvalidJson(msg) => ExtractError::Parse(msg),
            JsonSchemaError::SchemaType(msg) => ExtractError::SchemaType(msg),
            JsonSchemaError::PivotConfig(msg) => ExtractError::PivotConfig(msg),
            JsonSchemaError::InvalidS3Path(_) | JsonSchemaError::InvalidRegex { .. } => {
                ExtractError::Config(err.to_string())
            }
        }
    }
}

/// The `config` block of a `json_schema` connection.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonSchemaConfig {
    /// A local path or an `s3://bucket/key` URL.
    pub schema_path: String,
    pub database: String,
    /// Emit one table per `oneOf` variant, named by this property's `const`.
    pub pivot_column: Option<String>,
    /// Object properties whose own properties become `<parent>.<child>` columns.
    #[serde(default)]
    pub object_expand: Vec<String>,
    /// Only columns matching this expression are emitted.
    pub filter_columns: Option<String>,
    /// Columns matching this expression are listed first.
    pub pin_column: Option<String>,
    #[serde(default)]
    pub extract_descriptions: bool,
    /// Dotted path to an object whose entries become table tags.
    pub tags_key: Option<String>,
}

/// The `Extractor` implementation for JSON Schema documents.
pub struct JsonSchemaExtractor {
    connection_name: String,
    config: JsonSchemaConfig,
    filter_columns: Option<Regex>,
    pin_column: Option<Regex>,
    tags_key: Option<Vec<String>>,
    tables: Option<std::vec::IntoIter<TableMetadata>>,
}

fn compile(option: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, JsonSchemaError> {
    pattern
        .map(|p| Regex::new(p).map_err(|source| JsonSchemaError::InvalidRegex { option, source }))
        .transpose()
}

impl JsonSchemaExtractor {
    pub fn new(
        connection_name: impl Into<String>,
        config: JsonSchemaConfig,
    ) -> Result<Self, JsonSchemaError> {
        let filter_columns = compile("filter_columns", config.filter_columns.as_deref())?;
        let pin_column = compile("pin_column", config.pin_column.as_deref())?;
        let tags_key = config
            .tags_key
            .as_ref()
            .map(|key| key.split('.').map(String::from).collect());
        Ok(Self {
            connection_name: connection_name.into(),
            config,
            filter_columns,
            pin_column,
            tags_key,
            tables: None,
        })
    }

    /// Derives every table described by `schema`, in output order.
    pub fn tables_from_schema(&self, schema: &Value) -> Result<Vec<TableMetadata>, JsonSchemaError> {
        let Some(document) = schema.as_object() else {
            return Err(JsonSchemaError::SchemaType(
                "Schema type has to be 'object'".to_string(),
            ));
        };
        if document.get("type").and_then(Value::as_str) != Some("object") {
            return Err(JsonSchemaError::SchemaType(
                "Schema type has to be 'object'".to_string(),
            ));
        }

        let Some(pivot_column) = &self.config.pivot_column else {
            let name = document
                .get("title")
                .and_then(Value::as_str)
                .map(normalise)
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
            return Ok(vec![self.schema_to_table(name, document)]);
        };

        let constraints = document
            .get("oneOf")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                JsonSchemaError::PivotConfig(
                    "Pivot column provided, but no top-level 'oneOf' in schema".to_string(),
                )
            })?;

        let mut variants: Vec<(String, Value)> = Vec::with_capacity(constraints.len());
        for constraint in constraints {
            let pivot_value = constraint
                .get("properties")
                .and_then(|p| p.get(pivot_column))
                .and_then(|c| c.get("const"))
                .ok_or_else(|| {
                    JsonSchemaError::PivotConfig(format!(
                        "Pivot column '{pivot_column}' inside oneOf should be a const"
                    ))
                })?;
            let name = pivot_name(pivot_value);
            let merged = deep_merge(schema, constraint);

            // A repeated const replaces the earlier variant in place.
            match variants.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = merged,
                None => variants.push((name, merged)),
            }
        }

        Ok(variants
            .into_iter()
            .map(|(name, merged)| {
                let empty = Map::new();
                let document = merged.as_object().unwrap_or(&empty);
                self.schema_to_table(name, document)
            })
            .collect())
    }

    fn schema_to_table(&self, name: String, schema: &Map<String, Value>) -> TableMetadata {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut definitions: Vec<(String, &Value)> = Vec::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, definition) in properties {
                definitions.push((key.clone(), definition));
                if self.config.object_expand.contains(key) {
                    let children = definition.get("properties").and_then(Value::as_object);
                    for (child, child_definition) in children.into_iter().flatten() {
                        definitions.push((format!("{key}.{child}"), child_definition));
                    }
                }
            }
        }

        let mut columns: Vec<ColumnMetadata> = definitions
            .into_iter()
            .filter(|(column_name, _)| match &self.filter_columns {
                Some(filter) => filter.is_match(column_name),
                None => true,
            })
            .map(|(column_name, definition)| self.to_column(column_name, definition, &required))
            .collect();

        if let Some(pin) = &self.pin_column {
            let (pinned, regular): (Vec<_>, Vec<_>) =
                columns.into_iter().partition(|c| pin.is_match(&c.name));
            columns = pinned.into_iter().chain(regular).collect();
        }

        debug!("Derived {} columns for '{}'", columns.len(), name);
        TableMetadata {
            name,
            connection: self.connection_name.clone(),
            database: self.config.database.clone(),
            location: Some(self.config.schema_path.clone()),
            description: self.description_of(schema.get(DESCRIPTION_KEY)),
            columns,
            tags: self.tags_of(schema),
            table_type: TableType::Table,
        }
    }

    fn to_column(&self, name: String, definition: &Value, required: &[&str]) -> ColumnMetadata {
        let mut column_type = definition
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if required.contains(&name.as_str()) {
            column_type.push_str(" (required)");
        }
        let values = definition
            .get("enum")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(value_to_string).collect());

        ColumnMetadata {
            description: self.description_of(definition.get(DESCRIPTION_KEY)),
            values,
            ..ColumnMetadata::new(name, column_type)
        }
    }

    fn description_of(&self, value: Option<&Value>) -> Option<String> {
        if !self.config.extract_descriptions {
            return None;
        }
        value.and_then(Value::as_str).map(String::from)
    }

    fn tags_of(&self, schema: &Map<String, Value>) -> Vec<TableTag> {
        let Some(path) = &self.tags_key else {
            return Vec::new();
        };
        let mut segments = path.iter();
        let mut current = segments.next().and_then(|first| schema.get(first));
        for segment in segments {
            current = current.and_then(|v| v.get(segment));
        }
        current
            .and_then(Value::as_object)
            .map(|tags| {
                tags.iter()
                    .map(|(key, value)| TableTag::new(key, value_to_string(value)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `"Test schema-v1"` becomes `"test_schema_v1"`.
pub fn normalise(title: &str) -> String {
    title.replace(['-', ' '], "_").to_lowercase()
}

/// Names a pivoted table after its `const`. JSON literals are spelled
/// `True`, `False` and `None`, as in existing output trees.
fn pivot_name(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => value_to_string(other),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Extractor for JsonSchemaExtractor {
    async fn init(&mut self) -> Result<(), ExtractError> {
        let schema = load_schema(&self.config.schema_path).await?;
        let tables = self.tables_from_schema(&schema)?;
        info!(
            "Derived {} tables from schema '{}'",
            tables.len(),
            self.config.schema_path
        );
        self.tables = Some(tables.into_iter());
        Ok(())
    }

    async fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError> {
        if self.tables.is_none() {
            self.init().await?;
        }
        self.tables
            .as_mut()
            .map(Iterator::next)
            .ok_or_else(|| ExtractError::Internal(anyhow!("extractor was not initialised")))
    }

    fn scope(&self) -> String {
        format!(
            "carte.extractor.json_schema.{}.{}",
            self.connection_name, self.config.database
        )
    }
}
