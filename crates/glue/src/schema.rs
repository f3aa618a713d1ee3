//! Columns for tables registered by Spark, whose schema lives in the table
//! parameters rather than in the storage descriptor.
//!
//! Spark stores the schema as JSON under `spark.sql.sources.schema`. When the
//! document is too large for one parameter it is split across
//! `spark.sql.sources.schema.part.0` .. `part.{numParts - 1}`.

use crate::client::GlueTable;
use crate::GlueError;
use carte::ColumnMetadata;
use serde::Deserialize;
use serde_json::Value;

pub const SPARK_SCHEMA_KEY: &str = "spark.sql.sources.schema";
pub const SPARK_SCHEMA_NUM_PARTS_KEY: &str = "spark.sql.sources.schema.numParts";
pub const SPARK_SCHEMA_PART_PREFIX: &str = "spark.sql.sources.schema.part.";

#[derive(Deserialize, Debug)]
struct SparkSchema {
    #[serde(default)]
    fields: Vec<SparkField>,
}

#[derive(Deserialize, Debug)]
struct SparkField {
    name: String,
    #[serde(rename = "type")]
    data_type: Value,
}

/// Reassembles the raw schema document from the table parameters.
pub fn schema_document(table: &GlueTable) -> Result<String, GlueError> {
    if let Some(schema) = table.parameter(SPARK_SCHEMA_KEY) {
        return Ok(schema.to_string());
    }

    let Some(num_parts) = table.parameter(SPARK_SCHEMA_NUM_PARTS_KEY) else {
        return Err(GlueError::SchemaFormat(format!(
            "table '{}.{}' has neither '{SPARK_SCHEMA_KEY}' nor '{SPARK_SCHEMA_NUM_PARTS_KEY}'",
            table.database_name, table.name
        )));
    };
    let num_parts: usize = num_parts.trim().parse().map_err(|_| {
        GlueError::SchemaFormat(format!(
            "'{SPARK_SCHEMA_NUM_PARTS_KEY}' is not a number: '{num_parts}'"
        ))
    })?;

    let mut document = String::new();
    for index in 0..num_parts {
        let key = format!("{SPARK_SCHEMA_PART_PREFIX}{index}");
        let part = table.parameter(&key).ok_or_else(|| {
            GlueError::SchemaFormat(format!(
                "table '{}.{}' is missing schema part '{key}'",
                table.database_name, table.name
            ))
        })?;
        document.push_str(part);
    }
    Ok(document)
}

/// Decodes the embedded schema into columns, in field order.
pub fn columns_from_parameters(table: &GlueTable) -> Result<Vec<ColumnMetadata>, GlueError> {
    let document = schema_document(table)?;
    let schema: SparkSchema = serde_json::from_str(&document).map_err(|e| {
        GlueError::SchemaFormat(format!(
            "invalid schema JSON for '{}.{}': {e}",
            table.database_name, table.name
        ))
    })?;

    Ok(schema
        .fields
        .iter()
        .map(|field| ColumnMetadata::new(&field.name, render_type(&field.data_type)))
        .collect())
}

/// Renders a Spark type descriptor as a type string.
///
/// Plain names are used as-is; `map` descriptors become `map<key,value>`;
/// other structured descriptors use their own `type` field.
pub fn render_type(data_type: &Value) -> String {
    match data_type {
        Value::String(name) => name.clone(),
        Value::Object(descriptor) => match descriptor.get("type") {
            Some(Value::String(kind)) if kind == "map" => {
                let key = descriptor.get("keyType").map(render_type).unwrap_or_default();
                let value = descriptor
                    .get("valueType")
                    .map(render_type)
                    .unwrap_or_default();
                format!("map<{key},{value}>")
            }
            Some(kind) => render_type(kind),
            None => data_type.to_string(),
        },
        other => other.to_string(),
    }
}
