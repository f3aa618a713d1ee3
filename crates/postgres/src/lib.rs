//! # `carte-postgres`: Relational Catalog Extractor
//!
//! Reads table and column metadata for the configured schemas from
//! PostgreSQL's `information_schema`, groups it into generic
//! [`SourceTable`]s and adapts those into the canonical model.

use async_trait::async_trait;
use carte::extract::{ExtractError, Extractor};
use carte::{DescriptionMetadata, SourceColumn, SourceTable, TableMetadata};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const COLUMNS_QUERY: &str = r#"
SELECT
    c.table_catalog::text AS cluster,
    c.table_schema::text AS schema,
    c.table_name::text AS name,
    obj_description(pc.oid, 'pg_class') AS table_description,
    c.column_name::text AS col_name,
    c.data_type::text AS col_type,
    col_description(pc.oid, c.ordinal_position::int4) AS col_description,
    c.ordinal_position::int4 AS col_sort_order,
    (t.table_type = 'VIEW') AS is_view
FROM information_schema.columns c
JOIN information_schema.tables t
    ON t.table_catalog = c.table_catalog
    AND t.table_schema = c.table_schema
    AND t.table_name = c.table_name
LEFT JOIN pg_catalog.pg_namespace pn ON pn.nspname = c.table_schema
LEFT JOIN pg_catalog.pg_class pc ON pc.relnamespace = pn.oid AND pc.relname = c.table_name
WHERE c.table_schema = ANY($1)
ORDER BY cluster, schema, name, col_sort_order
"#;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Failed to connect to PostgreSQL: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("Failed to query the PostgreSQL catalog: {0}")]
    Query(#[source] sqlx::Error),
}

/// A helper to convert the specific `PostgresError` into the generic `carte::extract::ExtractError`.
impl From<PostgresError> for ExtractError {
    fn from(err: PostgresError) -> Self {
        ExtractError::Fetch(err.to_string())
    }
}

fn default_included_schemas() -> Vec<String> {
    vec!["public".to_string()]
}

/// The `config` block of a `postgresql` connection.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    #[serde(default = "default_included_schemas")]
    pub included_schemas: Vec<String>,
}

/// One row of the catalog query: a column together with its table.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub cluster: String,
    pub schema: String,
    pub name: String,
    pub table_description: Option<String>,
    pub col_name: String,
    pub col_type: String,
    pub col_description: Option<String>,
    pub col_sort_order: i32,
    pub is_view: bool,
}

/// Groups consecutive rows of the same table into one [`SourceTable`].
///
/// Rows must be ordered by table, as the catalog query returns them.
pub fn group_rows(connection_name: &str, rows: Vec<ColumnRow>) -> Vec<SourceTable> {
    let mut tables: Vec<SourceTable> = Vec::new();
    for row in rows {
        let same_table = tables.last().is_some_and(|t| {
            t.cluster == row.cluster && t.schema == row.schema && t.name == row.name
        });
        if !same_table {
            tables.push(SourceTable {
                database: connection_name.to_string(),
                cluster: row.cluster.clone(),
                schema: row.schema.clone(),
                name: row.name.clone(),
                description: row.table_description.clone().map(DescriptionMetadata::text),
                columns: Vec::new(),
                is_view: row.is_view,
            });
        }
        if let Some(table) = tables.last_mut() {
            table.columns.push(SourceColumn {
                name: row.col_name,
                column_type: row.col_type,
                description: row.col_description.map(DescriptionMetadata::text),
                sort_order: row.col_sort_order,
            });
        }
    }
    tables
}

/// The `Extractor` implementation for PostgreSQL.
pub struct PostgresExtractor {
    connection_name: String,
    config: PostgresConfig,
    tables: Option<std::vec::IntoIter<TableMetadata>>,
}

impl PostgresExtractor {
    pub fn new(connection_name: impl Into<String>, config: PostgresConfig) -> Self {
        Self {
            connection_name: connection_name.into(),
            config,
            tables: None,
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<ColumnRow>, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&self.config.connection_string)
            .await
            .map_err(PostgresError::Connect)?;

        let rows = sqlx::query_as::<_, ColumnRow>(COLUMNS_QUERY)
            .bind(&self.config.included_schemas)
            .fetch_all(&pool)
            .await
            .map_err(PostgresError::Query);
        pool.close().await;
        rows
    }
}

#[async_trait]
impl Extractor for PostgresExtractor {
    async fn init(&mut self) -> Result<(), ExtractError> {
        info!(
            "Reading catalog for schemas {:?} on connection '{}'",
            self.config.included_schemas, self.connection_name
        );
        let rows = self.fetch_rows().await?;
        let tables: Vec<TableMetadata> = group_rows(&self.connection_name, rows)
            .iter()
            .map(TableMetadata::from_source_table)
            .collect();
        info!("Found {} tables.", tables.len());
        self.tables = Some(tables.into_iter());
        Ok(())
    }

    async fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError> {
        if self.tables.is_none() {
            self.init().await?;
        }
        Ok(self.tables.as_mut().and_then(Iterator::next))
    }

    fn scope(&self) -> String {
        format!("carte.extractor.postgres.{}", self.connection_name)
    }
}
