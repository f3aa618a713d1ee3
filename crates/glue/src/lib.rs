//! # `carte-glue`: Catalog Search Extractor
//!
//! Extracts table metadata from an AWS Glue data catalog as a self-contained
//! plugin for `carte`. It implements the `Extractor` trait from the core
//! `carte` library.

pub mod client;
pub mod schema;

use anyhow::anyhow;
use async_trait::async_trait;
use carte::extract::{ExtractError, Extractor};
use carte::{ColumnMetadata, TableMetadata, TableType};
use aws_sdk_glue::config::http::HttpResponse;
use aws_sdk_glue::error::{DisplayErrorContext, SdkError};
use aws_sdk_glue::operation::search_tables::SearchTablesError;
use client::{search_all_tables, CatalogClient, GlueColumn, GlueTable, SdkCatalogClient};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub use client::{SearchTablesPage, StorageDescriptor};

const VIRTUAL_VIEW: &str = "VIRTUAL_VIEW";
const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";
const CONNECTION_NAME_KEY: &str = "connectionName";

/// Custom error types for the Glue extraction process.
#[derive(Error, Debug)]
pub enum GlueError {
    #[error("Failed to reach the catalog: {0}")]
    Fetch(String),
    #[error("Catalog API returned an error: {0}")]
    ApiError(String),
    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
    #[error("Malformed table schema: {0}")]
    SchemaFormat(String),
    #[error("Invalid table_name_filter: {0}")]
    InvalidFilter(#[from] regex::Error),
}

impl From<SdkError<SearchTablesError, HttpResponse>> for GlueError {
    fn from(err: SdkError<SearchTablesError, HttpResponse>) -> Self {
        let message = DisplayErrorContext(&err).to_string();
        // An unreadable body on a 2xx answer surfaces as an unhandled service error.
        let answered_ok = err
            .raw_response()
            .is_some_and(|response| response.status().is_success());
        match err {
            SdkError::ServiceError(_) if !answered_ok => GlueError::ApiError(message),
            SdkError::ServiceError(_) | SdkError::ResponseError(_) => GlueError::Parse(message),
            _ => GlueError::Fetch(message),
        }
    }
}

/// A helper to convert the specific `GlueError` into the generic `carte::extract::ExtractError`.
impl From<GlueError> for ExtractError {
    fn from(err: GlueError) -> Self {
        match err {
            GlueError::Fetch(msg) => ExtractError::Fetch(msg),
            GlueError::ApiError(msg) => ExtractError::Internal(anyhow!(msg)),
            GlueError::Parse(msg) => ExtractError::Parse(msg),
            GlueError::SchemaFormat(msg) => ExtractError::SchemaFormat(msg),
            GlueError::InvalidFilter(e) => {
                ExtractError::Config(format!("invalid table_name_filter: {e}"))
            }
        }
    }
}

/// The `config` block of a `glue` connection.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlueConfig {
    /// Tables whose `database.table` name matches are skipped.
    pub table_name_filter: Option<String>,
    /// Replaces the regional Glue endpoint resolved by the AWS SDK.
    pub endpoint_url: Option<String>,
}

/// The `Extractor` implementation for the Glue catalog.
pub struct GlueExtractor {
    connection_name: String,
    table_name_filter: Option<Regex>,
    client: Box<dyn CatalogClient>,
    rows: Option<std::vec::IntoIter<GlueTable>>,
}

impl GlueExtractor {
    /// Creates an extractor backed by the AWS SDK and the ambient AWS credentials.
    pub fn new(connection_name: impl Into<String>, config: GlueConfig) -> Result<Self, GlueError> {
        let client = SdkCatalogClient::from_env(config.endpoint_url.clone());
        Self::with_client(connection_name, config, Box::new(client))
    }

    /// Creates an extractor over any catalog client.
    pub fn with_client(
        connection_name: impl Into<String>,
        config: GlueConfig,
        client: Box<dyn CatalogClient>,
    ) -> Result<Self, GlueError> {
        let table_name_filter = config
            .table_name_filter
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            connection_name: connection_name.into(),
            table_name_filter,
            client,
            rows: None,
        })
    }

    fn is_filtered(&self, row: &GlueTable) -> bool {
        match &self.table_name_filter {
            Some(filter) => filter.is_match(&format!("{}.{}", row.database_name, row.name)),
            None => false,
        }
    }

    fn table_from_row(&self, row: GlueTable) -> Result<TableMetadata, GlueError> {
        let table_type = match row.table_type.as_deref() {
            Some(VIRTUAL_VIEW) => TableType::View,
            _ => TableType::Table,
        };
        let is_connected = row.table_type.as_deref() == Some(EXTERNAL_TABLE)
            && row.parameter(CONNECTION_NAME_KEY).is_some();

        let columns = if table_type == TableType::View || is_connected {
            let mut columns: Vec<ColumnMetadata> = row
                .storage_descriptor
                .iter()
                .flat_map(|sd| sd.columns.iter())
                .map(to_column)
                .collect();
            if table_type != TableType::View {
                columns.extend(row.partition_keys.iter().map(to_column));
            }
            columns
        } else {
            schema::columns_from_parameters(&row)?
        };

        let location = row.storage_descriptor.and_then(|sd| sd.location);
        Ok(TableMetadata {
            name: row.name,
            connection: self.connection_name.clone(),
            database: row.database_name,
            location,
            columns,
            table_type,
            ..Default::default()
        })
    }
}

fn to_column(column: &GlueColumn) -> ColumnMetadata {
    ColumnMetadata::new(&column.name, &column.column_type)
}

#[async_trait]
impl Extractor for GlueExtractor {
    /// Pages through every table in the catalog before the first row is emitted.
    async fn init(&mut self) -> Result<(), ExtractError> {
        info!("Searching catalog tables for connection '{}'", self.connection_name);
        let tables = search_all_tables(self.client.as_ref()).await?;
        self.rows = Some(tables.into_iter());
        Ok(())
    }

    async fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError> {
        if self.rows.is_none() {
            self.init().await?;
        }

        while let Some(row) = self.rows.as_mut().and_then(Iterator::next) {
            if self.is_filtered(&row) {
                debug!("Skipping filtered table '{}.{}'", row.database_name, row.name);
                continue;
            }
            return Ok(Some(self.table_from_row(row)?));
        }
        Ok(None)
    }

    fn scope(&self) -> String {
        "carte.extractor.glue".to_string()
    }
}
