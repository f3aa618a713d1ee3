//! # Catalog Search Client
//!
//! Pages through `SearchTables` with the AWS SDK, which signs every request
//! with credentials from the standard AWS provider chain. Raw SDK tables are
//! copied into plain structs carrying only the fields the extractor reads.

use crate::GlueError;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_glue::types::{Column, Table};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const DEFAULT_REGION: &str = "us-east-1";

// --- Catalog Table Structures ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlueColumn {
    pub name: String,
    pub column_type: String,
}

impl From<&Column> for GlueColumn {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name().to_string(),
            column_type: column.r#type().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageDescriptor {
    pub columns: Vec<GlueColumn>,
    pub location: Option<String>,
}

/// One raw table descriptor as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlueTable {
    pub name: String,
    pub database_name: String,
    pub table_type: Option<String>,
    pub parameters: HashMap<String, String>,
    pub storage_descriptor: Option<StorageDescriptor>,
    pub partition_keys: Vec<GlueColumn>,
}

impl GlueTable {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

impl From<&Table> for GlueTable {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name().to_string(),
            database_name: table.database_name().unwrap_or_default().to_string(),
            table_type: table.table_type().map(String::from),
            parameters: table.parameters().cloned().unwrap_or_default(),
            storage_descriptor: table.storage_descriptor().map(|sd| StorageDescriptor {
                columns: sd.columns().iter().map(GlueColumn::from).collect(),
                location: sd.location().map(String::from),
            }),
            partition_keys: table.partition_keys().iter().map(GlueColumn::from).collect(),
        }
    }
}

/// A single page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchTablesPage {
    pub table_list: Vec<GlueTable>,
    pub next_token: Option<String>,
}

// --- Client ---

/// Fetches pages of table descriptors from a catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_tables(&self, next_token: Option<&str>)
        -> Result<SearchTablesPage, GlueError>;
}

/// A `CatalogClient` backed by `aws_sdk_glue`.
#[derive(Debug)]
pub struct SdkCatalogClient {
    endpoint_url: Option<String>,
    client: OnceCell<aws_sdk_glue::Client>,
}

impl SdkCatalogClient {
    /// Resolves region and credentials from the AWS environment on first use.
    /// The region falls back to `us-east-1`; `endpoint_url` replaces the
    /// regional endpoint.
    pub fn from_env(endpoint_url: Option<String>) -> Self {
        Self {
            endpoint_url,
            client: OnceCell::new(),
        }
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: aws_sdk_glue::Client) -> Self {
        Self {
            endpoint_url: None,
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    async fn client(&self) -> &aws_sdk_glue::Client {
        self.client
            .get_or_init(|| async {
                let region = RegionProviderChain::default_provider().or_else(DEFAULT_REGION);
                let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
                if let Some(endpoint_url) = &self.endpoint_url {
                    loader = loader.endpoint_url(endpoint_url);
                }
                aws_sdk_glue::Client::new(&loader.load().await)
            })
            .await
    }
}

#[async_trait]
impl CatalogClient for SdkCatalogClient {
    async fn search_tables(
        &self,
        next_token: Option<&str>,
    ) -> Result<SearchTablesPage, GlueError> {
        let output = self
            .client()
            .await
            .search_tables()
            .set_next_token(next_token.map(String::from))
            .send()
            .await?;

        Ok(SearchTablesPage {
            table_list: output.table_list().iter().map(GlueTable::from).collect(),
            next_token: output.next_token().map(String::from),
        })
    }
}

/// Follows continuation tokens until the last page and returns every table,
/// in the order the catalog returned them.
pub async fn search_all_tables(client: &dyn CatalogClient) -> Result<Vec<GlueTable>, GlueError> {
    let mut tables = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let mut page = client.search_tables(next_token.as_deref()).await?;
        pages += 1;
        debug!("Fetched page {} with {} tables", pages, page.table_list.len());
        tables.append(&mut page.table_list);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    info!("Fetched {} tables in {} pages from the catalog.", tables.len(), pages);
    Ok(tables)
}
