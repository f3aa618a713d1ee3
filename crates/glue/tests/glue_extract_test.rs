//! # Glue Extractor Tests
//!
//! Drives `GlueExtractor` over an in-memory catalog client, covering table
//! kinds, column sources and the name filter.

use anyhow::Result;
use async_trait::async_trait;
use carte::extract::{ExtractError, Extractor};
use carte::{ColumnMetadata, TableMetadata, TableType};
use carte_glue::client::{CatalogClient, GlueColumn, GlueTable, SearchTablesPage};
use carte_glue::{GlueConfig, GlueError, GlueExtractor, StorageDescriptor};
use carte_test_utils::drain;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// --- Mock Catalog Client ---

#[derive(Clone, Default)]
struct MockCatalogClient {
    pages: Vec<SearchTablesPage>,
    calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockCatalogClient {
    /// Chains the given pages with tokens `page-1`, `page-2`, ...
    fn with_pages(pages: Vec<Vec<GlueTable>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, table_list)| SearchTablesPage {
                table_list,
                next_token: (i + 1 < count).then(|| format!("page-{}", i + 1)),
            })
            .collect();
        Self {
            pages,
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn search_tables(
        &self,
        next_token: Option<&str>,
    ) -> Result<SearchTablesPage, GlueError> {
        self.calls
            .lock()
            .unwrap()
            .push(next_token.map(String::from));
        let index = match next_token {
            None => 0,
            Some(token) => token.trim_start_matches("page-").parse().unwrap(),
        };
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

// --- Fixtures ---

fn column(name: &str, column_type: &str) -> GlueColumn {
    GlueColumn {
        name: name.to_string(),
        column_type: column_type.to_string(),
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn connected_table(database: &str, name: &str) -> GlueTable {
    GlueTable {
        name: name.to_string(),
        database_name: database.to_string(),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        parameters: params(&[("connectionName", "jdbc-prod")]),
        storage_descriptor: Some(StorageDescriptor {
            columns: vec![column("col_id1", "bigint"), column("source", "varchar")],
            location: Some("test_location".to_string()),
        }),
        partition_keys: vec![column("partition_key1", "string")],
    }
}

fn extractor(client: MockCatalogClient, filter: Option<&str>) -> Result<GlueExtractor> {
    let config = GlueConfig {
        table_name_filter: filter.map(String::from),
        ..Default::default()
    };
    Ok(GlueExtractor::with_client("glue", config, Box::new(client))?)
}

// --- Tests ---

#[tokio::test]
async fn test_extraction_with_empty_result() -> Result<()> {
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![]]), None)?;

    extractor.init().await?;

    assert!(extractor.extract().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_connected_table_uses_storage_descriptor_and_partition_keys() -> Result<()> {
    // --- Arrange ---
    let client = MockCatalogClient::with_pages(vec![vec![connected_table("test_schema", "test_table")]]);
    let mut extractor = extractor(client, None)?;

    // --- Act ---
    extractor.init().await?;
    let actual = extractor.extract().await?;

    // --- Assert ---
    let expected = TableMetadata {
        location: Some("test_location".to_string()),
        columns: vec![
            ColumnMetadata::new("col_id1", "bigint"),
            ColumnMetadata::new("source", "varchar"),
            ColumnMetadata::new("partition_key1", "string"),
        ],
        table_type: TableType::Table,
        ..TableMetadata::new("glue", "test_schema", "test_table")
    };
    assert_eq!(actual, Some(expected));
    assert!(extractor.extract().await?.is_none());
    assert!(extractor.extract().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_virtual_view_reads_storage_descriptor_only() -> Result<()> {
    // --- Arrange ---
    // The view carries a broken schema parameter and partition keys; neither is read.
    let view = GlueTable {
        name: "test_view1".to_string(),
        database_name: "test_schema1".to_string(),
        table_type: Some("VIRTUAL_VIEW".to_string()),
        parameters: params(&[("spark.sql.sources.schema", "not json")]),
        storage_descriptor: Some(StorageDescriptor {
            columns: vec![column("col_id3", "varchar"), column("col_name3", "varchar")],
            location: None,
        }),
        partition_keys: vec![column("ignored", "string")],
    };
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![view]]), None)?;

    // --- Act ---
    let tables = drain(&mut extractor).await?;

    // --- Assert ---
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table_type, TableType::View);
    assert_eq!(tables[0].location, None);
    assert_eq!(
        tables[0].columns,
        vec![
            ColumnMetadata::new("col_id3", "varchar"),
            ColumnMetadata::new("col_name3", "varchar"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_spark_table_reads_single_schema_parameter() -> Result<()> {
    let schema = r#"{"type":"struct","fields":[
        {"name":"id","type":"long","nullable":false,"metadata":{}},
        {"name":"attrs","type":{"type":"map","keyType":"string","valueType":"integer","valueContainsNull":true},"nullable":true,"metadata":{}},
        {"name":"items","type":{"type":"array","elementType":"string","containsNull":true},"nullable":true,"metadata":{}}
    ]}"#;
    let table = GlueTable {
        name: "events".to_string(),
        database_name: "analytics".to_string(),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        parameters: params(&[("spark.sql.sources.schema", schema)]),
        storage_descriptor: Some(StorageDescriptor {
            columns: vec![column("col", "array<string>")],
            location: Some("s3://lake/events".to_string()),
        }),
        ..Default::default()
    };
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![table]]), None)?;

    let tables = drain(&mut extractor).await?;

    assert_eq!(
        tables[0].columns,
        vec![
            ColumnMetadata::new("id", "long"),
            ColumnMetadata::new("attrs", "map<string,integer>"),
            ColumnMetadata::new("items", "array"),
        ]
    );
    assert_eq!(tables[0].location.as_deref(), Some("s3://lake/events"));
    Ok(())
}

#[tokio::test]
async fn test_spark_table_concatenates_schema_parts_in_order() -> Result<()> {
    // --- Arrange ---
    let table = GlueTable {
        name: "wide".to_string(),
        database_name: "analytics".to_string(),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        parameters: params(&[
            ("spark.sql.sources.schema.numParts", "3"),
            ("spark.sql.sources.schema.part.2", r#"ble","nullable":true,"metadata":{}}]}"#),
            ("spark.sql.sources.schema.part.0", r#"{"type":"struct","fields":[{"name":"a","type":"string","#),
            ("spark.sql.sources.schema.part.1", r#""nullable":true,"metadata":{}},{"name":"b","type":"dou"#),
        ]),
        ..Default::default()
    };
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![table]]), None)?;

    // --- Act ---
    let tables = drain(&mut extractor).await?;

    // --- Assert ---
    assert_eq!(
        tables[0].columns,
        vec![
            ColumnMetadata::new("a", "string"),
            ColumnMetadata::new("b", "double"),
        ]
    );
    assert_eq!(tables[0].location, None);
    Ok(())
}

#[tokio::test]
async fn test_table_without_schema_fails_with_schema_format_error() -> Result<()> {
    let table = GlueTable {
        name: "orphan".to_string(),
        database_name: "analytics".to_string(),
        table_type: Some("EXTERNAL_TABLE".to_string()),
        ..Default::default()
    };
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![table]]), None)?;

    let result = drain(&mut extractor).await;

    assert!(matches!(result, Err(ExtractError::SchemaFormat(_))));
    Ok(())
}

#[tokio::test]
async fn test_external_table_without_connection_name_needs_schema() -> Result<()> {
    let mut table = connected_table("analytics", "unconnected");
    table.parameters = params(&[("classification", "parquet")]);
    let mut extractor = extractor(MockCatalogClient::with_pages(vec![vec![table]]), None)?;

    let result = drain(&mut extractor).await;

    assert!(matches!(result, Err(ExtractError::SchemaFormat(_))));
    Ok(())
}

#[tokio::test]
async fn test_pagination_preserves_order_across_pages() -> Result<()> {
    // --- Arrange ---
    let client = MockCatalogClient::with_pages(vec![
        vec![connected_table("db", "first"), connected_table("db", "second")],
        vec![connected_table("db", "third")],
    ]);
    let mut extractor = extractor(client.clone(), None)?;

    // --- Act ---
    let tables = drain(&mut extractor).await?;

    // --- Assert ---
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert_eq!(client.calls(), vec![None, Some("page-1".to_string())]);
    Ok(())
}

#[tokio::test]
async fn test_name_filter_excludes_matching_tables() -> Result<()> {
    let client = MockCatalogClient::with_pages(vec![vec![
        connected_table("sandbox", "t"),
        connected_table("prod", "t"),
        connected_table("prod", "sandbox_copy"),
    ]]);
    let mut extractor = extractor(client, Some(r"^sandbox\."))?;

    let tables = drain(&mut extractor).await?;

    let identities: Vec<String> = tables.iter().map(TableMetadata::identity).collect();
    assert_eq!(identities, vec!["glue/prod/t", "glue/prod/sandbox_copy"]);
    Ok(())
}

#[tokio::test]
async fn test_extract_before_init_initialises_lazily() -> Result<()> {
    let client = MockCatalogClient::with_pages(vec![vec![connected_table("db", "t")]]);
    let mut extractor = extractor(client.clone(), None)?;

    let first = extractor.extract().await?;

    assert_eq!(first.map(|t| t.name), Some("t".to_string()));
    assert!(extractor.extract().await?.is_none());
    assert_eq!(client.calls().len(), 1);
    Ok(())
}

#[test]
fn test_invalid_filter_is_rejected_at_construction() {
    let result = extractor(MockCatalogClient::default(), Some("(unclosed"));
    assert!(result.is_err());
}

#[test]
fn test_invalid_filter_maps_to_config_error() {
    let err = GlueExtractor::with_client(
        "glue",
        GlueConfig {
            table_name_filter: Some("[".to_string()),
            ..Default::default()
        },
        Box::new(MockCatalogClient::default()),
    )
    .err()
    .unwrap();

    assert!(matches!(ExtractError::from(err), ExtractError::Config(_)));
}
