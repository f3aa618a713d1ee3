//! # PostgreSQL Extractor Tests
//!
//! The row grouping and model adaptation run everywhere. The live catalog
//! test needs a database and is ignored unless `CARTE_TEST_POSTGRES_URL` is
//! set and the test is run with `--ignored`.

use anyhow::Result;
use carte::extract::{ExtractError, Extractor};
use carte::{TableMetadata, TableType};
use carte_postgres::{group_rows, ColumnRow, PostgresConfig, PostgresExtractor};
use carte_test_utils::drain;

fn row(table: &str, column: &str, sort_order: i32) -> ColumnRow {
    ColumnRow {
        cluster: "shop".to_string(),
        schema: "public".to_string(),
        name: table.to_string(),
        table_description: None,
        col_name: column.to_string(),
        col_type: "integer".to_string(),
        col_description: None,
        col_sort_order: sort_order,
        is_view: false,
    }
}

#[test]
fn test_rows_adapt_into_canonical_tables() {
    // --- Arrange ---
    let rows = vec![
        ColumnRow {
            table_description: Some("Customer orders".to_string()),
            col_description: Some("Order id".to_string()),
            ..row("orders", "id", 1)
        },
        row("orders", "customer_id", 2),
        ColumnRow {
            is_view: true,
            ..row("order_totals", "total", 1)
        },
    ];

    // --- Act ---
    let tables: Vec<TableMetadata> = group_rows("postgres", rows)
        .iter()
        .map(TableMetadata::from_source_table)
        .collect();

    // --- Assert ---
    assert_eq!(tables.len(), 2);
    let orders = &tables[0];
    assert_eq!(orders.identity(), "postgres/shop/orders");
    assert_eq!(orders.location.as_deref(), Some("postgres://shop.public/orders"));
    assert_eq!(orders.description.as_deref(), Some("Customer orders"));
    assert_eq!(orders.columns[0].description.as_deref(), Some("Order id"));
    assert_eq!(orders.columns[1].name, "customer_id");
    assert_eq!(orders.table_type, TableType::Table);
    assert_eq!(tables[1].table_type, TableType::View);
}

#[tokio::test]
async fn test_unreachable_server_is_a_fetch_error() -> Result<()> {
    let config = PostgresConfig {
        connection_string: "postgres://carte@127.0.0.1:1/none".to_string(),
        included_schemas: vec!["public".to_string()],
    };
    let mut extractor = PostgresExtractor::new("postgres", config);

    let result = extractor.init().await;

    assert!(matches!(result, Err(ExtractError::Fetch(_))));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_live_catalog_extraction() -> Result<()> {
    let url = std::env::var("CARTE_TEST_POSTGRES_URL")?;
    let mut extractor = PostgresExtractor::new(
        "postgres",
        PostgresConfig {
            connection_string: url,
            included_schemas: vec!["information_schema".to_string()],
        },
    );

    let tables = drain(&mut extractor).await?;

    assert!(tables.iter().any(|t| t.name == "tables" && t.table_type == TableType::View));
    let catalog = &tables[0].database;
    assert!(tables.iter().all(|t| &t.database == catalog));
    assert!(tables
        .iter()
        .all(|t| t.location.as_deref().is_some_and(|l| l.contains(".information_schema/"))));
    Ok(())
}
