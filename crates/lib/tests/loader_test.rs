//! # Reconciling Persister Tests
//!
//! Exercises the loader against a real temporary output tree.

use anyhow::Result;
use carte::frontmatter;
use carte::{
    CarteLoader, ColumnMetadata, JobMetadata, LoadError, LoaderConfig, MergeError, Record,
    TableMetadata, TableType,
};
use std::fs;
use tempfile::tempdir;

fn extracted() -> TableMetadata {
    TableMetadata {
        location: Some("test_loc".to_string()),
        columns: vec![
            ColumnMetadata::new("test_col1", "string"),
            ColumnMetadata::new("test_col2", "bigint"),
        ],
        ..TableMetadata::new("glue", "test_db1", "test_name")
    }
}

#[test]
fn test_persist_new_table_writes_document_and_manifest() -> Result<()> {
    // --- Arrange ---
    let dir = tempdir()?;
    let config = LoaderConfig::new(dir.path().join("tables"));
    let mut loader = CarteLoader::new(config.clone());
    let table = extracted();

    // --- Act ---
    let persisted = loader.persist(&table)?;

    // --- Assert ---
    let expected_path = dir.path().join("tables/glue/test_db1/test_name.md");
    assert_eq!(persisted.path, expected_path);
    assert!(!persisted.merged);
    assert_eq!(frontmatter::read_file(&expected_path)?, table);
    assert_eq!(
        fs::read_to_string(&config.manifests_path)?,
        "glue/test_db1/test_name\n"
    );
    assert_eq!(loader.tables_written(), 1);
    Ok(())
}

#[test]
fn test_persist_merges_with_existing_document() -> Result<()> {
    // --- Arrange ---
    let dir = tempdir()?;
    let mut loader = CarteLoader::new(LoaderConfig::new(dir.path()));
    let existing = TableMetadata {
        location: Some("old_loc".to_string()),
        description: Some("Something".to_string()),
        columns: vec![
            ColumnMetadata::new("test_col1", "string").with_description("first column"),
            ColumnMetadata::new("test_col2", "varchar"),
            ColumnMetadata::new("gone", "int").with_description("dropped upstream"),
        ],
        table_type: TableType::View,
        ..TableMetadata::new("glue", "test_db1", "test_name")
    };
    let path = loader.table_file_path(&existing);
    fs::create_dir_all(path.parent().unwrap())?;
    frontmatter::write_file(&path, &existing)?;

    // --- Act ---
    let persisted = loader.persist(&extracted())?;

    // --- Assert ---
    assert!(persisted.merged);
    let written = frontmatter::read_file(&path)?;
    assert_eq!(written, extracted().merge_with_existing(&existing)?);
    assert_eq!(written.description.as_deref(), Some("Something"));
    assert_eq!(written.location.as_deref(), Some("test_loc"));
    assert_eq!(written.columns.len(), 2);
    assert_eq!(written.columns[1].column_type, "bigint");
    assert_eq!(
        written.columns[0].description.as_deref(),
        Some("first column")
    );
    Ok(())
}

#[test]
fn test_manifest_accumulates_across_calls() -> Result<()> {
    let dir = tempdir()?;
    let config = LoaderConfig::new(dir.path()).with_manifests_path(dir.path().join("run/manifests"));
    let mut loader = CarteLoader::new(config.clone());

    loader.persist(&extracted())?;
    loader.persist(&TableMetadata::new("pg", "public", "users"))?;
    // Re-persisting the same identity in one run is allowed; the last write wins.
    loader.persist(&extracted())?;

    let manifest = fs::read_to_string(&config.manifests_path)?;
    assert_eq!(
        manifest.lines().collect::<Vec<_>>(),
        vec![
            "glue/test_db1/test_name",
            "pg/public/users",
            "glue/test_db1/test_name"
        ]
    );
    Ok(())
}

#[test]
fn test_persist_reports_conflict_with_path() -> Result<()> {
    // --- Arrange ---
    let dir = tempdir()?;
    let mut loader = CarteLoader::new(LoaderConfig::new(dir.path()));
    let path = loader.table_file_path(&extracted());
    fs::create_dir_all(path.parent().unwrap())?;
    // A document that was copied here from another database.
    fs::write(&path, "---\ntitle: test_name\ndatabase: other_db\n---\n")?;

    // --- Act ---
    let result = loader.persist(&extracted());

    // --- Assert ---
    match result {
        Err(LoadError::Conflict {
            path: error_path,
            source: MergeError::Conflict { field, .. },
        }) => {
            assert_eq!(error_path, path);
            assert_eq!(field, "database");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert!(!dir.path().join("manifests").exists());
    assert_eq!(loader.tables_written(), 0);
    Ok(())
}

#[test]
fn test_persist_reports_missing_identity_with_path() -> Result<()> {
    let dir = tempdir()?;
    let mut loader = CarteLoader::new(LoaderConfig::new(dir.path()));
    let path = loader.table_file_path(&extracted());
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(&path, "---\ndatabase: test_db1\n---\nOrphaned text\n")?;

    let err = loader.persist(&extracted()).unwrap_err();

    assert!(matches!(
        err,
        LoadError::Decode {
            source: carte::FrontmatterError::MissingIdentity,
            ..
        }
    ));
    assert!(err.to_string().contains("test_name.md"));
    // The corrupt document is left untouched for an operator to fix.
    assert_eq!(
        fs::read_to_string(&path)?,
        "---\ndatabase: test_db1\n---\nOrphaned text\n"
    );
    Ok(())
}

#[test]
fn test_load_routes_records_by_variant() -> Result<()> {
    let dir = tempdir()?;
    let mut loader = CarteLoader::new(LoaderConfig::new(dir.path()));

    let job = loader.load(Record::Job(JobMetadata {
        name: "nightly".to_string(),
        ..Default::default()
    }))?;
    let table = loader.load(extracted().into())?;

    assert!(job.is_none());
    assert_eq!(table.map(|t| t.identity).as_deref(), Some("glue/test_db1/test_name"));
    assert_eq!(loader.tables_written(), 1);
    Ok(())
}

#[test]
fn test_persist_rejects_empty_database() -> Result<()> {
    // --- Arrange ---
    let dir = tempdir()?;
    let config = LoaderConfig::new(dir.path().join("tables"));
    let mut loader = CarteLoader::new(config.clone());
    let table = TableMetadata {
        database: String::new(),
        ..extracted()
    };

    // --- Act ---
    let result = loader.persist(&table);

    // --- Assert ---
    assert!(matches!(
        result,
        Err(LoadError::IncompleteIdentity { field: "database", .. })
    ));
    assert!(!dir.path().join("tables/glue/test_name.md").exists());
    assert!(!config.manifests_path.exists());
    assert_eq!(loader.tables_written(), 0);
    Ok(())
}
