use anyhow::Result;
use async_trait::async_trait;
use carte::extract::{ExtractError, Extractor};
use carte::{ColumnMetadata, LoaderConfig, TableMetadata, TableTag};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// --- Test Setup ---

/// A helper struct to manage a temporary output tree for each test.
pub struct TestTree {
    pub dir: TempDir,
    pub tables_path: PathBuf,
}

impl TestTree {
    /// Creates a new, isolated directory with an empty `tables` root.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let tables_path = dir.path().join("tables");
        fs::create_dir_all(&tables_path)?;
        Ok(Self { dir, tables_path })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A loader configuration writing into this tree.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new(&self.tables_path)
    }

    /// Writes a raw document at `relative` (e.g. `glue/db/table.md`) under the tables root.
    pub fn write_document(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.tables_path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Writes a file anywhere under the temporary directory.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn read_document(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.tables_path.join(relative))?)
    }
}

// --- Sample Records ---

/// A small table with an annotated column and a tag.
pub fn sample_table(connection: &str, database: &str, name: &str) -> TableMetadata {
    TableMetadata {
        location: Some(format!("s3://warehouse/{database}/{name}")),
        description: Some(format!("The {name} table.")),
        columns: vec![
            ColumnMetadata::new("id", "bigint").with_description("Primary key"),
            ColumnMetadata::new("status", "string")
                .with_values(vec!["open".to_string(), "closed".to_string()]),
        ],
        tags: vec![TableTag::new("owner", "data-platform")],
        ..TableMetadata::new(connection, database, name)
    }
}

// --- Extractor Helpers ---

/// Initialises an extractor and collects everything it produces.
pub async fn drain(extractor: &mut dyn Extractor) -> Result<Vec<TableMetadata>, ExtractError> {
    extractor.init().await?;
    let mut tables = Vec::new();
    while let Some(table) = extractor.extract().await? {
        tables.push(table);
    }
    Ok(tables)
}

/// An in-memory extractor replaying a fixed list of tables.
#[derive(Clone, Debug)]
pub struct MockExtractor {
    name: String,
    tables: Vec<TableMetadata>,
    position: usize,
    init_calls: Arc<Mutex<usize>>,
}

impl MockExtractor {
    pub fn new(name: &str, tables: Vec<TableMetadata>) -> Self {
        Self {
            name: name.to_string(),
            tables,
            position: 0,
            init_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Retrieves how many times `init` was called, for assertion.
    pub fn init_calls(&self) -> usize {
        *self.init_calls.lock().unwrap()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn init(&mut self) -> Result<(), ExtractError> {
        *self.init_calls.lock().unwrap() += 1;
        self.position = 0;
        Ok(())
    }

    async fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError> {
        let table = self.tables.get(self.position).cloned();
        if table.is_some() {
            self.position += 1;
        }
        Ok(table)
    }

    fn scope(&self) -> String {
        format!("carte.extractor.mock.{}", self.name)
    }
}
