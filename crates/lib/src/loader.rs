//! # Reconciling Persister
//!
//! Writes every extracted table to `<root>/<connection>/<database>/<name>.md`,
//! merging it onto the document already at that path so hand-written
//! descriptions survive re-extraction, and appends the table's identity to the
//! run manifest so the pruner knows which documents are still live.
//!
//! Writes are not transactional: a crash mid-write may leave a truncated
//! document. One run owns the output tree at a time.

use crate::constants::{MANIFESTS_FILE, TABLE_FILE_EXTENSION, TABLES_OUTPUT_PATH};
use crate::errors::LoadError;
use crate::frontmatter;
use crate::model::{Record, TableMetadata};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the loader writes documents and the manifest.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub tables_output_path: PathBuf,
    pub manifests_path: PathBuf,
}

impl LoaderConfig {
    /// Places the manifest directly inside the tables directory.
    pub fn new(tables_output_path: impl Into<PathBuf>) -> Self {
        let tables_output_path = tables_output_path.into();
        let manifests_path = tables_output_path.join(MANIFESTS_FILE);
        Self {
            tables_output_path,
            manifests_path,
        }
    }

    pub fn with_manifests_path(mut self, manifests_path: impl Into<PathBuf>) -> Self {
        self.manifests_path = manifests_path.into();
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(Path::new(".").join(TABLES_OUTPUT_PATH))
    }
}

/// Outcome of persisting a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTable {
    pub identity: String,
    pub path: PathBuf,
    /// True when an existing document was merged rather than created.
    pub merged: bool,
}

/// Persists records into the output tree, one document per table.
#[derive(Debug, Clone)]
pub struct CarteLoader {
    config: LoaderConfig,
    tables_written: usize,
}

impl CarteLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            tables_written: 0,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Number of table documents written by this loader so far.
    pub fn tables_written(&self) -> usize {
        self.tables_written
    }

    /// The path a table is persisted at.
    pub fn table_file_path(&self, table: &TableMetadata) -> PathBuf {
        self.config
            .tables_output_path
            .join(&table.connection)
            .join(&table.database)
            .join(format!("{}.{TABLE_FILE_EXTENSION}", table.name))
    }

    /// Routes a record to its handler. Job records are not stored.
    pub fn load(&mut self, record: Record) -> Result<Option<PersistedTable>, LoadError> {
        match record {
            Record::Table(table) => self.persist(&table).map(Some),
            Record::Job(job) => {
                warn!("Skipping job record '{}': jobs are not persisted.", job.name);
                Ok(None)
            }
        }
    }

    /// Writes `table`, merged onto any existing document for the same identity,
    /// and records its identity in the manifest.
    pub fn persist(&mut self, table: &TableMetadata) -> Result<PersistedTable, LoadError> {
        // The pruner only scans `<connection>/<database>/<name>.md`.
        let segments = [
            ("connection", &table.connection),
            ("database", &table.database),
            ("name", &table.name),
        ];
        if let Some(&(field, _)) = segments.iter().find(|(_, value)| value.is_empty()) {
            return Err(LoadError::IncompleteIdentity {
                identity: table.identity(),
                field,
            });
        }

        let path = self.table_file_path(table);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LoadError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let (to_write, merged) = if path.is_file() {
            debug!("Merging onto existing document '{}'", path.display());
            let existing =
                frontmatter::read_file(&path).map_err(|source| LoadError::Decode {
                    path: path.clone(),
                    source,
                })?;
            let merged =
                table
                    .merge_with_existing(&existing)
                    .map_err(|source| LoadError::Conflict {
                        path: path.clone(),
                        source,
                    })?;
            (merged, true)
        } else {
            (table.clone(), false)
        };

        let document = frontmatter::encode(&to_write).map_err(|source| LoadError::Encode {
            identity: table.identity(),
            source,
        })?;
        fs::write(&path, document).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let identity = table.identity();
        self.append_to_manifest(&identity)?;
        self.tables_written += 1;

        info!("Persisted table '{}' to '{}'", identity, path.display());
        Ok(PersistedTable {
            identity,
            path,
            merged,
        })
    }

    fn append_to_manifest(&self, identity: &str) -> Result<(), LoadError> {
        let manifests_path = &self.config.manifests_path;
        let io_err = |source| LoadError::Io {
            path: manifests_path.clone(),
            source,
        };
        if let Some(parent) = manifests_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(manifests_path)
            .map_err(io_err)?;
        writeln!(file, "{identity}").map_err(io_err)
    }
}
