//! # Extraction Run
//!
//! Drives a full run: every extractor is drained into the loader, one after
//! the other, then documents that no extractor produced are pruned.
//!
//! Extractor order matters. When two connections produce the same identity,
//! the one listed later wins.

use carte::constants::MANIFESTS_FILE;
use carte::extract::{ExtractError, Extractor};
use carte::publisher;
use carte::{CarteLoader, LoadError, LoaderConfig, PublishError, Record};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Extractor '{scope}' failed: {source}")]
    Extract { scope: String, source: ExtractError },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Failed to prepare output directory '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub extractors: usize,
    pub tables_written: usize,
    /// Documents deleted by the pruner.
    pub removed: Vec<PathBuf>,
}

/// Empties the run manifest so it only records identities written by this run.
fn reset_manifest(output_dir: &Path) -> Result<PathBuf, RunError> {
    fs::create_dir_all(output_dir).map_err(|source| RunError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let manifests_path = output_dir.join(MANIFESTS_FILE);
    let io_err = |source| RunError::Io {
        path: manifests_path.clone(),
        source,
    };
    if manifests_path.is_file() {
        fs::remove_file(&manifests_path).map_err(io_err)?;
    }
    fs::write(&manifests_path, "").map_err(io_err)?;
    Ok(manifests_path)
}

/// Initialises one extractor and loads everything it produces.
async fn drain_into(
    extractor: &mut dyn Extractor,
    loader: &mut CarteLoader,
) -> Result<(), RunError> {
    let scope = extractor.scope();
    let extract_err = |source| RunError::Extract {
        scope: scope.clone(),
        source,
    };

    extractor.init().await.map_err(extract_err)?;
    while let Some(table) = extractor.extract().await.map_err(extract_err)? {
        loader.load(Record::Table(table))?;
    }
    Ok(())
}

/// Runs every extractor into `output_dir`, then prunes stale documents.
///
/// With no extractors nothing is written and nothing is pruned.
pub async fn run_extraction(
    extractors: Vec<Box<dyn Extractor>>,
    output_dir: &Path,
) -> Result<RunSummary, RunError> {
    let manifests_path = reset_manifest(output_dir)?;
    let mut loader = CarteLoader::new(
        LoaderConfig::new(output_dir).with_manifests_path(&manifests_path),
    );
    let mut summary = RunSummary {
        extractors: extractors.len(),
        ..Default::default()
    };

    for mut extractor in extractors {
        let before = loader.tables_written();
        info!("Running extractor '{}'", extractor.scope());
        drain_into(extractor.as_mut(), &mut loader).await?;
        info!(
            "Extractor '{}' wrote {} tables",
            extractor.scope(),
            loader.tables_written() - before
        );
    }
    summary.tables_written = loader.tables_written();

    if summary.extractors > 0 {
        summary.removed = publisher::prune(&manifests_path, output_dir)?;
        info!("Removed {} stale tables", summary.removed.len());
    }
    Ok(summary)
}
