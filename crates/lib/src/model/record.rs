//! Records handed from the run orchestrator to the persister.

use super::table::TableMetadata;

/// Metadata about a scheduled job touching the catalog.
///
/// The output tree only stores tables, so the persister accepts these and
/// skips them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobMetadata {
    pub name: String,
    pub connection: String,
    pub description: Option<String>,
}

/// Everything the persister can be asked to load. The producer decides the
/// variant; the persister never inspects payload types.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Table(TableMetadata),
    Job(JobMetadata),
}

impl From<TableMetadata> for Record {
    fn from(table: TableMetadata) -> Self {
        Record::Table(table)
    }
}

impl From<JobMetadata> for Record {
    fn from(job: JobMetadata) -> Self {
        Record::Job(job)
    }
}
