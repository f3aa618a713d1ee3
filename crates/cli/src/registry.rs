//! Maps each configured connection to the extractor that serves it.

use crate::config::ConnectionConfig;
use carte::extract::{ExtractError, Extractor};
use carte_glue::GlueExtractor;
use carte_json_schema::JsonSchemaExtractor;
use carte_postgres::PostgresExtractor;

/// Builds the extractor for one connection. No I/O happens until `init`.
pub fn create_extractor(connection: &ConnectionConfig) -> Result<Box<dyn Extractor>, ExtractError> {
    let extractor: Box<dyn Extractor> = match connection {
        ConnectionConfig::Glue { name, config } => {
            Box::new(GlueExtractor::new(name.as_str(), config.clone())?)
        }
        ConnectionConfig::JsonSchema { name, config } => {
            Box::new(JsonSchemaExtractor::new(name.as_str(), config.clone())?)
        }
        ConnectionConfig::Postgresql { name, config } => {
            Box::new(PostgresExtractor::new(name.as_str(), config.clone()))
        }
    };
    Ok(extractor)
}

/// Builds every extractor, in configuration order.
pub fn create_extractors(
    connections: &[ConnectionConfig],
) -> Result<Vec<Box<dyn Extractor>>, ExtractError> {
    connections.iter().map(create_extractor).collect()
}
