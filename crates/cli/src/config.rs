//! # Run Configuration
//!
//! Loads the YAML file listing the connections to extract from. `${VAR}`
//! references are replaced with environment variables before parsing, so
//! secrets such as connection strings can stay out of the file.

use carte_glue::GlueConfig;
use carte_json_schema::JsonSchemaConfig;
use carte_postgres::PostgresConfig;
use config::{Config as ConfigBuilder, File, FileFormat, Value as ConfigValue};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    General(#[from] config::ConfigError),
    #[error("Invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid configuration for connection {connection}: {message}")]
    Connection { connection: String, message: String },
}

fn default_glue_name() -> String {
    "glue".to_string()
}

fn default_json_schema_name() -> String {
    "json_schema".to_string()
}

fn default_postgres_name() -> String {
    "postgres".to_string()
}

/// One entry of the `connections` list, selected by its `type` tag.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ConnectionConfig {
    #[serde(rename = "glue")]
    Glue {
        #[serde(default = "default_glue_name")]
        name: String,
        #[serde(default)]
        config: GlueConfig,
    },
    #[serde(rename = "json_schema")]
    JsonSchema {
        #[serde(default = "default_json_schema_name")]
        name: String,
        config: JsonSchemaConfig,
    },
    #[serde(rename = "postgresql")]
    Postgresql {
        #[serde(default = "default_postgres_name")]
        name: String,
        config: PostgresConfig,
    },
}

impl ConnectionConfig {
    pub fn name(&self) -> &str {
        match self {
            ConnectionConfig::Glue { name, .. }
            | ConnectionConfig::JsonSchema { name, .. }
            | ConnectionConfig::Postgresql { name, .. } => name,
        }
    }
}

/// The root configuration. Connections run in the order they are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarteConfig {
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    connections: Vec<ConfigValue>,
}

/// Replaces every `${VAR}` with the value of the environment variable `VAR`,
/// or with nothing when it is unset.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{(?P<var>[A-Za-z0-9_]+)\}")?;
    let expanded = re.replace_all(content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });
    Ok(expanded.into_owned())
}

/// Parses configuration text (after substitution) into a [`CarteConfig`].
pub fn parse_config(content: &str) -> Result<CarteConfig, ConfigError> {
    let settings = ConfigBuilder::builder()
        .add_source(File::from_str(content, FileFormat::Yaml))
        .build()?;
    let raw: RawConfig = settings.try_deserialize()?;

    let connections = raw
        .connections
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let label = connection_label(index, &value);
            value
                .try_deserialize::<ConnectionConfig>()
                .map_err(|e| ConfigError::Connection {
                    connection: label,
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CarteConfig { connections })
}

/// Reads, substitutes and parses the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<CarteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&substitute_env_vars(&content)?)?;
    info!(
        "Loaded {} connections from '{}'",
        config.connections.len(),
        path.display()
    );
    Ok(config)
}

/// `#<index> ('<name>')`, or just `#<index>` when the entry has no name.
fn connection_label(index: usize, value: &ConfigValue) -> String {
    let name = value
        .clone()
        .into_table()
        .ok()
        .and_then(|table| table.get("name").cloned())
        .and_then(|name| name.into_string().ok());
    match name {
        Some(name) => format!("#{index} ('{name}')"),
        None => format!("#{index}"),
    }
}
