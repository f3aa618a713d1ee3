//! Loading the schema document from a local path or an `s3://` URL.

use crate::JsonSchemaError;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectStorePath;
use object_store::ObjectStore;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

const S3_PROTOCOL: &str = "s3://";

/// Where a schema document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl SchemaLocation {
    /// Anything starting with `s3://` is an object in a bucket; everything
    /// else is a local path.
    pub fn parse(path: &str) -> Result<Self, JsonSchemaError> {
        let Some(without_protocol) = path.strip_prefix(S3_PROTOCOL) else {
            return Ok(Self::Local(PathBuf::from(path)));
        };
        match without_protocol.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(JsonSchemaError::InvalidS3Path(path.to_string())),
        }
    }
}

/// Reads and parses the schema document at `path`.
///
/// S3 credentials and region come from the standard `AWS_*` environment
/// variables.
pub async fn load_schema(path: &str) -> Result<Value, JsonSchemaError> {
    let content = match SchemaLocation::parse(path)? {
        SchemaLocation::Local(local) => {
            tokio::fs::read_to_string(&local)
                .await
                .map_err(|source| JsonSchemaError::Io {
                    path: local.clone(),
                    source,
                })?
        }
        SchemaLocation::S3 { bucket, key } => {
            info!("Reading schema from bucket '{}' key '{}'", bucket, key);
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(&bucket)
                .build()?;
            let bytes = store
                .get(&ObjectStorePath::from(key.as_str()))
                .await?
                .bytes()
                .await?;
            String::from_utf8(bytes.to_vec())
                .map_err(|e| JsonSchemaError::InvalidJson(format!("{path}: {e}")))?
        }
    };

    serde_json::from_str(&content).map_err(|e| JsonSchemaError::InvalidJson(format!("{path}: {e}")))
}
