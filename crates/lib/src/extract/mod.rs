//! # Extraction
//!
//! The extractor contract shared by every metadata source plugin
//! (`carte-glue`, `carte-json-schema`, `carte-postgres`).

pub mod traits;

pub use traits::{ExtractError, Extractor};
