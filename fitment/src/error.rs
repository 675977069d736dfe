//! Error types for Fitment
//!
//! Query parsing and scoring never fail; these errors come from the catalog
//! store, catalog files and reference-table loading.

use thiserror::Error;

/// Fitment error type
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Catalog source not found
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Malformed catalog file
    #[error("Catalog format error: {0}")]
    CatalogFormat(String),

    /// Product id already imported from another catalog file
    #[error("Product {id} is already defined in {owner}")]
    DuplicateProduct { id: String, owner: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for Fitment operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::ConfigError(format!("Invalid glob pattern: {}", err))
    }
}
