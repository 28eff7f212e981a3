//! Error types for Kardex.
//!
//! Configuration problems (taxonomy, config file) are fatal and surface at
//! construction time. Classification, aggregation and intent resolution never
//! fail; they degrade to valid empty or "Uncategorized" results instead.

use std::path::PathBuf;
use thiserror::Error;

/// Taxonomy loading and validation failures.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Taxonomy file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read taxonomy {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Taxonomy is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Malformed taxonomy: {0}")]
    Schema(String),

    #[error("Taxonomy defines no categories")]
    Empty,

    #[error("Category '{category}' has a blank keyword")]
    BlankKeyword { category: String },

    #[error("Sub-category '{category} / {subcategory}' has an empty keyword list")]
    EmptySubcategory {
        category: String,
        subcategory: String,
    },

    #[error("Category '{0}' has no keywords at any level and can never be matched")]
    Unreachable(String),

    #[error("Duplicate category name '{0}'")]
    DuplicateCategory(String),
}

#[derive(Error, Debug)]
pub enum KardexError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] TaxonomyError),

    #[error("Config file error: {0}")]
    Config(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Unsupported record file '{}': expected .csv or .json", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl KardexError {
    /// True for errors that come from static configuration rather than input data
    pub fn is_configuration(&self) -> bool {
        matches!(self, KardexError::Configuration(_) | KardexError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, KardexError>;
