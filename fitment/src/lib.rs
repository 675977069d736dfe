//! # Fitment - vehicle-aware parts search
//!
//! Ranks auto-parts catalog products against free-text queries such as
//! `"2017 Toyota Corolla battery"`.
//!
//! Fitment provides:
//! - **Query parsing** into a year/make/model descriptor plus product terms
//! - **Compatibility scoring** against per-product fitment records
//! - **Ranking** that combines text relevance with compatibility
//! - **Catalog store** in SQLite, fed from JSON/YAML/JSONL catalog files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitment::{Importer, SearchOptions, Store};
//!
//! // Open or create a database
//! let store = Store::open("~/.cache/fitment/catalog.sqlite").unwrap();
//!
//! // Register a directory of catalog files
//! store.add_source("oem", "~/catalogs/oem", &["**/*.json"]).unwrap();
//!
//! // Import it
//! let importer = Importer::new(&store);
//! importer.import_source("oem").unwrap();
//!
//! // Search
//! let searcher = fitment::search::Searcher::new(&store);
//! let results = searcher.search("2017 toyota corolla battery", SearchOptions::default()).unwrap();
//! ```
//!
//! The parser and scorer are pure functions and can be used without a store:
//!
//! ```
//! use fitment::parse_search_query;
//!
//! let parsed = parse_search_query("Honda Civic brake pads");
//! assert_eq!(parsed.vehicle_info.make.as_deref(), Some("honda"));
//! assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
//! assert_eq!(parsed.product_terms, vec!["brake", "pads"]);
//! ```

pub mod catalog;
pub mod error;
pub mod importer;
pub mod parser;
pub mod scanner;
pub mod scorer;
pub mod search;
pub mod store;
pub mod vehicle;

// Re-exports for convenience
pub use catalog::Product;
pub use error::{Error, Result};
pub use importer::Importer;
pub use parser::{parse_search_query, ParsedQuery, QueryParser};
pub use scorer::{score_compatibility, CompatibilityRecord, MatchType};
pub use search::{rank_products, ScoredProduct, SearchOptions};
pub use store::Store;
pub use vehicle::{ReferenceTables, VehicleDescriptor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("fitment")
        .join("catalog.sqlite")
}

/// Detect if content is binary using NUL-byte check
pub fn is_binary(content: &[u8]) -> bool {
    // Check first 8KB for NUL bytes
    content.iter().take(8192).any(|&b| b == 0)
}
