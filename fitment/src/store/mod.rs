//! Catalog store
//!
//! The store manages the SQLite database containing:
//! - Sources (directories of catalog files)
//! - Catalog files (content hashes of imported files)
//! - Products (with their fitment records)

mod schema;

use crate::catalog::Product;
use crate::error::{Error, Result};
use crate::scorer::CompatibilityRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

pub use schema::SCHEMA_VERSION;

/// Source configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub name: String,
    pub path: String,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Imported catalog file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CatalogFile {
    pub source: String,
    pub path: String,
    pub hash: String,
    pub product_count: i64,
    pub imported_at: String,
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, brand, compatibility";

/// The main database store
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut store = Store { conn, path };
        store.ensure_schema()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Store {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        schema::ensure_schema(&self.conn)
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // -------------------------------------------------------------------------
    // Source operations
    // -------------------------------------------------------------------------

    /// Add a new source
    pub fn add_source(&self, name: &str, path: &str, patterns: &[&str]) -> Result<()> {
        self.add_source_full(name, path, patterns, &[])
    }

    /// Add a source with exclude patterns
    pub fn add_source_full(
        &self,
        name: &str,
        path: &str,
        patterns: &[&str],
        exclude: &[&str],
    ) -> Result<()> {
        if name.trim().is_empty() || name.contains('/') {
            return Err(Error::ConfigError(format!("Invalid source name: '{}'", name)));
        }

        let now = Utc::now().to_rfc3339();
        let patterns_json = serde_json::to_string(&patterns)?;
        let exclude_json = serde_json::to_string(&exclude)?;

        self.conn.execute(
            "INSERT INTO sources (name, path, patterns, exclude, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(name) DO UPDATE SET
               path = excluded.path,
               patterns = excluded.patterns,
               exclude = excluded.exclude,
               updated_at = excluded.updated_at",
            params![name, path, patterns_json, exclude_json, now],
        )?;

        Ok(())
    }

    /// Get a source by name
    pub fn get_source(&self, name: &str) -> Result<Source> {
        let mut stmt = self.conn.prepare(
            "SELECT name, path, patterns, exclude, created_at, updated_at
             FROM sources WHERE name = ?1",
        )?;

        let source = stmt.query_row([name], source_from_row).optional()?;
        source.ok_or_else(|| Error::SourceNotFound(name.to_string()))
    }

    /// List all sources
    pub fn list_sources(&self) -> Result<Vec<Source>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, path, patterns, exclude, created_at, updated_at
             FROM sources ORDER BY name",
        )?;

        let sources = stmt
            .query_map([], source_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    /// Remove a source with its files and products
    pub fn remove_source(&self, name: &str) -> Result<()> {
        // Fail loudly for unknown names
        self.get_source(name)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM products WHERE source = ?1", [name])?;
        tx.execute("DELETE FROM catalog_files WHERE source = ?1", [name])?;
        tx.execute("DELETE FROM sources WHERE name = ?1", [name])?;
        tx.commit()?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Catalog file operations
    // -------------------------------------------------------------------------

    /// Hash of an imported file, if it has been imported
    pub fn file_hash(&self, source: &str, path: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT hash FROM catalog_files WHERE source = ?1 AND path = ?2",
                [source, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// List imported files of a source
    pub fn list_files(&self, source: &str) -> Result<Vec<CatalogFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT source, path, hash, product_count, imported_at
             FROM catalog_files WHERE source = ?1 ORDER BY path",
        )?;

        let files = stmt
            .query_map([source], |row| {
                Ok(CatalogFile {
                    source: row.get(0)?,
                    path: row.get(1)?,
                    hash: row.get(2)?,
                    product_count: row.get(3)?,
                    imported_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Replace the products of one catalog file
    ///
    /// Fails with [`Error::DuplicateProduct`] if an id is already owned by
    /// another file; nothing is written in that case.
    pub fn replace_file_products(
        &self,
        source: &str,
        path: &str,
        hash: &str,
        products: &[Product],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM products WHERE source = ?1 AND file = ?2",
            [source, path],
        )?;

        {
            let mut owner = tx.prepare(
                "SELECT source, file FROM products
                 WHERE id = ?1 AND NOT (source = ?2 AND file = ?3)",
            )?;
            for product in products {
                let existing: Option<(String, String)> = owner
                    .query_row(params![product.id, source, path], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .optional()?;
                if let Some((owner_source, owner_file)) = existing {
                    return Err(Error::DuplicateProduct {
                        id: product.id.clone(),
                        owner: format!("{}/{}", owner_source, owner_file),
                    });
                }
            }

            let mut insert = tx.prepare(
                "INSERT INTO products
                 (id, source, file, position, name, description, price, category, brand, compatibility, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for (position, product) in products.iter().enumerate() {
                let compatibility = serde_json::to_string(&product.vehicle_compatibility)?;
                insert.execute(params![
                    product.id,
                    source,
                    path,
                    position as i64,
                    product.name,
                    product.description,
                    product.price,
                    product.category,
                    product.brand,
                    compatibility,
                    now,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO catalog_files (source, path, hash, product_count, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(source, path) DO UPDATE SET
               hash = excluded.hash,
               product_count = excluded.product_count,
               imported_at = excluded.imported_at",
            params![source, path, hash, products.len() as i64, now],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Forget an imported file and its products
    pub fn remove_file(&self, source: &str, path: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM products WHERE source = ?1 AND file = ?2",
            [source, path],
        )?;
        tx.execute(
            "DELETE FROM catalog_files WHERE source = ?1 AND path = ?2",
            [source, path],
        )?;
        tx.commit()?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Product operations
    // -------------------------------------------------------------------------

    /// Get a product by id
    pub fn get_product(&self, id: &str) -> Result<Product> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], product_from_row)
            .optional()?
            .ok_or_else(|| Error::ProductNotFound(id.to_string()))?;

        decode_product(row)
    }

    /// List products in catalog order, optionally for one source
    pub fn list_products(&self, source: Option<&str>) -> Result<Vec<Product>> {
        let rows = if let Some(src) = source {
            let sql = format!(
                "SELECT {} FROM products WHERE source = ?1 ORDER BY source, file, position",
                PRODUCT_COLUMNS
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt
                .query_map([src], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        } else {
            let sql = format!(
                "SELECT {} FROM products ORDER BY source, file, position",
                PRODUCT_COLUMNS
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(decode_product).collect()
    }

    /// Count products, optionally for one source
    pub fn count_products(&self, source: Option<&str>) -> Result<i64> {
        let count: i64 = if let Some(src) = source {
            self.conn.query_row(
                "SELECT COUNT(*) FROM products WHERE source = ?1",
                [src],
                |row| row.get(0),
            )?
        } else {
            self.conn
                .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?
        };
        Ok(count)
    }

    /// Get database file size in bytes
    pub fn database_size(&self) -> Result<u64> {
        if self.path.to_str() == Some(":memory:") {
            return Ok(0);
        }
        let metadata = std::fs::metadata(&self.path)?;
        Ok(metadata.len())
    }
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    let patterns_json: String = row.get(2)?;
    let exclude_json: Option<String> = row.get(3)?;

    Ok(Source {
        name: row.get(0)?,
        path: row.get(1)?,
        patterns: serde_json::from_str(&patterns_json).unwrap_or_default(),
        exclude: exclude_json
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Product columns with the compatibility JSON still encoded
fn product_from_row(row: &Row<'_>) -> rusqlite::Result<(Product, String)> {
    let product = Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category: row.get(4)?,
        brand: row.get(5)?,
        vehicle_compatibility: Vec::new(),
    };
    Ok((product, row.get(6)?))
}

fn decode_product((mut product, compatibility): (Product, String)) -> Result<Product> {
    let records: Vec<CompatibilityRecord> = serde_json::from_str(&compatibility)?;
    product.vehicle_compatibility = records;
    Ok(product)
}
