//! Fitment CLI - vehicle-aware parts search from the command line

use anyhow::Result;
use clap::{Parser, Subcommand};
use fitment::catalog::CATALOG_PATTERNS;
use fitment::importer::{FileStatus, ImportProgress, ImportStats};
use fitment::search::Searcher;
use fitment::{CompatibilityRecord, Importer, QueryParser, ReferenceTables, SearchOptions, Store};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fitment")]
#[command(
    author,
    version,
    about = "Fitment - vehicle-aware auto-parts catalog search"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path (default: ~/.cache/fitment/catalog.sqlite)
    #[arg(long, short = 'd', env = "FITMENT_DB_PATH")]
    database: Option<PathBuf>,

    /// YAML file extending the built-in makes, models and part terms
    #[arg(long, short = 'r', env = "FITMENT_REFERENCE", global = true)]
    reference: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new database
    Init,

    /// Register a directory of catalog files
    Add {
        /// Source name
        name: String,

        /// Path to the directory
        path: PathBuf,

        /// Glob patterns to include (default: JSON, JSONL and YAML files)
        #[arg(long, short = 'p')]
        patterns: Vec<String>,

        /// Glob patterns to exclude
        #[arg(long, short = 'e')]
        exclude: Vec<String>,
    },

    /// Remove a source and its products
    Remove {
        /// Source name
        name: String,
    },

    /// List all sources
    List,

    /// Import catalog files of a source or all sources
    Import {
        /// Source name (import all if not specified)
        name: Option<String>,
    },

    /// Search products
    Search {
        /// Search query, e.g. "2017 toyota corolla battery"
        query: String,

        /// Maximum number of results
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,

        /// Minimum combined score
        #[arg(long, default_value = "0.0")]
        min_score: f64,

        /// Filter by source
        #[arg(long, short = 's')]
        source: Option<String>,

        /// Only show products that fit the vehicle in the query
        #[arg(long)]
        compatible_only: bool,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Show how a query is parsed
    Parse {
        /// Search query
        query: String,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Show a product by id
    Show {
        /// Product id
        id: String,

        /// Output format (text, json)
        #[arg(long, short = 'o', default_value = "text")]
        format: String,
    },

    /// Show database status and statistics
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let db_path = cli.database.unwrap_or_else(fitment::default_db_path);
    let reference = cli.reference.as_deref();

    match cli.command {
        Commands::Init => cmd_init(&db_path),
        Commands::Add {
            name,
            path,
            patterns,
            exclude,
        } => cmd_add(&db_path, &name, &path, &patterns, &exclude),
        Commands::Remove { name } => cmd_remove(&db_path, &name),
        Commands::List => cmd_list(&db_path),
        Commands::Import { name } => cmd_import(&db_path, name.as_deref()),
        Commands::Search {
            query,
            limit,
            min_score,
            source,
            compatible_only,
            format,
        } => {
            let options = SearchOptions {
                limit,
                min_score,
                source,
                compatible_only,
            };
            cmd_search(&db_path, reference, &query, options, &format)
        }
        Commands::Parse { query, format } => cmd_parse(reference, &query, &format),
        Commands::Show { id, format } => cmd_show(&db_path, &id, &format),
        Commands::Status => cmd_status(&db_path),
    }
}

fn load_parser(reference: Option<&Path>) -> Result<QueryParser> {
    let tables = match reference {
        Some(path) => {
            tracing::debug!("Using reference tables from {}", path.display());
            ReferenceTables::load(path)?
        }
        None => ReferenceTables::default(),
    };
    Ok(QueryParser::new(tables))
}

fn cmd_init(db_path: &Path) -> Result<()> {
    println!("Initializing Fitment database at: {}", db_path.display());
    let _store = Store::open(db_path)?;
    println!("Database initialized successfully.");
    Ok(())
}

fn cmd_add(
    db_path: &Path,
    name: &str,
    path: &Path,
    patterns: &[String],
    exclude: &[String],
) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }

    let store = Store::open(db_path)?;

    let pattern_refs: Vec<&str> = if patterns.is_empty() {
        CATALOG_PATTERNS.to_vec()
    } else {
        patterns.iter().map(|s| s.as_str()).collect()
    };
    let exclude_refs: Vec<&str> = exclude.iter().map(|s| s.as_str()).collect();

    let abs_path = path.canonicalize()?;
    store.add_source_full(name, &abs_path.to_string_lossy(), &pattern_refs, &exclude_refs)?;

    println!("Added source '{}' at {}", name, abs_path.display());
    println!("Run 'fitment import {}' to import its catalog files.", name);
    Ok(())
}

fn cmd_remove(db_path: &Path, name: &str) -> Result<()> {
    let store = Store::open(db_path)?;
    store.remove_source(name)?;
    println!("Removed source '{}'", name);
    Ok(())
}

fn cmd_list(db_path: &Path) -> Result<()> {
    let store = Store::open(db_path)?;
    let sources = store.list_sources()?;

    if sources.is_empty() {
        println!("No sources. Use 'fitment add <name> <path>' to add one.");
        return Ok(());
    }

    println!("Sources:\n");
    for source in sources {
        let count = store.count_products(Some(&source.name)).unwrap_or(0);
        println!("  {} ({} products)", source.name, count);
        println!("    Path: {}", source.path);
        println!("    Patterns: {}", source.patterns.join(", "));
        if !source.exclude.is_empty() {
            println!("    Exclude: {}", source.exclude.join(", "));
        }
    }

    Ok(())
}

/// Prints one line per file that changed
struct ConsoleProgress;

impl ImportProgress for ConsoleProgress {
    fn on_file(&mut self, path: &Path, status: FileStatus) {
        match status {
            FileStatus::Imported(count) => {
                println!("  imported {} ({} products)", path.display(), count)
            }
            FileStatus::Removed => println!("  removed  {}", path.display()),
            FileStatus::Error(e) => println!("  error    {}: {}", path.display(), e),
            FileStatus::Skipped => {}
        }
    }

    fn on_complete(&mut self, _stats: &ImportStats) {}
}

fn print_import_stats(stats: &ImportStats) {
    println!(
        "  {} scanned, {} imported, {} unchanged, {} removed, {} errors ({} products) in {:.2?}",
        stats.files_scanned,
        stats.files_imported,
        stats.files_skipped,
        stats.files_removed,
        stats.errors,
        stats.products_imported,
        stats.duration
    );
}

fn cmd_import(db_path: &Path, name: Option<&str>) -> Result<()> {
    let store = Store::open(db_path)?;
    let importer = Importer::new(&store);

    let names: Vec<String> = match name {
        Some(n) => vec![n.to_string()],
        None => store.list_sources()?.into_iter().map(|s| s.name).collect(),
    };

    if names.is_empty() {
        println!("No sources to import. Use 'fitment add <name> <path>' first.");
        return Ok(());
    }

    for source in names {
        println!("Importing '{}'...", source);
        let stats = importer.import_source_with_progress(&source, &mut ConsoleProgress)?;
        print_import_stats(&stats);
    }

    Ok(())
}

fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

fn describe_record(record: &CompatibilityRecord) -> String {
    let fields: Vec<&str> = [&record.year, &record.make, &record.model]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .collect();

    let vehicle = if fields.is_empty() {
        "(any)".to_string()
    } else {
        fields.join(" ")
    };

    format!("{} [{}]", vehicle, record.match_type.as_str())
}

fn cmd_search(
    db_path: &Path,
    reference: Option<&Path>,
    query: &str,
    options: SearchOptions,
    format: &str,
) -> Result<()> {
    let store = Store::open(db_path)?;
    let searcher = Searcher::with_parser(&store, load_parser(reference)?);

    let parsed = searcher.parse(query);
    let results = searcher.search(query, options)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for '{}'", query);
        return Ok(());
    }

    println!(
        "Found {} results for '{}' (vehicle: {}):\n",
        results.len(),
        query,
        parsed.vehicle_info
    );
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {} [{}] {}",
            i + 1,
            result.product.name,
            result.product.id,
            format_price(result.product.price)
        );
        println!(
            "   score {:.1} (relevance {:.1} + compatibility {:.1})",
            result.ranking_key(),
            result.relevance_score,
            result.compatibility_score
        );
        println!();
    }

    Ok(())
}

fn cmd_parse(reference: Option<&Path>, query: &str, format: &str) -> Result<()> {
    let parser = load_parser(reference)?;
    let parsed = parser.parse(query);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    let show = |field: &Option<String>| field.clone().unwrap_or_else(|| "-".to_string());
    println!("Query:    {}", parsed.original_query);
    println!("Year:     {}", show(&parsed.vehicle_info.year));
    println!("Make:     {}", show(&parsed.vehicle_info.make));
    println!("Model:    {}", show(&parsed.vehicle_info.model));
    println!(
        "Terms:    {}{}",
        parsed.product_terms.join(", "),
        if parsed.uses_fallback_terms {
            " (fallback)"
        } else {
            ""
        }
    );
    println!("Vehicle:  {}", if parsed.has_vehicle_info { "yes" } else { "no" });

    Ok(())
}

fn cmd_show(db_path: &Path, id: &str, format: &str) -> Result<()> {
    let store = Store::open(db_path)?;
    let product = store.get_product(id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&product)?);
        return Ok(());
    }

    println!("{} [{}]", product.name, product.id);
    println!("Price: {}", format_price(product.price));
    if let Some(ref brand) = product.brand {
        println!("Brand: {}", brand);
    }
    if let Some(ref category) = product.category {
        println!("Category: {}", category);
    }
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }

    if product.vehicle_compatibility.is_empty() {
        println!("\nNo fitment records.");
    } else {
        println!("\nFits:");
        for record in &product.vehicle_compatibility {
            println!("  {}", describe_record(record));
        }
    }

    Ok(())
}

fn cmd_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("Database not initialized. Run 'fitment init' first.");
        return Ok(());
    }

    let store = Store::open(db_path)?;
    let sources = store.list_sources()?;
    let total = store.count_products(None)?;

    println!("Fitment Status");
    println!("==============");
    println!("Database: {}", db_path.display());
    println!("Size: {} bytes", store.database_size()?);
    println!("Sources: {}", sources.len());
    println!("Total products: {}", total);

    if !sources.is_empty() {
        println!("\nPer-source stats:");
        for source in &sources {
            let count = store.count_products(Some(&source.name)).unwrap_or(0);
            let files = store.list_files(&source.name).map(|f| f.len()).unwrap_or(0);
            println!("  {}: {} products from {} files", source.name, count, files);
        }
    }

    Ok(())
}
