//! Ranking of catalog products for a search query

use crate::catalog::Product;
use crate::error::Result;
use crate::parser::{parse_search_query, ParsedQuery, QueryParser};
use crate::scorer::score_parsed;
use crate::store::Store;
use serde::Serialize;

/// Relevance every product starts with
pub const BASE_RELEVANCE: f64 = 1.0;
/// Bonus per year/make/model found in the name or description
pub const VEHICLE_TEXT_POINTS: f64 = 2.0;
/// Bonus per product term found in the name
pub const NAME_TERM_POINTS: f64 = 1.5;
/// Bonus per product term found only in the description
pub const DESCRIPTION_TERM_POINTS: f64 = 1.0;

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum combined score
    pub min_score: f64,
    /// Filter by catalog source
    pub source: Option<String>,
    /// Drop products without a compatibility bonus when the query names a vehicle
    pub compatible_only: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            limit: 20,
            min_score: 0.0,
            source: None,
            compatible_only: false,
        }
    }
}

/// A product with its ranking scores
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    /// Text relevance against name and description
    pub relevance_score: f64,
    /// Best fitment record score
    pub compatibility_score: f64,
}

impl ScoredProduct {
    /// Combined score results are ordered by
    pub fn ranking_key(&self) -> f64 {
        self.relevance_score + self.compatibility_score
    }
}

/// Text relevance of a product for a parsed query
pub fn relevance_score(product: &Product, parsed: &ParsedQuery) -> f64 {
    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();
    let mut score = BASE_RELEVANCE;

    for field in parsed.vehicle_info.fields() {
        let field = field.to_lowercase();
        if name.contains(&field) || description.contains(&field) {
            score += VEHICLE_TEXT_POINTS;
        }
    }

    if !parsed.uses_fallback_terms {
        for term in &parsed.product_terms {
            let term = term.to_lowercase();
            if name.contains(&term) {
                score += NAME_TERM_POINTS;
            } else if description.contains(&term) {
                score += DESCRIPTION_TERM_POINTS;
            }
        }
    }

    score
}

/// Score a single product
pub fn score_product(product: Product, parsed: &ParsedQuery) -> ScoredProduct {
    let relevance_score = relevance_score(&product, parsed);
    let compatibility_score = score_parsed(&product.vehicle_compatibility, parsed) as f64;
    ScoredProduct {
        product,
        relevance_score,
        compatibility_score,
    }
}

/// Score and order products for an already parsed query
///
/// Ordering is descending by [`ScoredProduct::ranking_key`]; equal keys keep
/// their input order.
pub fn rank_parsed<I>(products: I, parsed: &ParsedQuery, options: &SearchOptions) -> Vec<ScoredProduct>
where
    I: IntoIterator<Item = Product>,
{
    let mut scored: Vec<ScoredProduct> = products
        .into_iter()
        .map(|product| score_product(product, parsed))
        .collect();

    scored.sort_by(|a, b| b.ranking_key().total_cmp(&a.ranking_key()));

    scored
        .into_iter()
        .filter(|s| s.ranking_key() >= options.min_score)
        .filter(|s| {
            !(options.compatible_only && parsed.has_vehicle_info && s.compatibility_score <= 0.0)
        })
        .take(options.limit)
        .collect()
}

/// Score and order products for a raw query string
pub fn rank_products<I>(products: I, query: &str, options: &SearchOptions) -> Vec<ScoredProduct>
where
    I: IntoIterator<Item = Product>,
{
    rank_parsed(products, &parse_search_query(query), options)
}

/// Searcher over the products of a store
pub struct Searcher<'a> {
    store: &'a Store,
    parser: QueryParser,
}

impl<'a> Searcher<'a> {
    /// Create a new searcher with the built-in reference tables
    pub fn new(store: &'a Store) -> Self {
        Searcher {
            store,
            parser: QueryParser::default(),
        }
    }

    /// Create a searcher with a custom parser
    pub fn with_parser(store: &'a Store, parser: QueryParser) -> Self {
        Searcher { store, parser }
    }

    /// Parse a query with this searcher's parser
    pub fn parse(&self, query: &str) -> ParsedQuery {
        self.parser.parse(query)
    }

    /// Search the store's products
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<ScoredProduct>> {
        let parsed = self.parser.parse(query);
        tracing::debug!(
            "Parsed '{}' as vehicle [{}], terms {:?}",
            query,
            parsed.vehicle_info,
            parsed.product_terms
        );

        let products = self.store.list_products(options.source.as_deref())?;
        let total = products.len();
        let results = rank_parsed(products, &parsed, &options);

        tracing::debug!("Ranked {} products, returning {}", total, results.len());
        Ok(results)
    }
}
