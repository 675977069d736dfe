//! Free-text search query parser
//!
//! Splits a query such as `"2017 Toyota Corolla brake pads"` into a vehicle
//! descriptor (year, make, model) and the remaining product terms.
//!
//! Stages run in a fixed order (year, make, model) and each one consumes the
//! token it claims, so no token is used twice. The heuristic is greedy: the
//! make stage accepts substring matches in either direction, and the model
//! stage treats any unrecognised word longer than two characters as a model.

use crate::vehicle::{ReferenceTables, VehicleDescriptor};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Oldest model year recognised in free text
pub const MIN_YEAR: i32 = 1990;

/// Product terms used when a query names a vehicle and nothing else
pub const FALLBACK_TERMS: [&str; 2] = ["parts", "accessories"];

/// Structured form of a search query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// Year, make and model found in the query
    pub vehicle_info: VehicleDescriptor,
    /// Unclaimed tokens, in query order
    pub product_terms: Vec<String>,
    /// The query exactly as given
    pub original_query: String,
    /// Whether any of year, make or model was found
    pub has_vehicle_info: bool,
    /// Whether `product_terms` holds [`FALLBACK_TERMS`]
    pub uses_fallback_terms: bool,
}

/// Query parser bound to a set of reference tables and a year window
#[derive(Debug, Clone)]
pub struct QueryParser {
    tables: ReferenceTables,
    max_year: i32,
}

impl Default for QueryParser {
    fn default() -> Self {
        QueryParser::new(ReferenceTables::default())
    }
}

impl QueryParser {
    /// Create a parser whose year window ends two years after the current one
    pub fn new(tables: ReferenceTables) -> Self {
        QueryParser::with_current_year(tables, chrono::Local::now().year())
    }

    /// Create a parser for a fixed current year
    pub fn with_current_year(tables: ReferenceTables, current_year: i32) -> Self {
        QueryParser {
            tables,
            max_year: current_year + 2,
        }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    /// Years accepted as a model year
    pub fn year_range(&self) -> RangeInclusive<i32> {
        MIN_YEAR..=self.max_year
    }

    /// Parse a query. Never fails; empty input yields an empty result.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let normalized = query.trim().to_lowercase();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mut remaining = words.clone();
        let mut vehicle = VehicleDescriptor::default();

        // Only the first occurrence is consumed
        if let Some(year) = words.iter().copied().find(|w| self.is_year(w)) {
            if let Some(pos) = remaining.iter().position(|w| *w == year) {
                remaining.remove(pos);
            }
            vehicle.year = Some(year.to_string());
        }

        let make = remaining
            .iter()
            .enumerate()
            .find_map(|(i, w)| self.tables.match_make(w).map(|m| (i, m)));
        if let Some((pos, make)) = make {
            vehicle.make = Some(self.tables.canonical_make(make));
            remaining.remove(pos);
        }

        if let Some(pos) = remaining.iter().position(|w| self.is_model(w)) {
            vehicle.model = Some(remaining.remove(pos).to_string());
        }

        let mut product_terms: Vec<String> = remaining
            .into_iter()
            .filter(|w| w.chars().count() > 1)
            .map(String::from)
            .collect();

        let has_vehicle_info = vehicle.has_vehicle_info();
        let uses_fallback_terms = has_vehicle_info && product_terms.is_empty();
        if uses_fallback_terms {
            product_terms = FALLBACK_TERMS.iter().map(|t| t.to_string()).collect();
        }

        ParsedQuery {
            vehicle_info: vehicle,
            product_terms,
            original_query: query.to_string(),
            has_vehicle_info,
            uses_fallback_terms,
        }
    }

    fn is_year(&self, word: &str) -> bool {
        if word.len() != 4 || !word.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        word.parse::<i32>()
            .map(|year| self.year_range().contains(&year))
            .unwrap_or(false)
    }

    fn is_model(&self, word: &str) -> bool {
        self.tables.is_known_model(word)
            || (word.chars().count() > 2 && !self.tables.is_part_term(word))
    }
}

fn default_parser() -> &'static QueryParser {
    static PARSER: OnceLock<QueryParser> = OnceLock::new();
    PARSER.get_or_init(QueryParser::default)
}

/// Parse a query with the built-in reference tables
pub fn parse_search_query(query: &str) -> ParsedQuery {
    default_parser().parse(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::with_current_year(ReferenceTables::default(), 2025)
    }

    #[test]
    fn test_parse_full_vehicle() {
        let parsed = parser().parse("2017 Toyota Corolla");

        assert_eq!(parsed.vehicle_info.year.as_deref(), Some("2017"));
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("toyota"));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("corolla"));
        assert!(parsed.has_vehicle_info);
        assert!(parsed.uses_fallback_terms);
        assert_eq!(parsed.product_terms, vec!["parts", "accessories"]);
        assert_eq!(parsed.original_query, "2017 Toyota Corolla");
    }

    #[test]
    fn test_parse_vehicle_with_part_terms() {
        let parsed = parser().parse("Honda Civic brake pads");

        assert_eq!(parsed.vehicle_info.year, None);
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("honda"));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
        assert_eq!(parsed.product_terms, vec!["brake", "pads"]);
        assert!(!parsed.uses_fallback_terms);
    }

    #[test]
    fn test_parse_empty() {
        for query in ["", "   ", "\t\n"] {
            let parsed = parser().parse(query);
            assert!(!parsed.has_vehicle_info);
            assert!(parsed.product_terms.is_empty());
            assert_eq!(parsed.vehicle_info, VehicleDescriptor::default());
        }
    }

    #[test]
    fn test_parse_part_terms_only() {
        let parsed = parser().parse("brake pads");
        assert!(!parsed.has_vehicle_info);
        assert_eq!(parsed.product_terms, vec!["brake", "pads"]);

        let parsed = parser().parse("oil filter battery");
        assert!(!parsed.has_vehicle_info);
        assert_eq!(parsed.product_terms, vec!["oil", "filter", "battery"]);
    }

    #[test]
    fn test_aliases_canonicalize() {
        let p = parser();
        assert_eq!(p.parse("chevy silverado").vehicle_info.make.as_deref(), Some("chevrolet"));
        assert_eq!(p.parse("vw golf").vehicle_info.make.as_deref(), Some("volkswagen"));
        assert_eq!(
            p.parse("mercedes c300").vehicle_info.make.as_deref(),
            Some("mercedes-benz")
        );
        assert_eq!(p.parse("mercedes c300").vehicle_info.model.as_deref(), Some("c300"));
    }

    #[test]
    fn test_partial_make() {
        let parsed = parser().parse("toyo battery");
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("toyota"));
        assert_eq!(parsed.product_terms, vec!["battery"]);
    }

    #[test]
    fn test_year_range() {
        let p = parser();
        assert_eq!(p.parse("1990 ford").vehicle_info.year.as_deref(), Some("1990"));
        assert_eq!(p.parse("2027 ford").vehicle_info.year.as_deref(), Some("2027"));
        assert_eq!(p.parse("1989 ford").vehicle_info.year, None);
        assert_eq!(p.parse("2028 ford").vehicle_info.year, None);
    }

    #[test]
    fn test_non_year_numbers() {
        let parsed = parser().parse("4x4 battery");
        assert_eq!(parsed.vehicle_info.year, None);
        // "4x4" is unrecognised and long enough to be taken as a model
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("4x4"));

        let parsed = parser().parse("20170 brake");
        assert_eq!(parsed.vehicle_info.year, None);
    }

    #[test]
    fn test_year_consumed_once() {
        let parsed = parser().parse("2018 2018 brake");
        assert_eq!(parsed.vehicle_info.year.as_deref(), Some("2018"));
        // The second "2018" is not a part term, so the model stage claims it
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("2018"));
        assert_eq!(parsed.product_terms, vec!["brake"]);
    }

    #[test]
    fn test_first_year_wins() {
        let parsed = parser().parse("2015 2019 honda");
        assert_eq!(parsed.vehicle_info.year.as_deref(), Some("2015"));
    }

    #[test]
    fn test_unknown_word_becomes_model() {
        let parsed = parser().parse("ford ranger battery");
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("ford"));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("ranger"));
        assert_eq!(parsed.product_terms, vec!["battery"]);
    }

    #[test]
    fn test_model_order_is_first_eligible_token() {
        // Both tokens qualify; the earlier one is taken
        let parsed = parser().parse("synthetic civic");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("synthetic"));
        assert_eq!(parsed.product_terms, vec!["civic"]);
    }

    #[test]
    fn test_short_terms_dropped() {
        let parsed = parser().parse("oil 5 filter");
        assert_eq!(parsed.product_terms, vec!["oil", "filter"]);
    }

    #[test]
    fn test_make_substring_false_positive_preserved() {
        // "ceramic" contains "ram"
        let parsed = parser().parse("ceramic brake pads");
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("ram"));
        assert_eq!(parsed.product_terms, vec!["brake", "pads"]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let p = parser();
        let q = "2019 Ford F-150 spark plugs";
        assert_eq!(p.parse(q), p.parse(q));

        let parsed = p.parse(q);
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("f-150"));
        assert_eq!(parsed.product_terms, vec!["spark", "plugs"]);
    }

    #[test]
    fn test_free_function_uses_builtin_tables() {
        let parsed = parse_search_query("vw golf");
        assert_eq!(parsed.vehicle_info.make.as_deref(), Some("volkswagen"));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("golf"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(parser().parse("honda civic")).unwrap();
        assert!(json.get("vehicleInfo").is_some());
        assert!(json.get("productTerms").is_some());
        assert_eq!(json["hasVehicleInfo"], true);
    }

    #[test]
    fn test_extended_tables() {
        let tables = ReferenceTables::from_yaml_str("part_terms: [synthetic]").unwrap();
        let p = QueryParser::with_current_year(tables, 2025);
        let parsed = p.parse("synthetic civic");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
        assert_eq!(parsed.product_terms, vec!["synthetic"]);
    }
}
