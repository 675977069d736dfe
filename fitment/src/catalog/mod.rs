//! Product catalog types and catalog file formats
//!
//! A catalog file holds a list of products with their fitment records.
//! Supported formats, chosen by extension:
//! - `.json`: an array of products, or an object with a `products` array
//! - `.yaml` / `.yml`: the same shapes in YAML
//! - `.jsonl`: one product per line
//!
//! A fitment entry may give `years: "2017-2021"` instead of `year`; the range
//! is inclusive and expands to one record per year.

use crate::error::{Error, Result};
use crate::parser::MIN_YEAR;
use crate::scorer::{deserialize_year, CompatibilityRecord, MatchType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Widest `years` range a single fitment entry may expand to
pub const MAX_YEAR_SPAN: i32 = 50;

/// File patterns treated as catalog files
pub const CATALOG_PATTERNS: &[&str] = &["**/*.json", "**/*.jsonl", "**/*.yaml", "**/*.yml"];

/// A product as supplied by the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub vehicle_compatibility: Vec<CompatibilityRecord>,
}

/// Product entry as written in a catalog file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default, alias = "vehicle_compatibility", alias = "compatibility")]
    vehicle_compatibility: Vec<FitmentEntry>,
}

/// Fitment entry as written in a catalog file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitmentEntry {
    #[serde(default, deserialize_with = "deserialize_year")]
    year: Option<String>,
    #[serde(default)]
    years: Option<String>,
    #[serde(default)]
    make: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, alias = "match_type")]
    match_type: Option<MatchType>,
}

/// Parse a catalog file and return its products
pub fn parse_catalog(path: &Path, content: &[u8]) -> Result<Vec<Product>> {
    if crate::is_binary(content) {
        return Err(Error::CatalogFormat(format!(
            "{}: binary content",
            path.display()
        )));
    }

    let text = String::from_utf8_lossy(content);

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let entries = match ext.as_str() {
        "json" => parse_json(&text)?,
        "yaml" | "yml" => parse_yaml(&text)?,
        "jsonl" => parse_jsonl(&text)?,
        _ => {
            return Err(Error::CatalogFormat(format!(
                "{}: unsupported catalog format",
                path.display()
            )))
        }
    };

    build_products(entries).map_err(|e| match e {
        Error::CatalogFormat(msg) => Error::CatalogFormat(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn parse_json(text: &str) -> Result<Vec<ProductEntry>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    entries_from_value(value)
}

fn parse_yaml(text: &str) -> Result<Vec<ProductEntry>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_yaml::from_str(text)?;
    entries_from_value(value)
}

fn parse_jsonl(text: &str) -> Result<Vec<ProductEntry>> {
    let mut entries = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line)
            .map_err(|e| Error::CatalogFormat(format!("line {}: {}", i + 1, e)))?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Accept either a bare list or `{ "products": [...] }`
fn entries_from_value(value: serde_json::Value) -> Result<Vec<ProductEntry>> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(mut obj) => match obj.remove("products") {
            Some(products @ serde_json::Value::Array(_)) => Ok(serde_json::from_value(products)?),
            _ => Err(Error::CatalogFormat(
                "expected a list of products or a `products` list".to_string(),
            )),
        },
        serde_json::Value::Null => Ok(Vec::new()),
        _ => Err(Error::CatalogFormat(
            "expected a list of products or a `products` list".to_string(),
        )),
    }
}

fn build_products(entries: Vec<ProductEntry>) -> Result<Vec<Product>> {
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = entry.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::CatalogFormat(format!(
                "product '{}' has no id",
                entry.name
            )));
        }
        if entry.name.trim().is_empty() {
            return Err(Error::CatalogFormat(format!("product {} has no name", id)));
        }
        if !seen.insert(id.clone()) {
            return Err(Error::CatalogFormat(format!("duplicate product id {}", id)));
        }

        let mut records = Vec::new();
        for fitment in entry.vehicle_compatibility {
            expand_fitment(fitment, &mut records)
                .map_err(|e| Error::CatalogFormat(format!("product {}: {}", id, e)))?;
        }

        products.push(Product {
            id,
            name: entry.name,
            description: entry.description,
            price: entry.price,
            category: entry.category,
            brand: entry.brand,
            vehicle_compatibility: records,
        });
    }

    Ok(products)
}

fn year_range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{4})\s*(?:-\s*(\d{4})\s*)?$").expect("valid regex"))
}

/// Parse `"2017"` or `"2017-2021"` into an inclusive year range
///
/// Ranges starting before [`MIN_YEAR`] or spanning more than
/// [`MAX_YEAR_SPAN`] years are rejected.
pub fn parse_year_range(range: &str) -> Option<(i32, i32)> {
    let caps = year_range_regex().captures(range)?;
    let start: i32 = caps.get(1)?.as_str().parse().ok()?;
    let end: i32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => start,
    };
    if start < MIN_YEAR || end < start || end - start > MAX_YEAR_SPAN {
        return None;
    }
    Some((start, end))
}

fn expand_fitment(fitment: FitmentEntry, out: &mut Vec<CompatibilityRecord>) -> std::result::Result<(), String> {
    let make = non_empty(fitment.make);
    let model = non_empty(fitment.model);

    let years: Vec<Option<String>> = match (fitment.year, fitment.years) {
        (Some(_), Some(_)) => return Err("fitment gives both year and years".to_string()),
        (_, Some(range)) => {
            let (start, end) = parse_year_range(&range).ok_or_else(|| {
                format!(
                    "invalid year range '{}' (must start at {} or later and span at most {} years)",
                    range, MIN_YEAR, MAX_YEAR_SPAN
                )
            })?;
            (start..=end).map(|y| Some(y.to_string())).collect()
        }
        (year, None) => vec![year],
    };

    for year in years {
        let match_type = fitment
            .match_type
            .unwrap_or_else(|| infer_match_type(&year, &make, &model));
        out.push(CompatibilityRecord {
            year,
            make: make.clone(),
            model: model.clone(),
            match_type,
        });
    }

    Ok(())
}

/// Fully qualified entries are `specific`; otherwise the narrowest field wins
fn infer_match_type(year: &Option<String>, make: &Option<String>, model: &Option<String>) -> MatchType {
    match (year, make, model) {
        (Some(_), Some(_), Some(_)) => MatchType::Specific,
        (_, _, Some(_)) => MatchType::Model,
        _ => MatchType::Make,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let content = r#"[
            {
                "id": "bat-1",
                "name": "Corolla Battery",
                "description": "Fits late Corollas",
                "price": 129.99,
                "vehicleCompatibility": [
                    {"year": 2017, "make": "toyota", "model": "corolla", "matchType": "specific"}
                ]
            }
        ]"#;

        let products = parse_catalog(Path::new("batteries.json"), content.as_bytes()).unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "bat-1");
        assert!((products[0].price - 129.99).abs() < f64::EPSILON);
        assert_eq!(
            products[0].vehicle_compatibility,
            vec![CompatibilityRecord::specific("2017", "toyota", "corolla")]
        );
    }

    #[test]
    fn test_parse_json_wrapped() {
        let content = r#"{"products": [{"id": "p1", "name": "Wiper"}]}"#;
        let products = parse_catalog(Path::new("c.json"), content.as_bytes()).unwrap();
        assert_eq!(products.len(), 1);
        assert!(products[0].vehicle_compatibility.is_empty());
    }

    #[test]
    fn test_parse_json_wrong_shape() {
        let content = r#"{"items": []}"#;
        let err = parse_catalog(Path::new("c.json"), content.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::CatalogFormat(_)));
    }

    #[test]
    fn test_parse_yaml_with_year_range() {
        let content = r#"
products:
  - id: pads-1
    name: Ceramic Brake Pads
    price: 45.5
    vehicle_compatibility:
      - years: "2017-2021"
        make: toyota
        model: corolla
"#;

        let products = parse_catalog(Path::new("pads.yaml"), content.as_bytes()).unwrap();
        let records = &products[0].vehicle_compatibility;

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].year.as_deref(), Some("2017"));
        assert_eq!(records[4].year.as_deref(), Some("2021"));
        assert!(records.iter().all(|r| r.match_type == MatchType::Specific));
    }

    #[test]
    fn test_parse_jsonl() {
        let content = "{\"id\": \"a\", \"name\": \"A\"}\n\n{\"id\": \"b\", \"name\": \"B\"}\n";
        let products = parse_catalog(Path::new("c.jsonl"), content.as_bytes()).unwrap();
        assert_eq!(products.len(), 2);
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let content = "{\"id\": \"a\", \"name\": \"A\"}\nnot json\n";
        let err = parse_catalog(Path::new("c.jsonl"), content.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_infer_match_type() {
        let content = r#"[{"id": "f", "name": "Filter", "compatibility": [
            {"make": "honda", "model": "civic"},
            {"make": "ford"},
            {"year": "2019", "make": "ford", "model": "f-150"}
        ]}]"#;

        let products = parse_catalog(Path::new("f.json"), content.as_bytes()).unwrap();
        let types: Vec<MatchType> = products[0]
            .vehicle_compatibility
            .iter()
            .map(|r| r.match_type)
            .collect();
        assert_eq!(types, vec![MatchType::Model, MatchType::Make, MatchType::Specific]);
    }

    #[test]
    fn test_rejects_bad_entries() {
        let cases = [
            r#"[{"name": "No id"}]"#,
            r#"[{"id": "x"}]"#,
            r#"[{"id": "x", "name": "A"}, {"id": "x", "name": "B"}]"#,
            r#"[{"id": "x", "name": "A", "compatibility": [{"years": "2021-2017", "make": "kia"}]}]"#,
            r#"[{"id": "x", "name": "A", "compatibility": [{"year": 2020, "years": "2020-2021"}]}]"#,
            r#"[{"id": "x", "name": "A", "compatibility": [{"years": "1000-9999", "make": "kia"}]}]"#,
        ];

        for case in cases {
            let err = parse_catalog(Path::new("bad.json"), case.as_bytes()).unwrap_err();
            assert!(matches!(err, Error::CatalogFormat(_)), "case: {}", case);
        }
    }

    #[test]
    fn test_rejects_unknown_extension_and_binary() {
        assert!(parse_catalog(Path::new("c.csv"), b"id,name").is_err());
        assert!(parse_catalog(Path::new("c.json"), b"[\x00]").is_err());
    }

    #[test]
    fn test_parse_year_range() {
        assert_eq!(parse_year_range("2017-2021"), Some((2017, 2021)));
        assert_eq!(parse_year_range(" 2019 "), Some((2019, 2019)));
        assert_eq!(parse_year_range("2019 - 2020"), Some((2019, 2020)));
        assert_eq!(parse_year_range("2021-2017"), None);
        assert_eq!(parse_year_range("17-21"), None);
        assert_eq!(parse_year_range("1000-9999"), None);
        assert_eq!(parse_year_range("1985-1992"), None);
        assert_eq!(parse_year_range("1990-2040"), Some((1990, 2040)));
        assert_eq!(parse_year_range("1990-2041"), None);
    }

    #[test]
    fn test_product_roundtrip_shape() {
        let product = Product {
            id: "p".to_string(),
            name: "Part".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("vehicleCompatibility").is_some());
        assert!(json.get("category").is_none());
    }
}
