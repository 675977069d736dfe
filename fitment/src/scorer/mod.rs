//! Compatibility scoring of products against a parsed vehicle query
//!
//! Every fitment record of a product is scored on its own and the product
//! keeps the best record score. Scores are never summed across records.

use crate::catalog::Product;
use crate::error::{Error, Result};
use crate::parser::{parse_search_query, ParsedQuery};
use crate::vehicle::VehicleDescriptor;
use serde::{Deserialize, Deserializer, Serialize};

/// Points for a matching year, make or model
pub const FIELD_POINTS: u32 = 3;

/// Extra points for a `specific` record matching year, make and model
pub const SPECIFIC_BONUS: u32 = 5;

/// Granularity of a fitment record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// One year, make and model
    #[default]
    Specific,
    /// Every year and model of a make
    Make,
    /// Every year of a named model
    Model,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Specific => "specific",
            MatchType::Make => "make",
            MatchType::Model => "model",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "specific" => Ok(MatchType::Specific),
            "make" => Ok(MatchType::Make),
            "model" => Ok(MatchType::Model),
            _ => Err(Error::CatalogFormat(format!("Unknown match type: {}", s))),
        }
    }
}

/// One structured fitment entry of a product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityRecord {
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "match_type")]
    pub match_type: MatchType,
}

impl CompatibilityRecord {
    pub fn specific(year: &str, make: &str, model: &str) -> Self {
        CompatibilityRecord {
            year: Some(year.to_string()),
            make: Some(make.to_string()),
            model: Some(model.to_string()),
            match_type: MatchType::Specific,
        }
    }

    pub fn make_only(make: &str) -> Self {
        CompatibilityRecord {
            make: Some(make.to_string()),
            match_type: MatchType::Make,
            ..Default::default()
        }
    }

    pub fn model_only(make: &str, model: &str) -> Self {
        CompatibilityRecord {
            make: Some(make.to_string()),
            model: Some(model.to_string()),
            match_type: MatchType::Model,
            ..Default::default()
        }
    }
}

/// Accept a year written as a string or as a number
pub(crate) fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearValue {
        Text(String),
        Number(i64),
    }

    Ok(
        Option::<YearValue>::deserialize(deserializer)?.and_then(|value| match value {
            YearValue::Text(s) if s.trim().is_empty() => None,
            YearValue::Text(s) => Some(s.trim().to_string()),
            YearValue::Number(n) => Some(n.to_string()),
        }),
    )
}

/// Both sides present, non-empty and equal ignoring case
fn field_matches(parsed: Option<&str>, record: Option<&str>) -> bool {
    match (parsed, record) {
        (Some(p), Some(r)) => {
            let p = p.trim();
            let r = r.trim();
            !p.is_empty() && p.to_lowercase() == r.to_lowercase()
        }
        _ => false,
    }
}

/// Score a single fitment record against a vehicle descriptor
pub fn score_record(record: &CompatibilityRecord, vehicle: &VehicleDescriptor) -> u32 {
    let year = field_matches(vehicle.year.as_deref(), record.year.as_deref());
    let make = field_matches(vehicle.make.as_deref(), record.make.as_deref());
    let model = field_matches(vehicle.model.as_deref(), record.model.as_deref());

    let mut score = [year, make, model]
        .iter()
        .filter(|matched| **matched)
        .count() as u32
        * FIELD_POINTS;

    if record.match_type == MatchType::Specific
        && vehicle.is_fully_specified()
        && year
        && make
        && model
    {
        score += SPECIFIC_BONUS;
    }

    score
}

/// Best record score for an already parsed query
///
/// Zero when the query carries no vehicle information or there are no records.
pub fn score_parsed(records: &[CompatibilityRecord], parsed: &ParsedQuery) -> u32 {
    if !parsed.has_vehicle_info {
        return 0;
    }

    records
        .iter()
        .map(|record| score_record(record, &parsed.vehicle_info))
        .max()
        .unwrap_or(0)
}

/// Compatibility bonus of a product for a raw query string
pub fn score_compatibility(product: &Product, query: &str) -> f64 {
    let parsed = parse_search_query(query);
    score_parsed(&product.vehicle_compatibility, &parsed) as f64
}
