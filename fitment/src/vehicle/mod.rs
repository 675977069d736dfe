//! Vehicle descriptors and the reference tables used to recognise them
//!
//! The tables are plain data: a make list (aliases included), alias rules,
//! a common-model list and the auto-part vocabulary. They are built once and
//! shared by reference; extending them never changes how matching works.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Built-in manufacturer names. Order matters: the first make that matches a
/// token by substring is the one recorded.
const MAKES: &[&str] = &[
    "toyota",
    "honda",
    "ford",
    "chevrolet",
    "chevy",
    "nissan",
    "bmw",
    "mercedes-benz",
    "mercedes",
    "audi",
    "volkswagen",
    "vw",
    "hyundai",
    "kia",
    "mazda",
    "subaru",
    "lexus",
    "acura",
    "infiniti",
    "jeep",
    "dodge",
    "ram",
    "gmc",
    "buick",
    "cadillac",
    "lincoln",
    "chrysler",
    "tesla",
    "volvo",
    "mitsubishi",
    "porsche",
    "jaguar",
];

const ALIASES: &[(&str, &str)] = &[
    ("chevy", "chevrolet"),
    ("vw", "volkswagen"),
    ("mercedes", "mercedes-benz"),
];

const COMMON_MODELS: &[&str] = &[
    "camry",
    "corolla",
    "rav4",
    "tacoma",
    "tundra",
    "highlander",
    "accord",
    "civic",
    "cr-v",
    "pilot",
    "f-150",
    "f150",
    "mustang",
    "explorer",
    "escape",
    "silverado",
    "malibu",
    "equinox",
    "altima",
    "sentra",
    "rogue",
    "jetta",
    "golf",
    "wrangler",
    "outback",
    "forester",
    "elantra",
    "sonata",
];

const PART_TERMS: &[&str] = &[
    "battery",
    "brake",
    "brakes",
    "pad",
    "pads",
    "rotor",
    "rotors",
    "filter",
    "filters",
    "oil",
    "engine",
    "transmission",
    "alternator",
    "starter",
    "radiator",
    "coolant",
    "spark",
    "plug",
    "plugs",
    "belt",
    "hose",
    "pump",
    "sensor",
    "light",
    "headlight",
    "air",
    "cabin",
    "wiper",
    "wipers",
    "bulb",
    "bulbs",
    "tire",
    "tires",
    "parts",
    "accessories",
];

/// Year, make and model of a vehicle.
///
/// Produced by the query parser from free text; all fields are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl VehicleDescriptor {
    /// True when any of year, make or model is present
    pub fn has_vehicle_info(&self) -> bool {
        self.year.is_some() || self.make.is_some() || self.model.is_some()
    }

    /// True when year, make and model are all present
    pub fn is_fully_specified(&self) -> bool {
        self.year.is_some() && self.make.is_some() && self.model.is_some()
    }

    /// Present fields in year, make, model order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [&self.year, &self.make, &self.model]
            .into_iter()
            .filter_map(|f| f.as_deref())
    }
}

impl fmt::Display for VehicleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.fields().collect();
        if parts.is_empty() {
            write!(f, "(no vehicle)")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

/// Additional reference entries, typically loaded from YAML
///
/// ```yaml
/// makes: [genesis, polestar]
/// models: [gv70]
/// part_terms: [gasket]
/// aliases:
///   benz: mercedes-benz
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceExtensions {
    pub makes: Vec<String>,
    pub models: Vec<String>,
    pub part_terms: Vec<String>,
    pub aliases: HashMap<String, String>,
}

/// Immutable lookup tables for query parsing
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    makes: Vec<String>,
    aliases: HashMap<String, String>,
    models: Vec<String>,
    part_terms: Vec<String>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        ReferenceTables {
            makes: MAKES.iter().map(|s| s.to_string()).collect(),
            aliases: ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            models: COMMON_MODELS.iter().map(|s| s.to_string()).collect(),
            part_terms: PART_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReferenceTables {
    /// Built-in tables merged with the given extensions
    pub fn with_extensions(extensions: ReferenceExtensions) -> Self {
        let mut tables = ReferenceTables::default();

        for make in extensions.makes {
            push_unique(&mut tables.makes, &make);
        }
        for model in extensions.models {
            push_unique(&mut tables.models, &model);
        }
        for term in extensions.part_terms {
            push_unique(&mut tables.part_terms, &term);
        }
        for (alias, canonical) in extensions.aliases {
            let alias = normalize_entry(&alias);
            let canonical = normalize_entry(&canonical);
            if alias.is_empty() || canonical.is_empty() {
                continue;
            }
            push_unique(&mut tables.makes, &canonical);
            tables.aliases.insert(alias, canonical);
        }

        tables
    }

    /// Parse extensions from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(ReferenceTables::default());
        }
        let extensions: ReferenceExtensions = serde_yaml::from_str(yaml)?;
        Ok(Self::with_extensions(extensions))
    }

    /// Load extensions from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "Cannot read reference tables {}: {}",
                path.display(),
                e
            ))
        })?;
        let tables = Self::from_yaml_str(&text)?;
        tracing::debug!(
            "Loaded reference tables from {} ({} makes, {} models, {} part terms)",
            path.display(),
            tables.makes.len(),
            tables.models.len(),
            tables.part_terms.len()
        );
        Ok(tables)
    }

    pub fn makes(&self) -> &[String] {
        &self.makes
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn part_terms(&self) -> &[String] {
        &self.part_terms
    }

    /// Resolve a token to a make name, if it matches one.
    ///
    /// Exact matches win; otherwise the first make that contains the token, or
    /// that the token contains, is taken. Alias rules are checked last. The
    /// returned name is not yet canonical.
    pub fn match_make(&self, word: &str) -> Option<&str> {
        if word.is_empty() {
            return None;
        }

        if let Some(make) = self.makes.iter().find(|m| m.as_str() == word) {
            return Some(make);
        }

        if let Some(make) = self
            .makes
            .iter()
            .find(|m| m.contains(word) || word.contains(m.as_str()))
        {
            return Some(make);
        }

        self.aliases.get_key_value(word).map(|(k, _)| k.as_str())
    }

    /// Map an alias to its canonical make; other names pass through
    pub fn canonical_make(&self, make: &str) -> String {
        self.aliases
            .get(make)
            .cloned()
            .unwrap_or_else(|| make.to_string())
    }

    pub fn is_known_model(&self, word: &str) -> bool {
        self.models.iter().any(|m| m == word)
    }

    pub fn is_part_term(&self, word: &str) -> bool {
        self.part_terms.iter().any(|t| t == word)
    }
}

fn normalize_entry(entry: &str) -> String {
    entry.trim().to_lowercase()
}

fn push_unique(list: &mut Vec<String>, entry: &str) {
    let entry = normalize_entry(entry);
    if !entry.is_empty() && !list.contains(&entry) {
        list.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_vehicle_info() {
        let empty = VehicleDescriptor::default();
        assert!(!empty.has_vehicle_info());

        let make_only = VehicleDescriptor {
            make: Some("honda".to_string()),
            ..Default::default()
        };
        assert!(make_only.has_vehicle_info());
        assert!(!make_only.is_fully_specified());
    }

    #[test]
    fn test_descriptor_display() {
        let desc = VehicleDescriptor {
            year: Some("2017".to_string()),
            make: Some("toyota".to_string()),
            model: Some("corolla".to_string()),
        };
        assert_eq!(desc.to_string(), "2017 toyota corolla");
        assert_eq!(VehicleDescriptor::default().to_string(), "(no vehicle)");
    }

    #[test]
    fn test_match_make_exact_and_partial() {
        let tables = ReferenceTables::default();
        assert_eq!(tables.match_make("honda"), Some("honda"));
        assert_eq!(tables.match_make("toyo"), Some("toyota"));
        assert_eq!(tables.match_make("toyotas"), Some("toyota"));
        assert_eq!(tables.match_make("vw"), Some("vw"));
        assert_eq!(tables.match_make("civic"), None);
        assert_eq!(tables.match_make(""), None);
    }

    #[test]
    fn test_canonical_make() {
        let tables = ReferenceTables::default();
        assert_eq!(tables.canonical_make("chevy"), "chevrolet");
        assert_eq!(tables.canonical_make("vw"), "volkswagen");
        assert_eq!(tables.canonical_make("mercedes"), "mercedes-benz");
        assert_eq!(tables.canonical_make("toyota"), "toyota");
    }

    #[test]
    fn test_part_and_model_lookup() {
        let tables = ReferenceTables::default();
        assert!(tables.is_part_term("pads"));
        assert!(tables.is_part_term("headlight"));
        assert!(!tables.is_part_term("corolla"));
        assert!(tables.is_known_model("corolla"));
        assert!(!tables.is_known_model("battery"));
    }

    #[test]
    fn test_yaml_extensions() {
        let yaml = r#"
makes: [Genesis]
models: [gv70]
part_terms: [gasket]
aliases:
  benz: mercedes-benz
"#;
        let tables = ReferenceTables::from_yaml_str(yaml).unwrap();
        assert!(tables.makes().iter().any(|m| m == "genesis"));
        assert!(tables.is_known_model("gv70"));
        assert!(tables.is_part_term("gasket"));
        assert_eq!(tables.canonical_make("benz"), "mercedes-benz");
        // Built-ins survive
        assert!(tables.is_part_term("battery"));
        assert_eq!(tables.canonical_make("chevy"), "chevrolet");
    }

    #[test]
    fn test_yaml_empty_is_default() {
        let tables = ReferenceTables::from_yaml_str("  \n").unwrap();
        assert_eq!(tables.makes().len(), MAKES.len());
    }

    #[test]
    fn test_yaml_invalid() {
        assert!(ReferenceTables::from_yaml_str("makes: {not: [a list").is_err());
    }
}
