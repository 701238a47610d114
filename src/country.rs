// src/country.rs
//! Country and phone-format resolution with cascading fallback tiers

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Generic digit bounds applied when no country-specific rule exists.
pub const GENERIC_MIN_DIGITS: usize = 7;
pub const GENERIC_MAX_DIGITS: usize = 15;

const DEFAULT_FORMAT_HINT: &str = "XXX XXX XXXX";

/// One selectable country. Keyed by ISO code; calling codes are shared by
/// some territories, so resolution always goes ISO -> entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub iso_code: String,
    pub calling_code: String,
    pub display_name: String,
    pub flag: String,
}

/// Digit-count rule for one calling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhonePattern {
    pub min_digits: usize,
    pub max_digits: usize,
}

impl PhonePattern {
    pub fn matches(&self, digit_count: usize) -> bool {
        digit_count >= self.min_digits && digit_count <= self.max_digits
    }
}

/// Country entry plus its resolved phone rule and placeholder hint, handed
/// to the field validator for `tel` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryContext {
    pub entry: CountryEntry,
    pub pattern: Option<PhonePattern>,
    pub format_hint: String,
}

/// One resolution strategy. Strategies are tried in order; returning `None`
/// hands the lookup to the next tier.
pub trait CountrySource: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, iso_code: &str) -> Option<CountryEntry>;

    fn entries(&self) -> Vec<CountryEntry>;

    fn pattern(&self, _calling_code: &str) -> Option<PhonePattern> {
        None
    }

    fn format_hint(&self, _calling_code: &str) -> Option<String> {
        None
    }
}

// ===== Tier 1: deployed country dataset =====

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    iso_code: String,
    calling_code: String,
    display_name: String,
    #[serde(default)]
    flag: String,
    #[serde(default)]
    min_digits: Option<usize>,
    #[serde(default)]
    max_digits: Option<usize>,
    #[serde(default)]
    format_hint: Option<String>,
}

/// Full country/phone dataset shipped with the deployment as a JSON file.
/// Loading is best-effort: a missing or unparsable file fails the tier,
/// not the registry.
pub struct DatasetSource {
    records: Vec<DatasetEntry>,
}

impl DatasetSource {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read country dataset: {}", path.display()))?;
        let records: Vec<DatasetEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse country dataset: {}", path.display()))?;

        if records.is_empty() {
            anyhow::bail!("Country dataset is empty: {}", path.display());
        }

        info!(
            countries = records.len(),
            path = %path.display(),
            "Loaded country dataset"
        );
        Ok(Self { records })
    }

    fn record(&self, iso_code: &str) -> Option<&DatasetEntry> {
        self.records.iter().find(|r| r.iso_code == iso_code)
    }
}

impl CountrySource for DatasetSource {
    fn name(&self) -> &'static str {
        "dataset"
    }

    fn resolve(&self, iso_code: &str) -> Option<CountryEntry> {
        self.record(iso_code).map(|r| CountryEntry {
            iso_code: r.iso_code.clone(),
            calling_code: r.calling_code.clone(),
            display_name: r.display_name.clone(),
            flag: r.flag.clone(),
        })
    }

    fn entries(&self) -> Vec<CountryEntry> {
        self.records
            .iter()
            .map(|r| CountryEntry {
                iso_code: r.iso_code.clone(),
                calling_code: r.calling_code.clone(),
                display_name: r.display_name.clone(),
                flag: r.flag.clone(),
            })
            .collect()
    }

    fn pattern(&self, calling_code: &str) -> Option<PhonePattern> {
        self.records
            .iter()
            .find(|r| r.calling_code == calling_code)
            .and_then(|r| match (r.min_digits, r.max_digits) {
                (Some(min), Some(max)) => Some(PhonePattern {
                    min_digits: min,
                    max_digits: max,
                }),
                _ => None,
            })
    }

    fn format_hint(&self, calling_code: &str) -> Option<String> {
        self.records
            .iter()
            .find(|r| r.calling_code == calling_code)
            .and_then(|r| r.format_hint.clone())
    }
}

// ===== Tier 2: static table =====

const STATIC_TABLE: &[(&str, &str, &str, &str)] = &[
    ("AR", "54", "Argentina", "🇦🇷"),
    ("AT", "43", "Austria", "🇦🇹"),
    ("AU", "61", "Australia", "🇦🇺"),
    ("BE", "32", "Belgium", "🇧🇪"),
    ("BO", "591", "Bolivia", "🇧🇴"),
    ("BR", "55", "Brazil", "🇧🇷"),
    ("CA", "1", "Canada", "🇨🇦"),
    ("CH", "41", "Switzerland", "🇨🇭"),
    ("CL", "56", "Chile", "🇨🇱"),
    ("CO", "57", "Colombia", "🇨🇴"),
    ("CR", "506", "Costa Rica", "🇨🇷"),
    ("CU", "53", "Cuba", "🇨🇺"),
    ("DE", "49", "Germany", "🇩🇪"),
    ("DO", "1", "Dominican Republic", "🇩🇴"),
    ("EC", "593", "Ecuador", "🇪🇨"),
    ("ES", "34", "Spain", "🇪🇸"),
    ("FR", "33", "France", "🇫🇷"),
    ("GB", "44", "United Kingdom", "🇬🇧"),
    ("GT", "502", "Guatemala", "🇬🇹"),
    ("HN", "504", "Honduras", "🇭🇳"),
    ("HR", "385", "Croatia", "🇭🇷"),
    ("IE", "353", "Ireland", "🇮🇪"),
    ("IN", "91", "India", "🇮🇳"),
    ("IT", "39", "Italy", "🇮🇹"),
    ("JP", "81", "Japan", "🇯🇵"),
    ("MX", "52", "Mexico", "🇲🇽"),
    ("NI", "505", "Nicaragua", "🇳🇮"),
    ("NL", "31", "Netherlands", "🇳🇱"),
    ("NZ", "64", "New Zealand", "🇳🇿"),
    ("PA", "507", "Panama", "🇵🇦"),
    ("PE", "51", "Peru", "🇵🇪"),
    ("PL", "48", "Poland", "🇵🇱"),
    ("PT", "351", "Portugal", "🇵🇹"),
    ("PY", "595", "Paraguay", "🇵🇾"),
    ("RO", "40", "Romania", "🇷🇴"),
    ("SE", "46", "Sweden", "🇸🇪"),
    ("SV", "503", "El Salvador", "🇸🇻"),
    ("US", "1", "United States", "🇺🇸"),
    ("UY", "598", "Uruguay", "🇺🇾"),
    ("VE", "58", "Venezuela", "🇻🇪"),
];

const PHONE_PATTERNS: &[(&str, usize, usize, &str)] = &[
    ("1", 10, 10, "(XXX) XXX XXXX"),
    ("33", 9, 9, "X XX XX XX XX"),
    ("34", 9, 9, "XXX XXX XXX"),
    ("39", 9, 10, "XXX XXX XXXX"),
    ("44", 10, 10, "XXXX XXX XXX"),
    ("49", 10, 11, "XXX XXXXXXXX"),
    ("51", 9, 9, "XXX XXX XXX"),
    ("52", 10, 10, "XX XXXX XXXX"),
    ("54", 10, 10, "XX XXXX XXXX"),
    ("55", 10, 11, "XX XXXXX XXXX"),
    ("56", 9, 9, "X XXXX XXXX"),
    ("57", 10, 10, "XXX XXX XXXX"),
    ("58", 10, 10, "XXX XXX XXXX"),
    ("385", 8, 9, "XX XXX XXXX"),
    ("593", 9, 9, "XX XXX XXXX"),
    ("598", 8, 9, "X XXX XXXX"),
];

/// Hardcoded table covering the countries applicants actually select.
pub struct StaticTableSource;

fn entry_from_row(row: &(&str, &str, &str, &str)) -> CountryEntry {
    CountryEntry {
        iso_code: row.0.to_string(),
        calling_code: row.1.to_string(),
        display_name: row.2.to_string(),
        flag: row.3.to_string(),
    }
}

impl CountrySource for StaticTableSource {
    fn name(&self) -> &'static str {
        "static-table"
    }

    fn resolve(&self, iso_code: &str) -> Option<CountryEntry> {
        STATIC_TABLE
            .iter()
            .find(|row| row.0 == iso_code)
            .map(entry_from_row)
    }

    fn entries(&self) -> Vec<CountryEntry> {
        STATIC_TABLE.iter().map(entry_from_row).collect()
    }

    fn pattern(&self, calling_code: &str) -> Option<PhonePattern> {
        PHONE_PATTERNS
            .iter()
            .find(|row| row.0 == calling_code)
            .map(|row| PhonePattern {
                min_digits: row.1,
                max_digits: row.2,
            })
    }

    fn format_hint(&self, calling_code: &str) -> Option<String> {
        PHONE_PATTERNS
            .iter()
            .find(|row| row.0 == calling_code)
            .map(|row| row.3.to_string())
    }
}

// ===== Tier 3: minimal fallback =====

const MINIMAL_LIST: &[(&str, &str, &str, &str)] = &[
    ("AR", "54", "Argentina", "🇦🇷"),
    ("CL", "56", "Chile", "🇨🇱"),
    ("CO", "57", "Colombia", "🇨🇴"),
    ("EC", "593", "Ecuador", "🇪🇨"),
    ("ES", "34", "Spain", "🇪🇸"),
    ("MX", "52", "Mexico", "🇲🇽"),
    ("PE", "51", "Peru", "🇵🇪"),
    ("PR", "1", "Puerto Rico", "🇵🇷"),
    ("US", "1", "United States", "🇺🇸"),
    ("VE", "58", "Venezuela", "🇻🇪"),
];

/// Last-resort curated list used when everything else is unavailable.
pub struct MinimalFallbackSource;

impl CountrySource for MinimalFallbackSource {
    fn name(&self) -> &'static str {
        "minimal-fallback"
    }

    fn resolve(&self, iso_code: &str) -> Option<CountryEntry> {
        MINIMAL_LIST
            .iter()
            .find(|row| row.0 == iso_code)
            .map(entry_from_row)
    }

    fn entries(&self) -> Vec<CountryEntry> {
        MINIMAL_LIST.iter().map(entry_from_row).collect()
    }
}

// ===== Registry =====

/// Ordered fallback chain over the tiers. A tier that cannot answer is
/// skipped; the registry only comes up empty when every tier does.
pub struct CountryRegistry {
    sources: Vec<Box<dyn CountrySource>>,
}

impl CountryRegistry {
    pub fn with_sources(sources: Vec<Box<dyn CountrySource>>) -> Self {
        Self { sources }
    }

    /// Standard three-tier chain. The dataset tier is attempted from
    /// `dataset_path`; a load failure downgrades to the static tiers so the
    /// form never blocks on the optional dataset.
    pub fn from_dataset_path(dataset_path: Option<&Path>) -> Self {
        let mut sources: Vec<Box<dyn CountrySource>> = Vec::new();

        if let Some(path) = dataset_path {
            match DatasetSource::load(path) {
                Ok(source) => sources.push(Box::new(source)),
                Err(e) => {
                    warn!(error = %e, "Country dataset unavailable, falling back to static table");
                }
            }
        }

        sources.push(Box::new(StaticTableSource));
        sources.push(Box::new(MinimalFallbackSource));
        Self { sources }
    }

    /// Resolve a two-letter ISO code to a country entry, trying each tier in
    /// order. Deterministic, no side effects.
    pub fn resolve(&self, iso_code: &str) -> Option<CountryEntry> {
        let normalized = iso_code.trim().to_uppercase();
        self.sources
            .iter()
            .find_map(|source| source.resolve(&normalized))
    }

    /// Entry plus phone rule for the validator. `None` only when the ISO code
    /// is unknown to every tier.
    pub fn context_for(&self, iso_code: &str) -> Option<CountryContext> {
        self.resolve(iso_code).map(|entry| {
            let pattern = self.validation_pattern(&entry.calling_code);
            let format_hint = self.format_hint(&entry.calling_code);
            CountryContext {
                entry,
                pattern,
                format_hint,
            }
        })
    }

    /// Digit-count rule for a calling code, or `None` to signal the generic
    /// 7-15 digit check.
    pub fn validation_pattern(&self, calling_code: &str) -> Option<PhonePattern> {
        self.sources
            .iter()
            .find_map(|source| source.pattern(calling_code))
    }

    /// Human-readable example for the phone input placeholder.
    pub fn format_hint(&self, calling_code: &str) -> String {
        self.sources
            .iter()
            .find_map(|source| source.format_hint(calling_code))
            .unwrap_or_else(|| DEFAULT_FORMAT_HINT.to_string())
    }

    /// Selector population: the first tier with any entries, sorted by
    /// display name.
    pub fn countries(&self) -> Vec<CountryEntry> {
        for source in &self.sources {
            let mut entries = source.entries();
            if !entries.is_empty() {
                entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                return entries;
            }
        }
        Vec::new()
    }
}
