// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
pub mod heading;
pub mod matchers;

pub use heading::parse_heading;
pub use matchers::{
    CapitalizedPhraseMatcher, KeywordLineMatcher, Matcher, MarkerEmphasisMatcher,
    TableCellEmphasisMatcher,
};

/// When a user's file has a lower version, their keyword list is reset on load.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub const DEFAULT_MARKER: &str = "@";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Glyph that precedes a bold venue name, as in `Breakfast @ **Cafe Centrale**`.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Venue and infrastructure nouns used by the keyword-line matcher.
    pub keywords: Vec<String>,
    #[serde(default)]
    pub schema_version: u32,
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let keywords = [
            // Venues
            "Airport",
            "Park",
            "Resort",
            "Studios",
            "Center",
            "Science Center",
            "Space Center",
            "Hotel",
            "Museum",
            "Aquarium",
            "Zoo",
            "Theater",
            "Mall",
            "Restaurant",
            "Show",
            "Nightlife",
            // Districts and roads
            "Downtown",
            "District",
            "Drive",
            "Avenue",
            "Boulevard",
            "Plaza",
            "Square",
            // Transit
            "Trolley",
            "Bus",
            "Rental",
            "Lynx",
            "I-RIDE",
            // Brands
            "Gatorland",
            "SeaWorld",
            "Disney",
            "Universal",
        ];
        Self {
            marker: default_marker(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }
}

impl ExtractorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("Loading extractor config — path={}", path.display());
        if !path.exists() {
            log::debug!("No extractor config, using defaults — path={}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let mut config: ExtractorConfig = serde_json::from_str(&content).map_err(|e| {
            log::error!("Extractor config unreadable — path={} error={}", path.display(), e);
            e
        })?;

        if config.schema_version < CURRENT_SCHEMA_VERSION {
            log::info!(
                "Migrating extractor config — from_schema={} to_schema={}",
                config.schema_version,
                CURRENT_SCHEMA_VERSION
            );
            // v1→v2: districts and transit vocabulary added to the shipped list
            if config.schema_version <= 1 {
                config.keywords = Self::default().keywords;
            }
            config.schema_version = CURRENT_SCHEMA_VERSION;
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(path, serde_json::to_string_pretty(&config).unwrap_or_default());
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!(
            "Saved extractor config — keywords={} path={}",
            self.keywords.len(),
            path.display()
        );
        Ok(())
    }
}

/// Runs every registered [`Matcher`] over a text block and unions the results
/// in first-seen order, dropping exact (case-sensitive) duplicates.
#[derive(Clone)]
pub struct EntityExtractor {
    pub config: Arc<ExtractorConfig>,
    config_path: PathBuf,
    matchers: Vec<Arc<dyn Matcher>>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        let config_path = Self::get_config_path();
        let config = ExtractorConfig::load(&config_path).unwrap_or_default();
        Self::with_config(config, config_path)
    }
}

impl EntityExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self::default())
    }

    pub fn at_path(path: PathBuf) -> Self {
        let config = ExtractorConfig::load(&path).unwrap_or_default();
        Self::with_config(config, path)
    }

    /// Builds the four standard matchers from `config`.
    pub fn with_config(config: ExtractorConfig, config_path: PathBuf) -> Self {
        let matchers = Self::standard_matchers(&config);
        Self {
            config: Arc::new(config),
            config_path,
            matchers,
        }
    }

    /// An extractor with no matchers; add them with [`EntityExtractor::push`].
    pub fn empty() -> Self {
        Self {
            config: Arc::new(ExtractorConfig::default()),
            config_path: Self::get_config_path(),
            matchers: Vec::new(),
        }
    }

    pub fn push(&mut self, matcher: impl Matcher + 'static) {
        self.matchers.push(Arc::new(matcher));
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    pub fn update_config(&mut self, config: ExtractorConfig) {
        self.matchers = Self::standard_matchers(&config);
        self.config = Arc::new(config);
    }

    pub fn save(&self) -> Result<()> {
        self.config.save(&self.config_path)
    }

    pub fn reset_defaults(&mut self) -> Result<()> {
        self.update_config(ExtractorConfig::default());
        self.save()
    }

    fn get_config_path() -> PathBuf {
        ProjectDirs::from("org", "waymark", "waymark")
            .map(|dirs| dirs.config_dir().join("extractor.json"))
            .unwrap_or_else(|| PathBuf::from("extractor.json"))
    }

    fn standard_matchers(config: &ExtractorConfig) -> Vec<Arc<dyn Matcher>> {
        vec![
            Arc::new(MarkerEmphasisMatcher::new(&config.marker)),
            Arc::new(TableCellEmphasisMatcher),
            Arc::new(CapitalizedPhraseMatcher),
            Arc::new(KeywordLineMatcher::new(&config.keywords)),
        ]
    }

    /// Candidate place names found in `text`. Never fails; an empty vector
    /// means nothing looked like a place.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for matcher in &self.matchers {
            let found = matcher.find(text);
            log::debug!(
                "Matcher ran — matcher={} found={}",
                matcher.name(),
                found.len()
            );
            for name in found {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn extractor() -> EntityExtractor {
        EntityExtractor::with_config(ExtractorConfig::default(), PathBuf::from("unused.json"))
    }

    #[test]
    fn test_table_row_with_marker() {
        let text = "| 08:00 | Breakfast @ **Cafe Centrale** | Old Town | Reserve |";
        let names = extractor().extract(text);
        assert!(names.contains(&"Cafe Centrale".to_string()), "{:?}", names);
    }

    #[test]
    fn test_museum_line() {
        let names = extractor().extract("Visit the National History Museum before lunch");
        assert!(names.iter().any(|n| n.contains("Museum")), "{:?}", names);
        assert!(names.contains(&"National History Museum".to_string()));
    }

    #[test]
    fn test_first_seen_order_and_dedup() {
        let text = "Lunch @ **Blue Door**\n| 12:00 | **Blue Door** |\nThen Blue Door again.";
        let names = extractor().extract(text);
        assert_eq!(names[0], "Blue Door");
        assert_eq!(names.iter().filter(|n| *n == "Blue Door").count(), 1);
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let mut ex = EntityExtractor::empty();
        ex.push(TableCellEmphasisMatcher);
        let names = ex.extract("| **Pier Ten** | **PIER TEN** |");
        assert_eq!(names, vec!["Pier Ten".to_string(), "PIER TEN".to_string()]);
    }

    #[test]
    fn test_deterministic() {
        let text = "# Orlando – May 1 → May 4\n| 09:00 | **Epcot** | Walt Disney World Resort |\nRide the Lynx Bus to Downtown Orlando.";
        let ex = extractor();
        assert_eq!(ex.extract(text), ex.extract(text));
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let ex = extractor();
        assert!(ex.extract("").is_empty());
        assert!(ex.extract("** | ** @ ** |||| **").is_empty());
        assert!(ex.extract("lowercase prose with no places at all").is_empty());
    }

    #[test]
    fn test_empty_extractor_finds_nothing() {
        assert!(EntityExtractor::empty()
            .extract("Walt Disney World")
            .is_empty());
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let mut ex = extractor();
        let config = ExtractorConfig {
            keywords: vec!["Onsen".to_string()],
            ..ExtractorConfig::default()
        };
        ex.update_config(config);
        let names = ex.extract("soak at the Hakone Yumoto Onsen after hiking");
        assert!(names.contains(&"Hakone Yumoto Onsen after hiking".to_string()));
        assert!(ex.extract("Museum of Flight").is_empty());
    }

    #[test]
    fn test_config_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("extractor.json");
        let config = ExtractorConfig {
            marker: "at".to_string(),
            keywords: vec!["Temple".to_string()],
            schema_version: CURRENT_SCHEMA_VERSION,
        };
        config.save(&path)?;
        assert_eq!(ExtractorConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_outdated_schema_resets_keywords() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("extractor.json");
        fs::write(&path, r#"{"keywords":["Temple"],"schema_version":1}"#)?;

        let config = ExtractorConfig::load(&path)?;
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.keywords, ExtractorConfig::default().keywords);
        assert_eq!(config.marker, DEFAULT_MARKER);

        // Migration is written back
        let reloaded: ExtractorConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(reloaded.schema_version, CURRENT_SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn test_missing_config_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let ex = EntityExtractor::at_path(dir.path().join("nope.json"));
        assert_eq!(*ex.config, ExtractorConfig::default());
        assert_eq!(ex.matcher_names().len(), 4);
        Ok(())
    }
}
