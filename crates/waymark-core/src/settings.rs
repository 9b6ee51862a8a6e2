use crate::geocode::DEFAULT_ENDPOINT;
use crate::WaymarkError;
use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "WAYMARK_GEOCODE_KEY";

/// Timing and zoom levels for the fly-to sequence. Zoom levels are whole
/// slippy-map levels; one tick moves exactly one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub tick_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Level the camera backs out to before panning.
    pub wide_zoom: u8,
    /// Level the camera settles at over the destination.
    pub close_zoom: u8,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 150,
            settle_delay_ms: 800,
            min_zoom: 1,
            max_zoom: 19,
            wide_zoom: 4,
            close_zoom: 12,
        }
    }
}

impl AnimationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Total even for inverted bounds, where `max_zoom` wins.
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    pub fn validate(&self) -> Result<(), WaymarkError> {
        if self.tick_interval_ms == 0 {
            return Err(WaymarkError::InvalidSettings(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.settle_delay_ms == 0 {
            return Err(WaymarkError::InvalidSettings(
                "settle_delay_ms must be greater than zero".into(),
            ));
        }
        if !(self.min_zoom <= self.wide_zoom
            && self.wide_zoom < self.close_zoom
            && self.close_zoom <= self.max_zoom)
        {
            return Err(WaymarkError::InvalidSettings(format!(
                "zoom levels must satisfy min <= wide < close <= max (got {} / {} / {} / {})",
                self.min_zoom, self.wide_zoom, self.close_zoom, self.max_zoom
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub animation: AnimationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            request_timeout_secs: 10,
            cache_ttl_secs: 300,
            cache_capacity: 512,
            animation: AnimationConfig::default(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        crate::get_config_root().join("settings.json")
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file, using defaults — path={}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Like [`Settings::try_load`] but falls back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    "Settings unreadable, using defaults — path={} error={}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), WaymarkError> {
        if self.request_timeout_secs == 0 {
            return Err(WaymarkError::InvalidSettings(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        self.animation.validate()
    }

    /// Key precedence: explicit argument, then environment, then file.
    pub fn api_key(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_zoom_ordering_enforced() {
        let mut config = AnimationConfig::default();
        config.wide_zoom = config.close_zoom;
        assert!(matches!(
            config.validate(),
            Err(WaymarkError::InvalidSettings(_))
        ));

        let mut config = AnimationConfig::default();
        config.close_zoom = config.max_zoom + 1;
        assert!(config.validate().is_err());

        let mut config = AnimationConfig::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AnimationConfig::default();
        config.settle_delay_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(WaymarkError::InvalidSettings(ref msg)) if msg.contains("settle_delay_ms")
        ));
    }

    #[test]
    fn test_clamp_zoom_with_inverted_bounds() {
        let config = AnimationConfig {
            min_zoom: 10,
            max_zoom: 5,
            ..AnimationConfig::default()
        };
        assert_eq!(config.clamp_zoom(0), 5);
        assert_eq!(config.clamp_zoom(7), 5);
        assert_eq!(config.clamp_zoom(30), 5);
        assert_eq!(AnimationConfig::default().clamp_zoom(30), 19);
        assert_eq!(AnimationConfig::default().clamp_zoom(0), 1);
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"cache_ttl_secs": 30, "animation": {"close_zoom": 14}}"#)?;

        let settings = Settings::try_load(&path)?;
        assert_eq!(settings.cache_ttl_secs, 30);
        assert_eq!(settings.animation.close_zoom, 14);
        assert_eq!(settings.animation.wide_zoom, 4);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        Ok(())
    }

    #[test]
    fn test_garbage_file_falls_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json")?;
        assert!(Settings::try_load(&path).is_err());
        assert_eq!(Settings::load(&path), Settings::default());
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            api_key: Some("abc".into()),
            ..Settings::default()
        };
        settings.save(&path)?;
        assert_eq!(Settings::try_load(&path)?, settings);
        Ok(())
    }

    #[test]
    fn test_explicit_key_wins() {
        let settings = Settings {
            api_key: Some("from-file".into()),
            ..Settings::default()
        };
        assert_eq!(settings.api_key(Some("flag")), Some("flag".to_string()));
        assert_eq!(settings.api_key(Some("  ")), None);
    }
}
