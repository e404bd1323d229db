use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::params::WidgetParams;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a one-line message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Folder for the parameter file, metrics CSV and log file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Base name of the files in the storage folder
    #[serde(default = "default_script_name")]
    pub script_name: String,

    /// Parameters used when neither a widget argument nor a stored file is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<WidgetParams>,

    #[serde(default)]
    pub wikipedia: WikipediaConfig,

    #[serde(default)]
    pub maps: MapsConfig,

    #[serde(default)]
    pub geocode: GeocodeConfig,

    #[serde(default)]
    pub flickr: FlickrConfig,

    #[serde(default)]
    pub widget: WidgetConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    /// Wiki host, e.g. https://en.wikipedia.org
    pub base_url: String,

    /// Geosearch radius in meters (the API caps this at 10000)
    pub radius_meters: u32,

    /// Maximum number of articles
    pub limit: u32,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            radius_meters: 10_000,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Static Maps endpoint
    pub base_url: String,

    pub zoom: u8,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
            zoom: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeConfig {
    /// Nominatim host
    pub base_url: String,

    pub enabled: bool,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlickrConfig {
    /// Flickr REST endpoint
    pub base_url: String,

    /// Photos this much farther than the nearest one still count as "nearest"
    pub nearby_slack_meters: f64,
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flickr.com/services/rest/".to_string(),
            nearby_slack_meters: 1000.0,
        }
    }
}

/// Longest accepted refresh interval.
pub const MAX_REFRESH_HOURS: u32 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Hours until the snapshot should be refreshed
    pub refresh_hours: u32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self { refresh_hours: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            user_agent: concat!("nearby/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nearby")
        .join("storage")
}

fn default_script_name() -> String {
    "nearby".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            script_name: default_script_name(),
            defaults: None,
            wikipedia: WikipediaConfig::default(),
            maps: MapsConfig::default(),
            geocode: GeocodeConfig::default(),
            flickr: FlickrConfig::default(),
            widget: WidgetConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.wikipedia.base_url, "wikipedia.base_url", &mut result);
        self.validate_url(&self.maps.base_url, "maps.base_url", &mut result);
        self.validate_url(&self.geocode.base_url, "geocode.base_url", &mut result);
        self.validate_url(&self.flickr.base_url, "flickr.base_url", &mut result);

        if self.script_name.trim().is_empty() {
            result.add_error("script_name", "Script name must not be empty");
        } else if self.script_name.contains(['/', '\\']) {
            result.add_error("script_name", "Script name must not contain path separators");
        }

        if self.wikipedia.radius_meters < 10 || self.wikipedia.radius_meters > 10_000 {
            result.add_error(
                "wikipedia.radius_meters",
                "Geosearch radius must be between 10 and 10000 meters",
            );
        }
        if self.wikipedia.limit == 0 || self.wikipedia.limit > 500 {
            result.add_error("wikipedia.limit", "Article limit must be between 1 and 500");
        } else if self.wikipedia.limit > 26 {
            result.add_warning(
                "wikipedia.limit",
                "More than 26 articles: map labels run past 'Z'",
            );
        }

        if self.maps.zoom > 21 {
            result.add_error("maps.zoom", "Zoom must be between 0 and 21");
        }

        if self.flickr.nearby_slack_meters < 0.0 || !self.flickr.nearby_slack_meters.is_finite() {
            result.add_error(
                "flickr.nearby_slack_meters",
                "Slack must be a non-negative number of meters",
            );
        }

        if self.widget.refresh_hours == 0 {
            result.add_warning("widget.refresh_hours", "Refresh interval is 0 hours");
        } else if self.widget.refresh_hours > MAX_REFRESH_HOURS {
            result.add_error(
                "widget.refresh_hours",
                format!("Refresh interval must be at most {} hours (one year)", MAX_REFRESH_HOURS),
            );
        } else if self.widget.refresh_hours > 24 * 7 {
            result.add_warning("widget.refresh_hours", "Refresh interval is more than a week");
        }

        if self.http.timeout_secs == 0 {
            result.add_error("http.timeout_secs", "Timeout must be greater than 0");
        }
        if self.http.user_agent.trim().is_empty() {
            result.add_error("http.user_agent", "A User-Agent is required by Wikipedia and Nominatim");
        }

        match &self.defaults {
            None => result.add_warning(
                "defaults",
                "No default parameters - runs need --param or a stored parameter file",
            ),
            Some(defaults) => {
                if defaults.api_key().is_none() {
                    result.add_warning("defaults.apiKey", "No Google Maps API key configured");
                }
                if defaults.latitude.is_some() != defaults.longitude.is_some() {
                    result.add_warning(
                        "defaults",
                        "Only one of latitude/longitude is set; the override is ignored",
                    );
                }
                if let Some((lat, lng)) = defaults.coordinates() {
                    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                        result.add_error("defaults", "Coordinates are out of range");
                    }
                }
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nearby");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_defaults_is_warning() {
        let result = Config::default().validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "defaults"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.wikipedia.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "wikipedia.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.maps.base_url = "ftp://maps.example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_radius_out_of_range() {
        let mut config = Config::default();
        config.wikipedia.radius_meters = 20_000;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "wikipedia.radius_meters"));
    }

    #[test]
    fn test_refresh_interval_bounds() {
        let mut config = Config::default();

        config.widget.refresh_hours = 24 * 30;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "widget.refresh_hours"));

        config.widget.refresh_hours = u32::MAX;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "widget.refresh_hours"));
    }

    #[test]
    fn test_defaults_coordinates_checked() {
        let mut config = Config::default();
        config.defaults = Some(WidgetParams {
            api_key: Some("key".into()),
            latitude: Some(120.0),
            longitude: Some(0.0),
            ..Default::default()
        });
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "defaults"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nearby").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.script_name, "nearby");
        assert_eq!(config.maps.zoom, 14);
    }

    #[test]
    fn test_load_from_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
script_name = "map-widget"

[defaults]
apiKey = "XXX"
latitude = 42.43
longitude = -71.1

[wikipedia]
base_url = "https://de.wikipedia.org"
radius_meters = 5000
limit = 5
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.script_name, "map-widget");
        assert_eq!(config.wikipedia.radius_meters, 5000);
        assert_eq!(config.widget.refresh_hours, 6);
        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.api_key(), Some("XXX"));
        assert_eq!(defaults.coordinates(), Some((42.43, -71.1)));
    }

    #[test]
    fn test_save_and_reload_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.defaults = Some(WidgetParams {
            api_key: Some("key".into()),
            debug: true,
            ..Default::default()
        });
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.defaults, config.defaults);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
