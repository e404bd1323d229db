//! Widget parameters and their resolution order.
//!
//! Parameters come from three places, first hit wins:
//! the widget argument (`--param` / `NEARBY_PARAM`), the stored
//! `<storage>/<name>.json` file, then the `[defaults]` table of the config.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::json_file::JsonFileManager;

/// Widget family size. Only used to pick the static map dimensions.
///
/// Families this crate does not know (accessory widgets, newer sizes) read as
/// the default instead of rejecting the whole parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    #[default]
    Small,
    Medium,
    Large,
    #[serde(rename = "extraLarge")]
    ExtraLarge,
}

impl WidgetSize {
    pub fn from_family(family: &str) -> Self {
        match family.trim().to_ascii_lowercase().as_str() {
            "small" => WidgetSize::Small,
            "medium" => WidgetSize::Medium,
            "large" => WidgetSize::Large,
            "extralarge" => WidgetSize::ExtraLarge,
            other => {
                tracing::debug!("Unknown widget family '{}', using the default size", other);
                WidgetSize::default()
            }
        }
    }
}

impl<'de> Deserialize<'de> for WidgetSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let family = String::deserialize(deserializer)?;
        Ok(WidgetSize::from_family(&family))
    }
}

/// Settings for the Flickr photoset variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlickrParams {
    pub api_key: String,
    pub photoset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetParams {
    /// Google Maps Static API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Show the widget summary instead of the list view
    #[serde(default)]
    pub debug: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub widget_size: WidgetSize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flickr: Option<FlickrParams>,
}

impl WidgetParams {
    /// Location override, only when both halves are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// API key with blank strings treated as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Where the resolved parameters came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    WidgetArgument,
    StoredFile,
    Default,
}

impl std::fmt::Display for ParamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParamSource::WidgetArgument => "widget argument",
            ParamSource::StoredFile => "stored parameter file",
            ParamSource::Default => "configured defaults",
        };
        f.write_str(s)
    }
}

/// Parse the raw widget argument.
///
/// A missing, blank or literal `null` argument means "not supplied".
///
/// # Errors
/// Returns `ConfigError::ParseError` when the argument is not valid JSON for
/// [`WidgetParams`].
pub fn parse_widget_parameter(raw: Option<&str>) -> Result<Option<WidgetParams>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let params: Option<WidgetParams> = serde_json::from_str(raw)
        .map_err(|e| ConfigError::ParseError(format!("widget parameter: {}", e)))?;
    Ok(params)
}

/// Load `<storage>/<name>.json` as parameters. Every failure is logged and yields `None`.
pub fn load_stored(files: &JsonFileManager, name: &str) -> Option<WidgetParams> {
    files.read_as::<WidgetParams>(name)
}

/// Pick the first available parameter set.
///
/// `stored` is only invoked when no widget argument was given.
pub fn resolve<F>(
    widget_argument: Option<WidgetParams>,
    stored: F,
    default: Option<&WidgetParams>,
) -> Option<(WidgetParams, ParamSource)>
where
    F: FnOnce() -> Option<WidgetParams>,
{
    if let Some(params) = widget_argument {
        return Some((params, ParamSource::WidgetArgument));
    }
    if let Some(params) = stored() {
        return Some((params, ParamSource::StoredFile));
    }
    default.map(|params| (params.clone(), ParamSource::Default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_missing_or_null_argument() {
        assert_eq!(parse_widget_parameter(None).unwrap(), None);
        assert_eq!(parse_widget_parameter(Some("  ")).unwrap(), None);
        assert_eq!(parse_widget_parameter(Some("null")).unwrap(), None);
    }

    #[test]
    fn test_parse_camel_case_argument() {
        let params = parse_widget_parameter(Some(
            r#"{"apiKey":"abc","debug":true,"latitude":41.68,"longitude":-70.2,"widgetSize":"medium"}"#,
        ))
        .unwrap()
        .unwrap();

        assert_eq!(params.api_key(), Some("abc"));
        assert!(params.debug);
        assert_eq!(params.coordinates(), Some((41.68, -70.2)));
        assert_eq!(params.widget_size, WidgetSize::Medium);
    }

    #[test]
    fn test_unknown_widget_family_falls_back() {
        let params = parse_widget_parameter(Some(r#"{"apiKey":"abc","widgetSize":"extraLarge"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(params.widget_size, WidgetSize::ExtraLarge);

        let params = parse_widget_parameter(Some(r#"{"widgetSize":"accessoryRectangular"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(params.widget_size, WidgetSize::Small);

        let json = serde_json::to_string(&WidgetParams {
            widget_size: WidgetSize::ExtraLarge,
            ..Default::default()
        })
        .unwrap();
        assert!(json.contains(r#""widgetSize":"extraLarge""#));
    }

    #[test]
    fn test_parse_invalid_argument_is_error() {
        let result = parse_widget_parameter(Some("{apiKey: nope"));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_half_coordinates_are_ignored() {
        let params = WidgetParams {
            latitude: Some(1.0),
            ..Default::default()
        };
        assert_eq!(params.coordinates(), None);
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let params = WidgetParams {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(params.api_key(), None);
    }

    #[test]
    fn test_resolve_prefers_widget_argument() {
        let arg = WidgetParams {
            api_key: Some("arg".into()),
            ..Default::default()
        };
        let default = WidgetParams {
            api_key: Some("default".into()),
            ..Default::default()
        };

        let (params, source) = resolve(
            Some(arg),
            || panic!("stored file must not be read"),
            Some(&default),
        )
        .unwrap();
        assert_eq!(params.api_key(), Some("arg"));
        assert_eq!(source, ParamSource::WidgetArgument);
    }

    #[test]
    fn test_resolve_falls_back_in_order() {
        let stored = WidgetParams {
            api_key: Some("stored".into()),
            ..Default::default()
        };
        let default = WidgetParams {
            api_key: Some("default".into()),
            ..Default::default()
        };

        let (params, source) = resolve(None, || Some(stored.clone()), Some(&default)).unwrap();
        assert_eq!(params.api_key(), Some("stored"));
        assert_eq!(source, ParamSource::StoredFile);

        let (params, source) = resolve(None, || None, Some(&default)).unwrap();
        assert_eq!(params.api_key(), Some("default"));
        assert_eq!(source, ParamSource::Default);

        assert!(resolve(None, || None, None).is_none());
    }
}
