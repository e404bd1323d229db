//! Google Static Maps URLs, image download, and Google Maps deep links.

use nearby_core::config::MapsConfig;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PlacesError;
use crate::http::HttpClient;
use crate::types::{marker_label, Coordinates, Marker};

pub const STATIC_MAP_BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Rendered static map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl MapImage {
    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

fn query_string(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Map of the user's location, or of the markers when there are any.
///
/// With markers the map is auto-fitted to them (no center/zoom) and each is
/// drawn in red with labels A, B, ...; without markers the user's position is
/// the single blue marker.
pub fn map_url_by_coordinates(
    base_url: &str,
    api_key: &str,
    center: Coordinates,
    markers: &[Marker],
    zoom: u8,
    size: &str,
) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::new();

    if markers.is_empty() {
        pairs.push(("center", center.to_string()));
        pairs.push(("zoom", zoom.to_string()));
        pairs.push(("size", size.to_string()));
        pairs.push(("key", api_key.to_string()));
        pairs.push(("markers", format!("color:blue|{}", center)));
    } else {
        pairs.push(("size", size.to_string()));
        pairs.push(("key", api_key.to_string()));
        for (i, marker) in markers.iter().enumerate() {
            pairs.push((
                "markers",
                format!(
                    "color:red|label:{}|{}",
                    marker_label(i),
                    marker.coordinates()
                ),
            ));
        }
    }

    format!("{}?{}", base_url, query_string(&pairs))
}

/// Map centered on a place name such as "Boston, MA".
pub fn map_url_by_city(base_url: &str, api_key: &str, city: &str, zoom: u8, size: &str) -> String {
    let pairs = [
        ("center", city.to_string()),
        ("zoom", zoom.to_string()),
        ("size", size.to_string()),
        ("key", api_key.to_string()),
    ];
    format!("{}?{}", base_url, query_string(&pairs))
}

/// Driving directions from `from` to `to`.
pub fn directions_url(from: Coordinates, to: Coordinates) -> String {
    format!("https://www.google.com/maps/dir/{}/{}", from, to)
}

/// Google Maps search link for a point.
pub fn coordinates_url(destination: Coordinates) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        destination
    )
}

/// Paddle icon for a marker label.
pub fn marker_icon_url(label: char) -> String {
    format!("http://maps.google.com/mapfiles/kml/paddle/{}.png", label)
}

pub struct MapsClient {
    http: HttpClient,
    base_url: String,
    zoom: u8,
}

impl MapsClient {
    pub fn new(http: HttpClient, config: &MapsConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            zoom: config.zoom,
        }
    }

    /// Static map URL for `center` and `markers`.
    ///
    /// # Errors
    /// `PlacesError::MissingApiKey` when no key is available.
    pub fn url_for(
        &self,
        api_key: Option<&str>,
        center: Coordinates,
        markers: &[Marker],
        size: &str,
    ) -> Result<String, PlacesError> {
        let api_key = api_key.ok_or(PlacesError::MissingApiKey("Google Maps"))?;
        Ok(map_url_by_coordinates(
            &self.base_url,
            api_key,
            center,
            markers,
            self.zoom,
            size,
        ))
    }

    /// Static map URL for a place name.
    ///
    /// # Errors
    /// `PlacesError::MissingApiKey` when no key is available.
    pub fn url_for_city(&self, api_key: Option<&str>, city: &str, size: &str) -> Result<String, PlacesError> {
        let api_key = api_key.ok_or(PlacesError::MissingApiKey("Google Maps"))?;
        Ok(map_url_by_city(&self.base_url, api_key, city, self.zoom, size))
    }

    /// Download the image behind a static map URL.
    #[instrument(skip(self, url), level = "info")]
    pub async fn fetch_image(&self, url: &str) -> Result<MapImage, PlacesError> {
        let (bytes, content_type) = self.http.get_bytes(url).await?;
        let content_type = content_type.unwrap_or_default();

        if !content_type.starts_with("image/") {
            return Err(PlacesError::Parse(format!(
                "Expected an image, got '{}'",
                content_type
            )));
        }
        if bytes.is_empty() {
            return Err(PlacesError::Parse("Empty map image".to_string()));
        }

        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        tracing::info!("Fetched {} byte map image ({})", bytes.len(), content_type);
        Ok(MapImage {
            bytes,
            content_type,
        })
    }
}
