//! Wikipedia geosearch: articles near a coordinate, flattened into markers.
//!
//! See <https://www.mediawiki.org/wiki/API:Geosearch> for the generator mode
//! used here (`generator=geosearch` with `prop=coordinates|pageimages`).

use std::collections::HashMap;

use nearby_core::config::WikipediaConfig;
use serde::Deserialize;
use tracing::instrument;

use crate::error::PlacesError;
use crate::http::HttpClient;
use crate::types::{Coordinates, Marker, Thumbnail};

#[derive(Debug, Deserialize)]
pub struct GeoSearchResponse {
    pub query: Option<GeoSearchQuery>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct GeoSearchQuery {
    pub pages: Option<HashMap<String, Page>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub info: String,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub pageid: u64,
    pub title: String,
    #[serde(default)]
    pub coordinates: Vec<PageCoordinates>,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct PageCoordinates {
    pub lat: f64,
    pub lon: f64,
}

/// `{base}/w/api.php?...` geosearch query for pages around `coords`.
pub fn geosearch_url(base_url: &str, coords: Coordinates, radius_meters: u32, limit: u32) -> String {
    let ggscoord = format!("{}|{}", coords.latitude, coords.longitude);
    format!(
        "{}/w/api.php?action=query&format=json&prop={}&generator=geosearch&ggscoord={}&ggsradius={}&ggslimit={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode("coordinates|pageimages"),
        urlencoding::encode(&ggscoord),
        radius_meters,
        limit,
    )
}

/// Link to an article by page id.
pub fn article_url(base_url: &str, page_id: u64) -> String {
    format!("{}/?curid={}", base_url.trim_end_matches('/'), page_id)
}

/// Reshape a geosearch response into markers ordered by page id.
///
/// Pages without coordinates are skipped.
///
/// # Errors
/// `PlacesError::Api` when the body carries an API error, and
/// `PlacesError::Parse` when `query.pages` is absent.
pub fn pages_to_markers(base_url: &str, response: GeoSearchResponse) -> Result<Vec<Marker>, PlacesError> {
    if let Some(err) = response.error {
        return Err(PlacesError::Api(format!("{}: {}", err.code, err.info)));
    }

    let pages = response
        .query
        .and_then(|q| q.pages)
        .ok_or_else(|| PlacesError::Parse("Could not read data from wikipedia".to_string()))?;

    let mut pages: Vec<Page> = pages.into_values().collect();
    pages.sort_by_key(|p| p.pageid);

    let markers = pages
        .into_iter()
        .filter_map(|page| {
            let Some(coords) = page.coordinates.first() else {
                tracing::debug!("Skipping '{}': no coordinates", page.title);
                return None;
            };
            Some(Marker {
                url: article_url(base_url, page.pageid),
                lat: coords.lat,
                lng: coords.lon,
                title: page.title,
                thumbnail: page.thumbnail,
            })
        })
        .collect();

    Ok(markers)
}

pub struct WikipediaClient {
    http: HttpClient,
    base_url: String,
    radius_meters: u32,
    limit: u32,
}

impl WikipediaClient {
    pub fn new(http: HttpClient, config: &WikipediaConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            radius_meters: config.radius_meters,
            limit: config.limit,
        }
    }

    /// Articles near `coords`, as map markers.
    #[instrument(skip(self), level = "info")]
    pub async fn nearby_articles(&self, coords: Coordinates) -> Result<Vec<Marker>, PlacesError> {
        let url = geosearch_url(&self.base_url, coords, self.radius_meters, self.limit);
        tracing::debug!("Request URI: {}", url);

        let response: GeoSearchResponse = self.http.get_json(&url).await?;
        let markers = pages_to_markers(&self.base_url, response)?;

        tracing::info!("Found {} nearby articles", markers.len());
        Ok(markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://en.wikipedia.org";

    fn parse(body: serde_json::Value) -> GeoSearchResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_geosearch_url() {
        let url = geosearch_url(BASE, Coordinates::new(41.68365, -70.19823), 10_000, 10);
        assert_eq!(
            url,
            "https://en.wikipedia.org/w/api.php?action=query&format=json&prop=coordinates%7Cpageimages&generator=geosearch&ggscoord=41.68365%7C-70.19823&ggsradius=10000&ggslimit=10"
        );
    }

    #[test]
    fn test_article_url() {
        assert_eq!(article_url(BASE, 38743), "https://en.wikipedia.org/?curid=38743");
        assert_eq!(
            article_url("https://de.wikipedia.org/", 1),
            "https://de.wikipedia.org/?curid=1"
        );
    }

    #[test]
    fn test_pages_to_markers() {
        let response = parse(serde_json::json!({
            "batchcomplete": "",
            "query": {"pages": {"38743": {
                "pageid": 38743, "ns": 0, "title": "Cape Cod", "index": -1,
                "coordinates": [{"lat": 41.68, "lon": -70.2, "primary": "", "globe": "earth"}],
                "thumbnail": {
                    "source": "https://upload.wikimedia.org/wikipedia/en/thumb/1/12/Ccnatsea.jpg/50px-Ccnatsea.jpg",
                    "width": 50, "height": 34
                },
                "pageimage": "Ccnatsea.jpg"
            }}}
        }));

        let markers = pages_to_markers(BASE, response).unwrap();
        assert_eq!(markers.len(), 1);
        let cape_cod = &markers[0];
        assert_eq!(cape_cod.title, "Cape Cod");
        assert_eq!(cape_cod.url, "https://en.wikipedia.org/?curid=38743");
        assert_eq!(cape_cod.lat, 41.68);
        assert_eq!(cape_cod.lng, -70.2);
        let thumb = cape_cod.thumbnail.as_ref().unwrap();
        assert_eq!((thumb.width, thumb.height), (50, 34));
    }

    #[test]
    fn test_pages_sorted_by_id_and_missing_coordinates_skipped() {
        let response = parse(serde_json::json!({
            "query": {"pages": {
                "900": {"pageid": 900, "title": "Later", "coordinates": [{"lat": 1.0, "lon": 2.0}]},
                "12": {"pageid": 12, "title": "Earlier", "coordinates": [{"lat": 3.0, "lon": 4.0}]},
                "55": {"pageid": 55, "title": "Nowhere"}
            }}
        }));

        let markers = pages_to_markers(BASE, response).unwrap();
        let titles: Vec<_> = markers.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Later"]);
        assert!(markers.iter().all(|m| m.thumbnail.is_none()));
    }

    #[test]
    fn test_missing_pages_is_parse_error() {
        let response = parse(serde_json::json!({"batchcomplete": ""}));
        let result = pages_to_markers(BASE, response);
        assert!(matches!(result, Err(PlacesError::Parse(msg)) if msg.contains("wikipedia")));
    }

    #[test]
    fn test_api_error_body() {
        let response = parse(serde_json::json!({
            "error": {"code": "badcoord", "info": "Invalid coordinate provided"}
        }));
        let result = pages_to_markers(BASE, response);
        assert!(matches!(result, Err(PlacesError::Api(msg)) if msg.contains("badcoord")));
    }
}
