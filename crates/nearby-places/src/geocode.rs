//! Reverse geocoding: convert coordinates to a short description of the area.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use nearby_core::config::GeocodeConfig;
use serde::Deserialize;
use tracing::instrument;

use crate::http::HttpClient;
use crate::types::{Coordinates, LocationDescription};

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NominatimAddress {
    pub water: Option<String>,
    pub bay: Option<String>,
    pub tourism: Option<String>,
    pub leisure: Option<String>,
    pub natural: Option<String>,
    pub historic: Option<String>,
    pub amenity: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Build the widget description from a Nominatim address.
///
/// Area of interest is "<water> - <landmark>" (either half may be missing);
/// general area is "<locality>, <state>".
pub fn describe_address(addr: &NominatimAddress) -> LocationDescription {
    let water = non_empty(&addr.water).or_else(|| non_empty(&addr.bay));
    let landmark = non_empty(&addr.tourism)
        .or_else(|| non_empty(&addr.leisure))
        .or_else(|| non_empty(&addr.natural))
        .or_else(|| non_empty(&addr.historic))
        .or_else(|| non_empty(&addr.amenity));

    let area_of_interest = match (water, landmark) {
        (Some(w), Some(l)) => Some(format!("{} - {}", w, l)),
        (Some(w), None) => Some(w.to_string()),
        (None, Some(l)) => Some(l.to_string()),
        (None, None) => None,
    };

    let locality = non_empty(&addr.city)
        .or_else(|| non_empty(&addr.town))
        .or_else(|| non_empty(&addr.village))
        .or_else(|| non_empty(&addr.hamlet))
        .or_else(|| non_empty(&addr.municipality));
    // Out at sea there is no state; fall back to the country
    let region = non_empty(&addr.state).or_else(|| non_empty(&addr.country));

    let general_area = match (locality, region) {
        (Some(l), Some(r)) if l != r => Some(format!("{}, {}", l, r)),
        (Some(l), _) => Some(l.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    };

    LocationDescription {
        area_of_interest,
        general_area,
    }
}

pub struct GeocodeClient {
    http: HttpClient,
    base_url: String,
}

impl GeocodeClient {
    pub fn new(http: HttpClient, config: &GeocodeConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Describe where `coords` is. Returns `None` on failure; callers carry on without a title.
    #[instrument(skip(self), level = "info")]
    pub async fn reverse(&self, coords: Coordinates) -> Option<LocationDescription> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1&zoom=16",
            self.base_url, coords.latitude, coords.longitude
        );

        let body: NominatimResponse = match self.http.get_json(&url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if let Some(err) = body.error {
            tracing::debug!("Reverse geocode returned error: {}", err);
            return None;
        }

        let description = describe_address(&body.address?);
        if description.is_empty() {
            return None;
        }

        tracing::info!("Reverse geocoded to: {:?}", description);
        Some(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryConfig;
    use nearby_core::config::HttpConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_describe_water_and_landmark() {
        let addr = NominatimAddress {
            water: Some("Spot Pond".into()),
            leisure: Some("Middlesex Fells Reservation".into()),
            city: Some("Medford".into()),
            state: Some("Massachusetts".into()),
            ..Default::default()
        };
        let desc = describe_address(&addr);
        assert_eq!(
            desc.area_of_interest.as_deref(),
            Some("Spot Pond - Middlesex Fells Reservation")
        );
        assert_eq!(desc.general_area.as_deref(), Some("Medford, Massachusetts"));
    }

    #[test]
    fn test_describe_town_only() {
        let addr = NominatimAddress {
            town: Some("Truro".into()),
            ..Default::default()
        };
        let desc = describe_address(&addr);
        assert_eq!(desc.area_of_interest, None);
        assert_eq!(desc.general_area.as_deref(), Some("Truro"));
    }

    #[test]
    fn test_describe_ignores_blank_fields() {
        let addr = NominatimAddress {
            water: Some("  ".into()),
            country: Some("Iceland".into()),
            ..Default::default()
        };
        let desc = describe_address(&addr);
        assert_eq!(desc.area_of_interest, None);
        assert_eq!(desc.general_area.as_deref(), Some("Iceland"));
    }

    fn client(base_url: &str) -> GeocodeClient {
        let http = HttpClient::from_config(&HttpConfig::default())
            .unwrap()
            .with_retry_config(RetryConfig::none());
        GeocodeClient::new(
            http,
            &GeocodeConfig {
                base_url: base_url.to_string(),
                enabled: true,
            },
        )
    }

    #[tokio::test]
    async fn test_reverse_geocode() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "42.45"))
            .and(query_param("format", "jsonv2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "display_name": "Spot Pond, Medford, Massachusetts, United States",
                "address": {
                    "water": "Spot Pond",
                    "city": "Medford",
                    "state": "Massachusetts",
                    "country": "United States"
                }
            })))
            .mount(&mock_server)
            .await;

        let geocoder = client(&mock_server.uri());
        let desc = geocoder.reverse(Coordinates::new(42.45, -71.09)).await.unwrap();
        assert_eq!(desc.area_of_interest.as_deref(), Some("Spot Pond"));
        assert_eq!(desc.general_area.as_deref(), Some("Medford, Massachusetts"));
    }

    #[tokio::test]
    async fn test_reverse_geocode_error_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Unable to geocode"})),
            )
            .mount(&mock_server)
            .await;

        let geocoder = client(&mock_server.uri());
        assert!(geocoder.reverse(Coordinates::new(0.0, 0.0)).await.is_none());
    }

    #[tokio::test]
    async fn test_reverse_geocode_server_error_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let geocoder = client(&mock_server.uri());
        assert!(geocoder.reverse(Coordinates::new(1.0, 1.0)).await.is_none());
    }
}
