use nearby_core::WidgetSize;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two points.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Geographic location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl From<Coordinates> for Location {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
            accuracy_meters: None,
        }
    }
}

/// Article thumbnail as returned by the `pageimages` prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

/// One point of interest on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub title: String,
    pub url: String,
    pub lat: f64,
    pub lng: f64,
    pub thumbnail: Option<Thumbnail>,
}

impl Marker {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Map label for the marker at `index`: 'A', 'B', ... continuing by code point.
pub fn marker_label(index: usize) -> char {
    u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(u32::from('A')))
        .and_then(char::from_u32)
        .unwrap_or('?')
}

/// Static map dimensions for a widget size.
pub fn map_size(size: WidgetSize) -> &'static str {
    match size {
        WidgetSize::Medium => "800x500",
        WidgetSize::Small | WidgetSize::Large | WidgetSize::ExtraLarge => "800x800",
    }
}

/// Human description of where the user is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDescription {
    /// e.g. "Spot Pond - Middlesex Fells Reservation"
    pub area_of_interest: Option<String>,
    /// e.g. "Medford, Massachusetts"
    pub general_area: Option<String>,
}

/// Title lines shown on the widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetTitle {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl LocationDescription {
    pub fn is_empty(&self) -> bool {
        self.area_of_interest.is_none() && self.general_area.is_none()
    }

    /// Area of interest first with the general area underneath, else the general area alone.
    pub fn title(&self) -> WidgetTitle {
        match (&self.area_of_interest, &self.general_area) {
            (Some(area), general) => WidgetTitle {
                primary: Some(area.clone()),
                secondary: general.clone(),
            },
            (None, Some(general)) => WidgetTitle {
                primary: Some(general.clone()),
                secondary: None,
            },
            (None, None) => WidgetTitle::default(),
        }
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}
