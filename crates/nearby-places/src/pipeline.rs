//! One run: locate, look up nearby articles and the area name, build the map.
//!
//! Only a missing location aborts the run. Every other failing step is
//! written to the file logger and replaced with an empty value.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use nearby_core::{Config, FileLogger, PerformanceDebugger, WidgetParams};
use rand::Rng;
use serde::Serialize;

use crate::error::PlacesError;
use crate::flickr::{pick_photo, FlickrClient, Photo};
use crate::geocode::GeocodeClient;
use crate::http::HttpClient;
use crate::location::{acquire, LocationProvider};
use crate::maps::{coordinates_url, directions_url, marker_icon_url, MapImage, MapsClient};
use crate::types::{map_size, marker_label, Location, LocationDescription, Marker, WidgetTitle};
use crate::wikipedia::WikipediaClient;

/// Remote services used by a run.
pub struct Services {
    pub wikipedia: WikipediaClient,
    pub maps: MapsClient,
    pub geocode: Option<GeocodeClient>,
    pub flickr: FlickrClient,
}

impl Services {
    /// Build every client from the config, sharing one HTTP client.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, PlacesError> {
        let http = HttpClient::from_config(&config.http)?;
        Ok(Self::with_http(http, config))
    }

    pub fn with_http(http: HttpClient, config: &Config) -> Self {
        Self {
            wikipedia: WikipediaClient::new(http.clone(), &config.wikipedia),
            maps: MapsClient::new(http.clone(), &config.maps),
            geocode: config
                .geocode
                .enabled
                .then(|| GeocodeClient::new(http.clone(), &config.geocode)),
            flickr: FlickrClient::new(http, &config.flickr),
        }
    }
}

/// Per-run side channels: step timings and the exception log.
pub struct RunContext<'a> {
    pub perf: &'a PerformanceDebugger,
    pub logger: &'a FileLogger,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub location: Location,
    pub description: Option<LocationDescription>,
    pub title: WidgetTitle,
    pub markers: Vec<Marker>,
    pub map_url: Option<String>,
    #[serde(skip)]
    pub map: Option<MapImage>,
    pub fetched_at: DateTime<Utc>,
    pub refresh_after: DateTime<Utc>,
}

/// One line of the detail list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub label: char,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub article_url: String,
    pub maps_url: String,
    pub directions_url: String,
    pub marker_icon_url: String,
}

impl Snapshot {
    /// Detail rows in marker order, labelled like the map.
    pub fn rows(&self) -> Vec<ListRow> {
        let here = self.location.coordinates();
        self.markers
            .iter()
            .enumerate()
            .map(|(i, marker)| {
                let label = marker_label(i);
                ListRow {
                    label,
                    title: marker.title.clone(),
                    thumbnail_url: marker.thumbnail.as_ref().map(|t| t.source.clone()),
                    article_url: marker.url.clone(),
                    maps_url: coordinates_url(marker.coordinates()),
                    directions_url: directions_url(here, marker.coordinates()),
                    marker_icon_url: marker_icon_url(label),
                }
            })
            .collect()
    }
}

/// Run the Wikipedia + Maps pipeline.
///
/// # Errors
/// Only when no location can be acquired.
pub async fn build_snapshot(
    services: &Services,
    ctx: &RunContext<'_>,
    params: &WidgetParams,
    provider: &dyn LocationProvider,
    refresh_hours: u32,
    fetch_map: bool,
) -> Result<Snapshot, PlacesError> {
    let location = ctx
        .perf
        .wrap("current_location", acquire(provider))
        .await
        .map_err(|e| {
            ctx.logger.error(format!("Could not get current location: {}", e));
            PlacesError::from(e)
        })?;
    let coords = location.coordinates();

    let articles = ctx
        .perf
        .wrap("nearby_articles", services.wikipedia.nearby_articles(coords));
    let description = async {
        match &services.geocode {
            Some(geocoder) => ctx.perf.wrap("reverse_geocode", geocoder.reverse(coords)).await,
            None => None,
        }
    };
    let (articles, description) = tokio::join!(articles, description);

    let markers = articles.unwrap_or_else(|e| {
        ctx.logger.error(format!("Nearby articles unavailable: {}", e));
        Vec::new()
    });
    if description.is_none() && services.geocode.is_some() {
        ctx.logger.log("No description for the current location");
    }

    let map_url = match services
        .maps
        .url_for(params.api_key(), coords, &markers, map_size(params.widget_size))
    {
        Ok(url) => Some(url),
        Err(e) => {
            ctx.logger.warn(format!("Skipping static map: {}", e));
            None
        }
    };

    let map = match (&map_url, fetch_map) {
        (Some(url), true) => match ctx.perf.wrap("static_map", services.maps.fetch_image(url)).await {
            Ok(image) => Some(image),
            Err(e) => {
                ctx.logger.error(format!("Static map unavailable: {}", e));
                None
            }
        },
        _ => None,
    };

    let title = description
        .as_ref()
        .map(LocationDescription::title)
        .unwrap_or_default();
    let fetched_at = Utc::now();

    Ok(Snapshot {
        location,
        description,
        title,
        markers,
        map_url,
        map,
        fetched_at,
        refresh_after: refresh_after(fetched_at, refresh_hours),
    })
}

/// `fetched_at` plus `refresh_hours`, saturating at the latest representable time.
pub fn refresh_after(fetched_at: DateTime<Utc>, refresh_hours: u32) -> DateTime<Utc> {
    ChronoDuration::try_hours(i64::from(refresh_hours))
        .and_then(|delta| fetched_at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Run the Flickr variant: load the configured photoset and pick one photo.
///
/// The location is optional here; without it the pick is uniform.
///
/// # Errors
/// Missing Flickr parameters or a failed photoset request.
pub async fn flickr_pick<R: Rng + ?Sized>(
    services: &Services,
    ctx: &RunContext<'_>,
    params: &WidgetParams,
    provider: &dyn LocationProvider,
    slack_meters: f64,
    rng: &mut R,
) -> Result<Option<Photo>, PlacesError> {
    let flickr = params
        .flickr
        .as_ref()
        .ok_or(PlacesError::MissingApiKey("Flickr"))?;

    let origin = match ctx.perf.wrap("current_location", acquire(provider)).await {
        Ok(location) => Some(location.coordinates()),
        Err(e) => {
            ctx.logger.log(format!("Picking without a location: {}", e));
            None
        }
    };

    let photos = ctx
        .perf
        .wrap("photoset_photos", services.flickr.photoset_photos(flickr))
        .await
        .map_err(|e| {
            ctx.logger.error(format!("Could not load photoset: {}", e));
            e
        })?;

    Ok(pick_photo(&photos, origin, slack_meters, rng).cloned())
}
