//! Flickr photoset variant: pull every photo in a set and pick one,
//! preferring the photos taken closest to the current location.

use nearby_core::config::FlickrConfig;
use nearby_core::FlickrParams;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PlacesError;
use crate::http::HttpClient;
use crate::types::{haversine_meters, Coordinates};

const PER_PAGE: u32 = 500;
/// Hard stop on pagination, 25k photos.
const MAX_PAGES: u32 = 50;

/// Flickr encodes some numbers as strings depending on the method.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(f64),
    Text(String),
}

impl Lenient {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Lenient::Number(n) => Some(*n),
            Lenient::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhotosetResponse {
    stat: String,
    message: Option<String>,
    photoset: Option<ApiPhotoset>,
}

#[derive(Debug, Deserialize)]
struct ApiPhotoset {
    #[serde(default)]
    photo: Vec<ApiPhoto>,
    pages: Option<Lenient>,
}

#[derive(Debug, Deserialize)]
struct ApiPhoto {
    id: String,
    secret: String,
    server: String,
    #[serde(default)]
    title: String,
    latitude: Option<Lenient>,
    longitude: Option<Lenient>,
    url_l: Option<String>,
    datetaken: Option<String>,
}

/// A photo from the set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub title: String,
    pub image_url: String,
    /// `None` when the photo is not geotagged
    pub coordinates: Option<Coordinates>,
    pub taken: Option<String>,
}

impl From<ApiPhoto> for Photo {
    fn from(p: ApiPhoto) -> Self {
        let lat = p.latitude.as_ref().and_then(Lenient::as_f64);
        let lng = p.longitude.as_ref().and_then(Lenient::as_f64);
        // Flickr reports 0,0 for photos without geo data
        let coordinates = match (lat, lng) {
            (Some(lat), Some(lng)) if !(lat == 0.0 && lng == 0.0) => {
                Some(Coordinates::new(lat, lng))
            }
            _ => None,
        };

        let image_url = p.url_l.filter(|u| !u.is_empty()).unwrap_or_else(|| {
            format!(
                "https://live.staticflickr.com/{}/{}_{}_b.jpg",
                p.server, p.id, p.secret
            )
        });

        Self {
            id: p.id,
            title: p.title,
            image_url,
            coordinates,
            taken: p.datetaken,
        }
    }
}

/// `flickr.photosets.getPhotos` request URL.
pub fn photoset_url(base_url: &str, params: &FlickrParams, page: u32) -> String {
    let mut url = format!(
        "{}?method=flickr.photosets.getPhotos&api_key={}&photoset_id={}&extras={}&per_page={}&page={}&format=json&nojsoncallback=1",
        base_url,
        urlencoding::encode(&params.api_key),
        urlencoding::encode(&params.photoset_id),
        urlencoding::encode("geo,url_l,date_taken"),
        PER_PAGE,
        page,
    );
    if let Some(user) = &params.user_id {
        url.push_str("&user_id=");
        url.push_str(&urlencoding::encode(user));
    }
    url
}

/// Choose one photo.
///
/// With an origin and at least one geotagged photo, candidates are the
/// geotagged photos no more than `slack_meters` farther than the nearest one.
/// Otherwise every photo is a candidate.
pub fn pick_photo<'a, R: Rng + ?Sized>(
    photos: &'a [Photo],
    origin: Option<Coordinates>,
    slack_meters: f64,
    rng: &mut R,
) -> Option<&'a Photo> {
    let with_distance: Vec<(&Photo, f64)> = match origin {
        Some(origin) => photos
            .iter()
            .filter_map(|p| p.coordinates.map(|c| (p, haversine_meters(origin, c))))
            .collect(),
        None => Vec::new(),
    };

    if with_distance.is_empty() {
        return photos.choose(rng);
    }

    let nearest = with_distance
        .iter()
        .map(|(_, d)| *d)
        .fold(f64::INFINITY, f64::min);
    let candidates: Vec<&Photo> = with_distance
        .into_iter()
        .filter(|(_, d)| *d <= nearest + slack_meters)
        .map(|(p, _)| p)
        .collect();

    tracing::debug!(
        "{} photo(s) within {}m of the nearest ({}m away)",
        candidates.len(),
        slack_meters,
        nearest.round()
    );
    candidates.choose(rng).copied()
}

pub struct FlickrClient {
    http: HttpClient,
    base_url: String,
}

impl FlickrClient {
    pub fn new(http: HttpClient, config: &FlickrConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
        }
    }

    /// Every photo in the set, following pagination.
    #[instrument(skip(self, params), fields(photoset = %params.photoset_id), level = "info")]
    pub async fn photoset_photos(&self, params: &FlickrParams) -> Result<Vec<Photo>, PlacesError> {
        if params.api_key.trim().is_empty() {
            return Err(PlacesError::MissingApiKey("Flickr"));
        }

        let mut photos = Vec::new();
        let mut page = 1;
        loop {
            let url = photoset_url(&self.base_url, params, page);
            let response: PhotosetResponse = self.http.get_json(&url).await?;

            if response.stat != "ok" {
                return Err(PlacesError::Api(
                    response
                        .message
                        .unwrap_or_else(|| format!("stat={}", response.stat)),
                ));
            }
            let set = response
                .photoset
                .ok_or_else(|| PlacesError::Parse("Response has no photoset".to_string()))?;

            let pages = set
                .pages
                .as_ref()
                .and_then(Lenient::as_f64)
                .map(|p| p as u32)
                .unwrap_or(1);
            photos.extend(set.photo.into_iter().map(Photo::from));

            if page >= pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        tracing::info!("Loaded {} photos from the set", photos.len());
        Ok(photos)
    }
}
