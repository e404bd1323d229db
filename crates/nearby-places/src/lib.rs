//! Nearby places for Nearby
//!
//! Wikipedia geosearch, Google static maps, Nominatim reverse geocoding and
//! the Flickr photoset picker, plus the pipeline that ties them together.

pub mod error;
pub mod flickr;
pub mod geocode;
pub mod http;
pub mod location;
pub mod maps;
pub mod pipeline;
pub mod types;
pub mod wikipedia;

pub use error::PlacesError;
pub use flickr::{pick_photo, FlickrClient, Photo};
pub use geocode::GeocodeClient;
pub use http::{HttpClient, RetryConfig};
pub use location::{acquire, provider_for, LocationProvider, NoLocation, StaticLocation};
pub use maps::{MapImage, MapsClient};
pub use pipeline::{build_snapshot, flickr_pick, ListRow, RunContext, Services, Snapshot};
pub use types::*;
pub use wikipedia::WikipediaClient;
