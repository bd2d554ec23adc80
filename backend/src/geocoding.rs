use std::{num::NonZeroUsize, sync::Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use lru::LruCache;
use serde_json::Value;

use crate::http::retry_once;
use crate::models::Coordinate;

pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const UNKNOWN_CITY: &str = "Unknown";

/// Address fields tried in order when naming a place.
pub const PLACE_NAME_PRIORITY: [&str; 3] = ["village", "town", "city_district"];

/// Quantisation applied to coordinates used as cache keys (1e-5 degree, about 1 m).
const CACHE_SCALE: f64 = 1e5;

/// Best-effort coordinate -> city name oracle. Never fails: any internal
/// problem collapses to [`UNKNOWN_CITY`].
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn city_for(&self, point: Coordinate) -> String;
}

/// Resolves every point, at most `concurrency` lookups in flight, results in input order.
pub async fn resolve_cities(
    geocoder: &dyn ReverseGeocoder,
    points: &[Coordinate],
    concurrency: usize,
) -> Vec<String> {
    stream::iter(points.iter().copied())
        .map(|point| geocoder.city_for(point))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Picks the first present place name from a Nominatim `address` object.
pub fn place_name(address: &Value) -> Option<String> {
    PLACE_NAME_PRIORITY
        .iter()
        .filter_map(|field| address.get(field).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
enum GeocodeError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("response has no usable place name")]
    NoPlaceName,
}

/// Nominatim reverse geocoder with an LRU cache of successful lookups.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    url: String,
    cache: Mutex<LruCache<(i64, i64), String>>,
}

impl NominatimGeocoder {
    pub fn new(http: reqwest::Client, url: impl Into<String>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            url: url.into(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cache_key(point: Coordinate) -> (i64, i64) {
        (
            (point.lat * CACHE_SCALE).round() as i64,
            (point.lon * CACHE_SCALE).round() as i64,
        )
    }

    fn cached(&self, key: &(i64, i64)) -> Option<String> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: (i64, i64), city: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, city.to_string());
        }
    }

    async fn fetch(&self, point: Coordinate) -> Result<Value, reqwest::Error> {
        self.http
            .get(&self.url)
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn lookup(&self, point: Coordinate) -> Result<String, GeocodeError> {
        let payload = retry_once("reverse geocode", || self.fetch(point)).await?;
        payload
            .get("address")
            .and_then(place_name)
            .ok_or(GeocodeError::NoPlaceName)
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn city_for(&self, point: Coordinate) -> String {
        let key = Self::cache_key(point);
        if let Some(city) = self.cached(&key) {
            return city;
        }

        match self.lookup(point).await {
            Ok(city) => {
                self.remember(key, &city);
                city
            }
            Err(err) => {
                tracing::warn!("reverse geocoding failed for {point:?}: {err}");
                UNKNOWN_CITY.to_string()
            }
        }
    }
}
