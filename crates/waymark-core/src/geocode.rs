use crate::cache::GeocodeCache;
use crate::place::{is_valid_coordinate, ResolvedPlace};
use crate::WaymarkError;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Why a single name could not be placed on the map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionFailure {
    #[error("geocoder returned status {status}")]
    Status {
        status: String,
        message: Option<String>,
    },
    #[error("geocoder returned no results")]
    NoResults,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("coordinates out of range: ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },
}

impl ResolutionFailure {
    /// A failure the service would repeat for the same query.
    pub fn is_definitive(&self) -> bool {
        match self {
            ResolutionFailure::NoResults => true,
            ResolutionFailure::Status { status, .. } => status == "ZERO_RESULTS",
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl GeocodeResponse {
    /// Maps the service's answer for `name` to a place: `OK` with at least one
    /// result, first result wins.
    pub fn into_place(self, name: &str) -> Result<ResolvedPlace, ResolutionFailure> {
        if self.status != "OK" {
            return Err(ResolutionFailure::Status {
                status: self.status,
                message: self.error_message,
            });
        }
        let first = self
            .results
            .into_iter()
            .next()
            .ok_or(ResolutionFailure::NoResults)?;
        let LatLng { lat, lng } = first.geometry.location;
        if !is_valid_coordinate(lat, lng) {
            return Err(ResolutionFailure::InvalidCoordinates { lat, lng });
        }
        Ok(ResolvedPlace::new(name, lat, lng))
    }
}

/// One round trip to a geocoding service for a fully built address query.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeocodeResponse, ResolutionFailure>;
}

/// Google-compatible geocoding endpoint: `GET ?address=...&key=...`.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, WaymarkError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| WaymarkError::InvalidEndpoint(e.to_string()))?;
        if api_key.trim().is_empty() {
            return Err(WaymarkError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("waymark/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", query)
            .append_pair("key", &self.api_key);
        url
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodeResponse, ResolutionFailure> {
        // The key is part of the URL, so only the query is logged
        debug!("Geocoding — query={:?} endpoint={}", query, self.endpoint);
        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| ResolutionFailure::Transport(e.without_url().to_string()))?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(ResolutionFailure::Status {
                status: format!("HTTP {}", http_status.as_u16()),
                message: None,
            });
        }

        response
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| ResolutionFailure::Decode(e.without_url().to_string()))
    }
}

/// Resolves candidate names to places, best effort.
///
/// Failures are typed through [`LocationResolver::resolve_detailed`] and
/// collapse to "omit" in [`LocationResolver::resolve_all`].
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Mutex<GeocodeCache>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: GeocodeCache) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(cache),
        }
    }

    pub fn query_for(name: &str, context: Option<&str>) -> String {
        match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!("{}, {}", name, context),
            None => name.to_string(),
        }
    }

    pub async fn resolve_detailed(
        &self,
        name: &str,
        context: Option<&str>,
    ) -> Result<ResolvedPlace, ResolutionFailure> {
        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name, context)
        {
            debug!("Geocode cache hit — name={} context={:?}", name, context);
            return cached;
        }

        let query = Self::query_for(name, context);
        let result = match self.geocoder.geocode(&query).await {
            Ok(response) => response.into_place(name),
            Err(failure) => Err(failure),
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, context, &result);
        result
    }

    /// `None` when the name could not be placed; the reason is only logged.
    pub async fn resolve(&self, name: &str, context: Option<&str>) -> Option<ResolvedPlace> {
        match self.resolve_detailed(name, context).await {
            Ok(place) => Some(place),
            Err(failure) => {
                debug!(
                    "Could not resolve place — name={} context={:?} reason={}",
                    name, context, failure
                );
                None
            }
        }
    }

    /// Resolves every distinct name concurrently and keeps the successes.
    /// Output order is unspecified; match results by name.
    pub async fn resolve_all(&self, names: &[String], context: Option<&str>) -> Vec<ResolvedPlace> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect();

        let results = join_all(unique.iter().map(|name| self.resolve(name, context))).await;
        let places: Vec<ResolvedPlace> = results.into_iter().flatten().collect();

        if places.is_empty() && !unique.is_empty() {
            warn!(
                "No candidates resolved — requested={} context={:?}",
                unique.len(),
                context
            );
        } else {
            info!(
                "Resolved batch — requested={} resolved={}",
                unique.len(),
                places.len()
            );
        }
        places
    }

    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
