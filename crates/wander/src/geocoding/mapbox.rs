use std::fmt::Write as _;
use std::time::Duration;

use isahc::prelude::*;
use isahc::{HttpClient, Request};
use wander_atlas::{LngLat, Place};

use super::Geocoder;

const BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Mapbox Geocoding API v5 backend.
#[derive(Clone)]
pub struct Backend {
    client: HttpClient,
    access_token: String,
    base_url: String,
}

impl Backend {
    pub fn new(access_token: String) -> Result<Self, String> {
        let client = HttpClient::new().map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            access_token,
            base_url: BASE_URL.to_owned(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.trim_end_matches('/').clone_into(&mut self.base_url);
        self
    }

    /// `segment` must already be safe to place in a URL path.
    async fn fetch(&self, segment: &str) -> Result<Vec<Place>, String> {
        let url = format!(
            "{}/{segment}.json?access_token={}",
            self.base_url,
            percent_encode(&self.access_token),
        );

        let request = Request::get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("User-Agent", "Wander/0.1")
            .body(())
            .map_err(|e| e.to_string())?;

        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("mapbox returned status {}", response.status()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        parse_features(&body)
    }
}

impl Geocoder for Backend {
    fn geocode(
        &self,
        query: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Place>, String>> + Send + '_>>
    {
        Box::pin(async move {
            let places = self.fetch(&percent_encode(&query)).await?;
            tracing::debug!(%query, results = places.len(), "mapbox forward geocode");
            Ok(places)
        })
    }

    fn reverse_geocode(
        &self,
        lon: f64,
        lat: f64,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Option<String>, String>> + Send + '_>,
    > {
        Box::pin(async move {
            let places = self.fetch(&format!("{lon},{lat}")).await?;
            Ok(places.into_iter().next().map(|p| p.name))
        })
    }
}

#[derive(serde::Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(serde::Deserialize)]
struct Feature {
    center: Option<LngLat>,
    place_name: Option<String>,
}

/// Extract places from a geocoding response body.
///
/// Only `center` and `place_name` are consumed. A missing or empty
/// `features` array is a valid "not found".
fn parse_features(body: &str) -> Result<Vec<Place>, String> {
    let collection: FeatureCollection = serde_json::from_str(body)
        .map_err(|e| format!("failed to parse geocoding response: {e}"))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(|f| {
            let center = f.center?;
            Some(Place {
                center,
                name: f.place_name.unwrap_or_default(),
            })
        })
        .collect())
}

/// Percent-encode a string for use as a single URL path segment or query value.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
