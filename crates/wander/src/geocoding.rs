pub mod mapbox;

use std::future::Future;
use std::pin::Pin;

use wander_atlas::Place;

/// A geocoding provider that can resolve text to places and coordinates to names.
///
/// "Not found" is an empty result, never an error. Errors are reserved for
/// transport failures and unusable responses.
pub trait Geocoder: Send + Sync + 'static {
    /// Forward geocode: ranked matches for a query string, best first.
    fn geocode(
        &self,
        query: String,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Place>, String>> + Send + '_>>;

    /// Reverse geocode: the display name of the best match at a coordinate.
    fn reverse_geocode(
        &self,
        lon: f64,
        lat: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, String>> + Send + '_>>;
}

/// The single best match for `query`, or `None` when nothing was found.
pub async fn best_match<G: Geocoder + ?Sized>(
    geocoder: &G,
    query: &str,
) -> Result<Option<Place>, String> {
    let places = geocoder.geocode(query.to_owned()).await?;
    Ok(places.into_iter().next())
}
