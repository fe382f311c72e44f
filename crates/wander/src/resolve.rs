use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;
use wander_atlas::{Bounds, LngLat, Place};

use crate::geocoding::{best_match, Geocoder};
use crate::interpret::{Interpretation, Interpreter};
use crate::surface::{MapSurface, Notice};
use crate::track::{self, Tracker};

/// Where a submitted query is in its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Routing,
    DirectGeocoding,
    FanOutGeocoding,
    Rendering,
    NoResults,
    Failed,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Routing => "routing",
            Self::DirectGeocoding => "direct-geocoding",
            Self::FanOutGeocoding => "fan-out-geocoding",
            Self::Rendering => "rendering",
            Self::NoResults => "no-results",
            Self::Failed => "failed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a submitted query ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Places now shown on the map, in candidate order.
    Rendered(Vec<Place>),
    NoResults,
    Failed(String),
    /// Blank query, nothing happened.
    Ignored,
}

/// Drives one query from text to markers on the map.
///
/// The interpreter decides what to geocode, the geocoder finds it, and the
/// surface and tracker receive the results.
pub struct Orchestrator {
    interpreter: Arc<dyn Interpreter>,
    geocoder: Arc<dyn Geocoder>,
    surface: Arc<dyn MapSurface>,
    tracker: Arc<dyn Tracker>,
}

/// Shows the loading indicator for as long as it is alive.
struct Loading<'a>(&'a dyn MapSurface);

impl<'a> Loading<'a> {
    fn show(surface: &'a dyn MapSurface) -> Self {
        surface.set_loading(true);
        Self(surface)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

fn enter(stage: Stage, query: &str) {
    tracing::debug!(%stage, %query, "stage");
}

impl Orchestrator {
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        geocoder: Arc<dyn Geocoder>,
        surface: Arc<dyn MapSurface>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Self {
            interpreter,
            geocoder,
            surface,
            tracker,
        }
    }

    /// Resolve `query` and render the result.
    ///
    /// Markers from the previous search are removed first. Concurrent calls
    /// are not coordinated; the last one to render wins.
    pub async fn submit(&self, query: &str) -> Outcome {
        let query = query.trim();
        if query.is_empty() {
            return Outcome::Ignored;
        }

        let outcome = {
            let _loading = Loading::show(self.surface.as_ref());
            self.surface.clear_markers();
            enter(Stage::Routing, query);
            self.resolve(query).await
        };
        enter(Stage::Done, query);
        outcome
    }

    async fn resolve(&self, query: &str) -> Outcome {
        match self.interpreter.interpret(query).await {
            Ok(Interpretation::Direct) => self.direct(query).await,
            Ok(Interpretation::Candidates(candidates)) => self.fan_out(query, &candidates).await,
            Err(e) => self.failed(query, e.to_string()),
        }
    }

    async fn direct(&self, query: &str) -> Outcome {
        enter(Stage::DirectGeocoding, query);
        match best_match(self.geocoder.as_ref(), query).await {
            Ok(Some(place)) => {
                enter(Stage::Rendering, query);
                self.surface.add_marker(&place);
                self.surface.fly_to(place.center);
                self.track_search(&place);
                Outcome::Rendered(vec![place])
            }
            Ok(None) => self.no_results(query),
            Err(e) => self.failed(query, e),
        }
    }

    async fn fan_out(&self, query: &str, candidates: &[String]) -> Outcome {
        if candidates.is_empty() {
            return self.no_results(query);
        }
        enter(Stage::FanOutGeocoding, query);

        let geocoder = self.geocoder.as_ref();
        let lookups = candidates
            .iter()
            .map(|candidate| async move { (candidate, best_match(geocoder, candidate).await) });
        let places: Vec<Place> = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(candidate, result)| match result {
                Ok(Some(place)) => Some(place),
                Ok(None) => {
                    tracing::debug!(%candidate, "no geocoding result for candidate");
                    None
                }
                Err(e) => {
                    tracing::warn!(%e, %candidate, "geocoding candidate failed");
                    None
                }
            })
            .collect();

        if places.is_empty() {
            return self.no_results(query);
        }

        enter(Stage::Rendering, query);
        let mut bounds = Bounds::new();
        for place in &places {
            self.surface.add_marker(place);
            bounds.extend(place.center);
            self.track_search(place);
        }
        self.surface.fit_bounds(&bounds);
        tracing::info!(%query, candidates = candidates.len(), rendered = places.len(), "rendered candidates");
        Outcome::Rendered(places)
    }

    fn no_results(&self, query: &str) -> Outcome {
        enter(Stage::NoResults, query);
        self.surface.notify(Notice::NoResults);
        Outcome::NoResults
    }

    fn failed(&self, query: &str, reason: String) -> Outcome {
        enter(Stage::Failed, query);
        tracing::warn!(%reason, %query, "query failed");
        self.surface.notify(Notice::Error);
        Outcome::Failed(reason)
    }

    fn track_search(&self, place: &Place) {
        self.tracker.track(
            track::SEARCH_QUERY,
            json!({
                "query": place.name,
                "latitude": place.center.lat,
                "longitude": place.center.lon,
            }),
        );
    }

    /// Remove every marker from the map.
    pub fn clear(&self) {
        self.surface.clear_markers();
    }

    /// Handle a geolocation fix: recenter on it and record its address.
    ///
    /// Returns the address when one was found.
    pub async fn locate(&self, fix: LngLat) -> Option<String> {
        self.surface.fly_to(fix);
        match self.geocoder.reverse_geocode(fix.lon, fix.lat).await {
            Ok(Some(address)) => {
                self.tracker.track(
                    track::USER_LOCATION,
                    json!({
                        "address": address,
                        "latitude": fix.lat,
                        "longitude": fix.lon,
                    }),
                );
                Some(address)
            }
            Ok(None) => {
                tracing::warn!(%fix, "no address at location");
                None
            }
            Err(e) => {
                tracing::warn!(%e, %fix, "reverse geocoding failed");
                None
            }
        }
    }

    /// Handle a denied geolocation permission.
    pub fn location_denied(&self) {
        self.tracker.track(track::GEOLOCATION_DENIED, json!({}));
        self.surface.notify(Notice::LocationDisabled);
    }
}
