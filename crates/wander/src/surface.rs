#[cfg(test)]
pub mod noop;
pub mod terminal;

use wander_atlas::{Bounds, LngLat, Place, Viewport};

/// A user-facing notice shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoResults,
    Error,
    LocationDisabled,
}

impl Notice {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoResults => "No results found. Please try a different query.",
            Self::Error => "An error occurred while processing your request.",
            Self::LocationDisabled => "Location access is disabled.",
        }
    }
}

/// The map the search results are rendered onto.
///
/// Implementations own their markers and the current viewport and are shared
/// between tasks, so every method takes `&self`.
pub trait MapSurface: Send + Sync {
    fn clear_markers(&self);

    fn add_marker(&self, place: &Place);

    /// Center on `center`, keeping the current zoom.
    fn fly_to(&self, center: LngLat);

    /// Frame every point in `bounds`. Empty bounds are ignored.
    fn fit_bounds(&self, bounds: &Bounds);

    fn set_loading(&self, visible: bool);

    fn notify(&self, notice: Notice);

    fn viewport(&self) -> Viewport;
}

/// The markers currently placed on a surface, in placement order.
#[derive(Debug, Default)]
pub struct Markers {
    places: Vec<Place>,
}

impl Markers {
    pub fn push(&mut self, place: Place) {
        self.places.push(place);
    }

    /// Remove every marker, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.places.len();
        self.places.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.places.iter()
    }
}
