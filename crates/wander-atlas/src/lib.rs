pub mod geo;
pub mod viewport;

pub use geo::{Bounds, LngLat, Place, Viewport, MAX_ZOOM};
pub use viewport::ViewportStore;
