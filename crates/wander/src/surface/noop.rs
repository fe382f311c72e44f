use std::sync::Mutex;

use wander_atlas::{Bounds, LngLat, Place, Viewport};

use super::Notice;

/// Headless surface: keeps the viewport, renders nothing.
#[derive(Default)]
pub struct Surface {
    viewport: Mutex<Viewport>,
}

impl super::MapSurface for Surface {
    fn clear_markers(&self) {}

    fn add_marker(&self, _place: &Place) {}

    fn fly_to(&self, center: LngLat) {
        self.viewport.lock().expect("poisoned").center = center;
    }

    fn fit_bounds(&self, bounds: &Bounds) {
        if let Some(center) = bounds.center() {
            self.viewport.lock().expect("poisoned").center = center;
        }
    }

    fn set_loading(&self, _visible: bool) {}

    fn notify(&self, _notice: Notice) {}

    fn viewport(&self) -> Viewport {
        *self.viewport.lock().expect("poisoned")
    }
}
