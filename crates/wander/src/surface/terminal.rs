use std::io::Write;
use std::sync::Mutex;

use wander_atlas::{Bounds, LngLat, Place, Viewport, ViewportStore};

use super::{Markers, Notice};

/// Pixel size assumed when framing bounds.
const VIEW_WIDTH: f64 = 1024.0;
const VIEW_HEIGHT: f64 = 768.0;
const FIT_PADDING: f64 = 50.0;

/// Console map: prints markers and camera moves to stdout.
///
/// Every camera move is written to the [`ViewportStore`] so the next session
/// starts where this one left off.
pub struct Surface {
    inner: Mutex<Inner>,
    store: Option<ViewportStore>,
}

struct Inner {
    markers: Markers,
    viewport: Viewport,
}

impl Surface {
    pub fn new(viewport: Viewport, store: Option<ViewportStore>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                markers: Markers::default(),
                viewport,
            }),
            store,
        }
    }

    /// Move the camera on the user's behalf.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner.lock().expect("poisoned").viewport = viewport;
        self.moved(viewport);
    }

    /// Print the markers currently shown.
    pub fn list_markers(&self) {
        let inner = self.inner.lock().expect("poisoned");
        if inner.markers.is_empty() {
            println!("[map] no markers");
        }
        for (i, place) in inner.markers.iter().enumerate() {
            println!("[marker {}] {} {}", i + 1, place.name, place.center);
        }
    }

    fn moved(&self, viewport: Viewport) {
        println!("[map] {} zoom {:.1}", viewport.center, viewport.zoom);
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&viewport) {
                tracing::warn!(%e, "failed to save viewport");
            }
        }
    }
}

impl super::MapSurface for Surface {
    fn clear_markers(&self) {
        let removed = self.inner.lock().expect("poisoned").markers.clear();
        if removed > 0 {
            println!("[map] cleared {removed} marker(s)");
        }
    }

    fn add_marker(&self, place: &Place) {
        let mut inner = self.inner.lock().expect("poisoned");
        inner.markers.push(place.clone());
        println!(
            "[marker {}] {} {}",
            inner.markers.len(),
            place.name,
            place.center
        );
    }

    fn fly_to(&self, center: LngLat) {
        let viewport = {
            let mut inner = self.inner.lock().expect("poisoned");
            inner.viewport.center = center;
            inner.viewport
        };
        self.moved(viewport);
    }

    fn fit_bounds(&self, bounds: &Bounds) {
        let (Some(center), Some(zoom)) = (
            bounds.center(),
            bounds.fit_zoom(VIEW_WIDTH, VIEW_HEIGHT, FIT_PADDING),
        ) else {
            return;
        };
        let viewport = Viewport { center, zoom };
        self.inner.lock().expect("poisoned").viewport = viewport;
        self.moved(viewport);
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            // Dim, like a spinner that disappears with the next line.
            print!("\x1b[2msearching...\x1b[0m\r");
        } else {
            print!("\x1b[2K\r");
        }
        let _ = std::io::stdout().flush();
    }

    fn notify(&self, notice: Notice) {
        println!("{}", notice.message());
    }

    fn viewport(&self) -> Viewport {
        self.inner.lock().expect("poisoned").viewport
    }
}
