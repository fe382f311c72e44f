use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Deepest zoom level a viewport fit may pick.
pub const MAX_ZOOM: f64 = 22.0;

/// Web-mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_129;

/// Pixel size of the world at zoom 0.
const WORLD_SIZE: f64 = 512.0;

/// A WGS84 coordinate.
///
/// Serialized as a `[lon, lat]` pair, the order geocoding providers use for
/// feature centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lon, p.lat]
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lon, self.lat)
    }
}

/// A geocoded place: where it is and what the provider calls it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub center: LngLat,
    pub name: String,
}

/// The visible part of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LngLat,
    pub zoom: f64,
}

impl Default for Viewport {
    /// San Francisco, city scale.
    fn default() -> Self {
        Self {
            center: LngLat::new(-122.4194, 37.7749),
            zoom: 12.0,
        }
    }
}

/// Axis-aligned bounding box over a set of coordinates. Starts empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    corners: Option<(LngLat, LngLat)>,
}

impl Bounds {
    #[must_use]
    pub const fn new() -> Self {
        Self { corners: None }
    }

    /// Grow the box to include `point`.
    pub fn extend(&mut self, point: LngLat) {
        self.corners = Some(match self.corners {
            None => (point, point),
            Some((sw, ne)) => (
                LngLat::new(sw.lon.min(point.lon), sw.lat.min(point.lat)),
                LngLat::new(ne.lon.max(point.lon), ne.lat.max(point.lat)),
            ),
        });
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.corners.is_none()
    }

    #[must_use]
    pub fn south_west(&self) -> Option<LngLat> {
        self.corners.map(|(sw, _)| sw)
    }

    #[must_use]
    pub fn north_east(&self) -> Option<LngLat> {
        self.corners.map(|(_, ne)| ne)
    }

    /// Midpoint of the box in mercator space.
    #[must_use]
    pub fn center(&self) -> Option<LngLat> {
        let (sw, ne) = self.corners?;
        let y = (mercator_y(sw.lat) + mercator_y(ne.lat)) / 2.0;
        Some(LngLat::new((sw.lon + ne.lon) / 2.0, latitude_of(y)))
    }

    /// Zoom level at which the box fits a `width` × `height` pixel viewport
    /// with `padding` pixels on every side.
    ///
    /// Returns `None` for an empty box. A degenerate box (one point) fits at
    /// [`MAX_ZOOM`].
    #[must_use]
    pub fn fit_zoom(&self, width: f64, height: f64, padding: f64) -> Option<f64> {
        let (sw, ne) = self.corners?;
        let usable_w = width - 2.0 * padding;
        let usable_h = height - 2.0 * padding;
        if usable_w <= 0.0 || usable_h <= 0.0 {
            return Some(0.0);
        }

        let span_x = (ne.lon - sw.lon) / 360.0;
        let span_y = mercator_y(sw.lat) - mercator_y(ne.lat);

        let zoom_x = if span_x > 0.0 {
            (usable_w / (span_x * WORLD_SIZE)).log2()
        } else {
            MAX_ZOOM
        };
        let zoom_y = if span_y > 0.0 {
            (usable_h / (span_y * WORLD_SIZE)).log2()
        } else {
            MAX_ZOOM
        };

        Some(zoom_x.min(zoom_y).clamp(0.0, MAX_ZOOM))
    }
}

impl FromIterator<LngLat> for Bounds {
    fn from_iter<I: IntoIterator<Item = LngLat>>(iter: I) -> Self {
        let mut bounds = Self::new();
        for point in iter {
            bounds.extend(point);
        }
        bounds
    }
}

/// Normalized mercator y in `[0, 1]`, 0 at the north edge.
fn mercator_y(lat: f64) -> f64 {
    let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (1.0 - (PI / 4.0 + phi / 2.0).tan().ln() / PI) / 2.0
}

fn latitude_of(y: f64) -> f64 {
    let n = PI * (1.0 - 2.0 * y);
    n.sinh().atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn lnglat_serializes_as_pair() {
        let p = LngLat::new(2.2945, 48.8584);
        assert_eq!(serde_json::to_string(&p).unwrap(), "[2.2945,48.8584]");
        let back: LngLat = serde_json::from_str("[2.2945,48.8584]").unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn empty_bounds() {
        let b = Bounds::new();
        assert!(b.is_empty());
        assert_eq!(b.center(), None);
        assert_eq!(b.fit_zoom(800.0, 600.0, 50.0), None);
    }

    #[test]
    fn extend_tracks_corners() {
        let b: Bounds = [
            LngLat::new(-122.48, 37.77),
            LngLat::new(-122.50, 37.79),
            LngLat::new(-122.46, 37.76),
        ]
        .into_iter()
        .collect();
        assert_eq!(b.south_west(), Some(LngLat::new(-122.50, 37.76)));
        assert_eq!(b.north_east(), Some(LngLat::new(-122.46, 37.79)));
    }

    #[test]
    fn center_of_symmetric_box_is_origin() {
        let b: Bounds = [LngLat::new(-10.0, -10.0), LngLat::new(10.0, 10.0)]
            .into_iter()
            .collect();
        let c = b.center().unwrap();
        assert!(c.lon.abs() < EPS);
        assert!(c.lat.abs() < EPS);
    }

    #[test]
    fn single_point_fits_at_max_zoom() {
        let b: Bounds = std::iter::once(LngLat::new(2.29, 48.85)).collect();
        assert_eq!(b.fit_zoom(800.0, 600.0, 50.0), Some(MAX_ZOOM));
        let c = b.center().unwrap();
        assert!((c.lon - 2.29).abs() < EPS);
        assert!((c.lat - 48.85).abs() < EPS);
    }

    #[test]
    fn whole_world_fits_near_zoom_zero() {
        let b: Bounds = [LngLat::new(-180.0, -85.0), LngLat::new(180.0, 85.0)]
            .into_iter()
            .collect();
        assert!(b.fit_zoom(512.0, 512.0, 0.0).unwrap() < 0.1);
    }

    #[test]
    fn wider_box_fits_at_lower_zoom() {
        let near: Bounds = [LngLat::new(-122.48, 37.76), LngLat::new(-122.46, 37.77)]
            .into_iter()
            .collect();
        let far: Bounds = [LngLat::new(-123.0, 37.0), LngLat::new(-121.0, 38.5)]
            .into_iter()
            .collect();
        let zn = near.fit_zoom(1024.0, 768.0, 50.0).unwrap();
        let zf = far.fit_zoom(1024.0, 768.0, 50.0).unwrap();
        assert!(zf < zn);
    }

    #[test]
    fn padding_larger_than_viewport_yields_zero() {
        let b: Bounds = [LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)]
            .into_iter()
            .collect();
        assert_eq!(b.fit_zoom(80.0, 80.0, 50.0), Some(0.0));
    }

    #[test]
    fn default_viewport_is_san_francisco() {
        let v = Viewport::default();
        assert_eq!(v.center, LngLat::new(-122.4194, 37.7749));
        assert!((v.zoom - 12.0).abs() < EPS);
    }
}
