//! Site boundary polygon and extents

use geo::{BoundingRect, Contains, EuclideanDistance};
use geo_types::{LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::crs::CRS;
use crate::error::{Error, Result};

/// Axis-aligned extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest extent containing every coordinate, `None` if empty
    pub fn from_coords(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        coords.into_iter().fold(None, |acc: Option<Extent>, (x, y)| {
            Some(match acc {
                None => Extent::new(x, y, x, y),
                Some(e) => Extent::new(e.min_x.min(x), e.min_y.min(y), e.max_x.max(x), e.max_y.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Grown by `distance` on every side
    pub fn expanded(&self, distance: f64) -> Self {
        Extent::new(
            self.min_x - distance,
            self.min_y - distance,
            self.max_x + distance,
            self.max_y + distance,
        )
    }
}

/// The analysis extent: one or more polygons, possibly with holes.
///
/// Used only for masking. Coordinates are in the same projected CRS as the
/// survey points.
#[derive(Debug, Clone)]
pub struct SiteBoundary {
    polygons: MultiPolygon<f64>,
    crs: Option<CRS>,
}

impl SiteBoundary {
    /// Boundary from polygons.
    ///
    /// Fails if there is no polygon with a closed exterior ring of at least
    /// three distinct vertices, or if any coordinate is not finite.
    pub fn new(polygons: MultiPolygon<f64>) -> Result<Self> {
        let mut usable = 0;
        for polygon in &polygons {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
            for ring in rings {
                if ring.coords().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
                    return Err(Error::InvalidInput("boundary has non-finite coordinates".into()));
                }
            }
            // geo closes rings on construction, so a triangle has 4 coords
            if polygon.exterior().0.len() >= 4 {
                usable += 1;
            }
        }
        if usable == 0 {
            return Err(Error::InvalidInput("boundary has no polygon with an exterior ring".into()));
        }
        Ok(Self { polygons, crs: None })
    }

    /// Boundary from a single exterior ring given as `(x, y)` vertices
    pub fn from_exterior(vertices: Vec<(f64, f64)>) -> Result<Self> {
        let ring = LineString::from(vertices);
        Self::new(MultiPolygon::new(vec![Polygon::new(ring, vec![])]))
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    /// Strict containment: points on an edge count as outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.contains(&Point::new(x, y))
    }

    /// Euclidean distance from a point to the boundary area (0 inside).
    pub fn distance(&self, x: f64, y: f64) -> f64 {
        let p = Point::new(x, y);
        self.polygons
            .iter()
            .map(|poly| p.euclidean_distance(poly))
            .fold(f64::INFINITY, f64::min)
    }

    /// Inside the boundary, or within `buffer` of it.
    pub fn within_buffer(&self, x: f64, y: f64, buffer: f64) -> bool {
        if self.contains(x, y) {
            return true;
        }
        buffer > 0.0 && self.distance(x, y) <= buffer
    }

    /// Bounding extent of all polygons
    pub fn extent(&self) -> Extent {
        match self.polygons.bounding_rect() {
            Some(rect) => Extent::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
            None => Extent::new(0.0, 0.0, 0.0, 0.0),
        }
    }
}
