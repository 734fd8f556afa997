//! Linear interpolation on a Delaunay triangulation
//!
//! Samples are triangulated with the incremental Bowyer-Watson algorithm
//! and values are interpolated within each triangle by barycentric
//! weights. Outside the convex hull the value of the closest point on the
//! hull boundary is used, which keeps the surface continuous everywhere.

use std::collections::HashMap;

use siteassay_core::{Error, Result};

use super::SamplePoint;

/// Barycentric weights down to this value still count as inside
const INSIDE_TOLERANCE: f64 = -1e-10;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v0: usize,
    v1: usize,
    v2: usize,
}

impl Triangle {
    fn edges(&self) -> [(usize, usize); 3] {
        [(self.v0, self.v1), (self.v1, self.v2), (self.v2, self.v0)]
    }
}

struct Circumcircle {
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

fn circumcircle(p0: &SamplePoint, p1: &SamplePoint, p2: &SamplePoint) -> Option<Circumcircle> {
    let (ax, ay) = (p0.x, p0.y);
    let (bx, by) = (p1.x, p1.y);
    let (cx, cy) = (p2.x, p2.y);

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-12 {
        return None;
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;

    let (dx, dy) = (ax - ux, ay - uy);
    Some(Circumcircle { cx: ux, cy: uy, radius_sq: dx * dx + dy * dy })
}

/// Barycentric coordinates (u, v, w) of (px, py) relative to p0, p1, p2
fn barycentric(px: f64, py: f64, p0: &SamplePoint, p1: &SamplePoint, p2: &SamplePoint) -> (f64, f64, f64) {
    let (v0x, v0y) = (p1.x - p0.x, p1.y - p0.y);
    let (v1x, v1y) = (p2.x - p0.x, p2.y - p0.y);
    let (v2x, v2y) = (px - p0.x, py - p0.y);

    let dot00 = v0x * v0x + v0y * v0y;
    let dot01 = v0x * v1x + v0y * v1y;
    let dot02 = v0x * v2x + v0y * v2y;
    let dot11 = v1x * v1x + v1y * v1y;
    let dot12 = v1x * v2x + v1y * v2y;

    let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
    let v = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let w = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    (1.0 - v - w, v, w)
}

/// Bowyer-Watson triangulation of `points`, returned as vertex indices
fn delaunay(points: &[SamplePoint]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let (dx, dy) = (max_x - min_x, max_y - min_y);
    let delta = dx.max(dy).max(1.0);

    // super-triangle occupies indices 0, 1, 2
    let mut vertices = vec![
        SamplePoint::new(min_x - 10.0 * delta, min_y - delta, 0.0),
        SamplePoint::new(min_x + 0.5 * dx, max_y + 10.0 * delta, 0.0),
        SamplePoint::new(max_x + 10.0 * delta, min_y - delta, 0.0),
    ];
    let mut triangles = vec![Triangle { v0: 0, v1: 1, v2: 2 }];

    for point in points {
        let vi = vertices.len();
        vertices.push(*point);

        let mut bad: Vec<usize> = triangles
            .iter()
            .enumerate()
            .filter(|(_, tri)| {
                circumcircle(&vertices[tri.v0], &vertices[tri.v1], &vertices[tri.v2])
                    .is_some_and(|cc| point.dist_sq(cc.cx, cc.cy) <= cc.radius_sq)
            })
            .map(|(ti, _)| ti)
            .collect();

        // edges of the cavity are those not shared by two bad triangles
        let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
        for &bi in &bad {
            for (a, b) in triangles[bi].edges() {
                *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        let cavity: Vec<(usize, usize)> = bad
            .iter()
            .flat_map(|&bi| triangles[bi].edges())
            .filter(|&(a, b)| edge_count[&(a.min(b), a.max(b))] == 1)
            .collect();

        bad.sort_unstable_by(|a, b| b.cmp(a));
        for bi in bad {
            triangles.swap_remove(bi);
        }
        triangles.extend(cavity.into_iter().map(|(a, b)| Triangle { v0: a, v1: b, v2: vi }));
    }

    triangles.retain(|tri| tri.v0 >= 3 && tri.v1 >= 3 && tri.v2 >= 3);
    for tri in &mut triangles {
        tri.v0 -= 3;
        tri.v1 -= 3;
        tri.v2 -= 3;
    }
    triangles
}

/// Triangulated samples ready for linear interpolation
#[derive(Debug, Clone)]
pub(crate) struct Triangulation {
    /// Samples shifted so the lower-left corner of their extent is the origin
    vertices: Vec<SamplePoint>,
    origin: (f64, f64),
    triangles: Vec<Triangle>,
    /// Edges belonging to a single triangle
    hull: Vec<(usize, usize)>,
}

impl Triangulation {
    /// Triangulate the samples.
    ///
    /// # Errors
    /// [`Error::DegenerateGeometry`] when no triangle can be formed.
    pub(crate) fn build(samples: &[SamplePoint]) -> Result<Self> {
        let origin = samples
            .iter()
            .fold((f64::INFINITY, f64::INFINITY), |(mx, my), p| (mx.min(p.x), my.min(p.y)));
        // local coordinates keep the circumcircle arithmetic well scaled
        let vertices: Vec<SamplePoint> = samples
            .iter()
            .map(|p| SamplePoint::new(p.x - origin.0, p.y - origin.1, p.value))
            .collect();

        let mut triangles = delaunay(&vertices);
        triangles.retain(|tri| {
            let (p0, p1, p2) = (&vertices[tri.v0], &vertices[tri.v1], &vertices[tri.v2]);
            ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)) != 0.0
        });
        if triangles.is_empty() {
            return Err(Error::DegenerateGeometry("samples cannot be triangulated".into()));
        }

        let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
        for tri in &triangles {
            for (a, b) in tri.edges() {
                *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        let mut hull: Vec<(usize, usize)> = edge_count
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .map(|(edge, _)| edge)
            .collect();
        hull.sort_unstable();

        tracing::debug!(triangles = triangles.len(), hull_edges = hull.len(), "samples triangulated");
        Ok(Self { vertices, origin, triangles, hull })
    }

    /// Linear estimate at (x, y)
    pub(crate) fn value(&self, x: f64, y: f64) -> f64 {
        let (px, py) = (x - self.origin.0, y - self.origin.1);
        for tri in &self.triangles {
            let (p0, p1, p2) = (&self.vertices[tri.v0], &self.vertices[tri.v1], &self.vertices[tri.v2]);
            let (u, v, w) = barycentric(px, py, p0, p1, p2);
            if u >= INSIDE_TOLERANCE && v >= INSIDE_TOLERANCE && w >= INSIDE_TOLERANCE {
                return u * p0.value + v * p1.value + w * p2.value;
            }
        }
        self.hull_value(px, py)
    }

    /// Value at the closest point of the hull boundary, linear along the edge
    fn hull_value(&self, px: f64, py: f64) -> f64 {
        let mut best = (f64::INFINITY, f64::NAN);
        for &(a, b) in &self.hull {
            let (pa, pb) = (&self.vertices[a], &self.vertices[b]);
            let (ex, ey) = (pb.x - pa.x, pb.y - pa.y);
            let len_sq = ex * ex + ey * ey;
            let t = if len_sq > 0.0 {
                (((px - pa.x) * ex + (py - pa.y) * ey) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (qx, qy) = (pa.x + t * ex, pa.y + t * ey);
            let dist_sq = (px - qx).powi(2) + (py - qy).powi(2);
            if dist_sq < best.0 {
                best = (dist_sq, pa.value + t * (pb.value - pa.value));
            }
        }
        best.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corners() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 20.0),
            SamplePoint::new(0.0, 10.0, 30.0),
            SamplePoint::new(10.0, 10.0, 40.0),
        ]
    }

    #[test]
    fn test_quad_gives_two_triangles() {
        let quad = vec![
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(10.0, 0.0, 2.0),
            SamplePoint::new(0.0, 10.0, 3.0),
            SamplePoint::new(9.0, 11.0, 4.0),
        ];
        let tin = Triangulation::build(&quad).unwrap();
        assert_eq!(tin.triangles.len(), 2);
        assert_eq!(tin.hull.len(), 4);
    }

    #[test]
    fn test_exact_at_vertices() {
        let pts = corners();
        let tin = Triangulation::build(&pts).unwrap();
        for p in &pts {
            assert_relative_eq!(tin.value(p.x, p.y), p.value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_reproduces_plane() {
        // z = 2x + 3y + 1 is linear in every triangle
        let pts: Vec<SamplePoint> = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (4.0, 6.0), (7.0, 2.0)]
            .iter()
            .map(|&(x, y)| SamplePoint::new(x, y, 2.0 * x + 3.0 * y + 1.0))
            .collect();
        let tin = Triangulation::build(&pts).unwrap();
        for (x, y) in [(5.0, 5.0), (1.0, 8.5), (9.0, 1.0), (3.3, 3.3)] {
            assert_relative_eq!(tin.value(x, y), 2.0 * x + 3.0 * y + 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_outside_hull_takes_nearest_edge() {
        let tin = Triangulation::build(&corners()).unwrap();
        // below the bottom edge, halfway along it
        assert_relative_eq!(tin.value(5.0, -3.0), 15.0, epsilon = 1e-9);
        // beyond a corner
        assert_relative_eq!(tin.value(-2.0, -2.0), 10.0, epsilon = 1e-9);
        // continuous across the hull
        assert_relative_eq!(tin.value(5.0, -1e-7), tin.value(5.0, 1e-7), epsilon = 1e-5);
    }

    #[test]
    fn test_projected_coordinates() {
        let pts: Vec<SamplePoint> = corners()
            .into_iter()
            .map(|p| SamplePoint::new(p.x + 350_000.0, p.y + 6_300_000.0, p.value))
            .collect();
        let tin = Triangulation::build(&pts).unwrap();
        assert_relative_eq!(tin.value(350_005.0, 6_300_005.0), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collinear_samples_fail() {
        let line: Vec<SamplePoint> = (0..4).map(|i| SamplePoint::new(i as f64, i as f64, 1.0)).collect();
        assert!(matches!(Triangulation::build(&line), Err(Error::DegenerateGeometry(_))));
    }
}
