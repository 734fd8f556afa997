//! Inverse Distance Weighting (IDW) kernel
//!
//! Estimates values at unknown locations as a weighted average of all
//! sample points, where weights are inversely proportional to distance
//! raised to a power parameter. A location within the snap distance of a
//! sample takes that sample's value, which makes the scheme exact at the
//! samples.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use siteassay_core::{Error, Result};

use super::SamplePoint;
use crate::kdtree::KdTree;

/// Perpendicular spread, relative to the baseline length, below which a
/// point set counts as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// IDW estimate at (x, y).
///
/// ```text
/// z(x,y) = Σ(wi * zi) / Σ(wi)
/// where wi = 1 / d(x,y, xi,yi)^p
/// ```
///
/// If any sample lies within `snap` of (x, y) the nearest one's value is
/// returned (lowest index on ties). The nearest sample's value is also
/// returned when the weights underflow or overflow, as with very large
/// powers far from every sample.
pub(crate) fn idw_value(samples: &[SamplePoint], x: f64, y: f64, power: f64, snap: f64) -> f64 {
    let snap_sq = snap * snap;
    let half_power = power / 2.0;

    let mut nearest: Option<(f64, f64)> = None;
    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;

    for pt in samples {
        let dsq = pt.dist_sq(x, y);
        if nearest.map_or(true, |(best, _)| dsq < best) {
            nearest = Some((dsq, pt.value));
        }
        if dsq <= snap_sq {
            continue;
        }
        // d^p computed from d^2 to skip a sqrt per sample
        let w = 1.0 / dsq.powf(half_power);
        sum_w += w;
        sum_wz += w * pt.value;
    }

    let estimate = sum_wz / sum_w;
    match nearest {
        Some((dsq, value)) if dsq <= snap_sq || !(sum_w > 0.0 && estimate.is_finite()) => value,
        Some(_) => estimate,
        None => f64::NAN,
    }
}

/// Average samples lying within `snap` of an earlier sample.
///
/// Groups are formed greedily in input order: each unmerged sample claims
/// every unmerged sample within `snap` of it and keeps its own location.
/// Returns the merged samples and the number of groups whose values
/// disagreed.
pub(crate) fn merge_coincident(points: &[SamplePoint], snap: f64) -> (Vec<SamplePoint>, usize) {
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    let tree = KdTree::build(&coords);

    let mut merged_into = vec![false; points.len()];
    let mut merged = Vec::with_capacity(points.len());
    let mut conflicts = 0;

    for (i, p) in points.iter().enumerate() {
        if merged_into[i] {
            continue;
        }
        let mut group = vec![i];
        group.extend(
            tree.within_radius(p.x, p.y, snap)
                .into_iter()
                .map(|n| n.index)
                .filter(|&j| j != i && !merged_into[j]),
        );

        let mut sum = 0.0;
        let mut differing = false;
        for &j in &group {
            merged_into[j] = true;
            sum += points[j].value;
            differing |= points[j].value != p.value;
        }
        if differing {
            conflicts += 1;
        }
        merged.push(SamplePoint::new(p.x, p.y, sum / group.len() as f64));
    }

    (merged, conflicts)
}

/// Fail unless the samples contain three non-collinear locations.
pub(crate) fn ensure_spread(samples: &[SamplePoint]) -> Result<()> {
    if samples.len() < 3 {
        return Err(Error::DegenerateGeometry(format!(
            "need at least 3 distinct sample locations, found {}",
            samples.len()
        )));
    }

    let origin = samples[0];
    let far = samples
        .iter()
        .skip(1)
        .max_by(|a, b| a.dist_sq(origin.x, origin.y).total_cmp(&b.dist_sq(origin.x, origin.y)))
        .copied()
        .unwrap_or(origin);
    let (bx, by) = (far.x - origin.x, far.y - origin.y);
    let baseline = bx.hypot(by);
    if baseline == 0.0 {
        return Err(Error::DegenerateGeometry("all sample locations coincide".into()));
    }

    let spread = samples
        .iter()
        .map(|p| (bx * (p.y - origin.y) - by * (p.x - origin.x)).abs() / baseline)
        .fold(0.0, f64::max);
    if spread <= COLLINEAR_TOLERANCE * baseline {
        return Err(Error::DegenerateGeometry("sample locations are collinear".into()));
    }
    Ok(())
}
