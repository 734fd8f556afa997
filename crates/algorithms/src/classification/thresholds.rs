//! Classification thresholds

use serde::{Deserialize, Serialize};
use siteassay_core::{Error, Result};

use super::PollutionLevel;

/// Ratios against the background and the clustering rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// value / background above which a reading is elevated (default: 1.5)
    pub elevated_ratio: f64,
    /// value / background above which a reading exceeds the threshold
    /// (default: 3.0)
    pub exceedance_ratio: f64,
    /// Minimum adjacent exceeding points or cells for a suspected source
    /// (default: 3)
    pub source_cluster_min_points: usize,
    /// Cluster mean / background above which a suspected source is
    /// confirmed (default: `exceedance_ratio²`)
    pub confirmed_ratio: Option<f64>,
    /// Points within this distance are adjacent. `None` derives it from
    /// the point spacing (see [`Thresholds::resolve_adjacency`]).
    pub adjacency_distance: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            elevated_ratio: 1.5,
            exceedance_ratio: 3.0,
            source_cluster_min_points: 3,
            confirmed_ratio: None,
            adjacency_distance: None,
        }
    }
}

/// Multiplier on the median nearest-neighbour spacing used when no
/// adjacency distance is configured
const AUTO_ADJACENCY_FACTOR: f64 = 1.5;

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        if !(self.elevated_ratio.is_finite() && self.elevated_ratio >= 1.0) {
            return Err(Error::config("elevated_ratio", self.elevated_ratio, "must be a number >= 1"));
        }
        if !(self.exceedance_ratio.is_finite() && self.exceedance_ratio > self.elevated_ratio) {
            return Err(Error::config(
                "exceedance_ratio",
                self.exceedance_ratio,
                format!("must be greater than elevated_ratio ({})", self.elevated_ratio),
            ));
        }
        if self.source_cluster_min_points == 0 {
            return Err(Error::config("source_cluster_min_points", 0, "must be at least 1"));
        }
        if let Some(ratio) = self.confirmed_ratio {
            if !(ratio.is_finite() && ratio > self.exceedance_ratio) {
                return Err(Error::config(
                    "confirmed_ratio",
                    ratio,
                    format!("must be greater than exceedance_ratio ({})", self.exceedance_ratio),
                ));
            }
        }
        if let Some(d) = self.adjacency_distance {
            if !(d.is_finite() && d > 0.0) {
                return Err(Error::config("adjacency_distance", d, "must be a positive number"));
            }
        }
        Ok(())
    }

    /// Ratio for the confirmed-source criterion
    pub fn confirmed_ratio(&self) -> f64 {
        self.confirmed_ratio
            .unwrap_or(self.exceedance_ratio * self.exceedance_ratio)
    }

    /// Pointwise level of `value` against `background`.
    ///
    /// Values between `elevated_ratio` and `exceedance_ratio` times the
    /// background stay elevated.
    pub fn level(&self, value: f64, background: f64) -> PollutionLevel {
        if value <= background {
            PollutionLevel::BelowBackground
        } else if value <= background * self.exceedance_ratio {
            PollutionLevel::Elevated
        } else {
            PollutionLevel::ExceedsThreshold
        }
    }

    /// True when `value` is above `elevated_ratio` times the background
    pub fn is_above_elevated(&self, value: f64, background: f64) -> bool {
        value > background * self.elevated_ratio
    }

    /// Adjacency distance for points at `coords`.
    ///
    /// Uses the configured distance, or `1.5 ×` the median nearest-neighbour
    /// spacing of the points.
    pub fn resolve_adjacency(&self, coords: &[(f64, f64)]) -> Result<f64> {
        if let Some(d) = self.adjacency_distance {
            return Ok(d);
        }
        let median = super::cluster::median_spacing(coords).ok_or_else(|| {
            Error::config(
                "adjacency_distance",
                "auto",
                "cannot derive from fewer than two distinct point locations",
            )
        })?;
        Ok(median * AUTO_ADJACENCY_FACTOR)
    }
}
