//! Empirical variogram and model fitting for kriging
//!
//! The semivariance γ(h) measures how much the indicator changes between
//! samples separated by a distance h:
//! ```text
//! γ(h) = (1/2N(h)) Σ [z(xᵢ) - z(xⱼ)]²   for all pairs with |xᵢ-xⱼ| ∈ h±Δh/2
//! ```
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use serde::{Deserialize, Serialize};

use siteassay_core::{Error, Result};

use super::SamplePoint;

/// Empirical variogram: semivariance at discrete lag distances
#[derive(Debug, Clone)]
pub struct EmpiricalVariogram {
    /// Lag distances (bin centers)
    pub lags: Vec<f64>,
    /// Semivariance at each lag; NaN for bins without pairs
    pub semivariance: Vec<f64>,
    /// Number of sample pairs in each bin
    pub pair_counts: Vec<usize>,
}

/// Theoretical variogram model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariogramModel {
    /// γ(h) = c·[1.5(h/a) - 0.5(h/a)³] for h ≤ a; c for h > a
    #[default]
    Spherical,
    /// γ(h) = c·[1 - exp(-3h/a)]
    Exponential,
    /// γ(h) = c·[1 - exp(-3h²/a²)]
    Gaussian,
}

/// Fitted variogram.
///
/// The nugget is held at zero, so kriging with it is continuous and
/// reproduces every sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FittedVariogram {
    pub model: VariogramModel,
    /// Semivariance the model levels off at
    pub sill: f64,
    /// Distance at which the model reaches (about) the sill
    pub range: f64,
    /// Pair-weighted residual sum of squares of the fit
    pub rss: f64,
}

impl FittedVariogram {
    /// Model semivariance at distance h
    pub fn evaluate(&self, h: f64) -> f64 {
        if h < 1e-15 {
            return 0.0;
        }
        let (c, a) = (self.sill, self.range);
        match self.model {
            VariogramModel::Spherical => {
                if h >= a {
                    c
                } else {
                    let hr = h / a;
                    c * (1.5 * hr - 0.5 * hr * hr * hr)
                }
            }
            VariogramModel::Exponential => c * (1.0 - (-3.0 * h / a).exp()),
            VariogramModel::Gaussian => c * (1.0 - (-3.0 * h * h / (a * a)).exp()),
        }
    }
}

/// Empirical variogram over `n_lags` equal bins up to half the largest
/// pairwise distance.
pub fn empirical_variogram(points: &[SamplePoint], n_lags: usize) -> Result<EmpiricalVariogram> {
    let n = points.len();
    if n < 2 {
        return Err(Error::InsufficientData {
            what: "variogram samples",
            required: 2,
            found: n,
        });
    }
    if n_lags == 0 {
        return Err(Error::config("n_lags", n_lags, "must be at least 1"));
    }

    let mut max_dist_sq = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            max_dist_sq = max_dist_sq.max(points[i].dist_sq(points[j].x, points[j].y));
        }
    }
    let max_lag = max_dist_sq.sqrt() / 2.0;
    if max_lag <= 0.0 {
        return Err(Error::DegenerateGeometry("all sample locations coincide".into()));
    }

    let bin_width = max_lag / n_lags as f64;
    let lags: Vec<f64> = (0..n_lags).map(|k| (k as f64 + 0.5) * bin_width).collect();
    let mut semivariance = vec![0.0_f64; n_lags];
    let mut pair_counts = vec![0_usize; n_lags];

    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i].dist_sq(points[j].x, points[j].y).sqrt();
            let bin = (d / bin_width).floor() as usize;
            // pairs exactly at max_lag close the last bin
            let bin = if d == max_lag { n_lags - 1 } else { bin };
            if bin < n_lags {
                let dz = points[i].value - points[j].value;
                semivariance[bin] += dz * dz;
                pair_counts[bin] += 1;
            }
        }
    }

    for (sv, &count) in semivariance.iter_mut().zip(&pair_counts) {
        *sv = if count > 0 { *sv / (2.0 * count as f64) } else { f64::NAN };
    }

    Ok(EmpiricalVariogram { lags, semivariance, pair_counts })
}

/// Fit `model` to an empirical variogram.
///
/// Grid search over sill and range minimizing the residual sum of squares
/// weighted by pair counts.
pub fn fit_variogram(empirical: &EmpiricalVariogram, model: VariogramModel) -> Result<FittedVariogram> {
    let valid: Vec<(f64, f64, usize)> = empirical
        .lags
        .iter()
        .zip(&empirical.semivariance)
        .zip(&empirical.pair_counts)
        .filter(|((_, sv), &count)| sv.is_finite() && count > 0)
        .map(|((&lag, &sv), &count)| (lag, sv, count))
        .collect();

    if valid.len() < 3 {
        return Err(Error::Interpolation(format!(
            "need at least 3 populated lag bins to fit a variogram, found {}",
            valid.len()
        )));
    }

    let max_lag = valid.last().map_or(1.0, |&(lag, _, _)| lag);
    let max_sv = valid.iter().map(|&(_, sv, _)| sv).fold(0.0_f64, f64::max);
    if max_sv <= 0.0 {
        return Err(Error::Interpolation("all semivariances are zero".into()));
    }

    let n_sill = 20;
    let n_range = 20;
    let mut best = FittedVariogram {
        model,
        sill: max_sv,
        range: max_lag,
        rss: f64::INFINITY,
    };

    for is in 1..=n_sill {
        // sills up to 1.5x the largest observed semivariance
        let sill = max_sv * 1.5 * is as f64 / n_sill as f64;
        for ir in 1..=n_range {
            let range = max_lag * 2.0 * ir as f64 / n_range as f64;
            let mut trial = FittedVariogram { model, sill, range, rss: 0.0 };
            trial.rss = valid
                .iter()
                .map(|&(lag, sv, count)| {
                    let residual = sv - trial.evaluate(lag);
                    count as f64 * residual * residual
                })
                .sum();
            if trial.rss < best.rss {
                best = trial;
            }
        }
    }

    tracing::debug!(?model, sill = best.sill, range = best.range, rss = best.rss, "variogram fitted");
    Ok(best)
}
