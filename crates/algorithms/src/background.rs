//! Background level estimation and anomaly flags
//!
//! The background of a field is the reference value separating natural
//! conditions from contamination. It can be given by hand, or estimated
//! from the measurements themselves with a two-cluster 1-D k-means (the
//! cut-off is the midpoint of the two centroids) or a percentile.

use serde::{Deserialize, Serialize};
use siteassay_core::{Error, Result};

const KMEANS_MAX_ITERATIONS: usize = 100;
const KMEANS_CONVERGENCE: f64 = 1e-12;

/// How the background of one field is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMethod {
    /// Fixed value supplied by the user
    Manual(f64),
    /// Midpoint of the two 1-D k-means centroids
    #[serde(rename = "kmeans")]
    KMeansCutoff,
    /// Linear-interpolated percentile in [0, 100]
    Percentile(f64),
}

impl Default for BackgroundMethod {
    fn default() -> Self {
        BackgroundMethod::KMeansCutoff
    }
}

impl BackgroundMethod {
    pub fn validate(&self) -> Result<()> {
        match *self {
            BackgroundMethod::Manual(v) if !(v.is_finite() && v >= 0.0) => {
                Err(Error::config("background", v, "must be finite and non-negative"))
            }
            BackgroundMethod::Percentile(p) if !(0.0..=100.0).contains(&p) => {
                Err(Error::config("percentile", p, "must be within [0, 100]"))
            }
            _ => Ok(()),
        }
    }
}

/// Whether high or low readings indicate contamination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDirection {
    /// Anomalous when `value > background` (VOCs, CO2, CH4, ...)
    #[default]
    High,
    /// Anomalous when `value <= background` (depleted O2, radon deficit)
    Low,
}

/// Anomaly flag of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    Normal,
    Anomalous,
    Missing,
}

impl AnomalyDirection {
    /// Flag `value` against `background`.
    pub fn flag(&self, value: Option<f64>, background: f64) -> Anomaly {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return Anomaly::Missing;
        };
        let anomalous = match self {
            AnomalyDirection::High => v > background,
            AnomalyDirection::Low => v <= background,
        };
        if anomalous {
            Anomaly::Anomalous
        } else {
            Anomaly::Normal
        }
    }
}

fn finite_sorted(values: &[f64]) -> Result<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < 2 {
        return Err(Error::InsufficientData {
            what: "background values",
            required: 2,
            found: sorted.len(),
        });
    }
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

/// Empirical cumulative distribution as `(value, i / n)` over the sorted
/// finite values.
pub fn ecdf(values: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, (i + 1) as f64 / n))
        .collect()
}

/// Linear-interpolated percentile (`p` in [0, 100]) of the finite values.
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    BackgroundMethod::Percentile(p).validate()?;
    let sorted = finite_sorted(values)?;
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Two-cluster 1-D k-means; returns the sorted centroids.
///
/// Centroids start at the lower and upper quartile positions of the sorted
/// values, so the result is deterministic.
pub fn kmeans_centroids(values: &[f64]) -> Result<(f64, f64)> {
    let sorted = finite_sorted(values)?;
    let n = sorted.len();
    let mut centroids = [sorted[n / 4], sorted[(3 * n / 4).min(n - 1)]];
    if centroids[0] == centroids[1] {
        centroids = [sorted[0], sorted[n - 1]];
    }

    for _ in 0..KMEANS_MAX_ITERATIONS {
        let mut sums = [0.0; 2];
        let mut counts = [0usize; 2];
        for &v in &sorted {
            // ties go to the lower cluster
            let k = usize::from((v - centroids[1]).abs() < (v - centroids[0]).abs());
            sums[k] += v;
            counts[k] += 1;
        }

        let mut shift = 0.0_f64;
        for k in 0..2 {
            if counts[k] > 0 {
                let updated = sums[k] / counts[k] as f64;
                shift = shift.max((updated - centroids[k]).abs());
                centroids[k] = updated;
            }
        }
        if shift <= KMEANS_CONVERGENCE {
            break;
        }
    }

    let (a, b) = (centroids[0], centroids[1]);
    Ok((a.min(b), a.max(b)))
}

/// Background as the midpoint of the two k-means centroids.
pub fn kmeans_cutoff(values: &[f64]) -> Result<f64> {
    let (low, high) = kmeans_centroids(values)?;
    Ok((low + high) / 2.0)
}

/// Estimate the background of `values` with `method`.
///
/// # Errors
/// - [`Error::InvalidConfig`] for an invalid method
/// - [`Error::InsufficientData`] with fewer than 2 finite values
pub fn estimate_background(values: &[f64], method: BackgroundMethod) -> Result<f64> {
    method.validate()?;
    let background = match method {
        BackgroundMethod::Manual(v) => v,
        BackgroundMethod::KMeansCutoff => kmeans_cutoff(values)?,
        BackgroundMethod::Percentile(p) => percentile(values, p)?,
    };
    tracing::debug!(?method, background, "estimated background");
    Ok(background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ecdf() {
        let e = ecdf(&[3.0, 1.0, f64::NAN, 2.0, 4.0]);
        assert_eq!(e, vec![(1.0, 0.25), (2.0, 0.5), (3.0, 0.75), (4.0, 1.0)]);
        assert!(ecdf(&[]).is_empty());
    }

    #[test]
    fn test_percentile() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&v, 50.0).unwrap(), 3.0);
        assert_relative_eq!(percentile(&v, 90.0).unwrap(), 4.6, epsilon = 1e-12);
        assert_relative_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&v, 100.0).unwrap(), 5.0);
        assert!(percentile(&v, 101.0).is_err());
    }

    #[test]
    fn test_kmeans_separates_two_groups() {
        let v = [1.0, 1.2, 0.8, 1.1, 0.9, 10.0, 11.0, 9.0];
        let (low, high) = kmeans_centroids(&v).unwrap();
        assert_relative_eq!(low, 1.0, epsilon = 1e-12);
        assert_relative_eq!(high, 10.0, epsilon = 1e-12);
        assert_relative_eq!(kmeans_cutoff(&v).unwrap(), 5.5, epsilon = 1e-12);
    }

    #[test]
    fn test_kmeans_constant_values() {
        assert_relative_eq!(kmeans_cutoff(&[4.0, 4.0, 4.0]).unwrap(), 4.0);
    }

    #[test]
    fn test_estimate_requires_two_values() {
        let err = estimate_background(&[1.0, f64::NAN], BackgroundMethod::KMeansCutoff).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 2, found: 1, .. }));
        assert_eq!(estimate_background(&[], BackgroundMethod::Manual(3.0)).unwrap(), 3.0);
        assert!(estimate_background(&[], BackgroundMethod::Manual(-3.0)).is_err());
    }

    #[test]
    fn test_anomaly_flags() {
        assert_eq!(AnomalyDirection::High.flag(Some(11.0), 10.0), Anomaly::Anomalous);
        assert_eq!(AnomalyDirection::High.flag(Some(10.0), 10.0), Anomaly::Normal);
        assert_eq!(AnomalyDirection::Low.flag(Some(10.0), 10.0), Anomaly::Anomalous);
        assert_eq!(AnomalyDirection::Low.flag(Some(12.0), 10.0), Anomaly::Normal);
        assert_eq!(AnomalyDirection::High.flag(None, 10.0), Anomaly::Missing);
    }

    #[test]
    fn test_method_serde() {
        let m: BackgroundMethod = serde_json::from_str("\"kmeans\"").unwrap();
        assert_eq!(m, BackgroundMethod::KMeansCutoff);
        let m: BackgroundMethod = serde_json::from_str(r#"{"percentile": 90}"#).unwrap();
        assert_eq!(m, BackgroundMethod::Percentile(90.0));
    }
}
