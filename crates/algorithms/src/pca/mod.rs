//! Principal Component Analysis over the selected survey fields
//!
//! Centers (and by default standardizes) each field, builds the
//! fields x fields covariance matrix, and decomposes it with a Jacobi
//! eigensolver. Components are ordered by descending eigenvalue and every
//! eigenvector is sign-normalized so repeated runs give identical output.

mod jacobi;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use siteassay_core::{Error, Result};

use crate::selection::{ValidatedDataset, MIN_FIELDS, MIN_POINTS};
use crate::stats;

/// Eigenvector entries whose magnitudes differ by less than this count as tied
const SIGN_TIE_EPS: f64 = 1e-12;

/// Parameters for PCA
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaParams {
    /// Scale each field to unit variance after centering (default: true)
    pub standardize: bool,
    /// Number of components to report (default: all)
    pub n_components: Option<usize>,
    /// Largest accepted `λ_max / λ_min` (default: 1e12)
    pub max_condition_number: f64,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self {
            standardize: true,
            n_components: None,
            max_condition_number: 1e12,
        }
    }
}

impl PcaParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_components == Some(0) {
            return Err(Error::config("n_components", 0, "must be at least 1"));
        }
        if !(self.max_condition_number.is_finite() && self.max_condition_number > 1.0) {
            return Err(Error::config(
                "max_condition_number",
                self.max_condition_number,
                "must be a finite number greater than 1",
            ));
        }
        Ok(())
    }
}

/// One principal component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrincipalComponent {
    pub eigenvalue: f64,
    /// Share of the total variance, in [0, 1]
    pub variance_ratio: f64,
    /// Unit-length eigenvector, one entry per field
    pub eigenvector: Vec<f64>,
    /// Eigenvector scaled by `sqrt(eigenvalue)`
    pub loading: Vec<f64>,
    /// Projection of every point, in dataset order
    pub scores: Vec<f64>,
}

/// Result of PCA
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaResult {
    pub fields: Vec<String>,
    pub standardized: bool,
    /// Per-field mean used for centering
    pub means: Vec<f64>,
    /// Per-field divisor used for scaling (1.0 when not standardized)
    pub scales: Vec<f64>,
    /// Sum of all eigenvalues, including unreported components
    pub total_variance: f64,
    pub condition_number: f64,
    pub components: Vec<PrincipalComponent>,
}

impl PcaResult {
    /// Display name of component `index` ("PC1", "PC2", ...)
    pub fn component_name(index: usize) -> String {
        format!("PC{}", index + 1)
    }

    pub fn n_points(&self) -> usize {
        self.components.first().map_or(0, |c| c.scores.len())
    }

    pub fn variance_ratios(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.variance_ratio).collect()
    }

    /// Running sum of the variance ratios
    pub fn cumulative_variance(&self) -> Vec<f64> {
        self.components
            .iter()
            .scan(0.0, |acc, c| {
                *acc += c.variance_ratio;
                Some(*acc)
            })
            .collect()
    }

    /// Scaled loading of `field` on component `index`
    pub fn loading(&self, index: usize, field: &str) -> Option<f64> {
        let j = self.fields.iter().position(|f| f == field)?;
        self.components.get(index).map(|c| c.loading[j])
    }

    /// Scores of component `index`
    pub fn scores(&self, index: usize) -> Option<&[f64]> {
        self.components.get(index).map(|c| c.scores.as_slice())
    }

    /// Project a new observation (one value per field) onto the components.
    pub fn project(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != self.fields.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} values, got {}",
                self.fields.len(),
                values.len()
            )));
        }
        let z: Vec<f64> = values
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect();
        Ok(self
            .components
            .iter()
            .map(|c| c.eigenvector.iter().zip(&z).map(|(e, x)| e * x).sum())
            .collect())
    }
}

/// Run PCA on a validated dataset.
pub fn pca(dataset: &ValidatedDataset, params: &PcaParams) -> Result<PcaResult> {
    pca_from_matrix(dataset.values(), dataset.fields(), params)
}

/// Run PCA on an n_points x n_fields matrix.
///
/// # Errors
/// - [`Error::InsufficientData`] with fewer than 3 rows or 2 columns
/// - [`Error::Numerical`] with reason "ill-conditioned" when a field is
///   constant or the covariance matrix is (near-)singular
pub fn pca_from_matrix(values: &Array2<f64>, fields: &[String], params: &PcaParams) -> Result<PcaResult> {
    params.validate()?;

    let (n, k) = values.dim();
    if k < MIN_FIELDS {
        return Err(Error::InsufficientData { what: "fields", required: MIN_FIELDS, found: k });
    }
    if n < MIN_POINTS {
        return Err(Error::InsufficientData { what: "points", required: MIN_POINTS, found: n });
    }
    if fields.len() != k {
        return Err(Error::InvalidInput(format!("{} field names for {} columns", fields.len(), k)));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("PCA input contains non-finite values".into()));
    }

    // Center and scale
    let mut means = Vec::with_capacity(k);
    let mut scales = Vec::with_capacity(k);
    for column in values.axis_iter(Axis(1)) {
        let col = column.to_vec();
        let m = stats::mean(&col).unwrap_or(0.0);
        let s = if params.standardize {
            // population deviation, as a standard scaler does
            let s = stats::std_dev(&col, 0).unwrap_or(0.0);
            if s <= f64::EPSILON * m.abs().max(1.0) {
                tracing::debug!(field = %fields[means.len()], "constant field");
                return Err(Error::ill_conditioned());
            }
            s
        } else {
            1.0
        };
        means.push(m);
        scales.push(s);
    }

    let means_arr = Array1::from(means.clone());
    let scales_arr = Array1::from(scales.clone());
    let z = (values - &means_arr) / &scales_arr;

    let cov = z.t().dot(&z) / (n - 1) as f64;

    let (eigenvalues, eigenvectors) = jacobi::symmetric_eigen(&cov)?;

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let lambda_max = eigenvalues[order[0]];
    let lambda_min = eigenvalues[order[k - 1]];
    let condition_number = if lambda_min > 0.0 { lambda_max / lambda_min } else { f64::INFINITY };
    tracing::debug!(condition_number, lambda_max, lambda_min, "covariance spectrum");
    if !(condition_number <= params.max_condition_number) {
        return Err(Error::ill_conditioned());
    }

    let total_variance: f64 = eigenvalues.iter().sum();
    let n_keep = params.n_components.map_or(k, |c| c.min(k));

    let components = order
        .iter()
        .take(n_keep)
        .map(|&idx| {
            let eigenvalue = eigenvalues[idx];
            let mut eigenvector = eigenvectors.column(idx).to_vec();
            fix_sign(&mut eigenvector);

            let loading = eigenvector.iter().map(|e| e * eigenvalue.sqrt()).collect();
            let scores = z.dot(&Array1::from(eigenvector.clone())).to_vec();

            PrincipalComponent {
                eigenvalue,
                variance_ratio: eigenvalue / total_variance,
                eigenvector,
                loading,
                scores,
            }
        })
        .collect();

    Ok(PcaResult {
        fields: fields.to_vec(),
        standardized: params.standardize,
        means,
        scales,
        total_variance,
        condition_number,
        components,
    })
}

/// Flip `v` so that its entry of largest magnitude is positive.
///
/// Entries tied in magnitude resolve to the lowest index.
pub(crate) fn fix_sign(v: &mut [f64]) {
    let mut pivot = 0;
    for (i, x) in v.iter().enumerate().skip(1) {
        if x.abs() > v[pivot].abs() + SIGN_TIE_EPS {
            pivot = i;
        }
    }
    if v.get(pivot).is_some_and(|&x| x < 0.0) {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}
