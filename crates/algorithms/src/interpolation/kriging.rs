//! Ordinary kriging
//!
//! Best linear unbiased estimator under a fitted variogram. Every sample
//! takes part in every estimate, so the kriging matrix is the same for all
//! targets: it is factored once and each cell costs one pair of triangular
//! solves.
//!
//! ```text
//! [γ(x₁,x₁) ... γ(x₁,xₙ) 1] [w₁]   [γ(x₁,x₀)]
//! [   ...     ...    ...  .] [..] = [   ...   ]
//! [γ(xₙ,x₁) ... γ(xₙ,xₙ) 1] [wₙ]   [γ(xₙ,x₀)]
//! [  1       ...    1     0] [μ ]   [    1    ]
//! ```
//!
//! Reference:
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use siteassay_core::{Error, Result};

use super::variogram::FittedVariogram;
use super::SamplePoint;

/// Pivots below this fraction of the largest matrix entry mean the
/// kriging system is singular
const PIVOT_TOLERANCE: f64 = 1e-14;

/// Kriging system factored with partial pivoting (PA = LU)
#[derive(Debug, Clone)]
struct LuFactors {
    n: usize,
    /// Row-major; L below the diagonal (unit diagonal implied), U on and above
    lu: Vec<f64>,
    /// Row permutation applied to the right-hand side
    perm: Vec<usize>,
}

impl LuFactors {
    fn factor(n: usize, mut mat: Vec<f64>) -> Result<Self> {
        let scale = mat.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let mut perm: Vec<usize> = (0..n).collect();

        for col in 0..n {
            let mut max_val = mat[col * n + col].abs();
            let mut max_row = col;
            for row in (col + 1)..n {
                let val = mat[row * n + col].abs();
                if val > max_val {
                    max_val = val;
                    max_row = row;
                }
            }

            if max_val <= PIVOT_TOLERANCE * scale {
                return Err(Error::Numerical {
                    reason: "singular kriging system".into(),
                });
            }

            if max_row != col {
                for j in 0..n {
                    mat.swap(col * n + j, max_row * n + j);
                }
                perm.swap(col, max_row);
            }

            let pivot = mat[col * n + col];
            for row in (col + 1)..n {
                let factor = mat[row * n + col] / pivot;
                mat[row * n + col] = factor;
                for j in (col + 1)..n {
                    mat[row * n + j] -= factor * mat[col * n + j];
                }
            }
        }

        Ok(Self { n, lu: mat, perm })
    }

    fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut x: Vec<f64> = self.perm.iter().map(|&p| rhs[p]).collect();
        // forward substitution with unit-diagonal L
        for row in 0..n {
            let sum: f64 = (0..row).map(|j| self.lu[row * n + j] * x[j]).sum();
            x[row] -= sum;
        }
        // back substitution with U
        for row in (0..n).rev() {
            let sum: f64 = ((row + 1)..n).map(|j| self.lu[row * n + j] * x[j]).sum();
            x[row] = (x[row] - sum) / self.lu[row * n + row];
        }
        x
    }
}

/// Ordinary kriging estimator over a fixed sample set
#[derive(Debug, Clone)]
pub(crate) struct OrdinaryKriging {
    samples: Vec<SamplePoint>,
    variogram: FittedVariogram,
    system: LuFactors,
}

impl OrdinaryKriging {
    /// Build and factor the kriging system.
    ///
    /// # Errors
    /// [`Error::Numerical`] when the system is singular.
    pub(crate) fn new(samples: &[SamplePoint], variogram: FittedVariogram) -> Result<Self> {
        let n = samples.len();
        let size = n + 1;
        let mut mat = vec![0.0_f64; size * size];
        for i in 0..n {
            for j in 0..n {
                let h = samples[i].dist_sq(samples[j].x, samples[j].y).sqrt();
                mat[i * size + j] = variogram.evaluate(h);
            }
            mat[i * size + n] = 1.0;
            mat[n * size + i] = 1.0;
        }

        Ok(Self {
            samples: samples.to_vec(),
            variogram,
            system: LuFactors::factor(size, mat)?,
        })
    }

    pub(crate) fn variogram(&self) -> &FittedVariogram {
        &self.variogram
    }

    /// Kriging estimate at (x, y)
    pub(crate) fn value(&self, x: f64, y: f64) -> f64 {
        let mut rhs: Vec<f64> = self
            .samples
            .iter()
            .map(|p| self.variogram.evaluate(p.dist_sq(x, y).sqrt()))
            .collect();
        rhs.push(1.0);

        let weights = self.system.solve(&rhs);
        self.samples.iter().zip(&weights).map(|(p, w)| w * p.value).sum()
    }
}
