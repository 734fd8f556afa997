//! Cyclic Jacobi eigensolver for small symmetric matrices
//!
//! Field counts in a site survey are small (rarely more than a few dozen),
//! so the O(n^3)-per-sweep Jacobi method is both fast enough and very
//! accurate for the eigenvectors, which is what the loadings depend on.

use ndarray::Array2;
use siteassay_core::{Error, Result};

const MAX_SWEEPS: usize = 100;
const TOLERANCE: f64 = 1e-14;

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix, in the
/// solver's native order. Callers sort.
pub(crate) fn symmetric_eigen(matrix: &Array2<f64>) -> Result<(Vec<f64>, Array2<f64>)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(Error::Numerical {
            reason: format!("matrix is not square ({}x{})", n, matrix.ncols()),
        });
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    if scale == 0.0 {
        return Ok((vec![0.0; n], v));
    }

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum::<f64>()
            .sqrt();
        if off <= TOLERANCE * scale {
            let eigenvalues = (0..n).map(|i| a[[i, i]]).collect();
            return Ok((eigenvalues, v));
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                // A <- A J
                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                // A <- J^T A
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                a[[p, q]] = 0.0;
                a[[q, p]] = 0.0;

                // V <- V J
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    Err(Error::Numerical {
        reason: format!("eigendecomposition did not converge in {} sweeps", MAX_SWEEPS),
    })
}
