//! Execution strategy for per-cell work

use serde::{Deserialize, Serialize};
use siteassay_core::{Error, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How independent work items (grid rows) are scheduled.
///
/// Every item is computed solely from immutable inputs, so the output is
/// identical for every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Single-threaded
    Sequential,
    /// Rayon global pool
    #[default]
    Parallel,
    /// Dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ExecutionMode {
    /// Map `f` over `0..n`, preserving index order in the result.
    pub fn map_indexed<T, F>(&self, n: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match *self {
            ExecutionMode::Sequential => Ok((0..n).map(f).collect()),
            #[cfg(feature = "parallel")]
            ExecutionMode::Parallel => Ok((0..n).into_par_iter().map(f).collect()),
            #[cfg(feature = "parallel")]
            ExecutionMode::ParallelWith(threads) => {
                if threads == 0 {
                    return Err(Error::config("execution", threads, "thread count must be at least 1"));
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::config("execution", threads, e.to_string()))?;
                Ok(pool.install(|| (0..n).into_par_iter().map(f).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            ExecutionMode::Parallel | ExecutionMode::ParallelWith(_) => Ok((0..n).map(f).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_agree() {
        let f = |i: usize| (i as f64).sqrt() * 3.0;
        let seq = ExecutionMode::Sequential.map_indexed(1000, f).unwrap();
        let par = ExecutionMode::Parallel.map_indexed(1000, f).unwrap();
        let two = ExecutionMode::ParallelWith(2).map_indexed(1000, f).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq, two);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_zero_threads_rejected() {
        assert!(ExecutionMode::ParallelWith(0).map_indexed(4, |i| i).is_err());
    }
}
