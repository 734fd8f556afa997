//! Spatial interpolation of a scalar indicator over the site
//!
//! Scattered samples are interpolated onto a regular grid laid over the
//! boundary extent. Global inverse distance weighting is the default;
//! linear interpolation on a Delaunay triangulation and ordinary kriging
//! are also available. Cells whose center is outside the boundary (plus an
//! optional buffer) hold `None`.

mod idw;
mod kriging;
mod tin;
pub mod variogram;

use serde::{Deserialize, Serialize};

use siteassay_core::{Error, Grid, GridSpec, Result, SiteBoundary};

use crate::execution::ExecutionMode;
use crate::kdtree::KdTree;
use crate::stats;
use kriging::OrdinaryKriging;
use tin::Triangulation;
use variogram::{empirical_variogram, fit_variogram, FittedVariogram, VariogramModel};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }
}

/// Surface estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Inverse distance weighting over all samples
    #[default]
    Idw,
    /// Barycentric interpolation on the Delaunay triangulation
    Linear,
    /// Ordinary kriging with a fitted variogram
    OrdinaryKriging,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Idw => "idw",
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::OrdinaryKriging => "ordinary_kriging",
        }
    }
}

/// Variogram settings for ordinary kriging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingParams {
    /// Variogram model (default: spherical)
    pub model: VariogramModel,
    /// Lag bins of the empirical variogram (default: 6)
    pub n_lags: usize,
}

impl Default for KrigingParams {
    fn default() -> Self {
        Self {
            model: VariogramModel::Spherical,
            n_lags: 6,
        }
    }
}

/// Parameters for surface interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationParams {
    /// Estimator (default: IDW)
    pub method: InterpolationMethod,
    /// IDW power parameter (default: 2.0)
    pub power: f64,
    /// Variogram settings, used by ordinary kriging
    pub kriging: KrigingParams,
    /// Output grid resolution over the boundary extent (default: 100x100)
    pub grid: GridSpec,
    /// Cells within this distance outside the boundary are still populated
    /// (default: 0.0)
    pub buffer_distance: f64,
    /// Samples closer than this are merged, and a location this close to a
    /// sample takes its value (default: 1e-9)
    pub snap_distance: f64,
    /// Row scheduling (default: parallel)
    pub execution: ExecutionMode,
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::Idw,
            power: 2.0,
            kriging: KrigingParams::default(),
            grid: GridSpec::default(),
            buffer_distance: 0.0,
            snap_distance: 1e-9,
            execution: ExecutionMode::default(),
        }
    }
}

impl InterpolationParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(Error::config("power", self.power, "must be a positive number"));
        }
        if !(self.buffer_distance.is_finite() && self.buffer_distance >= 0.0) {
            return Err(Error::config("buffer_distance", self.buffer_distance, "must be a non-negative number"));
        }
        if !(self.snap_distance.is_finite() && self.snap_distance >= 0.0) {
            return Err(Error::config("snap_distance", self.snap_distance, "must be a non-negative number"));
        }
        if self.kriging.n_lags < 3 {
            return Err(Error::config("kriging.n_lags", self.kriging.n_lags, "must be at least 3"));
        }
        if let ExecutionMode::ParallelWith(0) = self.execution {
            return Err(Error::config("execution", 0, "thread count must be at least 1"));
        }
        self.grid.validate()
    }
}

/// Estimator prepared from the merged samples
#[derive(Debug, Clone)]
enum Kernel {
    Constant(f64),
    Idw { power: f64 },
    Linear(Triangulation),
    Kriging(OrdinaryKriging),
}

/// Samples, snapping and the prepared estimator
#[derive(Debug, Clone)]
struct Interpolator {
    samples: Vec<SamplePoint>,
    tree: KdTree,
    snap_distance: f64,
    kernel: Kernel,
}

impl Interpolator {
    fn prepare(samples: Vec<SamplePoint>, params: &InterpolationParams) -> Result<Self> {
        let kernel = match params.method {
            InterpolationMethod::Idw => Kernel::Idw { power: params.power },
            InterpolationMethod::Linear => Kernel::Linear(Triangulation::build(&samples)?),
            InterpolationMethod::OrdinaryKriging => {
                if samples.iter().all(|p| p.value == samples[0].value) {
                    // no variogram can be fitted to a flat indicator
                    tracing::debug!("constant samples, kriging skipped");
                    Kernel::Constant(samples[0].value)
                } else {
                    let empirical = empirical_variogram(&samples, params.kriging.n_lags)?;
                    let fitted = fit_variogram(&empirical, params.kriging.model)?;
                    Kernel::Kriging(OrdinaryKriging::new(&samples, fitted)?)
                }
            }
        };
        let coords: Vec<(f64, f64)> = samples.iter().map(|p| (p.x, p.y)).collect();
        Ok(Self {
            tree: KdTree::build(&coords),
            samples,
            snap_distance: params.snap_distance,
            kernel,
        })
    }

    fn value(&self, x: f64, y: f64) -> f64 {
        match &self.kernel {
            Kernel::Constant(value) => *value,
            Kernel::Idw { power } => idw::idw_value(&self.samples, x, y, *power, self.snap_distance),
            Kernel::Linear(tin) => self.snapped(x, y).unwrap_or_else(|| tin.value(x, y)),
            Kernel::Kriging(ok) => self.snapped(x, y).unwrap_or_else(|| ok.value(x, y)),
        }
    }

    /// Value of the nearest sample within the snap distance
    fn snapped(&self, x: f64, y: f64) -> Option<f64> {
        self.tree
            .nearest(x, y)
            .filter(|hit| hit.distance_sq <= self.snap_distance * self.snap_distance)
            .map(|hit| self.samples[hit.index].value)
    }
}

/// Interpolated indicator surface.
///
/// Cells are `Some(value)` inside the boundary (or its buffer) and `None`
/// outside.
#[derive(Debug, Clone, Serialize)]
pub struct InterpolatedSurface {
    grid: Grid<Option<f64>>,
    method: InterpolationMethod,
    /// Fitted variogram when the surface was kriged
    variogram: Option<FittedVariogram>,
    buffer_distance: f64,
    #[serde(skip)]
    interpolator: Interpolator,
    #[serde(skip)]
    boundary: SiteBoundary,
}

impl InterpolatedSurface {
    pub fn grid(&self) -> &Grid<Option<f64>> {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Value of the cell at (row, col); `None` outside the boundary
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.grid.get(row, col).copied().flatten()
    }

    /// Samples after coincident points were merged
    pub fn samples(&self) -> &[SamplePoint] {
        &self.interpolator.samples
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    pub fn variogram(&self) -> Option<&FittedVariogram> {
        self.variogram.as_ref()
    }

    /// Interpolate at an arbitrary location.
    ///
    /// Returns `None` for locations outside the boundary and its buffer.
    pub fn evaluate(&self, x: f64, y: f64) -> Option<f64> {
        if !self.boundary.within_buffer(x, y, self.buffer_distance) {
            return None;
        }
        Some(self.interpolator.value(x, y))
    }

    /// Populated cells in row-major order as `(row, col, value)`
    pub fn inside_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.grid.iter().filter_map(|(r, c, v)| v.map(|v| (r, c, v)))
    }

    pub fn inside_count(&self) -> usize {
        self.inside_cells().count()
    }

    /// Minimum and maximum over populated cells
    pub fn min_max(&self) -> Option<(f64, f64)> {
        stats::min_max(self.inside_cells().map(|(_, _, v)| v))
    }

    /// Mean over populated cells
    pub fn mean(&self) -> Option<f64> {
        let values: Vec<f64> = self.inside_cells().map(|(_, _, v)| v).collect();
        stats::mean(&values)
    }
}

/// Interpolate `points` over `boundary`.
///
/// # Errors
/// - [`Error::InvalidConfig`] for invalid parameters
/// - [`Error::Interpolation`] if a sample has a non-finite coordinate or value
/// - [`Error::DegenerateGeometry`] unless three non-collinear sample
///   locations remain after coincident samples are merged
/// - [`Error::Interpolation`] if no variogram can be fitted for kriging
/// - [`Error::Numerical`] if the kriging system is singular
pub fn interpolate(
    points: &[SamplePoint],
    boundary: &SiteBoundary,
    params: &InterpolationParams,
) -> Result<InterpolatedSurface> {
    params.validate()?;

    if let Some(bad) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite() && p.value.is_finite())) {
        return Err(Error::Interpolation(format!(
            "non-finite sample at ({}, {}) = {}",
            bad.x, bad.y, bad.value
        )));
    }

    let (samples, conflicts) = idw::merge_coincident(points, params.snap_distance);
    if samples.len() < points.len() {
        tracing::debug!(before = points.len(), after = samples.len(), "merged coincident samples");
    }
    if conflicts > 0 {
        tracing::warn!(groups = conflicts, "coincident samples with differing values were averaged");
    }
    idw::ensure_spread(&samples)?;
    let interpolator = Interpolator::prepare(samples, params)?;

    let extent = boundary.extent().expanded(params.buffer_distance);
    let (rows, cols, transform) = params.grid.layout(&extent)?;
    tracing::debug!(rows, cols, cell_width = transform.cell_width, "interpolation grid");

    let buffer = params.buffer_distance;
    let row_values = params.execution.map_indexed(rows, |row| {
        (0..cols)
            .map(|col| {
                let (x, y) = transform.cell_center(col, row);
                boundary
                    .within_buffer(x, y, buffer)
                    .then(|| interpolator.value(x, y))
            })
            .collect::<Vec<_>>()
    })?;

    let grid = Grid::from_vec(row_values.into_iter().flatten().collect(), rows, cols, transform)?;

    let variogram = match &interpolator.kernel {
        Kernel::Kriging(ok) => Some(*ok.variogram()),
        _ => None,
    };
    Ok(InterpolatedSurface {
        grid,
        method: params.method,
        variogram,
        buffer_distance: buffer,
        interpolator,
        boundary: boundary.clone(),
    })
}
