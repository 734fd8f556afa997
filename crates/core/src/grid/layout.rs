//! Grid resolution and placement over an extent

use serde::{Deserialize, Serialize};

use super::GeoTransform;
use crate::boundary::Extent;
use crate::error::{Error, Result};

/// Upper bound on the number of cells a single run may allocate.
const MAX_CELLS: usize = 25_000_000;

/// How finely an extent is divided into cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpec {
    /// Fixed number of rows and columns stretched over the extent
    Cells { rows: usize, cols: usize },
    /// Square cells of the given size; the grid covers the extent
    CellSize(f64),
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec::Cells { rows: 100, cols: 100 }
    }
}

impl GridSpec {
    /// Check the layout parameters on their own, without an extent.
    pub fn validate(&self) -> Result<()> {
        match *self {
            GridSpec::Cells { rows, cols } => {
                if rows == 0 || cols == 0 {
                    return Err(Error::config(
                        "grid",
                        format!("{}x{}", rows, cols),
                        "rows and cols must be at least 1",
                    ));
                }
                if rows.saturating_mul(cols) > MAX_CELLS {
                    return Err(Error::config(
                        "grid",
                        format!("{}x{}", rows, cols),
                        format!("more than {} cells", MAX_CELLS),
                    ));
                }
            }
            GridSpec::CellSize(size) => {
                if !size.is_finite() || size <= 0.0 {
                    return Err(Error::config("grid.cell_size", size, "must be a positive number"));
                }
            }
        }
        Ok(())
    }

    /// Resolve to `(rows, cols, transform)` covering `extent`.
    pub fn layout(&self, extent: &Extent) -> Result<(usize, usize, GeoTransform)> {
        self.validate()?;
        let width = extent.width();
        let height = extent.height();
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "extent has zero area ({} x {})",
                width, height
            )));
        }

        let (rows, cols, cell_w, cell_h) = match *self {
            GridSpec::Cells { rows, cols } => (rows, cols, width / cols as f64, height / rows as f64),
            GridSpec::CellSize(size) => {
                let cols = ((width / size).ceil() as usize).max(1);
                let rows = ((height / size).ceil() as usize).max(1);
                if rows.saturating_mul(cols) > MAX_CELLS {
                    return Err(Error::config(
                        "grid.cell_size",
                        size,
                        format!("{}x{} cells exceeds {}", rows, cols, MAX_CELLS),
                    ));
                }
                (rows, cols, size, size)
            }
        };

        let transform = GeoTransform::new(extent.min_x, extent.max_y, cell_w, -cell_h);
        Ok((rows, cols, transform))
    }
}
