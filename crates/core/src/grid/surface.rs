//! Georeferenced 2D grid of cell values

use ndarray::Array2;
use serde::Serialize;

use super::GeoTransform;
use crate::error::{Error, Result};

/// A georeferenced grid stored in row-major order (row 0 = north edge).
///
/// Cells are addressed as `(row, col)`; [`Grid::iter`] visits them in
/// row-major scan order, which is the order used by every export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid<T> {
    data: Array2<T>,
    transform: GeoTransform,
}

impl<T: Clone> Grid<T> {
    /// Grid filled with one value
    pub fn filled(rows: usize, cols: usize, value: T, transform: GeoTransform) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform,
        }
    }

    /// Grid from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize, transform: GeoTransform) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidInput(format!(
                "grid data has {} values, expected {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self { data, transform })
    }

    /// Same geometry, values mapped cell by cell
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            data: self.data.map(f),
            transform: self.transform,
        }
    }
}

impl<T> Grid<T> {
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.data.get((row, col))
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::InvalidInput(format!(
                "cell ({}, {}) outside {}x{} grid",
                row, col, rows, cols
            ))),
        }
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Center coordinates of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.cell_center(col, row)
    }

    /// Cell containing a site coordinate, if it falls on the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_cell(x, y);
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// `(row, col, value)` in row-major scan order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.data.indexed_iter().map(|((r, c), v)| (r, c, v))
    }

    /// Underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform() -> GeoTransform {
        GeoTransform::new(0.0, 10.0, 1.0, -1.0)
    }

    #[test]
    fn test_grid_access() {
        let mut grid = Grid::filled(10, 10, 0.0, transform());
        grid.set(5, 5, 42.0).unwrap();
        assert_eq!(grid.get(5, 5), Some(&42.0));
        assert!(grid.set(10, 0, 1.0).is_err());
        assert_eq!(grid.get(0, 10), None);
    }

    #[test]
    fn test_row_major_order() {
        let grid = Grid::from_vec((0..6).collect(), 2, 3, transform()).unwrap();
        let order: Vec<_> = grid.iter().map(|(_, _, v)| *v).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
        let (r, c, _) = grid.iter().nth(4).unwrap();
        assert_eq!((r, c), (1, 1));
    }

    #[test]
    fn test_cell_at() {
        let grid = Grid::filled(10, 10, 0u8, transform());
        assert_eq!(grid.cell_at(0.5, 9.5), Some((0, 0)));
        assert_eq!(grid.cell_at(9.9, 0.1), Some((9, 9)));
        assert_eq!(grid.cell_at(-0.1, 5.0), None);
        assert_eq!(grid.cell_at(5.0, 10.5), None);
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        assert!(Grid::from_vec(vec![1.0; 5], 2, 3, transform()).is_err());
    }
}
