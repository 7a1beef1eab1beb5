//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D grid of cells.
///
/// `Raster<T>` stores values of type `T` in row-major order together with
/// the [`GeoTransform`] that places every cell in map coordinates. Border
/// extraction uses `Raster<i32>` for region labels and `Raster<f64>` for
/// distance and direction fields.
///
/// # Example
///
/// ```ignore
/// use carto_core::{GeoTransform, Raster};
///
/// let mut labels: Raster<i32> = Raster::new(10, 20);
/// labels.set_transform(GeoTransform::north_up(0.0, 10.0, 1.0));
/// labels.set(2, 3, 7)?;
/// assert_eq!(labels.sample(3.5, 7.5), Some(7));
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Cell values stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            transform: GeoTransform::default(),
            nodata: None,
        })
    }

    /// Create a raster with the same transform but a different cell type,
    /// filled with `fill_value`.
    pub fn like<U: RasterElement>(&self, fill_value: U) -> Raster<U> {
        Raster {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
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

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    // Coordinate conversion

    /// Map coordinates of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Cell (row, col) containing the map coordinate, if it lies on the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Nearest-cell lookup of the value at a map coordinate
    pub fn sample(&self, x: f64, y: f64) -> Option<T> {
        self.cell_at(x, y).map(|(row, col)| self.data[(row, col)])
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding a valid (non no-data) value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<i32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_from_vec_dimension_check() {
        assert!(Raster::<i32>::from_vec(vec![1, 2, 3], 2, 2).is_err());
        let r = Raster::<i32>::from_vec(vec![1, 2, 3, 4], 2, 2).unwrap();
        assert_eq!(r.get(1, 0).unwrap(), 3);
    }

    #[test]
    fn test_sample_uses_nearest_cell() {
        let mut raster: Raster<i32> = Raster::new(4, 5);
        raster.set_transform(GeoTransform::north_up(10.0, 20.0, 2.0));
        raster.set(1, 2, 9).unwrap();

        // Cell (1, 2) spans x in [14, 16), y in (16, 18]
        assert_eq!(raster.sample(15.9, 16.1), Some(9));
        assert_eq!(raster.cell_at(14.0, 17.0), Some((1, 2)));
        assert_eq!(raster.sample(9.9, 19.0), None);
        assert_eq!(raster.sample(15.0, 12.0), None);
    }

    #[test]
    fn test_valid_count() {
        let mut raster: Raster<i32> = Raster::new(3, 3);
        raster.set_nodata(Some(0));
        raster.set(0, 0, 1).unwrap();
        raster.set(2, 2, 2).unwrap();
        assert_eq!(raster.valid_count(), 2);

        let field: Raster<f64> = raster.like(f64::NAN);
        assert_eq!(field.shape(), (3, 3));
        assert_eq!(field.valid_count(), 0);
    }
}
