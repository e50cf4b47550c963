use anyhow::{Result, bail};

/// Millimetres per metre for raw 16-bit depth.
pub const MM_PER_M: f64 = 1000.0;

/// Row-major grid of raw depth samples in millimetres.
///
/// A value of 0 is the usual "no return" sentinel of structured-light and
/// ToF sensors; it falls outside the valid range and is rejected by the
/// segmenter like any other out-of-range reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    rows: usize,
    cols: usize,
    data: Vec<u16>,
}

impl DepthGrid {
    /// Wrap a row-major buffer of `rows * cols` samples.
    pub fn new(rows: usize, cols: usize, data: Vec<u16>) -> Result<Self> {
        if data.len() != rows * cols {
            bail!(
                "Depth buffer has {} samples, expected {}x{} = {}",
                data.len(),
                rows,
                cols,
                rows * cols
            );
        }
        Ok(Self { rows, cols, data })
    }

    /// Grid with every sample set to `mm`.
    pub fn filled(rows: usize, cols: usize, mm: u16) -> Self {
        Self {
            rows,
            cols,
            data: vec![mm; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw millimetre sample, `None` outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u16> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Sample converted to metres, `None` outside the grid.
    #[inline]
    pub fn depth_m(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).map(|mm| mm as f64 / MM_PER_M)
    }

    /// Overwrite one sample. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, mm: u16) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = mm;
        }
    }

    /// Fill an axis-aligned block (clipped to the grid) with `mm`.
    pub fn fill_block(&mut self, row: usize, col: usize, height: usize, width: usize, mm: u16) {
        let row_end = (row + height).min(self.rows);
        let col_end = (col + width).min(self.cols);
        for r in row..row_end {
            for c in col..col_end {
                self.data[r * self.cols + c] = mm;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_size_mismatch() {
        assert!(DepthGrid::new(2, 3, vec![0; 5]).is_err());
        assert!(DepthGrid::new(2, 3, vec![0; 6]).is_ok());
    }

    #[test]
    fn test_row_major_indexing() {
        let grid = DepthGrid::new(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();

        assert_eq!(grid.get(0, 2), Some(3));
        assert_eq!(grid.get(1, 0), Some(4));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, 3), None);
    }

    #[test]
    fn test_depth_conversion_to_meters() {
        let grid = DepthGrid::filled(1, 1, 1500);
        assert_eq!(grid.depth_m(0, 0), Some(1.5));
    }

    #[test]
    fn test_fill_block_clips() {
        let mut grid = DepthGrid::filled(3, 3, 0);
        grid.fill_block(1, 1, 10, 10, 7);

        assert_eq!(grid.get(0, 0), Some(0));
        assert_eq!(grid.get(1, 1), Some(7));
        assert_eq!(grid.get(2, 2), Some(7));
        assert_eq!(grid.get(1, 2), Some(7));
        assert_eq!(grid.get(2, 1), Some(7));
        assert_eq!(grid.get(0, 2), Some(0));
    }
}
