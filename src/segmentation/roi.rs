use serde::{Deserialize, Serialize};

/// Detection bounding box in pixel coordinates.
///
/// Detectors may report boxes that extend past the image border (or lie
/// entirely outside it), so offsets are signed and the box is only ever
/// read through [`Roi::clip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roi {
    pub x_offset: i32,
    pub y_offset: i32,
    pub width: i32,
    pub height: i32,
}

/// Half-open pixel ranges of a box after clipping against a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedRoi {
    pub col_start: usize,
    pub col_end: usize,
    pub row_start: usize,
    pub row_end: usize,
}

impl ClippedRoi {
    pub fn is_empty(&self) -> bool {
        self.col_start >= self.col_end || self.row_start >= self.row_end
    }
}

impl Roi {
    pub fn new(x_offset: i32, y_offset: i32, width: i32, height: i32) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    /// Clip to a `rows x cols` grid. Returns `None` when nothing is left.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<ClippedRoi> {
        let (col_start, col_end) = clip_span(self.x_offset, self.width, cols);
        let (row_start, row_end) = clip_span(self.y_offset, self.height, rows);

        let clipped = ClippedRoi {
            col_start,
            col_end,
            row_start,
            row_end,
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Intersect `[offset, offset + len)` with `[0, limit)`.
fn clip_span(offset: i32, len: i32, limit: usize) -> (usize, usize) {
    let start = i64::from(offset).max(0);
    let end = (i64::from(offset) + i64::from(len.max(0))).min(limit as i64);
    if end <= start {
        (0, 0)
    } else {
        (start as usize, end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_box_unchanged() {
        let clipped = Roi::new(2, 3, 4, 5).clip(10, 10).unwrap();

        assert_eq!(
            clipped,
            ClippedRoi {
                col_start: 2,
                col_end: 6,
                row_start: 3,
                row_end: 8
            }
        );
    }

    #[test]
    fn test_partially_outside_is_clipped() {
        let clipped = Roi::new(-3, 8, 5, 10).clip(10, 6).unwrap();

        assert_eq!((clipped.col_start, clipped.col_end), (0, 2));
        assert_eq!((clipped.row_start, clipped.row_end), (8, 10));
    }

    #[test]
    fn test_fully_outside_is_none() {
        assert!(Roi::new(20, 0, 5, 5).clip(10, 10).is_none());
        assert!(Roi::new(-10, 0, 5, 5).clip(10, 10).is_none());
        assert!(Roi::new(0, 10, 5, 5).clip(10, 10).is_none());
    }

    #[test]
    fn test_degenerate_sizes_are_none() {
        assert!(Roi::new(1, 1, 0, 5).clip(10, 10).is_none());
        assert!(Roi::new(1, 1, -4, 5).clip(10, 10).is_none());
    }

    #[test]
    fn test_extreme_offsets_do_not_overflow() {
        assert!(Roi::new(i32::MAX, 0, i32::MAX, 1).clip(10, 10).is_none());
        let clipped = Roi::new(i32::MIN, 0, i32::MAX, 1).clip(10, 10);
        assert!(clipped.is_none());
    }
}
