//! Median-window foreground segmentation.
//!
//! A detection box around a person also covers floor, walls and whatever is
//! behind them. The person is assumed to be the dominant depth layer inside
//! the box, so samples are gated to the sensor's valid range and then kept
//! only if they lie within a fixed window around the box's median depth.
//!
//! The "median" is the order statistic at index `n / 2` (zero-based). For
//! even `n` this is the upper of the two middle values, never their mean.
//!
//! The window is applied in whole millimetres, the sensor's native unit, so
//! a reading exactly on either edge is always kept.

use nalgebra::Vector3;

use crate::camera::CameraModel;

use super::depth_grid::{DepthGrid, MM_PER_M};
use super::roi::Roi;

/// Nearest valid depth reading (meters).
pub const MIN_DEPTH_M: f64 = 0.01;
/// Farthest valid depth reading (meters).
pub const MAX_DEPTH_M: f64 = 6.0;
/// Half-width of the window kept around the median depth (millimetres).
pub const DEPTH_WINDOW_MM: u16 = 120;

/// One valid depth pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSample {
    /// Pixel column.
    pub px: u32,
    /// Pixel row.
    pub py: u32,
    /// Metric depth along the optical axis.
    pub depth: f64,
}

impl DepthSample {
    pub fn new(px: u32, py: u32, depth: f64) -> Self {
        Self { px, py, depth }
    }

    /// Depth rounded to whole millimetres.
    pub fn depth_mm(&self) -> i64 {
        (self.depth * MM_PER_M).round() as i64
    }

    /// Camera-frame point of this sample.
    pub fn back_project(&self, camera: &CameraModel) -> Vector3<f64> {
        camera.back_project(self.px as f64, self.py as f64, self.depth)
    }
}

/// Ordered depth samples belonging to one detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<DepthSample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<DepthSample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: DepthSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DepthSample> {
        self.samples.iter()
    }

    /// Depth values in sample order.
    pub fn depths(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.depth).collect()
    }

    /// Order statistic at `len / 2` over this set's depths.
    pub fn median_depth(&self) -> Option<f64> {
        order_statistic(&mut self.depths())
    }

    /// `(min, max)` pixel column over all samples.
    pub fn column_extent(&self) -> Option<(u32, u32)> {
        let mut iter = self.samples.iter().map(|s| s.px);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))))
    }

    /// Keep only samples within `half_width_mm` of `center` (inclusive).
    fn retain_depth_window(&mut self, center: f64, half_width_mm: u16) {
        let center_mm = (center * MM_PER_M).round() as i64;
        self.samples
            .retain(|s| (s.depth_mm() - center_mm).abs() <= i64::from(half_width_mm));
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a DepthSample;
    type IntoIter = std::slice::Iter<'a, DepthSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Order statistic at index `values.len() / 2`.
///
/// Uses a partial selection, so `values` is reordered. Returns `None` for an
/// empty slice. The caller's copy of the data must not be assumed to keep
/// its original order afterwards.
pub fn order_statistic(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let idx = values.len() / 2;
    let (_, nth, _) = values.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    Some(*nth)
}

/// Result of segmenting one box, with the numbers behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    /// Samples that survived the median window.
    pub samples: SampleSet,
    /// Valid-range samples before the median window.
    pub n_candidates: usize,
    /// Median depth used for the window (`None` when there were no candidates).
    pub filter_median: Option<f64>,
}

/// Extracts the foreground depth samples inside a detection box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSegmenter {
    min_depth: f64,
    max_depth: f64,
    window_mm: u16,
}

impl Default for DepthSegmenter {
    fn default() -> Self {
        Self {
            min_depth: MIN_DEPTH_M,
            max_depth: MAX_DEPTH_M,
            window_mm: DEPTH_WINDOW_MM,
        }
    }
}

impl DepthSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment `roi` in `grid`. Empty when no pixel in the box is valid.
    pub fn segment(&self, roi: &Roi, grid: &DepthGrid) -> SampleSet {
        self.segment_detailed(roi, grid).samples
    }

    /// Like [`segment`](Self::segment) but also reports candidate count and
    /// the window median.
    pub fn segment_detailed(&self, roi: &Roi, grid: &DepthGrid) -> Segmentation {
        let mut candidates = self.collect_candidates(roi, grid);
        let n_candidates = candidates.len();

        let Some(median) = candidates.median_depth() else {
            return Segmentation::default();
        };

        candidates.retain_depth_window(median, self.window_mm);

        Segmentation {
            samples: candidates,
            n_candidates,
            filter_median: Some(median),
        }
    }

    /// Valid-range samples inside the clipped box, row-major.
    fn collect_candidates(&self, roi: &Roi, grid: &DepthGrid) -> SampleSet {
        let mut set = SampleSet::new();
        let Some(clipped) = roi.clip(grid.rows(), grid.cols()) else {
            return set;
        };

        for row in clipped.row_start..clipped.row_end {
            for col in clipped.col_start..clipped.col_end {
                let Some(depth) = grid.depth_m(row, col) else {
                    continue;
                };
                if !self.is_valid_depth(depth) {
                    continue;
                }
                set.push(DepthSample::new(col as u32, row as u32, depth));
            }
        }
        set
    }

    #[inline]
    fn is_valid_depth(&self, depth: f64) -> bool {
        depth.is_finite() && depth >= self.min_depth && depth <= self.max_depth
    }
}
