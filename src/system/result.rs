//! Per-frame outcome and diagnostics.
//!
//! These types describe what happened while processing one pair:
//! - whether anything was published
//! - which detection was selected
//! - segmentation counts
//! - timing information for profiling

use nalgebra::Vector3;

use crate::projection::RelativePose;

/// What the processor published for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Cloud, relative pose and both transforms went out.
    Published,
    /// No person detection had valid depth; only the camera extrinsic went out.
    NoDetection,
}

/// Summary of one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub status: FrameStatus,
    /// Index into the detection list of the detection that was used.
    pub detection_index: Option<usize>,
    /// Person detections that were segmented (including empty ones).
    pub n_person_detections_tried: usize,
    /// Valid-range samples of the selected detection.
    pub n_candidates: usize,
    /// Samples kept by the median window (= cloud size).
    pub n_segmented: usize,
    /// Median the window was centred on.
    pub filter_median: Option<f64>,
    pub pose: Option<RelativePose>,
    /// Person position in the camera's parent frame.
    pub position_in_parent: Option<Vector3<f64>>,
    /// Stamp used for every message of this frame.
    pub stamp_ns: u64,
    pub timing: TimingStats,
}

impl FrameResult {
    pub fn published(&self) -> bool {
        self.status == FrameStatus::Published
    }
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingStats {
    pub total_ms: f64,
    pub segment_ms: f64,
    pub publish_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self::default()
    }
}
