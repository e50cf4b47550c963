//! Foreground depth segmentation inside a detection box.
//!
//! - `DepthGrid`: raw 16-bit millimetre depth image
//! - `Roi`: detection bounding box, clipped against the grid
//! - `DepthSegmenter`: valid-range gating + median-window background rejection

pub mod depth_grid;
pub mod roi;
pub mod segmenter;

pub use depth_grid::DepthGrid;
pub use roi::{ClippedRoi, Roi};
pub use segmenter::{
    DEPTH_WINDOW_MM, DepthSample, DepthSegmenter, MAX_DEPTH_M, MIN_DEPTH_M, SampleSet,
    Segmentation, order_statistic,
};
