//! Back-projection of segmented depth samples into the camera frame.
//!
//! - `point_cloud`: every sample becomes a 3D point
//! - `pose`: the sample set collapses to one representative position

pub mod point_cloud;
pub mod pose;

pub use point_cloud::{PointCloud, project, project_into};
pub use pose::{RelativePose, estimate};
