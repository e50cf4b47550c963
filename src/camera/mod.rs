//! Depth camera model: pinhole intrinsics and back-projection.

pub mod model;

pub use model::CameraModel;
