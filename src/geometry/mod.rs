//! Geometry utilities: SE3 transforms, frame conventions, sensor mounting.

pub mod extrinsic;
pub mod frames;
pub mod se3;

pub use extrinsic::{CameraMount, compose_extrinsic, mount_basis};
pub use se3::SE3;
