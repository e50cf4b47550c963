//! Coordinate frame names and conventions.
//!
//! # Frames
//!
//! There are three frames involved in every published message:
//!
//! 1. **Camera frame** (`"camera"`) - where the cloud and relative pose live
//! 2. **Relative pose frame** (`"relative_pose"`) - the tracked person
//! 3. **Parent frame** (configurable, default `"laser"`) - the vehicle frame
//!    the camera is mounted on
//!
//! ## Camera Frame (RDF - OpenCV/Computer Vision convention)
//! ```text
//!        +Y (down)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (forward, optical axis)
//! ```
//!
//! ## Parent Frame (FLU - laser / base convention)
//! ```text
//!        +Z (up)
//!         |
//!         |
//!         +------ +Y (left)
//!        /
//!       /
//!      +X (forward)
//! ```
//!
//! # Mounting
//!
//! The depth camera is rear-facing: its optical axis points along the
//! parent's −X axis, tilted upward by the mounting pitch. At zero pitch:
//!
//! - Camera +X (right)   → Parent +Y
//! - Camera +Y (down)    → Parent −Z
//! - Camera +Z (forward) → Parent −X
//!
//! See [`super::extrinsic`] for the pitch-dependent basis.
//!
//! # Transformation Naming Convention
//!
//! `T_target_source` maps points from `source` into `target`:
//! ```text
//! p_laser = T_laser_camera * p_camera
//! ```
//! A broadcast with parent `P` and child `C` carries `T_P_C`.

use nalgebra::{Matrix3, Vector3};

/// Frame of the depth camera; the cloud and relative pose are expressed here.
pub const CAMERA_FRAME: &str = "camera";

/// Child frame of the relative pose broadcast.
pub const RELATIVE_POSE_FRAME: &str = "relative_pose";

/// Default parent of the camera frame.
pub const DEFAULT_PARENT_FRAME: &str = "laser";

/// Rotation matrix whose columns are the images of the source axes.
///
/// `x`, `y`, `z` are where the source frame's X, Y, Z axes point when
/// expressed in the target frame.
#[rustfmt::skip]
pub fn rotation_from_basis(x: &Vector3<f64>, y: &Vector3<f64>, z: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        x.x, y.x, z.x,
        x.y, y.y, z.y,
        x.z, y.z, z.z,
    )
}

/// True when `m` is orthonormal with determinant +1 (within `tol`).
pub fn is_rotation(m: &Matrix3<f64>, tol: f64) -> bool {
    let should_be_identity = m.transpose() * m - Matrix3::identity();
    should_be_identity.abs().max() <= tol && (m.determinant() - 1.0).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_basis_columns() {
        let x = Vector3::new(0.0, 1.0, 0.0);
        let y = Vector3::new(0.0, 0.0, -1.0);
        let z = Vector3::new(-1.0, 0.0, 0.0);
        let r = rotation_from_basis(&x, &y, &z);

        assert_eq!(r * Vector3::x(), x);
        assert_eq!(r * Vector3::y(), y);
        assert_eq!(r * Vector3::z(), z);
        assert!(is_rotation(&r, 1e-12));
    }

    #[test]
    fn test_reflection_is_not_rotation() {
        let r = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        assert!(!is_rotation(&r, 1e-9));
    }
}
