//! Camera-to-parent extrinsic from a mounting offset and pitch.
//!
//! The rotation is built from an explicit orthonormal basis instead of Euler
//! angles so the axis permutation of the rear-facing mount is visible:
//!
//! ```text
//! basis_x = (0, 1, 0)
//! basis_z = (-cos(pitch), 0, sin(pitch))
//! basis_y = basis_z × basis_x
//! R       = [basis_x | basis_y | basis_z]
//! ```
//!
//! The result depends only on configuration, so callers compute it once.

use nalgebra::Vector3;

use super::SE3;
use super::frames::rotation_from_basis;

/// Camera position and tilt relative to the parent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMount {
    /// Camera origin in the parent frame (meters).
    pub offset: Vector3<f64>,
    /// Upward tilt of the optical axis (degrees).
    pub pitch_deg: f64,
}

impl CameraMount {
    pub fn new(offset: Vector3<f64>, pitch_deg: f64) -> Self {
        Self { offset, pitch_deg }
    }

    /// `T_parent_camera` for this mount.
    pub fn extrinsic(&self) -> SE3 {
        compose_extrinsic(self.offset, self.pitch_deg)
    }
}

/// Camera axes expressed in the parent frame, `[x, y, z]`.
pub fn mount_basis(pitch_deg: f64) -> [Vector3<f64>; 3] {
    let pitch = pitch_deg * std::f64::consts::PI / 180.0;

    let basis_x = Vector3::new(0.0, 1.0, 0.0);
    let basis_z = Vector3::new(-pitch.cos(), 0.0, pitch.sin());
    let basis_y = basis_z.cross(&basis_x);

    [basis_x, basis_y, basis_z]
}

/// `T_parent_camera`: translation is `offset` verbatim, rotation comes from
/// [`mount_basis`].
pub fn compose_extrinsic(offset: Vector3<f64>, pitch_deg: f64) -> SE3 {
    let [x, y, z] = mount_basis(pitch_deg);
    SE3::from_rt(rotation_from_basis(&x, &y, &z), offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frames::is_rotation;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_basis_orthonormal_for_any_pitch() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let pitch: f64 = rng.gen_range(-360.0..360.0);
            let [x, y, z] = mount_basis(pitch);

            assert_relative_eq!(x.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(y.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(z.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(x.dot(&y), 0.0, epsilon = 1e-12);
            assert_relative_eq!(y.dot(&z), 0.0, epsilon = 1e-12);
            assert_relative_eq!(z.dot(&x), 0.0, epsilon = 1e-12);
            assert!(is_rotation(&rotation_from_basis(&x, &y, &z), 1e-9));
        }
    }

    #[test]
    fn test_zero_pitch_forward_maps_to_negative_x() {
        let t = compose_extrinsic(Vector3::zeros(), 0.0);

        let forward = t.rotation * Vector3::z();
        assert_relative_eq!(forward, -Vector3::x(), epsilon = 1e-12);

        let right = t.rotation * Vector3::x();
        assert_relative_eq!(right, Vector3::y(), epsilon = 1e-12);

        let down = t.rotation * Vector3::y();
        assert_relative_eq!(down, -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_pitch_tilts_optical_axis_up() {
        let t = compose_extrinsic(Vector3::zeros(), 16.5);
        let forward = t.rotation * Vector3::z();
        let pitch = 16.5f64.to_radians();

        assert_relative_eq!(forward, Vector3::new(-pitch.cos(), 0.0, pitch.sin()), epsilon = 1e-12);
    }

    #[test]
    fn test_quaternion_matches_basis_matrix() {
        let [x, y, z] = mount_basis(30.0);
        let m = rotation_from_basis(&x, &y, &z);
        let t = compose_extrinsic(Vector3::zeros(), 30.0);

        assert_relative_eq!(t.rotation.to_rotation_matrix().into_inner(), m, epsilon = 1e-12);
        assert_relative_eq!(t.rotation.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_translation_is_offset_verbatim() {
        let offset = Vector3::new(-0.075, -0.01, 0.174);
        let t = compose_extrinsic(offset, 16.5);

        assert_eq!(t.translation, offset);
    }

    #[test]
    fn test_composition_is_bitwise_idempotent() {
        let offset = Vector3::new(-0.075, -0.01, 0.174);
        let a = compose_extrinsic(offset, 16.5);
        let b = compose_extrinsic(offset, 16.5);

        assert_eq!(a.translation_array(), b.translation_array());
        let (qa, qb) = (a.quaternion_xyzw(), b.quaternion_xyzw());
        for i in 0..4 {
            assert_eq!(qa[i].to_bits(), qb[i].to_bits());
        }
    }

    #[test]
    fn test_mount_extrinsic_matches_free_function() {
        let mount = CameraMount::new(Vector3::new(0.1, 0.2, 0.3), -5.0);
        assert_eq!(mount.extrinsic(), compose_extrinsic(mount.offset, mount.pitch_deg));
    }
}
