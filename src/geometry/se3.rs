//! SE3: rigid-body transform (rotation + translation).

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Rigid-body transformation `p' = R * p + t`.
///
/// Named with the `T_target_source` convention: an `SE3` called `t_laser_cam`
/// maps camera-frame points into the laser frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from a rotation matrix and translation.
    ///
    /// The matrix is assumed orthonormal with determinant +1.
    pub fn from_rt(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let rot3 = Rotation3::from_matrix_unchecked(rotation);
        Self {
            rotation: UnitQuaternion::from_rotation_matrix(&rot3),
            translation,
        }
    }

    /// Transform a point.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Rotation as `[x, y, z, w]`, the order used on the wire.
    pub fn quaternion_xyzw(&self) -> [f64; 4] {
        let q = self.rotation.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    /// Translation as `[x, y, z]`.
    pub fn translation_array(&self) -> [f64; 3] {
        [self.translation.x, self.translation.y, self.translation.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pose() -> SE3 {
        SE3 {
            rotation: UnitQuaternion::from_euler_angles(0.1, -0.4, 1.2),
            translation: Vector3::new(0.5, -1.0, 2.0),
        }
    }

    #[test]
    fn test_transform_point_rotates_then_translates() {
        let t = sample_pose();
        let p = Vector3::new(0.3, -0.2, 1.5);

        let expected = t.rotation.to_rotation_matrix().matrix() * p + t.translation;
        assert_relative_eq!(t.transform_point(&p), expected, epsilon = 1e-12);
        assert_relative_eq!(SE3::identity().transform_point(&p), p, epsilon = 1e-15);
    }

    #[test]
    fn test_from_rt_keeps_rotation() {
        let t = sample_pose();
        let back = SE3::from_rt(t.rotation.to_rotation_matrix().into_inner(), t.translation);

        assert_eq!(back.translation, t.translation);
        assert_relative_eq!(back.rotation.angle_to(&t.rotation), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_identity_quaternion_order() {
        assert_eq!(SE3::identity().quaternion_xyzw(), [0.0, 0.0, 0.0, 1.0]);
    }
}
