use anyhow::{Result, bail};
use nalgebra::Vector3;
use serde::Deserialize;

/// Pinhole intrinsics of the depth camera.
///
/// Depth images are assumed to be registered and undistorted upstream, so
/// back-projection is the plain pinhole inverse:
///
/// ```text
/// x = (u - cx) / fx * z
/// y = (v - cy) / fy * z
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Build from an intrinsics list `[fx, fy, cx, cy]` (EuRoC sensor.yaml order).
    pub fn from_intrinsics(intrinsics: &[f64]) -> Result<Self> {
        if intrinsics.len() != 4 {
            bail!(
                "Expected 4 intrinsics [fx, fy, cx, cy], got {}",
                intrinsics.len()
            );
        }
        Ok(Self::new(
            intrinsics[0],
            intrinsics[1],
            intrinsics[2],
            intrinsics[3],
        ))
    }

    /// Horizontal camera-frame coordinate of pixel column `u` at depth `z`.
    #[inline]
    pub fn back_project_x(&self, u: f64, z: f64) -> f64 {
        (u - self.cx) / self.fx * z
    }

    /// Vertical camera-frame coordinate of pixel row `v` at depth `z`.
    #[inline]
    pub fn back_project_y(&self, v: f64, z: f64) -> f64 {
        (v - self.cy) / self.fy * z
    }

    /// Back-project pixel `(u, v)` with metric depth `z` into the camera frame.
    pub fn back_project(&self, u: f64, v: f64, z: f64) -> Vector3<f64> {
        Vector3::new(self.back_project_x(u, z), self.back_project_y(v, z), z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_back_project_formula() {
        let cam = CameraModel::new(500.0, 480.0, 320.0, 240.0);
        let p = cam.back_project(420.0, 120.0, 2.0);

        assert_relative_eq!(p.x, (420.0 - 320.0) / 500.0 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, (120.0 - 240.0) / 480.0 * 2.0, epsilon = 1e-12);
        assert_eq!(p.z, 2.0);
    }

    #[test]
    fn test_principal_point_maps_to_optical_axis() {
        let cam = CameraModel::new(570.0, 570.0, 319.5, 239.5);
        let p = cam.back_project(319.5, 239.5, 3.0);

        assert_eq!(p, Vector3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_from_intrinsics_rejects_wrong_length() {
        assert!(CameraModel::from_intrinsics(&[1.0, 2.0, 3.0]).is_err());
        let cam = CameraModel::from_intrinsics(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(cam, CameraModel::new(1.0, 2.0, 3.0, 4.0));
    }
}
