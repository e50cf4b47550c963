//! Single-position estimate of the segmented person.
//!
//! Horizontal position comes from the middle of the segmented pixel columns,
//! depth from the order statistic of the segmented depths. No vertical or
//! orientation estimate is attempted: one box and a depth layer do not
//! constrain either, so `y = 0` and the rotation is identity.

use nalgebra::{UnitQuaternion, Vector3};

use crate::camera::CameraModel;
use crate::geometry::SE3;
use crate::segmentation::SampleSet;

/// Person position relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePose {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl RelativePose {
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            translation,
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn to_se3(&self) -> SE3 {
        SE3 {
            rotation: self.rotation,
            translation: self.translation,
        }
    }

    /// Planar range from the camera (ignores y).
    pub fn range(&self) -> f64 {
        self.translation.x.hypot(self.translation.z)
    }

    /// Bearing around the camera's vertical axis, positive to the right.
    pub fn bearing(&self) -> f64 {
        self.translation.x.atan2(self.translation.z)
    }
}

/// Estimate the person position from an already segmented sample set.
///
/// The depth order statistic is recomputed here over the filtered set; it
/// generally differs from the one the segmenter filtered around.
pub fn estimate(samples: &SampleSet, camera: &CameraModel) -> Option<RelativePose> {
    let (min_x, max_x) = samples.column_extent()?;
    let z = samples.median_depth()?;

    let center_px = (min_x as f64 + max_x as f64) / 2.0;
    let x = camera.back_project_x(center_px, z);

    Some(RelativePose::from_translation(Vector3::new(x, 0.0, z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{DepthGrid, DepthSample, DepthSegmenter, Roi};
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::new(570.0, 570.0, 320.0, 240.0)
    }

    #[test]
    fn test_empty_set_has_no_pose() {
        assert!(estimate(&SampleSet::new(), &camera()).is_none());
    }

    #[test]
    fn test_uniform_box_depth_is_exact() {
        let grid = DepthGrid::filled(480, 640, 2345);
        let samples = DepthSegmenter::new().segment(&Roi::new(100, 50, 80, 200), &grid);

        let pose = estimate(&samples, &camera()).unwrap();

        assert_eq!(pose.translation.z, 2.345);
        assert_eq!(pose.translation.y, 0.0);
        // Columns 100..=179, centre 139.5.
        assert_relative_eq!(
            pose.translation.x,
            (139.5 - 320.0) / 570.0 * 2.345,
            epsilon = 1e-12
        );
        assert_eq!(pose.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn test_center_uses_column_extent_not_mean() {
        // Most samples sit at column 10, one outlier column at 30.
        let mut samples: Vec<DepthSample> = (0..9).map(|r| DepthSample::new(10, r, 1.0)).collect();
        samples.push(DepthSample::new(30, 0, 1.0));
        let set = SampleSet::from_samples(samples);

        let cam = CameraModel::new(100.0, 100.0, 0.0, 0.0);
        let pose = estimate(&set, &cam).unwrap();

        assert_relative_eq!(pose.translation.x, 20.0 / 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_depth_uses_upper_middle_for_even_count() {
        let set = SampleSet::from_samples(vec![
            DepthSample::new(0, 0, 1.00),
            DepthSample::new(1, 0, 1.10),
            DepthSample::new(2, 0, 1.05),
            DepthSample::new(3, 0, 1.15),
        ]);

        let pose = estimate(&set, &camera()).unwrap();

        // Sorted [1.00, 1.05, 1.10, 1.15], index 2.
        assert_eq!(pose.translation.z, 1.10);
    }

    #[test]
    fn test_median_recomputed_after_filtering() {
        // 5 samples at 2.0 m, 4 at 2.1 m, 4 far outliers at 5.0 m; n = 13.
        // Filter median (index 6) is 2.1: the window keeps 2.0 and 2.1.
        // Over the 9 retained samples index 4 is 2.0.
        let mut grid = DepthGrid::new(1, 13, vec![0; 13]).unwrap();
        for c in 0..5 {
            grid.set(0, c, 2000);
        }
        for c in 5..9 {
            grid.set(0, c, 2100);
        }
        for c in 9..13 {
            grid.set(0, c, 5000);
        }

        let seg = DepthSegmenter::new().segment_detailed(&Roi::new(0, 0, 13, 1), &grid);
        assert_eq!(seg.filter_median, Some(2.1));
        assert_eq!(seg.samples.len(), 9);

        let pose = estimate(&seg.samples, &camera()).unwrap();
        assert_eq!(pose.translation.z, 2.0);
    }

    #[test]
    fn test_range_and_bearing() {
        let pose = RelativePose::from_translation(Vector3::new(1.0, 0.0, 1.0));

        assert_relative_eq!(pose.range(), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(pose.bearing(), std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }
}
