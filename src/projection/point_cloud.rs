use nalgebra::Vector3;

use crate::camera::CameraModel;
use crate::segmentation::SampleSet;

/// Camera-frame points (meters), one per segmented depth sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Vector3<f64>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.points.iter()
    }
}

/// Back-project every sample. `None` for an empty set: there is nothing to
/// publish and an empty cloud must not go out.
pub fn project(samples: &SampleSet, camera: &CameraModel) -> Option<PointCloud> {
    let mut cloud = PointCloud::with_capacity(samples.len());
    project_into(samples, camera, &mut cloud).then_some(cloud)
}

/// Back-project into a reused buffer.
///
/// `out` is always cleared first, so nothing from a previous frame survives.
/// Returns `false` (and leaves `out` empty) when `samples` is empty.
pub fn project_into(samples: &SampleSet, camera: &CameraModel, out: &mut PointCloud) -> bool {
    out.clear();
    out.points
        .extend(samples.iter().map(|s| s.back_project(camera)));
    !out.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::DepthSample;
    use approx::assert_relative_eq;

    fn camera() -> CameraModel {
        CameraModel::new(500.0, 400.0, 320.0, 240.0)
    }

    #[test]
    fn test_projection_formula() {
        let samples = SampleSet::from_samples(vec![
            DepthSample::new(420, 140, 2.0),
            DepthSample::new(0, 479, 0.5),
        ]);

        let cloud = project(&samples, &camera()).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_relative_eq!(cloud.points[0].x, (420.0 - 320.0) / 500.0 * 2.0);
        assert_relative_eq!(cloud.points[0].y, (140.0 - 240.0) / 400.0 * 2.0);
        assert_eq!(cloud.points[0].z, 2.0);
        assert_relative_eq!(cloud.points[1].x, (0.0 - 320.0) / 500.0 * 0.5);
        assert_relative_eq!(cloud.points[1].y, (479.0 - 240.0) / 400.0 * 0.5);
        assert_eq!(cloud.points[1].z, 0.5);
    }

    #[test]
    fn test_empty_samples_produce_no_cloud() {
        assert!(project(&SampleSet::new(), &camera()).is_none());
    }

    #[test]
    fn test_project_into_replaces_previous_contents() {
        let mut buffer = PointCloud::new();
        let first = SampleSet::from_samples(vec![DepthSample::new(1, 1, 1.0); 5]);
        let second = SampleSet::from_samples(vec![DepthSample::new(2, 2, 2.0); 2]);

        assert!(project_into(&first, &camera(), &mut buffer));
        assert_eq!(buffer.len(), 5);

        assert!(project_into(&second, &camera(), &mut buffer));
        assert_eq!(buffer.len(), 2);
        assert!(buffer.iter().all(|p| p.z == 2.0));

        assert!(!project_into(&SampleSet::new(), &camera(), &mut buffer));
        assert!(buffer.is_empty());
    }
}
