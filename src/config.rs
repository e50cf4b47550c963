//! Node configuration.
//!
//! Every key is optional; a missing file section falls back to the values
//! of the reference robot (Kinect-class depth camera mounted behind the
//! laser scanner, tilted up 16.5 degrees).
//!
//! ```yaml
//! camera_wrt_laser_x: -0.075
//! camera_wrt_laser_y: -0.01
//! camera_wrt_laser_z: 0.174
//! camera_wrt_laser_pitch: 16.5
//! camera_parent_frame: laser
//! camera: { fx: 570.3422, fy: 570.3422, cx: 319.5, cy: 239.5 }
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::camera::CameraModel;
use crate::geometry::CameraMount;
use crate::geometry::frames::DEFAULT_PARENT_FRAME;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublisherConfig {
    /// Camera origin in the parent frame, x (meters)
    #[serde(default = "default_camera_wrt_laser_x")]
    pub camera_wrt_laser_x: f64,
    /// Camera origin in the parent frame, y (meters)
    #[serde(default = "default_camera_wrt_laser_y")]
    pub camera_wrt_laser_y: f64,
    /// Camera origin in the parent frame, z (meters)
    #[serde(default = "default_camera_wrt_laser_z")]
    pub camera_wrt_laser_z: f64,
    /// Upward tilt of the camera (degrees)
    #[serde(default = "default_camera_wrt_laser_pitch")]
    pub camera_wrt_laser_pitch: f64,
    /// Parent frame of the camera extrinsic broadcast
    #[serde(default = "default_camera_parent_frame")]
    pub camera_parent_frame: String,
    /// Depth camera intrinsics
    #[serde(default = "default_camera")]
    pub camera: CameraModel,
    /// Pending messages kept per stream while pairing detections with depth
    #[serde(default = "default_sync_queue_size")]
    pub sync_queue_size: usize,
    /// Largest timestamp gap accepted between a detection list and a depth image
    #[serde(default = "default_sync_max_interval_ms")]
    pub sync_max_interval_ms: u64,
    /// Optional CSV file receiving every published relative pose
    #[serde(default)]
    pub pose_log: Option<PathBuf>,
}

fn default_camera_wrt_laser_x() -> f64 { -0.075 }
fn default_camera_wrt_laser_y() -> f64 { -0.01 }
fn default_camera_wrt_laser_z() -> f64 { 0.174 }
fn default_camera_wrt_laser_pitch() -> f64 { 16.5 }
fn default_camera_parent_frame() -> String { DEFAULT_PARENT_FRAME.to_string() }
fn default_camera() -> CameraModel { CameraModel::new(570.3422, 570.3422, 319.5, 239.5) }
fn default_sync_queue_size() -> usize { 1000 }
fn default_sync_max_interval_ms() -> u64 { 50 }

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            camera_wrt_laser_x: default_camera_wrt_laser_x(),
            camera_wrt_laser_y: default_camera_wrt_laser_y(),
            camera_wrt_laser_z: default_camera_wrt_laser_z(),
            camera_wrt_laser_pitch: default_camera_wrt_laser_pitch(),
            camera_parent_frame: default_camera_parent_frame(),
            camera: default_camera(),
            sync_queue_size: default_sync_queue_size(),
            sync_max_interval_ms: default_sync_max_interval_ms(),
            pose_log: None,
        }
    }
}

impl PublisherConfig {
    /// Load and validate a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: PublisherConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PublisherConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let cam = &self.camera;
        for (name, value) in [("fx", cam.fx), ("fy", cam.fy)] {
            if !value.is_finite() || value == 0.0 {
                bail!("Camera focal length {} must be finite and non-zero, got {}", name, value);
            }
        }
        if !cam.cx.is_finite() || !cam.cy.is_finite() {
            bail!("Camera principal point must be finite, got ({}, {})", cam.cx, cam.cy);
        }
        let offset = [
            self.camera_wrt_laser_x,
            self.camera_wrt_laser_y,
            self.camera_wrt_laser_z,
            self.camera_wrt_laser_pitch,
        ];
        if offset.iter().any(|v| !v.is_finite()) {
            bail!("Camera mounting offset and pitch must be finite");
        }
        if self.camera_parent_frame.is_empty() {
            bail!("camera_parent_frame must not be empty");
        }
        if self.sync_queue_size == 0 {
            bail!("sync_queue_size must be at least 1");
        }
        Ok(())
    }

    /// Camera mounting relative to `camera_parent_frame`.
    pub fn mount(&self) -> CameraMount {
        CameraMount::new(
            Vector3::new(
                self.camera_wrt_laser_x,
                self.camera_wrt_laser_y,
                self.camera_wrt_laser_z,
            ),
            self.camera_wrt_laser_pitch,
        )
    }
}
