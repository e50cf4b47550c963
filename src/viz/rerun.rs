//! Rerun viewer for the person tracker.
//!
//! Entity hierarchy (rooted at the configured parent frame, e.g. `laser`):
//!     laser/                       - parent frame, FLU
//!         camera                   - camera extrinsic, RDF
//!         camera/cloud             - segmented person points (orange)
//!         camera/relative_pose     - relative pose of the person
//!     plots/
//!         range                    - distance to the person (m)
//!         bearing                  - bearing of the person (rad)
//!         cloud_size               - points per published cloud
//!     status                       - last frame summary

use std::collections::HashMap;

use anyhow::{Context, Result};
use rerun::{RecordingStream, external::glam};

use crate::geometry::SE3;
use crate::geometry::frames::CAMERA_FRAME;
use crate::projection::RelativePose;
use crate::system::messages::{PointCloudMsg, TransformStamped};
use crate::system::sink::OutputSink;

pub struct RerunVisualizer {
    rec: RecordingStream,
    /// Entity path of every frame seen so far, keyed by frame id.
    frame_paths: HashMap<String, String>,
    start_timestamp_ns: Option<u64>,
    n_clouds: usize,
}

impl RerunVisualizer {
    /// Spawn a viewer process and stream to it.
    pub fn spawn(app_name: &str, parent_frame: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;
        Ok(Self::with_stream(rec, parent_frame))
    }

    fn with_stream(rec: RecordingStream, parent_frame: &str) -> Self {
        // Laser/base frames are X forward, Y left, Z up.
        rec.log_static(parent_frame, &rerun::ViewCoordinates::FLU()).ok();

        let camera_path = format!("{}/{}", parent_frame, CAMERA_FRAME);
        rec.log_static(camera_path.as_str(), &rerun::ViewCoordinates::RDF())
            .ok();

        let mut frame_paths = HashMap::new();
        frame_paths.insert(parent_frame.to_string(), parent_frame.to_string());
        frame_paths.insert(CAMERA_FRAME.to_string(), camera_path);

        Self {
            rec,
            frame_paths,
            start_timestamp_ns: None,
            n_clouds: 0,
        }
    }

    /// Set the current timestamp for all subsequent logs (relative to the first message).
    pub fn set_time(&mut self, timestamp_ns: u64) {
        let start_ns = *self.start_timestamp_ns.get_or_insert(timestamp_ns);
        let relative_sec = timestamp_ns.saturating_sub(start_ns) as f64 / 1e9;
        self.rec.set_duration_secs("time", relative_sec);
    }

    /// Entity path of `frame_id`; unknown frames hang off the root.
    fn frame_path(&self, frame_id: &str) -> String {
        self.frame_paths
            .get(frame_id)
            .cloned()
            .unwrap_or_else(|| frame_id.to_string())
    }

    fn log_transform(&mut self, msg: &TransformStamped) {
        let path = format!(
            "{}/{}",
            self.frame_path(msg.parent_frame_id()),
            msg.child_frame_id
        );
        let (translation, rotation) = to_glam(&msg.transform);

        self.rec
            .log(
                path.as_str(),
                &rerun::Transform3D::from_translation_rotation(translation, rotation),
            )
            .ok();
        self.frame_paths.insert(msg.child_frame_id.clone(), path);
    }

    fn log_pose_plots(&self, pose: &RelativePose) {
        self.rec
            .log("plots/range", &rerun::Scalars::new([pose.range()]))
            .ok();
        self.rec
            .log("plots/bearing", &rerun::Scalars::new([pose.bearing()]))
            .ok();
    }
}

fn to_glam(pose: &SE3) -> (glam::Vec3, glam::Quat) {
    let translation = glam::Vec3::new(
        pose.translation.x as f32,
        pose.translation.y as f32,
        pose.translation.z as f32,
    );
    let rotation = glam::Quat::from_xyzw(
        pose.rotation.coords.x as f32,
        pose.rotation.coords.y as f32,
        pose.rotation.coords.z as f32,
        pose.rotation.w as f32,
    );
    (translation, rotation)
}

impl OutputSink for RerunVisualizer {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        self.set_time(msg.header.stamp_ns);

        let pts: Vec<[f32; 3]> = msg
            .cloud
            .iter()
            .map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect();
        let path = format!("{}/cloud", self.frame_path(&msg.header.frame_id));

        self.rec
            .log(
                path.as_str(),
                &rerun::Points3D::new(pts)
                    .with_colors([[255u8, 140, 0]]) // Orange
                    .with_radii([0.01f32]),
            )
            .ok();
        self.rec
            .log("plots/cloud_size", &rerun::Scalars::new([msg.cloud.len() as f64]))
            .ok();

        self.n_clouds += 1;
        Ok(())
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        self.set_time(msg.header.stamp_ns);

        let pose = RelativePose {
            translation: msg.transform.translation,
            rotation: msg.transform.rotation,
        };
        self.log_pose_plots(&pose);

        let status = format!(
            "**PERSON** | range: {:.2} m | bearing: {:.1} deg | clouds: {}",
            pose.range(),
            pose.bearing().to_degrees(),
            self.n_clouds
        );
        self.rec
            .log("status", &rerun::TextDocument::new(status))
            .ok();
        Ok(())
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        self.set_time(msg.header.stamp_ns);
        self.log_transform(msg);
        Ok(())
    }
}
