//! Per-frame orchestration: detection scan, segmentation, projection, pose
//! and publishing.

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, warn};

use crate::camera::CameraModel;
use crate::config::PublisherConfig;
use crate::geometry::SE3;
use crate::geometry::frames::{CAMERA_FRAME, RELATIVE_POSE_FRAME};
use crate::projection::{self, RelativePose};
use crate::segmentation::{DepthGrid, DepthSegmenter, Segmentation};

use super::messages::{DetectionList, Header, PointCloudMsg, TransformStamped};
use super::result::{FrameResult, FrameStatus, TimingStats};
use super::sink::{Clock, OutputSink, SystemClock};
use super::state::ProcessorState;

/// Person detection picked for a frame.
struct Selection {
    index: usize,
    segmentation: Segmentation,
}

/// Turns synchronized detection/depth pairs into published outputs.
///
/// Holds only configuration, the precomputed camera extrinsic and a
/// reusable cloud buffer; no result of one frame influences the next.
pub struct FrameProcessor<C: Clock = SystemClock> {
    camera: CameraModel,
    segmenter: DepthSegmenter,
    parent_frame: String,
    /// `T_parent_camera`, fixed by configuration.
    t_parent_camera: SE3,
    clock: C,
    state: ProcessorState,
    cloud_msg: PointCloudMsg,
}

impl FrameProcessor<SystemClock> {
    pub fn new(config: &PublisherConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> FrameProcessor<C> {
    pub fn with_clock(config: &PublisherConfig, clock: C) -> Self {
        Self {
            camera: config.camera,
            segmenter: DepthSegmenter::new(),
            parent_frame: config.camera_parent_frame.clone(),
            t_parent_camera: config.mount().extrinsic(),
            clock,
            state: ProcessorState::Idle,
            cloud_msg: PointCloudMsg::default(),
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// Replace the intrinsics, e.g. with a recording's own calibration.
    pub fn set_camera(&mut self, camera: CameraModel) {
        self.camera = camera;
    }

    /// Cached `T_parent_camera`.
    pub fn extrinsic(&self) -> &SE3 {
        &self.t_parent_camera
    }

    pub fn parent_frame(&self) -> &str {
        &self.parent_frame
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Process one synchronized pair.
    ///
    /// The camera extrinsic is broadcast first, on every call. Then the first
    /// person detection whose box holds valid depth, if any, yields the cloud,
    /// the relative pose and its transform. Errors only come from the sink.
    pub fn process<S: OutputSink + ?Sized>(
        &mut self,
        detections: &DetectionList,
        depth: &DepthGrid,
        sink: &mut S,
    ) -> Result<FrameResult> {
        self.state = ProcessorState::Processing;
        let result = self.process_inner(detections, depth, sink);
        self.state = ProcessorState::Idle;
        result
    }

    fn process_inner<S: OutputSink + ?Sized>(
        &mut self,
        detections: &DetectionList,
        depth: &DepthGrid,
        sink: &mut S,
    ) -> Result<FrameResult> {
        let t_start = Instant::now();
        let mut timing = TimingStats::zero();
        let stamp_ns = self.clock.now_ns();

        let extrinsic = TransformStamped::new(
            &self.parent_frame,
            CAMERA_FRAME,
            stamp_ns,
            self.t_parent_camera,
        );
        sink.broadcast_transform(&extrinsic)?;

        let t_segment = Instant::now();
        let (selection, n_tried) = self.select_detection(detections, depth);
        timing.segment_ms = t_segment.elapsed().as_secs_f64() * 1000.0;

        let t_publish = Instant::now();
        let mut pose = None;
        let mut result_detection = None;
        let mut n_candidates = 0;
        let mut filter_median = None;

        match selection {
            Some(Selection { index, segmentation }) => {
                let samples = &segmentation.samples;

                projection::project_into(samples, &self.camera, &mut self.cloud_msg.cloud);
                self.cloud_msg.header = Header::new(CAMERA_FRAME, stamp_ns);
                sink.publish_cloud(&self.cloud_msg)?;

                pose = projection::estimate(samples, &self.camera);
                if let Some(pose) = &pose {
                    self.publish_pose(pose, stamp_ns, sink)?;
                }

                result_detection = Some(index);
                n_candidates = segmentation.n_candidates;
                filter_median = segmentation.filter_median;
            }
            None => {
                warn!("No detection");
                self.cloud_msg.cloud.clear();
            }
        }

        timing.publish_ms = t_publish.elapsed().as_secs_f64() * 1000.0;
        timing.total_ms = t_start.elapsed().as_secs_f64() * 1000.0;

        let status = if result_detection.is_some() {
            FrameStatus::Published
        } else {
            FrameStatus::NoDetection
        };

        debug!(
            "Frame {}: {:?}, detection {:?}, {} candidates, {} points, {:.2} ms",
            detections.timestamp_ns,
            status,
            result_detection,
            n_candidates,
            self.cloud_msg.cloud.len(),
            timing.total_ms
        );

        Ok(FrameResult {
            status,
            detection_index: result_detection,
            n_person_detections_tried: n_tried,
            n_candidates,
            n_segmented: self.cloud_msg.cloud.len(),
            filter_median,
            position_in_parent: pose
                .as_ref()
                .map(|p| self.t_parent_camera.transform_point(&p.translation)),
            pose,
            stamp_ns,
            timing,
        })
    }

    /// First person detection with a non-empty segmentation, and the number
    /// of person detections segmented to find it.
    fn select_detection(
        &self,
        detections: &DetectionList,
        depth: &DepthGrid,
    ) -> (Option<Selection>, usize) {
        let mut n_tried = 0;
        for (index, detection) in detections.detections.iter().enumerate() {
            if !detection.is_person() {
                continue;
            }
            n_tried += 1;

            let segmentation = self.segmenter.segment_detailed(&detection.roi, depth);
            if segmentation.samples.is_empty() {
                warn!("No valid depth samples in detection {}", index);
                continue;
            }
            return (Some(Selection { index, segmentation }), n_tried);
        }
        (None, n_tried)
    }

    fn publish_pose<S: OutputSink + ?Sized>(
        &self,
        pose: &RelativePose,
        stamp_ns: u64,
        sink: &mut S,
    ) -> Result<()> {
        let msg = TransformStamped::new(CAMERA_FRAME, RELATIVE_POSE_FRAME, stamp_ns, pose.to_se3());
        sink.publish_relative_pose(&msg)?;
        sink.broadcast_transform(&msg)
    }
}
