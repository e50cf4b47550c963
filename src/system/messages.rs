//! Message types crossing the node boundary.
//!
//! Inputs arrive as a matched `(DetectionList, DepthImage)` pair; outputs
//! are a stamped point cloud and stamped transforms, handed to an
//! [`OutputSink`](super::sink::OutputSink).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::geometry::SE3;
use crate::projection::PointCloud;
use crate::segmentation::{DepthGrid, Roi};

use super::sink::OutputSink;

/// Detector class index of "person".
pub const PERSON_CLASS_ID: i32 = 0;

/// One detector output: class and bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: i32,
    pub roi: Roi,
}

impl Detection {
    pub fn new(class_id: i32, roi: Roi) -> Self {
        Self { class_id, roi }
    }

    pub fn person(roi: Roi) -> Self {
        Self::new(PERSON_CLASS_ID, roi)
    }

    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }
}

/// All detections of one image, in detector order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionList {
    /// Capture time of the detected image (nanoseconds).
    pub timestamp_ns: u64,
    pub detections: Vec<Detection>,
}

impl DetectionList {
    pub fn new(timestamp_ns: u64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp_ns,
            detections,
        }
    }
}

/// Decoded depth image with its capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub timestamp_ns: u64,
    pub grid: DepthGrid,
}

/// Frame and time stamp of an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub frame_id: String,
    /// Processing time (nanoseconds since the UNIX epoch for the system clock).
    pub stamp_ns: u64,
}

impl Header {
    pub fn new(frame_id: &str, stamp_ns: u64) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp_ns,
        }
    }
}

/// Stamped point cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloudMsg {
    pub header: Header,
    pub cloud: PointCloud,
}

/// Stamped transform `T_parent_child`; `header.frame_id` is the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: SE3,
}

impl TransformStamped {
    pub fn new(parent: &str, child: &str, stamp_ns: u64, transform: SE3) -> Self {
        Self {
            header: Header::new(parent, stamp_ns),
            child_frame_id: child.to_string(),
            transform,
        }
    }

    pub fn parent_frame_id(&self) -> &str {
        &self.header.frame_id
    }
}

/// Any published output, for sinks that forward or record everything.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Cloud(PointCloudMsg),
    RelativePose(TransformStamped),
    Transform(TransformStamped),
}

impl Output {
    /// Hand this output to the matching method of `sink`.
    pub fn publish_to<S: OutputSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        match self {
            Output::Cloud(msg) => sink.publish_cloud(msg),
            Output::RelativePose(msg) => sink.publish_relative_pose(msg),
            Output::Transform(msg) => sink.broadcast_transform(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_class() {
        assert!(Detection::person(Roi::default()).is_person());
        assert!(!Detection::new(2, Roi::default()).is_person());
    }

    #[test]
    fn test_transform_parent_is_header_frame() {
        let t = TransformStamped::new("laser", "camera", 42, SE3::identity());

        assert_eq!(t.parent_frame_id(), "laser");
        assert_eq!(t.child_frame_id, "camera");
        assert_eq!(t.header.stamp_ns, 42);
    }

    #[test]
    fn test_publish_to_dispatches_by_kind() {
        let sink = crate::system::sink::CollectingSink::new();
        let pose = TransformStamped::new("camera", "relative_pose", 1, SE3::identity());

        Output::RelativePose(pose.clone())
            .publish_to(&mut sink.clone())
            .unwrap();
        Output::Cloud(PointCloudMsg::default())
            .publish_to(&mut sink.clone())
            .unwrap();

        assert_eq!(sink.relative_poses(), vec![pose]);
        assert_eq!(sink.clouds().len(), 1);
        assert!(sink.transforms().is_empty());
    }
}
