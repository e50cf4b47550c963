//! Recorded input and logged output.

pub mod pose_log;
pub mod recording;
pub mod sync;

pub use pose_log::PoseLogSink;
pub use recording::{DepthEntry, RecordedMessage, Recording};
pub use sync::{ApproximateSync, DetectionDepthSync, Stamped};
