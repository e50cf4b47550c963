//! Frame processing core and its output plumbing.
//!
//! `FrameProcessor` turns one synchronized detection/depth pair into a
//! person cloud, a relative pose and the camera extrinsic broadcast. It
//! publishes through an injected `OutputSink` and stamps with an injected
//! `Clock`.

pub mod messages;
pub mod processor;
pub mod result;
pub mod sink;
pub mod state;

pub use messages::{
    DepthImage, Detection, DetectionList, Header, Output, PERSON_CLASS_ID, PointCloudMsg,
    TransformStamped,
};
pub use processor::FrameProcessor;
pub use result::{FrameResult, FrameStatus, TimingStats};
pub use sink::{
    ChannelSink, Clock, CollectingSink, Fanout, ManualClock, OutputSink, SystemClock,
    spawn_sink_thread,
};
pub use state::ProcessorState;
