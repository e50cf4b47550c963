//! Output sinks and time sources injected into the frame processor.
//!
//! The processor never talks to a transport directly. It calls an
//! [`OutputSink`] for every message and asks a [`Clock`] for the stamp, so
//! the same core drives the viewer, the pose log and the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use tracing::warn;

use super::messages::{Output, PointCloudMsg, TransformStamped};

/// Destination for everything the processor publishes.
pub trait OutputSink {
    /// Segmented person cloud in the camera frame.
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()>;

    /// Relative pose of the person, `camera -> relative_pose`.
    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()>;

    /// Frame transform broadcast (relative pose and camera extrinsic).
    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        (**self).publish_cloud(msg)
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        (**self).publish_relative_pose(msg)
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        (**self).broadcast_transform(msg)
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        (**self).publish_cloud(msg)
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        (**self).publish_relative_pose(msg)
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        (**self).broadcast_transform(msg)
    }
}

/// Source of message stamps.
pub trait Clock {
    /// Current time in nanoseconds.
    fn now_ns(&self) -> u64;
}

/// Wall clock, nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to, for deterministic stamps in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(start_ns),
        }
    }

    pub fn set(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ns: u64) {
        self.now_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Relaxed)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// Records every output in publish order. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    outputs: Arc<Mutex<Vec<Output>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.outputs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.lock().is_empty()
    }

    pub fn clear(&self) {
        self.outputs.lock().clear();
    }

    pub fn clouds(&self) -> Vec<PointCloudMsg> {
        self.outputs
            .lock()
            .iter()
            .filter_map(|o| match o {
                Output::Cloud(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn relative_poses(&self) -> Vec<TransformStamped> {
        self.outputs
            .lock()
            .iter()
            .filter_map(|o| match o {
                Output::RelativePose(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn transforms(&self) -> Vec<TransformStamped> {
        self.outputs
            .lock()
            .iter()
            .filter_map(|o| match o {
                Output::Transform(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

impl OutputSink for CollectingSink {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        self.outputs.lock().push(Output::Cloud(msg.clone()));
        Ok(())
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        self.outputs.lock().push(Output::RelativePose(msg.clone()));
        Ok(())
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        self.outputs.lock().push(Output::Transform(msg.clone()));
        Ok(())
    }
}

/// Forwards outputs to another thread over a bounded channel.
///
/// A full channel drops the message with a warning so the processor never
/// blocks; a disconnected receiver is an error.
pub struct ChannelSink {
    sender: Sender<Output>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Output>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end of a channel holding `capacity` outputs.
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<Output>) {
        let (sender, receiver) = bounded(capacity);
        (Self::new(sender), receiver)
    }

    fn forward(&self, output: Output) -> Result<()> {
        match self.sender.try_send(output) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Output channel full, dropping message");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => bail!("Output channel disconnected"),
        }
    }
}

impl OutputSink for ChannelSink {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        self.forward(Output::Cloud(msg.clone()))
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        self.forward(Output::RelativePose(msg.clone()))
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        self.forward(Output::Transform(msg.clone()))
    }
}

/// Run `sink` on its own thread, fed by the returned [`ChannelSink`].
///
/// The thread drains the channel until every sender is dropped and returns
/// the number of outputs it handled. Errors of the inner sink are logged and
/// do not stop the thread.
pub fn spawn_sink_thread<S>(mut sink: S, capacity: usize) -> (ChannelSink, JoinHandle<usize>)
where
    S: OutputSink + Send + 'static,
{
    let (sender, receiver) = ChannelSink::with_capacity(capacity);
    let handle = thread::spawn(move || {
        let mut n_handled = 0;
        for output in receiver {
            if let Err(e) = output.publish_to(&mut sink) {
                warn!("Sink thread failed to publish: {:#}", e);
            }
            n_handled += 1;
        }
        n_handled
    });
    (sender, handle)
}

/// Publishes to every inner sink in insertion order.
///
/// A failing sink does not keep the others from receiving the message; the
/// first error is returned once all sinks have been tried.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn OutputSink + Send>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: OutputSink + Send + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn with<S: OutputSink + Send + 'static>(mut self, sink: S) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn for_each_sink<F>(&mut self, mut publish: F) -> Result<()>
    where
        F: FnMut(&mut (dyn OutputSink + Send + 'static)) -> Result<()>,
    {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = publish(sink.as_mut()) {
                match first_err {
                    None => first_err = Some(e),
                    Some(_) => warn!("Additional sink failure: {:#}", e),
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl OutputSink for Fanout {
    fn publish_cloud(&mut self, msg: &PointCloudMsg) -> Result<()> {
        self.for_each_sink(|sink| sink.publish_cloud(msg))
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        self.for_each_sink(|sink| sink.publish_relative_pose(msg))
    }

    fn broadcast_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        self.for_each_sink(|sink| sink.broadcast_transform(msg))
    }
}
