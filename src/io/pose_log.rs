//! CSV log of published relative poses, for offline trajectory plots.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::system::messages::{PointCloudMsg, TransformStamped};
use crate::system::sink::OutputSink;

#[derive(Debug, Serialize)]
struct PoseRow {
    timestamp_ns: u64,
    x: f64,
    y: f64,
    z: f64,
}

/// Writes `timestamp_ns,x,y,z` for every relative pose; ignores clouds and
/// transform broadcasts.
pub struct PoseLogSink<W: Write = File> {
    writer: csv::Writer<W>,
    n_rows: usize,
}

impl PoseLogSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create pose log {}", path.display()))?;
        Ok(Self { writer, n_rows: 0 })
    }
}

impl<W: Write> PoseLogSink<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            n_rows: 0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush pose log: {}", e.error()))
    }
}

impl<W: Write> OutputSink for PoseLogSink<W> {
    fn publish_cloud(&mut self, _msg: &PointCloudMsg) -> Result<()> {
        Ok(())
    }

    fn publish_relative_pose(&mut self, msg: &TransformStamped) -> Result<()> {
        let t = &msg.transform.translation;
        self.writer.serialize(PoseRow {
            timestamp_ns: msg.header.stamp_ns,
            x: t.x,
            y: t.y,
            z: t.z,
        })?;
        self.writer.flush()?;
        self.n_rows += 1;
        Ok(())
    }

    fn broadcast_transform(&mut self, _msg: &TransformStamped) -> Result<()> {
        Ok(())
    }
}
