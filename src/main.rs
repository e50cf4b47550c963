use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use person_blob::config::PublisherConfig;
use person_blob::io::{DetectionDepthSync, PoseLogSink, RecordedMessage, Recording};
use person_blob::segmentation::DepthGrid;
use person_blob::system::{
    DetectionList, Fanout, FrameProcessor, FrameResult, OutputSink, spawn_sink_thread,
};
use person_blob::viz::rerun::RerunVisualizer;

/// Outputs buffered between the processor and the viewer thread.
const VIEWER_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct RunStats {
    n_frames: usize,
    n_published: usize,
    n_failed: usize,
    total_ms: f64,
}

impl RunStats {
    fn record(&mut self, result: &FrameResult) {
        self.n_frames += 1;
        if result.published() {
            self.n_published += 1;
        }
        self.total_ms += result.timing.total_ms;
    }
}

fn run_pair<S: OutputSink>(
    processor: &mut FrameProcessor,
    detections: &DetectionList,
    depth: &DepthGrid,
    sink: &mut S,
    stats: &mut RunStats,
) {
    let result = match processor.process(detections, depth, sink) {
        Ok(result) => result,
        Err(e) => {
            warn!("Frame {}: publishing failed: {:#}", detections.timestamp_ns, e);
            stats.n_failed += 1;
            return;
        }
    };
    stats.record(&result);

    if stats.n_frames % 100 == 0 {
        match result.position_in_parent {
            Some(p) => info!(
                "Frame {}: {} published so far, person at [{:.2}, {:.2}, {:.2}]",
                stats.n_frames, stats.n_published, p.x, p.y, p.z
            ),
            None => info!(
                "Frame {}: {} published so far, no person",
                stats.n_frames, stats.n_published
            ),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let recording_path = args.next().unwrap_or_else(|| "data/recording".to_string());
    let config_path = args.next().map(PathBuf::from);

    let config = PublisherConfig::load_or_default(config_path.as_deref())?;
    let recording = Recording::open(&recording_path)?;

    let mut processor = FrameProcessor::new(&config);
    if let Some(camera) = recording.camera {
        info!("Using intrinsics from recording: {:?}", camera);
        processor.set_camera(camera);
    }

    let mut sinks = Fanout::new();
    let mut viewer_thread = None;
    match RerunVisualizer::spawn("person-blob", &config.camera_parent_frame) {
        Ok(viz) => {
            let (sender, handle) = spawn_sink_thread(viz, VIEWER_CHANNEL_CAPACITY);
            sinks.push(sender);
            viewer_thread = Some(handle);
        }
        Err(e) => warn!("Continuing without viewer: {:#}", e),
    }
    if let Some(path) = &config.pose_log {
        sinks.push(PoseLogSink::create(path)?);
        info!("Logging relative poses to {}", path.display());
    }

    let mut sync = DetectionDepthSync::from_config(&config);
    let mut stats = RunStats::default();

    for msg in recording.timeline() {
        let pairs = match msg {
            RecordedMessage::Detections(i) => sync.push_first(recording.detections[i].clone()),
            RecordedMessage::Depth(i) => sync.push_second(recording.depth_image(i)?),
        };
        for (detections, depth) in pairs {
            run_pair(&mut processor, &detections, &depth.grid, &mut sinks, &mut stats);
        }
    }
    for (detections, depth) in sync.flush() {
        run_pair(&mut processor, &detections, &depth.grid, &mut sinks, &mut stats);
    }

    // Closes the viewer channel so its thread can finish.
    drop(sinks);
    if let Some(handle) = viewer_thread {
        let n_viewed = handle
            .join()
            .map_err(|_| anyhow!("Viewer thread panicked"))?;
        info!("Viewer handled {} outputs", n_viewed);
    }

    let mean_ms = if stats.n_frames > 0 {
        stats.total_ms / stats.n_frames as f64
    } else {
        0.0
    };
    println!(
        "Done! Processed {} frames: {} with a person, {} without, {} failed, {} unmatched messages dropped, {:.2} ms/frame",
        stats.n_frames,
        stats.n_published,
        stats.n_frames - stats.n_published,
        stats.n_failed,
        sync.n_dropped(),
        mean_ms
    );

    Ok(())
}
