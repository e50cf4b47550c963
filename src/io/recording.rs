//! Recorded session loader.
//!
//! Layout of a recording directory:
//!
//! ```text
//! <root>/detections.csv      timestamp_ns,class_id,x_offset,y_offset,width,height
//! <root>/depth/data.csv      timestamp_ns,filename
//! <root>/depth/data/*.png    16-bit grayscale, millimetres
//! <root>/camera.yaml         optional, `intrinsics: [fx, fy, cx, cy]`
//! ```
//!
//! A detection list may span several rows sharing a timestamp; rows keep
//! their file order inside the list. A row with `class_id = -1` marks a
//! frame in which the detector found nothing.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::info;

use crate::camera::CameraModel;
use crate::segmentation::{DepthGrid, Roi};
use crate::system::messages::{DepthImage, Detection, DetectionList};

/// `class_id` of a placeholder row standing for an empty detection list.
pub const EMPTY_LIST_CLASS_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthEntry {
    pub timestamp_ns: u64,
    pub filename: String,
}

/// One message of the recording, by index into its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedMessage {
    Detections(usize),
    Depth(usize),
}

#[derive(Debug)]
pub struct Recording {
    root: PathBuf,
    pub detections: Vec<DetectionList>,
    pub depth_entries: Vec<DepthEntry>,
    /// Intrinsics shipped with the recording, if any.
    pub camera: Option<CameraModel>,
}

impl Recording {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            bail!("Recording directory {} does not exist", root.display());
        }

        let detections = load_detections(root.join("detections.csv"))?;
        let depth_entries = load_depth_list(root.join("depth/data.csv"))?;

        let camera_yaml = root.join("camera.yaml");
        let camera = if camera_yaml.exists() {
            Some(load_camera(&camera_yaml)?)
        } else {
            None
        };

        info!(
            "Opened recording {}: {} detection lists, {} depth images",
            root.display(),
            detections.len(),
            depth_entries.len()
        );

        Ok(Self {
            root,
            detections,
            depth_entries,
            camera,
        })
    }

    /// Decode the depth image at `idx`.
    pub fn depth_image(&self, idx: usize) -> Result<DepthImage> {
        let entry = self
            .depth_entries
            .get(idx)
            .with_context(|| format!("No depth image at index {}", idx))?;
        let path = self.root.join("depth/data").join(&entry.filename);

        Ok(DepthImage {
            timestamp_ns: entry.timestamp_ns,
            grid: read_depth_png(&path)?,
        })
    }

    /// Both streams merged in timestamp order. Depth goes first on ties.
    pub fn timeline(&self) -> Vec<RecordedMessage> {
        let mut events: Vec<(u64, u8, RecordedMessage)> = self
            .depth_entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.timestamp_ns, 0, RecordedMessage::Depth(i)))
            .chain(
                self.detections
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (d.timestamp_ns, 1, RecordedMessage::Detections(i))),
            )
            .collect();
        events.sort_by_key(|&(ts, order, _)| (ts, order));
        events.into_iter().map(|(_, _, msg)| msg).collect()
    }
}

/// Read a 16-bit single-channel PNG into a depth grid (millimetres).
pub fn read_depth_png(path: &Path) -> Result<DepthGrid> {
    let img = image::open(path)
        .with_context(|| format!("Failed to read depth image {}", path.display()))?
        .into_luma16();
    let (width, height) = img.dimensions();
    DepthGrid::new(height as usize, width as usize, img.into_raw())
}

fn load_detections(csv_path: PathBuf) -> Result<Vec<DetectionList>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut lists: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        let ts: u64 = rec[0].trim().parse()?;
        let class_id: i32 = rec[1].trim().parse()?;

        let list = lists.entry(ts).or_default();
        if class_id == EMPTY_LIST_CLASS_ID {
            continue;
        }
        if rec.len() < 6 {
            bail!(
                "{}: record {} has {} fields, expected 6",
                csv_path.display(),
                line + 1,
                rec.len()
            );
        }
        let roi = Roi::new(
            rec[2].trim().parse()?,
            rec[3].trim().parse()?,
            rec[4].trim().parse()?,
            rec[5].trim().parse()?,
        );
        list.push(Detection::new(class_id, roi));
    }

    Ok(lists
        .into_iter()
        .map(|(ts, detections)| DetectionList::new(ts, detections))
        .collect())
}

fn load_depth_list(csv_path: PathBuf) -> Result<Vec<DepthEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        entries.push(DepthEntry {
            timestamp_ns: rec[0].trim().parse()?,
            filename: rec[1].trim().to_string(),
        });
    }
    entries.sort_by_key(|e| e.timestamp_ns);
    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct CameraYaml {
    /// [fx, fy, cx, cy]
    intrinsics: Vec<f64>,
}

fn load_camera(path: &Path) -> Result<CameraModel> {
    let yaml: CameraYaml = serde_yaml::from_reader(
        File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
    )
    .with_context(|| format!("Failed to parse {:?}", path))?;
    CameraModel::from_intrinsics(&yaml.intrinsics)
}
