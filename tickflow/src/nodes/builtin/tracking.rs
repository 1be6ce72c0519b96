//! `dabble.tracking`: multi-object tracking by bounding box overlap.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::frame::NodeInputs;
use crate::nodes::{Node, NodeContract, NodeOutput};
use serde::Deserialize;
use serde_json::json;

const BBOXES: &str = "bboxes";
const OBJ_TAGS: &str = "obj_tags";

/// A box as `[x1, y1, x2, y2]`.
pub type BBox = [f64; 4];

fn default_tracking_type() -> String {
    "iou".to_string()
}

fn default_iou_threshold() -> f64 {
    0.1
}

fn default_max_lost() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default = "default_tracking_type")]
    tracking_type: String,
    #[serde(default = "default_iou_threshold")]
    iou_threshold: f64,
    #[serde(default = "default_max_lost")]
    max_lost: u32,
}

/// Intersection over union of two boxes.
#[must_use]
pub fn iou(a: &BBox, b: &BBox) -> f64 {
    let width = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let height = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = width * height;

    let area = |r: &BBox| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[derive(Debug, Clone)]
struct Track {
    id: u64,
    bbox: BBox,
    lost: u32,
}

/// Greedy IoU tracker.
///
/// Each detection continues the unmatched track it overlaps most, if the
/// overlap reaches the threshold; otherwise it starts a new track. Tracks
/// unmatched for more than `max_lost` ticks are dropped.
#[derive(Debug, Clone)]
pub struct IouTracker {
    threshold: f64,
    max_lost: u32,
    tracks: Vec<Track>,
    next_id: u64,
}

impl IouTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(threshold: f64, max_lost: u32) -> Self {
        Self {
            threshold,
            max_lost,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    /// Returns the number of live tracks.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Assigns a track id to each box, in input order.
    pub fn update(&mut self, bboxes: &[BBox]) -> Vec<u64> {
        let mut matched = vec![false; self.tracks.len()];
        let mut ids = Vec::with_capacity(bboxes.len());

        for bbox in bboxes {
            let best = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(i, _)| !matched[*i])
                .map(|(i, track)| (i, iou(&track.bbox, bbox)))
                .filter(|(_, score)| *score >= self.threshold)
                .max_by(|a, b| a.1.total_cmp(&b.1));

            let id = if let Some((i, _)) = best {
                matched[i] = true;
                let track = &mut self.tracks[i];
                track.bbox = *bbox;
                track.lost = 0;
                track.id
            } else {
                let id = self.next_id;
                self.next_id += 1;
                self.tracks.push(Track {
                    id,
                    bbox: *bbox,
                    lost: 0,
                });
                matched.push(true);
                id
            };
            ids.push(id);
        }

        for (track, hit) in self.tracks.iter_mut().zip(&matched) {
            if !hit {
                track.lost += 1;
            }
        }
        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.lost <= max_lost);

        ids
    }
}

/// Emits `obj_tags`, one track id per box in `bboxes`.
#[derive(Debug)]
pub struct Tracking {
    contract: NodeContract,
    tracker: IouTracker,
}

impl Tracking {
    /// Creates the node from its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for unsupported tracking types or an
    /// out-of-range threshold.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let settings: Settings = config.deserialize()?;
        if settings.tracking_type != "iou" {
            return Err(NodeError::invalid_config(
                "tracking_type",
                format!("unsupported tracking type '{}', expected 'iou'", settings.tracking_type),
            ));
        }
        if !(0.0..=1.0).contains(&settings.iou_threshold) {
            return Err(NodeError::invalid_config("iou_threshold", "must be within [0, 1]"));
        }

        Ok(Self {
            contract: NodeContract::from_config(config)?,
            tracker: IouTracker::new(settings.iou_threshold, settings.max_lost),
        })
    }
}

impl Node for Tracking {
    fn name(&self) -> &str {
        &self.contract.name
    }

    fn inputs(&self) -> &[String] {
        &self.contract.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.contract.outputs
    }

    fn run(&mut self, inputs: &NodeInputs<'_>) -> Result<NodeOutput, NodeError> {
        let bboxes: Vec<BBox> = inputs.require_as(BBOXES)?;
        let tags: Vec<String> = self
            .tracker
            .update(&bboxes)
            .into_iter()
            .map(|id| id.to_string())
            .collect();

        Ok(NodeOutput::from([(OBJ_TAGS.to_string(), json!(tags))]))
    }
}
