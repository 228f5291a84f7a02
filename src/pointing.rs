//! Pointing classifier: body keypoints to a left/center/right observation.
//!
//! The fingertip is extrapolated along the elbow→wrist vector
//! (`tip = wrist + (wrist - elbow) * 0.8`) of whichever arm has the more
//! confident wrist. Its normalized x coordinate picks the zone; positions
//! hugging the frame edges are reported as `free`.

use crate::{
    config::PointingConfig,
    constants::{FINGERTIP_EXTRAPOLATION, KP_LEFT_ELBOW, KP_LEFT_WRIST, KP_RIGHT_ELBOW, KP_RIGHT_WRIST},
    gesture::{GestureLabel, Observation},
    utils::{normalize, Point},
    vision::{Frame, GestureClassifier},
    Result,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A single body keypoint in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    #[must_use]
    pub const fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from([x, y, score]: [f32; 3]) -> Self {
        Self::new(x, y, score)
    }
}

impl From<Keypoint> for [f32; 3] {
    fn from(kp: Keypoint) -> Self {
        [kp.x, kp.y, kp.score]
    }
}

/// Keypoints of the most prominent person, COCO order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    #[must_use]
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }
}

/// Produces body keypoints for a frame
pub trait PoseEstimator<I> {
    /// Keypoints of the best person in the frame, or `None` when nobody is visible
    fn estimate(&mut self, frame: &I) -> Result<Option<Pose>>;
}

/// Maps a normalized x coordinate onto a zone label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneThresholds {
    pub left: f32,
    pub right: f32,
    pub edge_margin: f32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            left: crate::constants::DEFAULT_LEFT_THRESHOLD,
            right: crate::constants::DEFAULT_RIGHT_THRESHOLD,
            edge_margin: crate::constants::DEFAULT_EDGE_MARGIN,
        }
    }
}

impl ZoneThresholds {
    /// Zone for a normalized x; edge positions are `Free`
    #[must_use]
    pub fn label_for(&self, x: f32) -> GestureLabel {
        if x < self.edge_margin || x > 1.0 - self.edge_margin {
            GestureLabel::Free
        } else if x < self.left {
            GestureLabel::Left
        } else if x < self.right {
            GestureLabel::Center
        } else {
            GestureLabel::Right
        }
    }
}

/// Estimated fingertip in pixels plus the score of the wrist it came from
#[must_use]
pub fn fingertip(pose: &Pose, min_confidence: f32) -> Option<(Point, f32)> {
    if pose.keypoints.len() <= KP_RIGHT_WRIST {
        return None;
    }
    let kp = &pose.keypoints;
    let left = (kp[KP_LEFT_WRIST], kp[KP_LEFT_ELBOW]);
    let right = (kp[KP_RIGHT_WRIST], kp[KP_RIGHT_ELBOW]);

    let left_ok = left.0.score > min_confidence;
    let right_ok = right.0.score > min_confidence;

    let (wrist, elbow) = match (left_ok, right_ok) {
        (true, true) if right.0.score > left.0.score => right,
        (true, true) => left,
        (false, true) => right,
        (true, false) => left,
        (false, false) => return None,
    };

    if elbow.score < min_confidence {
        return Some((wrist.position(), wrist.score));
    }

    let tip = Point::new(
        wrist.x + (wrist.x - elbow.x) * FINGERTIP_EXTRAPOLATION,
        wrist.y + (wrist.y - elbow.y) * FINGERTIP_EXTRAPOLATION,
    );
    Some((tip, wrist.score))
}

/// [`GestureClassifier`] backed by a [`PoseEstimator`]
pub struct PointingClassifier<P> {
    estimator: P,
    zones: ZoneThresholds,
    keypoint_min_confidence: f32,
}

impl<P> PointingClassifier<P> {
    pub fn new(estimator: P, zones: ZoneThresholds, keypoint_min_confidence: f32) -> Self {
        Self {
            estimator,
            zones,
            keypoint_min_confidence,
        }
    }

    pub fn from_config(estimator: P, config: &PointingConfig) -> Self {
        Self::new(
            estimator,
            ZoneThresholds {
                left: config.left_threshold,
                right: config.right_threshold,
                edge_margin: config.edge_margin,
            },
            config.keypoint_min_confidence,
        )
    }

    /// Observation for a pose already estimated on a frame of the given size
    #[must_use]
    pub fn observe_pose(&self, pose: Option<&Pose>, frame_size: (u32, u32), frame_index: u64) -> Observation {
        let Some(pose) = pose else {
            return Observation::new(GestureLabel::None, 0.0, frame_index);
        };
        let Some((tip, score)) = fingertip(pose, self.keypoint_min_confidence) else {
            return Observation::new(GestureLabel::None, 0.0, frame_index);
        };
        let Some(pointer) = normalize(tip, frame_size.0, frame_size.1) else {
            return Observation::idle(frame_index);
        };

        let label = self.zones.label_for(pointer.x);
        debug!(
            "Frame {}: fingertip ({:.3}, {:.3}) -> {}",
            frame_index, pointer.x, pointer.y, label
        );
        Observation::new(label, score, frame_index).with_pointer(pointer)
    }
}

impl<I, P> GestureClassifier<I> for PointingClassifier<P>
where
    I: Frame,
    P: PoseEstimator<I>,
{
    fn classify(&mut self, frame: &I) -> Result<Observation> {
        let pose = match self.estimator.estimate(frame) {
            Ok(pose) => pose,
            Err(e) => {
                warn!("Pose estimation failed on frame {}: {}", frame.index(), e);
                return Ok(Observation::idle(frame.index()));
            }
        };
        Ok(self.observe_pose(pose.as_ref(), frame.size(), frame.index()))
    }
}
