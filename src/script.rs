//! Scripted collaborators for headless runs and tests.
//!
//! A script is a YAML list of steps. Each step describes what the camera sees
//! for `repeat` consecutive frames: face boxes, either an explicit gesture or
//! body keypoints for the pointing classifier, and UI input that arrives with
//! the first frame of the step.
//!
//! ```yaml
//! frame_size: [640, 480]
//! steps:
//!   - repeat: 30
//!     faces: [[270, 190, 100, 100]]
//!   - repeat: 5
//!     faces: [[270, 190, 100, 100]]
//!     gesture: { label: center, confidence: 0.95 }
//!   - keys: "123456"
//!     events: [submit]
//! ```

use crate::{
    config::PointingConfig,
    events::UiEvent,
    gesture::{Direction, GestureLabel, Observation},
    pointing::{Keypoint, PointingClassifier, Pose, PoseEstimator},
    utils::{BoundingBox, Point},
    vision::{FaceDetector, Frame, FrameSource, GestureClassifier},
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, path::Path};

/// Whole scripted session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// `[width, height]` of every frame
    #[serde(default = "default_frame_size")]
    pub frame_size: [u32; 2],
    pub steps: Vec<ScriptStep>,
}

fn default_frame_size() -> [u32; 2] {
    [640, 480]
}

fn default_repeat() -> u32 {
    1
}

/// A run of identical frames
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptStep {
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Face boxes `[x, y, width, height]`
    pub faces: Vec<BoundingBox>,
    /// Classifier output, bypassing keypoints
    pub gesture: Option<ScriptGesture>,
    /// 17 COCO keypoints `[x, y, score]`
    pub pose: Option<Vec<Keypoint>>,
    /// Characters typed on the first frame
    pub keys: String,
    /// Mouse click on the first frame
    pub click: Option<Direction>,
    /// Other UI events on the first frame, after keys and click
    pub events: Vec<UiEvent>,
    /// The camera fails to deliver these frames
    pub camera_error: bool,
    /// The face detector fails on these frames
    pub detector_error: bool,
    /// The gesture classifier fails on these frames
    pub classifier_error: bool,
}

/// Explicit classifier output for a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptGesture {
    pub label: GestureLabel,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Normalized pointer position
    #[serde(default)]
    pub pointer: Option<[f32; 2]>,
}

fn default_confidence() -> f32 {
    1.0
}

impl Script {
    /// Load a script from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a script from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Script(format!("Failed to parse script: {}", e)))?;
        if script.frame_size[0] == 0 || script.frame_size[1] == 0 {
            return Err(Error::Script("frame_size must be non-zero".to_string()));
        }
        Ok(script)
    }

    /// Total number of frames, failed ones included
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.repeat)).sum()
    }

    /// Expand the steps into a frame source
    #[must_use]
    pub fn into_source(self) -> ScriptedSource {
        let size = (self.frame_size[0], self.frame_size[1]);
        let mut frames = VecDeque::new();
        let mut index = 0u64;

        for step in self.steps {
            let mut ui_events = Vec::new();
            ui_events.extend(step.keys.chars().map(UiEvent::Key));
            ui_events.extend(step.click.map(UiEvent::Click));
            ui_events.extend(step.events.iter().copied());

            for i in 0..step.repeat {
                let frame = (!step.camera_error).then(|| ScriptedFrame {
                    index,
                    size,
                    faces: step.faces.clone(),
                    gesture: step.gesture,
                    pose: step.pose.clone().map(Pose::new),
                    ui_events: if i == 0 { ui_events.clone() } else { Vec::new() },
                    detector_error: step.detector_error,
                    classifier_error: step.classifier_error,
                });
                frames.push_back(frame);
                index += 1;
            }
        }

        ScriptedSource { frames }
    }
}

/// A frame described by a script step
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedFrame {
    pub index: u64,
    pub size: (u32, u32),
    pub faces: Vec<BoundingBox>,
    pub gesture: Option<ScriptGesture>,
    pub pose: Option<Pose>,
    pub ui_events: Vec<UiEvent>,
    pub detector_error: bool,
    pub classifier_error: bool,
}

impl Frame for ScriptedFrame {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn index(&self) -> u64 {
        self.index
    }

    fn ui_events(&self) -> &[UiEvent] {
        &self.ui_events
    }
}

/// Replays a script frame by frame
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    frames: VecDeque<Option<ScriptedFrame>>,
}

impl ScriptedSource {
    /// True once every scripted frame has been pulled
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames left to replay
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource<ScriptedFrame> for ScriptedSource {
    fn next_frame(&mut self) -> Result<ScriptedFrame> {
        match self.frames.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) => Err(Error::CameraUnavailable("scripted camera failure".to_string())),
            None => Err(Error::CameraUnavailable("script exhausted".to_string())),
        }
    }
}

/// Face detector that reports the scripted boxes
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedFaceDetector;

impl FaceDetector<ScriptedFrame> for ScriptedFaceDetector {
    fn detect_faces(&mut self, frame: &ScriptedFrame) -> Result<Vec<BoundingBox>> {
        if frame.detector_error {
            return Err(Error::FaceDetection("scripted detector failure".to_string()));
        }
        Ok(frame.faces.clone())
    }
}

/// Pose estimator that reports the scripted keypoints
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedPoseEstimator;

impl PoseEstimator<ScriptedFrame> for ScriptedPoseEstimator {
    fn estimate(&mut self, frame: &ScriptedFrame) -> Result<Option<Pose>> {
        Ok(frame.pose.clone())
    }
}

/// Classifier that uses the scripted gesture, or the pointing classifier on scripted keypoints
pub struct ScriptedClassifier {
    pointing: PointingClassifier<ScriptedPoseEstimator>,
}

impl ScriptedClassifier {
    #[must_use]
    pub fn new(config: &PointingConfig) -> Self {
        Self {
            pointing: PointingClassifier::from_config(ScriptedPoseEstimator, config),
        }
    }
}

impl Default for ScriptedClassifier {
    fn default() -> Self {
        Self::new(&PointingConfig::default())
    }
}

impl GestureClassifier<ScriptedFrame> for ScriptedClassifier {
    fn classify(&mut self, frame: &ScriptedFrame) -> Result<Observation> {
        if frame.classifier_error {
            return Err(Error::Classification("scripted classifier failure".to_string()));
        }
        match frame.gesture {
            Some(gesture) => {
                let mut observation = Observation::new(gesture.label, gesture.confidence, frame.index);
                if let Some([x, y]) = gesture.pointer {
                    observation = observation.with_pointer(Point::new(x, y));
                }
                debug!("Frame {}: scripted gesture {}", frame.index, gesture.label);
                Ok(observation)
            }
            None => self.pointing.classify(frame),
        }
    }
}
