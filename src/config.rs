//! Configuration management for the touchless ATM kiosk

use crate::{
    constants::{
        DEFAULT_ABSENCE_FRAMES, DEFAULT_ABSENCE_WARNING_SECONDS, DEFAULT_EDGE_MARGIN, DEFAULT_FACE_UNLOCK_FRAMES, DEFAULT_FPS,
        DEFAULT_GESTURE_CONFIRM_FRAMES, DEFAULT_GRACE_PERIOD_FRAMES, DEFAULT_GUIDE_BOX_RATIO,
        DEFAULT_IDLE_TIMEOUT_SECONDS, DEFAULT_KEYPOINT_MIN_CONFIDENCE, DEFAULT_LEFT_THRESHOLD,
        DEFAULT_MAX_AMOUNT, DEFAULT_MAX_PIN_ATTEMPTS, DEFAULT_MIN_DETECTION_CONFIDENCE,
        DEFAULT_PIN_SALT, DEFAULT_RIGHT_THRESHOLD, DEFAULT_UPPER_REGION_CUTOFF,
    },
    validator::IdlePolicy,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera settings
    pub camera: CameraConfig,

    /// Model file paths
    pub models: ModelConfig,

    /// Face-guide unlock
    pub face_guide: FaceGuideConfig,

    /// Gesture validation
    pub gesture: GestureConfig,

    /// Pointing zones
    pub pointing: PointingConfig,

    /// Session timing and absence detection
    pub session: SessionConfig,

    /// PIN hashing and transaction limits
    pub security: SecurityConfig,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub device_id: i32,

    /// Requested frame width
    pub width: u32,

    /// Requested frame height
    pub height: u32,

    /// Tick rate of the main loop
    pub fps: u32,

    /// Mirror the image horizontally so pointing left moves left on screen
    pub mirror: bool,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// YOLOv8-pose ONNX model
    pub pose_model: PathBuf,

    /// Haar cascade for frontal faces
    pub face_cascade: PathBuf,
}

/// Face-guide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceGuideConfig {
    /// Consecutive frames with a centered face needed to unlock
    pub face_unlock_frames: u32,

    /// Guide square side as a fraction of the frame height
    pub guide_box_ratio: f32,
}

/// Gesture validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Consecutive qualifying frames needed to confirm
    pub gesture_confirm_frames: u32,

    /// Observations below this confidence count as idle (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Pointer positions above this normalized y are discarded (0.0-1.0)
    pub upper_region_cutoff: f32,

    /// How idle frames affect a run in progress
    pub idle_policy: IdlePolicy,
}

/// Pointing classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointingConfig {
    /// Normalized x below which the pointer is in the left zone
    pub left_threshold: f32,

    /// Normalized x from which the pointer is in the right zone
    pub right_threshold: f32,

    /// Margin at both frame edges where pointing is ignored
    pub edge_margin: f32,

    /// Minimum wrist/elbow keypoint score
    pub keypoint_min_confidence: f32,

    /// Minimum person score from the pose model
    pub pose_confidence: f32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds before the result screen returns to the face guide
    pub idle_timeout_seconds: u64,

    /// Consecutive frames without a face before the user counts as absent
    pub absence_frames: u32,

    /// Frames after an unlock or an absence-warning answer during which absence is not checked
    pub grace_period_frames: u32,

    /// Seconds the absence warning waits before falling back to the menu
    pub absence_warning_seconds: u64,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Salt prepended to PINs before hashing
    pub pin_salt: String,

    /// Largest amount a single transaction may move
    pub max_amount: u64,

    /// Wrong PINs before an account is frozen
    pub max_pin_attempts: u32,

    /// YAML file backing the ledger; in-memory when unset
    pub ledger_path: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: DEFAULT_FPS,
            mirror: true,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pose_model: PathBuf::from("assets/yolov8n-pose.onnx"),
            face_cascade: PathBuf::from("assets/haarcascade_frontalface_default.xml"),
        }
    }
}

impl Default for FaceGuideConfig {
    fn default() -> Self {
        Self {
            face_unlock_frames: DEFAULT_FACE_UNLOCK_FRAMES,
            guide_box_ratio: DEFAULT_GUIDE_BOX_RATIO,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            gesture_confirm_frames: DEFAULT_GESTURE_CONFIRM_FRAMES,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            upper_region_cutoff: DEFAULT_UPPER_REGION_CUTOFF,
            idle_policy: IdlePolicy::default(),
        }
    }
}

impl Default for PointingConfig {
    fn default() -> Self {
        Self {
            left_threshold: DEFAULT_LEFT_THRESHOLD,
            right_threshold: DEFAULT_RIGHT_THRESHOLD,
            edge_margin: DEFAULT_EDGE_MARGIN,
            keypoint_min_confidence: DEFAULT_KEYPOINT_MIN_CONFIDENCE,
            pose_confidence: 0.5,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
            absence_frames: DEFAULT_ABSENCE_FRAMES,
            grace_period_frames: DEFAULT_GRACE_PERIOD_FRAMES,
            absence_warning_seconds: DEFAULT_ABSENCE_WARNING_SECONDS,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            pin_salt: DEFAULT_PIN_SALT.to_string(),
            max_amount: DEFAULT_MAX_AMOUNT,
            max_pin_attempts: DEFAULT_MAX_PIN_ATTEMPTS,
            ledger_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Face guide
        if self.face_guide.face_unlock_frames == 0 {
            return Err(Error::ConfigError(
                "face_unlock_frames must be greater than 0".to_string(),
            ));
        }
        if !(self.face_guide.guide_box_ratio > 0.0 && self.face_guide.guide_box_ratio <= 1.0) {
            return Err(Error::ConfigError(
                "guide_box_ratio must be in (0.0, 1.0]".to_string(),
            ));
        }

        // Gesture validation
        if self.gesture.gesture_confirm_frames == 0 {
            return Err(Error::ConfigError(
                "gesture_confirm_frames must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gesture.min_detection_confidence) {
            return Err(Error::ConfigError(
                "min_detection_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gesture.upper_region_cutoff) {
            return Err(Error::ConfigError(
                "upper_region_cutoff must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Pointing zones
        let pointing = &self.pointing;
        if !(0.0..=1.0).contains(&pointing.left_threshold) || !(0.0..=1.0).contains(&pointing.right_threshold) {
            return Err(Error::ConfigError(
                "Pointing thresholds must be between 0.0 and 1.0".to_string(),
            ));
        }
        if pointing.left_threshold >= pointing.right_threshold {
            return Err(Error::ConfigError(
                "left_threshold must be smaller than right_threshold".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&pointing.edge_margin) {
            return Err(Error::ConfigError(
                "edge_margin must be in [0.0, 0.5)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&pointing.keypoint_min_confidence)
            || !(0.0..=1.0).contains(&pointing.pose_confidence)
        {
            return Err(Error::ConfigError(
                "Pointing confidences must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Session
        if self.session.idle_timeout_seconds == 0 {
            return Err(Error::ConfigError(
                "idle_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.session.absence_frames == 0 {
            return Err(Error::ConfigError(
                "absence_frames must be greater than 0".to_string(),
            ));
        }
        if self.session.absence_warning_seconds == 0 {
            return Err(Error::ConfigError(
                "absence_warning_seconds must be greater than 0".to_string(),
            ));
        }

        // Camera
        if self.camera.fps == 0 {
            return Err(Error::ConfigError("Camera FPS must be greater than 0".to_string()));
        }

        // Security
        if self.security.max_amount == 0 {
            return Err(Error::ConfigError("max_amount must be greater than 0".to_string()));
        }
        if self.security.max_pin_attempts == 0 {
            return Err(Error::ConfigError(
                "max_pin_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that the model files needed for camera mode exist
    pub fn validate_models(&self) -> Result<()> {
        if !self.models.pose_model.exists() {
            return Err(Error::ConfigError(format!(
                "Pose model not found: {}",
                self.models.pose_model.display()
            )));
        }
        if !self.models.face_cascade.exists() {
            return Err(Error::ConfigError(format!(
                "Face cascade not found: {}",
                self.models.face_cascade.display()
            )));
        }
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Touchless ATM Configuration

# Camera
camera:
  device_id: 0
  width: 640
  height: 480
  fps: 30
  mirror: true

# Model paths (camera mode only)
models:
  pose_model: "assets/yolov8n-pose.onnx"
  face_cascade: "assets/haarcascade_frontalface_default.xml"

# Face-guide unlock
face_guide:
  face_unlock_frames: 30
  guide_box_ratio: 0.6

# Gesture validation
gesture:
  gesture_confirm_frames: 5
  min_detection_confidence: 0.85
  upper_region_cutoff: 0.1
  idle_policy: ignore   # or "reset"

# Pointing zones
pointing:
  left_threshold: 0.3333
  right_threshold: 0.6667
  edge_margin: 0.05
  keypoint_min_confidence: 0.3
  pose_confidence: 0.5

# Session
session:
  idle_timeout_seconds: 5
  absence_frames: 45
  grace_period_frames: 90
  absence_warning_seconds: 10

# Security
security:
  pin_salt: "default_salt"
  max_amount: 999999
  max_pin_attempts: 3
  # ledger_path: "data/accounts.yaml"
"#;
