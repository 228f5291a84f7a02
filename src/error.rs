//! Error types for the touchless ATM kiosk.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "vision")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No frame could be pulled from the camera
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The face detector failed on a frame
    #[error("Face detection error: {0}")]
    FaceDetection(String),

    /// The gesture classifier failed on a frame
    #[error("Gesture classification error: {0}")]
    Classification(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scripted session could not be parsed or replayed
    #[error("Script error: {0}")]
    Script(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Account store failure (not a rejected transaction)
    #[error("Ledger error: {0}")]
    Ledger(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
