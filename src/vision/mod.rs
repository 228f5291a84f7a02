//! Collaborator seams: where frames come from and how they are analysed.
//!
//! The kiosk core is generic over the frame type `I`. Headless runs use
//! [`crate::script::ScriptedFrame`]; with the `vision` feature enabled the
//! OpenCV camera produces [`camera::CameraFrame`]s that the Haar face
//! detector and the ONNX pose estimator consume.

use crate::{events::UiEvent, gesture::Observation, utils::BoundingBox, Result};

#[cfg(feature = "vision")]
pub mod camera;
#[cfg(feature = "vision")]
pub mod display;
#[cfg(feature = "vision")]
pub mod haar;
#[cfg(feature = "vision")]
pub mod pose;

/// A captured frame
pub trait Frame {
    /// Frame size in pixels, `(width, height)`
    fn size(&self) -> (u32, u32);

    /// Monotonic frame index assigned by the source
    fn index(&self) -> u64;

    /// UI events that arrived together with this frame
    fn ui_events(&self) -> &[UiEvent] {
        &[]
    }
}

/// Produces frames, one per tick
pub trait FrameSource<I> {
    /// Pull the next frame; fails with [`crate::Error::CameraUnavailable`]
    fn next_frame(&mut self) -> Result<I>;
}

/// Finds faces in a frame
pub trait FaceDetector<I> {
    /// Bounding boxes of all faces found, in pixels
    fn detect_faces(&mut self, frame: &I) -> Result<Vec<BoundingBox>>;
}

/// Turns a frame into a single gesture observation
pub trait GestureClassifier<I> {
    /// Classify one frame. Frames with nothing usable yield [`Observation::idle`].
    fn classify(&mut self, frame: &I) -> Result<Observation>;
}
