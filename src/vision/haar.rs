//! Haar cascade face detector.

use crate::{
    utils::BoundingBox,
    vision::{camera::CameraFrame, FaceDetector},
    Error, Result,
};
use log::info;
use opencv::{
    core::{Mat, Rect, Size, Vector},
    imgproc,
    objdetect::CascadeClassifier,
    prelude::*,
};
use std::path::Path;

const SCALE_FACTOR: f64 = 1.1;
const MIN_NEIGHBORS: i32 = 4;
const MIN_FACE_SIZE: i32 = 30;

/// Frontal face detector backed by an `OpenCV` cascade
pub struct HaarFaceDetector {
    classifier: CascadeClassifier,
}

impl HaarFaceDetector {
    /// Load a cascade XML file
    pub fn new<P: AsRef<Path>>(cascade_path: P) -> Result<Self> {
        let path = cascade_path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InvalidInput(format!("non UTF-8 path: {}", path.display())))?;

        let classifier = CascadeClassifier::new(path_str)?;
        if classifier.empty()? {
            return Err(Error::ModelError(format!("failed to load cascade {}", path.display())));
        }
        info!("Loaded face cascade {}", path.display());
        Ok(Self { classifier })
    }
}

impl FaceDetector<CameraFrame> for HaarFaceDetector {
    fn detect_faces(&mut self, frame: &CameraFrame) -> Result<Vec<BoundingBox>> {
        let mut gray = Mat::default();
        imgproc::cvt_color(&frame.mat, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &gray,
            &mut faces,
            SCALE_FACTOR,
            MIN_NEIGHBORS,
            0,
            Size::new(MIN_FACE_SIZE, MIN_FACE_SIZE),
            Size::new(0, 0),
        )?;

        Ok(faces
            .iter()
            .map(|r| BoundingBox::new(r.x as f32, r.y as f32, r.width as f32, r.height as f32))
            .collect())
    }
}
