//! YOLOv8-pose keypoint estimator using `ONNX` Runtime.
//!
//! The model takes a 640×640 RGB image scaled to `[0, 1]` (NCHW) and returns
//! `[1, 56, 8400]`: per anchor a box (4), a person score (1) and 17
//! keypoints as `(x, y, score)` triples, all in input pixels.

use crate::{
    constants::NUM_POSE_KEYPOINTS,
    pointing::{Keypoint, Pose, PoseEstimator},
    vision::camera::CameraFrame,
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::{
    core::{Mat, Rect, Scalar, Size, CV_8UC3},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};
use ort::{Environment, Session, Value};
use std::{path::Path, sync::Arc};

/// Square model input size
const INPUT_SIZE: i32 = 640;

/// Letterbox padding value
const PAD_VALUE: f64 = 114.0;

/// Box (4) + score (1) + keypoints (17 × 3)
const OUTPUT_CHANNELS: usize = 5 + NUM_POSE_KEYPOINTS * 3;

/// Person keypoint estimator
pub struct OnnxPoseEstimator {
    session: Session,
    confidence_threshold: f32,
}

impl OnnxPoseEstimator {
    /// Load a YOLOv8-pose model
    ///
    /// # Errors
    ///
    /// Returns an error if the ONNX runtime environment cannot be created or
    /// the model file cannot be loaded
    pub fn new<P: AsRef<Path>>(model_path: P, confidence_threshold: f32) -> Result<Self> {
        info!("Initializing pose estimator with model: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("pose_estimator")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }

        Ok(Self {
            session,
            confidence_threshold,
        })
    }

    /// Resize keeping the aspect ratio and pad to the model input; returns the tensor and scale
    fn preprocess(&self, image: &Mat) -> Result<(Array4<f32>, f32)> {
        let (width, height) = (image.cols(), image.rows());
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidInput("empty frame".to_string()));
        }
        let scale = INPUT_SIZE as f32 / width.max(height) as f32;
        let new_width = ((width as f32 * scale) as i32).clamp(1, INPUT_SIZE);
        let new_height = ((height as f32 * scale) as i32).clamp(1, INPUT_SIZE);

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut padded =
            Mat::new_rows_cols_with_default(INPUT_SIZE, INPUT_SIZE, CV_8UC3, Scalar::all(PAD_VALUE))?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&padded, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let size = INPUT_SIZE as usize;
        let bytes = rgb.data_bytes()?;
        let array = Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            f32::from(bytes[(y * size + x) * 3 + c]) / 255.0
        });

        Ok((array, scale))
    }

    fn forward(&self, input: Array4<f32>) -> Result<(Vec<f32>, usize)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelError("No output from model".to_string()))?;
        let tensor = output.try_extract::<f32>()?;
        let view = tensor.view();
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[1] < OUTPUT_CHANNELS {
            return Err(Error::ModelError(format!("Unexpected pose output shape {:?}", shape)));
        }
        let data = view
            .as_slice()
            .ok_or_else(|| Error::ModelError("Failed to get output data".to_string()))?
            .to_vec();
        Ok((data, shape[2]))
    }
}

/// Pick the most confident person from a `[channels, anchors]` output, scaled back to frame pixels
#[must_use]
pub fn decode_best_pose(data: &[f32], anchors: usize, confidence_threshold: f32, scale: f32) -> Option<Pose> {
    if anchors == 0 || data.len() < OUTPUT_CHANNELS * anchors || scale <= 0.0 {
        return None;
    }
    let at = |channel: usize, anchor: usize| data[channel * anchors + anchor];

    let (best, score) = (0..anchors)
        .map(|i| (i, at(4, i)))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if score < confidence_threshold {
        return None;
    }

    let keypoints = (0..NUM_POSE_KEYPOINTS)
        .map(|k| {
            let base = 5 + k * 3;
            Keypoint::new(at(base, best) / scale, at(base + 1, best) / scale, at(base + 2, best))
        })
        .collect();
    Some(Pose::new(keypoints))
}

impl PoseEstimator<CameraFrame> for OnnxPoseEstimator {
    fn estimate(&mut self, frame: &CameraFrame) -> Result<Option<Pose>> {
        let (input, scale) = self.preprocess(&frame.mat)?;
        let (data, anchors) = self.forward(input)?;
        let pose = decode_best_pose(&data, anchors, self.confidence_threshold, scale);
        if pose.is_none() {
            debug!("No person above {:.2} on frame {}", self.confidence_threshold, frame.index);
        }
        Ok(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_best_pose() {
        let anchors = 3;
        let mut data = vec![0.0f32; OUTPUT_CHANNELS * anchors];
        // Anchor 1 wins with score 0.9
        data[4 * anchors] = 0.2;
        data[4 * anchors + 1] = 0.9;
        // Keypoint 0 of anchor 1 at (100, 50), score 0.8
        data[5 * anchors + 1] = 100.0;
        data[6 * anchors + 1] = 50.0;
        data[7 * anchors + 1] = 0.8;

        let pose = decode_best_pose(&data, anchors, 0.5, 0.5).unwrap();
        assert_eq!(pose.keypoints.len(), NUM_POSE_KEYPOINTS);
        assert_eq!(pose.keypoints[0], Keypoint::new(200.0, 100.0, 0.8));

        assert!(decode_best_pose(&data, anchors, 0.95, 0.5).is_none());
        assert!(decode_best_pose(&data[..10], anchors, 0.5, 0.5).is_none());
    }
}
