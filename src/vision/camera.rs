//! `OpenCV` webcam frame source.

use crate::{
    config::CameraConfig,
    vision::{Frame, FrameSource},
    Error, Result,
};
use log::info;
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

/// A BGR camera frame
pub struct CameraFrame {
    /// Image data
    pub mat: Mat,
    /// Sequence number assigned by the camera source
    pub index: u64,
}

impl Frame for CameraFrame {
    fn size(&self) -> (u32, u32) {
        (self.mat.cols().max(0) as u32, self.mat.rows().max(0) as u32)
    }

    fn index(&self) -> u64 {
        self.index
    }
}

/// Webcam opened through `VideoCapture`
pub struct OpenCvCamera {
    capture: VideoCapture,
    mirror: bool,
    next_index: u64,
}

impl OpenCvCamera {
    /// Open camera `device_id` at the requested resolution
    pub fn new(device_id: i32, width: u32, height: u32, mirror: bool) -> Result<Self> {
        info!("Opening camera {}", device_id);
        let mut capture = VideoCapture::new(device_id, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::CameraUnavailable(format!("camera {} could not be opened", device_id)));
        }

        capture.set(CAP_PROP_FRAME_WIDTH, f64::from(width))?;
        capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(height))?;
        // Always hand out the newest frame
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        Ok(Self {
            capture,
            mirror,
            next_index: 0,
        })
    }

    /// Open the camera described by the `camera` configuration section
    pub fn from_config(config: &CameraConfig) -> Result<Self> {
        Self::new(config.device_id, config.width, config.height, config.mirror)
    }
}

impl FrameSource<CameraFrame> for OpenCvCamera {
    fn next_frame(&mut self) -> Result<CameraFrame> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Err(Error::CameraUnavailable("failed to read frame".to_string()));
        }

        if self.mirror {
            let mut flipped = Mat::default();
            core::flip(&mat, &mut flipped, 1)?;
            mat = flipped;
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(CameraFrame { mat, index })
    }
}
