//! Face presence gate.
//!
//! The kiosk stays locked on the face-guide screen until a face has been
//! centered in the guide square for a number of consecutive frames. A single
//! frame without a face in the region resets the counter; there is no decay.

use crate::{
    config::FaceGuideConfig,
    utils::{guide_box, largest_face, BoundingBox},
    vision::{FaceDetector, Frame},
    Result,
};
use log::{debug, info, warn};

/// Coarse gate status for the face-guide screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// No face in the guide region
    Waiting,
    /// Face in region, counting frames
    Detecting,
    /// Threshold reached
    Unlocked,
}

/// Snapshot of the gate after one evaluated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGateState {
    /// Consecutive frames with a face centered in the guide region
    pub consecutive_hit_count: u32,
    /// Hits needed to unlock
    pub threshold: u32,
    /// Sticky unlock flag
    pub is_unlocked: bool,
    /// Guide region for the evaluated frame, in pixels
    pub guide: BoundingBox,
    /// Face selected on this frame, if any
    pub face: Option<BoundingBox>,
}

impl FaceGateState {
    /// Status derived from the counters
    #[must_use]
    pub fn status(&self) -> GateStatus {
        if self.is_unlocked {
            GateStatus::Unlocked
        } else if self.consecutive_hit_count > 0 {
            GateStatus::Detecting
        } else {
            GateStatus::Waiting
        }
    }

    /// Unlock progress in `0.0..=1.0`
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.is_unlocked {
            return 1.0;
        }
        (self.consecutive_hit_count as f32 / self.threshold.max(1) as f32).min(1.0)
    }
}

/// Consecutive-frame face-in-region unlock
#[derive(Debug, Clone)]
pub struct FaceGate {
    threshold: u32,
    guide_ratio: f32,
    consecutive_hits: u32,
    unlocked: bool,
    last_guide: BoundingBox,
}

impl FaceGate {
    /// Create a gate requiring `threshold` consecutive hits
    #[must_use]
    pub fn new(threshold: u32, guide_ratio: f32) -> Self {
        assert!(threshold > 0, "Unlock threshold must be greater than 0");
        Self {
            threshold,
            guide_ratio,
            consecutive_hits: 0,
            unlocked: false,
            last_guide: BoundingBox::default(),
        }
    }

    /// Build a gate from the `face_guide` configuration section
    #[must_use]
    pub fn from_config(config: &FaceGuideConfig) -> Self {
        Self::new(config.face_unlock_frames, config.guide_box_ratio)
    }

    /// Evaluate one frame's detection result.
    ///
    /// Detector errors are logged and count as a frame without a face.
    pub fn evaluate(
        &mut self,
        detection: Result<Vec<BoundingBox>>,
        frame_size: (u32, u32),
    ) -> FaceGateState {
        let (width, height) = frame_size;
        let guide = guide_box(width, height, self.guide_ratio);
        self.last_guide = guide;

        let faces = detection.unwrap_or_else(|e| {
            warn!("Face detection failed, counting frame as empty: {}", e);
            Vec::new()
        });

        let face = largest_face(&faces);
        let in_region = face.map_or(false, |f| guide.contains_strict(f.center()));

        if in_region {
            self.consecutive_hits = self.consecutive_hits.saturating_add(1);
            if !self.unlocked && self.consecutive_hits >= self.threshold {
                self.unlocked = true;
                info!("Face gate unlocked after {} frames", self.consecutive_hits);
            }
        } else {
            if self.consecutive_hits > 0 {
                debug!("Face left guide region after {} frames", self.consecutive_hits);
            }
            self.consecutive_hits = 0;
        }

        FaceGateState {
            consecutive_hit_count: self.consecutive_hits,
            threshold: self.threshold,
            is_unlocked: self.unlocked,
            guide,
            face,
        }
    }

    /// Run the detector on a frame and evaluate the result
    pub fn evaluate_frame<I: Frame>(
        &mut self,
        detector: &mut dyn FaceDetector<I>,
        frame: &I,
    ) -> FaceGateState {
        let detection = detector.detect_faces(frame);
        self.evaluate(detection, frame.size())
    }

    /// Count a frame that never arrived (camera failure) as a miss
    pub fn record_miss(&mut self) -> FaceGateState {
        self.consecutive_hits = 0;
        self.snapshot()
    }

    /// Clear the counter and the unlock flag
    pub fn reset(&mut self) {
        self.consecutive_hits = 0;
        self.unlocked = false;
    }

    /// Current state without evaluating a frame
    #[must_use]
    pub fn snapshot(&self) -> FaceGateState {
        FaceGateState {
            consecutive_hit_count: self.consecutive_hits,
            threshold: self.threshold,
            is_unlocked: self.unlocked,
            guide: self.last_guide,
            face: None,
        }
    }

    /// Whether the gate has unlocked
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const FRAME: (u32, u32) = (100, 100);

    fn centered() -> Result<Vec<BoundingBox>> {
        Ok(vec![BoundingBox::new(40.0, 40.0, 20.0, 20.0)])
    }

    #[test]
    fn test_unlocks_at_threshold() {
        let mut gate = FaceGate::new(3, 0.5);
        assert_eq!(gate.evaluate(centered(), FRAME).status(), GateStatus::Detecting);
        assert!(!gate.evaluate(centered(), FRAME).is_unlocked);
        let state = gate.evaluate(centered(), FRAME);
        assert!(state.is_unlocked);
        assert_eq!(state.status(), GateStatus::Unlocked);
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_miss_resets_counter() {
        let mut gate = FaceGate::new(3, 0.5);
        gate.evaluate(centered(), FRAME);
        gate.evaluate(centered(), FRAME);
        let state = gate.evaluate(Ok(vec![]), FRAME);
        assert_eq!(state.consecutive_hit_count, 0);
        assert_eq!(state.status(), GateStatus::Waiting);
    }

    #[test]
    fn test_face_outside_region_is_miss() {
        let mut gate = FaceGate::new(1, 0.5);
        // Guide is (25,25,50,50); this face is centered at (10,10)
        let state = gate.evaluate(Ok(vec![BoundingBox::new(0.0, 0.0, 20.0, 20.0)]), FRAME);
        assert!(!state.is_unlocked);
        assert!(state.face.is_some());
    }

    #[test]
    fn test_largest_face_decides() {
        let mut gate = FaceGate::new(1, 0.5);
        let faces = vec![
            BoundingBox::new(45.0, 45.0, 10.0, 10.0),
            BoundingBox::new(0.0, 0.0, 30.0, 30.0),
        ];
        // The bigger face is outside the guide, so the small centered one does not count
        assert!(!gate.evaluate(Ok(faces), FRAME).is_unlocked);
    }

    #[test]
    fn test_detector_error_counts_as_miss() {
        let mut gate = FaceGate::new(3, 0.5);
        gate.evaluate(centered(), FRAME);
        let state = gate.evaluate(Err(Error::FaceDetection("boom".into())), FRAME);
        assert_eq!(state.consecutive_hit_count, 0);
    }

    #[test]
    fn test_unlock_is_sticky_until_reset() {
        let mut gate = FaceGate::new(2, 0.5);
        gate.evaluate(centered(), FRAME);
        gate.evaluate(centered(), FRAME);
        assert!(gate.evaluate(Ok(vec![]), FRAME).is_unlocked);
        assert!(gate.record_miss().is_unlocked);

        gate.reset();
        assert!(!gate.is_unlocked());
        assert_eq!(gate.snapshot().consecutive_hit_count, 0);
    }
}
