//! Absence detection while a session is in progress.
//!
//! Tracks per-frame face counts over a sliding window to decide whether the
//! user walked away, either outright (a long run of empty frames) or through
//! intermittent loss (rare, short detections). A face that shrinks well below
//! the user's usual face area (someone stepping back) also counts as empty.

use crate::{
    config::SessionConfig,
    constants::{
        ABSENT_AREA_RATIO, INTERMITTENT_DETECTION_RATE, INTERMITTENT_MIN_RUN, NORMAL_AREA_ALPHA,
        NORMAL_AREA_BAND, PRESENCE_HISTORY_WINDOW,
    },
};
use log::debug;
use std::collections::VecDeque;

/// Sliding-window absence monitor
pub struct AbsenceMonitor {
    absence_frames: u32,
    grace_period_frames: u32,
    window_size: usize,
    history: VecDeque<bool>,
    consecutive_misses: u32,
    grace_remaining: u32,
    normal_area: Option<f32>,
}

impl AbsenceMonitor {
    /// Create a monitor that flags absence after `absence_frames` empty frames
    #[must_use]
    pub fn new(absence_frames: u32, grace_period_frames: u32) -> Self {
        assert!(absence_frames > 0, "Absence frames must be greater than 0");
        Self {
            absence_frames,
            grace_period_frames,
            window_size: PRESENCE_HISTORY_WINDOW,
            history: VecDeque::with_capacity(PRESENCE_HISTORY_WINDOW),
            consecutive_misses: 0,
            grace_remaining: 0,
            normal_area: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.absence_frames, config.grace_period_frames)
    }

    /// Set the user's usual face area, in square pixels
    pub fn set_normal_area(&mut self, area: f32) {
        self.normal_area = Some(area).filter(|a| *a > 0.0);
    }

    /// Usual face area, smoothed over the session
    #[must_use]
    pub fn normal_area(&self) -> Option<f32> {
        self.normal_area
    }

    /// Start a grace period; called when a session begins or the user answers the absence warning
    pub fn start_grace_period(&mut self) {
        self.history.clear();
        self.consecutive_misses = 0;
        self.grace_remaining = self.grace_period_frames;
    }

    /// Update with the faces seen this frame; returns true when the user is gone.
    ///
    /// `primary_area` is the area of the largest face, when there is one.
    pub fn update(&mut self, face_count: usize, primary_area: Option<f32>) -> bool {
        if self.grace_remaining > 0 {
            self.grace_remaining -= 1;
            return false;
        }

        // Several people in view: not a reliable signal either way
        if face_count >= 2 {
            return false;
        }

        let detected = face_count == 1;
        if self.history.len() >= self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(detected);

        if detected && !self.is_too_small(primary_area) {
            self.consecutive_misses = 0;
            self.track_area(primary_area);
        } else {
            self.consecutive_misses += 1;
        }

        if self.consecutive_misses >= self.absence_frames {
            debug!("No usable face for {} frames", self.consecutive_misses);
            return true;
        }

        if self.is_intermittent() {
            debug!("Intermittent detection over the last {} frames", self.window_size);
            return true;
        }

        false
    }

    /// Consecutive frames without a usable face
    #[must_use]
    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    /// Clear the history, the grace period and the usual face area
    pub fn reset(&mut self) {
        self.history.clear();
        self.consecutive_misses = 0;
        self.grace_remaining = 0;
        self.normal_area = None;
    }

    fn is_too_small(&self, area: Option<f32>) -> bool {
        match (self.normal_area, area) {
            (Some(normal), Some(area)) => area < normal * ABSENT_AREA_RATIO,
            _ => false,
        }
    }

    fn track_area(&mut self, area: Option<f32>) {
        if let (Some(normal), Some(area)) = (self.normal_area, area) {
            if (area - normal).abs() < normal * NORMAL_AREA_BAND {
                self.normal_area = Some(NORMAL_AREA_ALPHA * area + (1.0 - NORMAL_AREA_ALPHA) * normal);
            }
        }
    }

    fn is_intermittent(&self) -> bool {
        if self.history.len() < self.window_size {
            return false;
        }
        let hits = self.history.iter().filter(|&&d| d).count();
        let rate = hits as f32 / self.window_size as f32;

        let mut longest = 0;
        let mut run = 0;
        for &d in &self.history {
            run = if d { run + 1 } else { 0 };
            longest = longest.max(run);
        }

        rate <= INTERMITTENT_DETECTION_RATE && longest < INTERMITTENT_MIN_RUN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE: Option<f32> = Some(10_000.0);

    #[test]
    fn test_consecutive_absence() {
        let mut monitor = AbsenceMonitor::new(45, 0);
        for _ in 0..44 {
            assert!(!monitor.update(0, None));
        }
        assert!(monitor.update(0, None));
    }

    #[test]
    fn test_face_resets_count() {
        let mut monitor = AbsenceMonitor::new(3, 0);
        monitor.update(0, None);
        monitor.update(0, None);
        assert!(!monitor.update(1, FACE));
        assert_eq!(monitor.consecutive_misses(), 0);
        assert!(!monitor.update(0, None));
    }

    #[test]
    fn test_grace_period() {
        let mut monitor = AbsenceMonitor::new(2, 5);
        monitor.start_grace_period();
        for _ in 0..5 {
            assert!(!monitor.update(0, None));
        }
        assert!(!monitor.update(0, None));
        assert!(monitor.update(0, None));
    }

    #[test]
    fn test_intermittent_detection() {
        let mut monitor = AbsenceMonitor::new(1000, 0);
        let mut flagged = false;
        // One hit every 6 frames: rate ~0.17, never a run of 5
        for i in 0..PRESENCE_HISTORY_WINDOW {
            flagged = monitor.update(usize::from(i % 6 == 0), FACE);
        }
        assert!(flagged);
    }

    #[test]
    fn test_steady_presence_not_flagged() {
        let mut monitor = AbsenceMonitor::new(45, 0);
        for _ in 0..200 {
            assert!(!monitor.update(1, FACE));
        }
    }

    #[test]
    fn test_multiple_faces_ignored() {
        let mut monitor = AbsenceMonitor::new(2, 0);
        monitor.update(0, None);
        assert!(!monitor.update(3, FACE));
        assert!(monitor.update(0, None));
    }

    #[test]
    fn test_small_face_counts_as_absent() {
        let mut monitor = AbsenceMonitor::new(3, 0);
        monitor.set_normal_area(10_000.0);

        // 35% of the usual area: the user stepped back
        assert!(!monitor.update(1, Some(3_500.0)));
        assert!(!monitor.update(1, Some(3_500.0)));
        assert_eq!(monitor.consecutive_misses(), 2);
        assert!(monitor.update(1, Some(3_500.0)));

        // 45% still counts as present
        let mut monitor = AbsenceMonitor::new(3, 0);
        monitor.set_normal_area(10_000.0);
        for _ in 0..10 {
            assert!(!monitor.update(1, Some(4_500.0)));
        }
    }

    #[test]
    fn test_normal_area_follows_nearby_faces_only() {
        let mut monitor = AbsenceMonitor::new(45, 0);
        monitor.set_normal_area(10_000.0);

        monitor.update(1, Some(11_000.0));
        let tracked = monitor.normal_area().unwrap();
        assert!((tracked - 10_050.0).abs() < 1e-2, "tracked {}", tracked);

        // Outside the 15% band: kept as present but not learned
        monitor.update(1, Some(20_000.0));
        assert_eq!(monitor.normal_area(), Some(tracked));
    }

    #[test]
    fn test_grace_keeps_normal_area_and_reset_clears_it() {
        let mut monitor = AbsenceMonitor::new(45, 3);
        monitor.set_normal_area(10_000.0);
        monitor.start_grace_period();
        assert_eq!(monitor.normal_area(), Some(10_000.0));

        monitor.reset();
        assert_eq!(monitor.normal_area(), None);
        // Without a usual area any face size is fine
        assert!(!monitor.update(1, Some(10.0)));
        assert_eq!(monitor.consecutive_misses(), 0);
    }

    #[test]
    #[should_panic(expected = "Absence frames must be greater than 0")]
    fn test_zero_absence_frames_panics() {
        AbsenceMonitor::new(0, 0);
    }
}
