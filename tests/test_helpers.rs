//! Helper functions and utilities for tests

#![allow(dead_code)]

use touchless_atm::{
    bank::Ledger,
    config::Config,
    events::UiEvent,
    flow::Screen,
    gesture::{GestureLabel, Observation},
    kiosk::Kiosk,
    script::{Script, ScriptedClassifier, ScriptedFaceDetector, ScriptedFrame},
    utils::BoundingBox,
    Result,
};

/// Frame size used by the scripted tests
pub const FRAME_SIZE: (u32, u32) = (640, 480);

/// A face centered in a 640×480 frame
pub fn centered_face() -> BoundingBox {
    BoundingBox::new(270.0, 190.0, 100.0, 100.0)
}

/// A face near the top-left corner, outside the guide square
pub fn off_center_face() -> BoundingBox {
    BoundingBox::new(10.0, 10.0, 80.0, 80.0)
}

/// Configuration with short thresholds for scripted sessions
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.face_guide.face_unlock_frames = 3;
    config.gesture.gesture_confirm_frames = 2;
    config
}

/// Kiosk replaying `yaml` against the demo ledger
pub fn scripted_kiosk(config: &Config, yaml: &str) -> Kiosk<ScriptedFrame> {
    try_scripted_kiosk(config, yaml).expect("config should be valid")
}

/// Same as [`scripted_kiosk`], keeping the construction error
pub fn try_scripted_kiosk(config: &Config, yaml: &str) -> Result<Kiosk<ScriptedFrame>> {
    let script = Script::from_yaml(yaml).expect("script should parse");
    Kiosk::new(
        config,
        Box::new(script.into_source()),
        Box::new(ScriptedFaceDetector),
        Box::new(ScriptedClassifier::new(&config.pointing)),
        Box::new(Ledger::default().with_demo_account()),
    )
}

/// Queue the pad keys that spell `pin` on the current entry screen
pub fn push_pin(kiosk: &mut Kiosk<ScriptedFrame>, pin: &str) {
    let Screen::PinEntry(form) = kiosk.screen() else {
        panic!("expected entry screen, found {}", kiosk.state());
    };
    let layout = form.pad().layout();
    let keys: Vec<char> = pin
        .chars()
        .map(|digit| {
            layout
                .iter()
                .find(|&&(_, d)| d == digit)
                .map(|&(k, _)| k)
                .expect("every digit is on the pad")
        })
        .collect();
    for key in keys {
        kiosk.push_ui_event(UiEvent::Key(key));
    }
}

/// Observation with a directional or idle label
pub fn observation(label: GestureLabel, confidence: f32, frame_index: u64) -> Observation {
    Observation::new(label, confidence, frame_index)
}
