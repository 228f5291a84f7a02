//! Touchless ATM kiosk: a camera-driven ATM demo operated without touching anything.
//!
//! The pipeline runs once per camera frame:
//! 1. A face presence gate keeps the kiosk locked until a face has been
//!    centered in the guide square for a number of consecutive frames
//! 2. A gesture classifier turns each frame into a left/center/right
//!    observation (pointing direction derived from body keypoints)
//! 3. The gesture validator debounces observations into confirmed gestures
//! 4. The flow controller drives the screens: face guide, menu, entry form,
//!    confirmation and result
//!
//! Camera, detectors, bank and audio are collaborators behind traits. The
//! default build runs headless on scripted frames; the `vision` feature adds
//! an `OpenCV` camera, a Haar face detector and an ONNX pose estimator.
//!
//! # Examples
//!
//! ## Debouncing gestures
//!
//! ```
//! use touchless_atm::gesture::{Direction, GestureLabel, Observation};
//! use touchless_atm::validator::GestureValidator;
//!
//! let mut validator = GestureValidator::new(5, 0.85);
//! let confirmed: Vec<_> = (0..10)
//!     .filter_map(|i| validator.observe(&Observation::new(GestureLabel::Center, 0.95, i)))
//!     .collect();
//!
//! assert_eq!(confirmed.len(), 1);
//! assert_eq!(confirmed[0].direction, Direction::Center);
//! assert_eq!(confirmed[0].frame_index, 4);
//! ```
//!
//! ## Running a scripted session
//!
//! ```
//! use std::time::Instant;
//! use touchless_atm::{
//!     bank::Ledger,
//!     config::Config,
//!     flow::FlowState,
//!     kiosk::Kiosk,
//!     script::{Script, ScriptedClassifier, ScriptedFaceDetector},
//! };
//!
//! # fn main() -> touchless_atm::Result<()> {
//! let script = Script::from_yaml(
//!     "frame_size: [640, 480]\nsteps:\n  - repeat: 30\n    faces: [[270, 190, 100, 100]]\n",
//! )?;
//! let config = Config::default();
//! let mut kiosk = Kiosk::new(
//!     &config,
//!     Box::new(script.into_source()),
//!     Box::new(ScriptedFaceDetector),
//!     Box::new(ScriptedClassifier::new(&config.pointing)),
//!     Box::new(Ledger::default().with_demo_account()),
//! )?;
//!
//! let now = Instant::now();
//! for _ in 0..30 {
//!     kiosk.tick(now);
//! }
//! assert_eq!(kiosk.state(), FlowState::Menu);
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Geometry helpers
pub mod utils;

/// Per-frame observations and confirmed gestures
pub mod gesture;

/// Debouncing of gesture observations
pub mod validator;

/// Consecutive-frame face-in-guide unlock
pub mod face_gate;

/// Pointing direction from body keypoints
pub mod pointing;

/// Absence detection during a session
pub mod presence;

/// Voice cues and sound effects
pub mod audio;

/// PIN rules, shuffled keypad and input buffers
pub mod pin;

/// Bank collaborator and the in-memory ledger
pub mod bank;

/// Screen state machine
pub mod flow;

/// Inbound UI events and outbound kiosk events
pub mod events;

/// Frame source, detector and classifier traits
pub mod vision;

/// Scripted collaborators for headless runs
pub mod script;

/// The kiosk tick loop
pub mod kiosk;

pub use error::{Error, Result};
