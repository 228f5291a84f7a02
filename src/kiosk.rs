//! The kiosk tick loop.
//!
//! One call to [`Kiosk::tick`] pulls a frame and pushes it through the face
//! gate (or the presence monitor), the classifier, the validator and the flow
//! controller, then reports what happened. Presence is not checked while the
//! absence warning is up. All state lives here; there is no
//! threading and no locking.

use crate::{
    audio::{AudioPolicy, AudioSink, LogAudioSink},
    bank::Bank,
    config::Config,
    events::{KioskEvent, UiEvent},
    face_gate::{FaceGate, FaceGateState},
    flow::{FlowController, FlowState, Screen},
    gesture::Observation,
    presence::AbsenceMonitor,
    utils::largest_face,
    validator::GestureValidator,
    vision::{FaceDetector, Frame, FrameSource, GestureClassifier},
    Result,
};
use log::{debug, info, warn};
use std::{collections::VecDeque, time::Instant};

/// What one tick did
#[derive(Debug)]
pub struct TickReport<I> {
    /// Frame processed on this tick, if the camera delivered one
    pub frame: Option<I>,
    /// Flow state after the tick
    pub state: FlowState,
    /// Face gate snapshot, on face-guide ticks
    pub gate: Option<FaceGateState>,
    /// Classifier output, on ticks past the face guide
    pub observation: Option<Observation>,
    /// Face-unlock or gesture-confirmation progress, `0.0..=1.0`
    pub progress: f32,
    /// Events in the order they happened
    pub events: Vec<KioskEvent>,
}

/// Touchless ATM kiosk
pub struct Kiosk<I> {
    source: Box<dyn FrameSource<I>>,
    detector: Box<dyn FaceDetector<I>>,
    classifier: Box<dyn GestureClassifier<I>>,
    bank: Box<dyn Bank>,
    audio_sink: Box<dyn AudioSink>,
    gate: FaceGate,
    validator: GestureValidator,
    presence: AbsenceMonitor,
    flow: FlowController,
    audio: AudioPolicy,
    pending_ui: VecDeque<UiEvent>,
    ticks: u64,
}

impl<I: Frame> Kiosk<I> {
    /// Assemble a kiosk from its collaborators.
    ///
    /// The configuration is validated first; an invalid one is a
    /// [`Error::ConfigError`](crate::Error::ConfigError).
    pub fn new(
        config: &Config,
        source: Box<dyn FrameSource<I>>,
        detector: Box<dyn FaceDetector<I>>,
        classifier: Box<dyn GestureClassifier<I>>,
        bank: Box<dyn Bank>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Initializing kiosk");
        Ok(Self {
            source,
            detector,
            classifier,
            bank,
            audio_sink: Box::new(LogAudioSink),
            gate: FaceGate::from_config(&config.face_guide),
            validator: GestureValidator::from_config(&config.gesture),
            presence: AbsenceMonitor::from_config(&config.session),
            flow: FlowController::from_config(config),
            audio: AudioPolicy::new(),
            pending_ui: VecDeque::new(),
            ticks: 0,
        })
    }

    /// Replace the default logging audio sink
    #[must_use]
    pub fn with_audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio_sink = sink;
        self
    }

    /// Queue a UI event for the next tick
    pub fn push_ui_event(&mut self, event: UiEvent) {
        self.pending_ui.push_back(event);
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.flow.state()
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        self.flow.screen()
    }

    #[must_use]
    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    #[must_use]
    pub fn validator(&self) -> &GestureValidator {
        &self.validator
    }

    #[must_use]
    pub fn bank(&self) -> &dyn Bank {
        self.bank.as_ref()
    }

    /// Ticks run so far
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick at time `now`
    pub fn tick(&mut self, now: Instant) -> TickReport<I> {
        self.ticks += 1;
        let mut events = Vec::new();

        let frame = match self.source.next_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("No frame on tick {}: {}", self.ticks, e);
                None
            }
        };

        let gate = match self.flow.state() {
            FlowState::FaceGuide => Some(self.run_face_gate(frame.as_ref(), &mut events)),
            FlowState::AbsenceWarning => None,
            _ => {
                self.run_presence(frame.as_ref(), now, &mut events);
                None
            }
        };

        let mut ui_events: Vec<UiEvent> = frame
            .as_ref()
            .map(|f| f.ui_events().to_vec())
            .unwrap_or_default();
        ui_events.extend(self.pending_ui.drain(..));
        for event in ui_events {
            debug!("UI event: {:?}", event);
            self.flow.on_ui_event(event, self.bank.as_mut(), now);
            self.apply_flow_events(&mut events);
        }

        let mut observation = None;
        if let Some(frame) = frame.as_ref().filter(|_| self.flow.state() != FlowState::FaceGuide) {
            let obs = self.classifier.classify(frame).unwrap_or_else(|e| {
                warn!("Classification failed on frame {}: {}", frame.index(), e);
                Observation::idle(frame.index())
            });
            if let Some(confirmed) = self.validator.observe(&obs) {
                info!("Confirmed gesture: {}", confirmed.direction);
                events.push(KioskEvent::ConfirmedGesture(confirmed));
                self.flow.on_gesture(confirmed, self.bank.as_mut(), now);
                self.apply_flow_events(&mut events);
            }
            observation = Some(obs);
        }

        self.flow.on_tick(now);
        self.apply_flow_events(&mut events);

        if let Some(cue) = self.audio.update(self.flow.screen()) {
            self.audio_sink.play_voice(cue);
            events.push(KioskEvent::Voice(cue));
        }

        let progress = match &gate {
            Some(state) if self.flow.state() == FlowState::FaceGuide => state.progress(),
            _ => self.validator.progress(),
        };

        TickReport {
            frame,
            state: self.flow.state(),
            gate,
            observation,
            progress,
            events,
        }
    }

    fn run_face_gate(&mut self, frame: Option<&I>, events: &mut Vec<KioskEvent>) -> FaceGateState {
        let was_unlocked = self.gate.is_unlocked();
        let state = match frame {
            Some(frame) => self.gate.evaluate_frame(self.detector.as_mut(), frame),
            None => self.gate.record_miss(),
        };

        if state.is_unlocked && !was_unlocked {
            events.push(KioskEvent::FaceUnlocked);
            self.flow.on_face_unlocked();
            self.apply_flow_events(events);
            // The unlocking face is the user's usual size
            if let Some(face) = state.face {
                self.presence.set_normal_area(face.area());
            }
        }
        state
    }

    fn run_presence(&mut self, frame: Option<&I>, now: Instant, events: &mut Vec<KioskEvent>) {
        let faces = match frame {
            Some(frame) => self.detector.detect_faces(frame).unwrap_or_else(|e| {
                warn!("Face detection failed during session: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let primary_area = largest_face(&faces).map(|f| f.area());

        if self.presence.update(faces.len(), primary_area) {
            self.flow.on_user_absent(now);
            self.apply_flow_events(events);
        }
    }

    fn apply_flow_events(&mut self, out: &mut Vec<KioskEvent>) {
        for event in self.flow.drain_events() {
            match &event {
                KioskEvent::StateChanged { from, to } => {
                    self.validator.reset();
                    if *to == FlowState::FaceGuide {
                        self.gate.reset();
                        self.presence.reset();
                    }
                    if matches!(from, FlowState::FaceGuide | FlowState::AbsenceWarning) {
                        self.presence.start_grace_period();
                    }
                }
                KioskEvent::FieldCompleted(_) => self.validator.reset(),
                KioskEvent::Effect(effect) => self.audio_sink.play_effect(*effect),
                _ => {}
            }
            out.push(event);
        }
    }
}
