//! Voice guidance and feedback sounds.
//!
//! [`AudioPolicy`] is purely declarative: it maps the current screen to a
//! voice cue and only reports a cue when it changes. Playback is the job of
//! an [`AudioSink`].

use crate::flow::{Field, Screen, Transaction};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spoken guidance, keyed by the name of the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceCue {
    Welcome,
    PushButton,
    WithdrawalAccount,
    RecipientAccount,
    EnterName,
    PayMoney,
    EnterPin,
    EnterNewPin,
    RetryPin,
    CheckScreen,
    CreateAccount,
    ComeAgain,
}

impl VoiceCue {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::PushButton => "push-button",
            Self::WithdrawalAccount => "withdrawal-account",
            Self::RecipientAccount => "recipient-account",
            Self::EnterName => "enter-name",
            Self::PayMoney => "pay-money",
            Self::EnterPin => "enter-pin",
            Self::EnterNewPin => "enter-new-pin",
            Self::RetryPin => "retry-pin",
            Self::CheckScreen => "check-screen",
            Self::CreateAccount => "create-account",
            Self::ComeAgain => "come-again",
        }
    }
}

impl fmt::Display for VoiceCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Short feedback sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundEffect {
    /// Key accepted
    Button,
    /// Input refused
    Beep,
    /// Transaction abandoned
    Cancel,
    /// Menu selection
    PushButton,
    /// Field or transaction accepted
    Assert,
    /// Character removed
    Back,
}

impl SoundEffect {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Beep => "beep",
            Self::Cancel => "cancel",
            Self::PushButton => "push-button",
            Self::Assert => "assert",
            Self::Back => "back",
        }
    }
}

/// Voice cue for a screen
#[must_use]
pub fn cue_for(screen: &Screen) -> VoiceCue {
    match screen {
        Screen::FaceGuide => VoiceCue::Welcome,
        Screen::Menu => VoiceCue::PushButton,
        Screen::PinEntry(form) => match form.field() {
            Field::AccountNumber => VoiceCue::WithdrawalAccount,
            Field::TargetAccount => VoiceCue::RecipientAccount,
            Field::HolderName => VoiceCue::EnterName,
            Field::Amount => VoiceCue::PayMoney,
            Field::Pin | Field::NewPin if form.is_retry() => VoiceCue::RetryPin,
            Field::Pin => VoiceCue::EnterPin,
            Field::NewPin | Field::ConfirmPin => VoiceCue::EnterNewPin,
        },
        Screen::Confirm(_) | Screen::AbsenceWarning(_) => VoiceCue::CheckScreen,
        Screen::Result(outcome) => {
            if outcome.transaction == Transaction::CreateAccount && outcome.success {
                VoiceCue::CreateAccount
            } else {
                VoiceCue::ComeAgain
            }
        }
    }
}

/// Edge-triggered screen → cue mapping
#[derive(Debug, Default, Clone)]
pub struct AudioPolicy {
    last: Option<VoiceCue>,
}

impl AudioPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cue to play for this screen, or `None` when it is already playing
    pub fn update(&mut self, screen: &Screen) -> Option<VoiceCue> {
        let cue = cue_for(screen);
        if self.last == Some(cue) {
            return None;
        }
        self.last = Some(cue);
        Some(cue)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Plays cues and effects
pub trait AudioSink {
    fn play_voice(&mut self, cue: VoiceCue);
    fn play_effect(&mut self, effect: SoundEffect);
}

/// Sink that only logs; used in headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudioSink;

impl AudioSink for LogAudioSink {
    fn play_voice(&mut self, cue: VoiceCue) {
        info!("Voice: {}", cue);
    }

    fn play_effect(&mut self, effect: SoundEffect) {
        debug!("Sound effect: {}", effect.key());
    }
}
