//! Events flowing in and out of the kiosk.

use crate::{
    audio::{SoundEffect, VoiceCue},
    flow::{Field, FlowState, Transaction},
    gesture::{ConfirmedGesture, Direction},
};
use serde::{Deserialize, Serialize};

/// Input from the on-screen UI or the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEvent {
    /// A printable key
    Key(char),
    /// Delete the last character of the active field
    Backspace,
    /// Complete the active field or confirm the screen
    Submit,
    /// Abandon the current transaction
    Cancel,
    /// Mouse click on one of the three button zones
    Click(Direction),
}

/// Outbound notification produced during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskEvent {
    /// The face gate unlocked
    FaceUnlocked,
    /// The validator confirmed a gesture
    ConfirmedGesture(ConfirmedGesture),
    /// The flow controller switched screens
    StateChanged {
        /// Previous state
        from: FlowState,
        /// New state
        to: FlowState,
    },
    /// An entry field was accepted and the form moved on
    FieldCompleted(Field),
    /// The presence monitor decided the user walked away
    UserAbsent,
    /// Guidance or error text key for the current screen
    Guidance(&'static str),
    /// Voice cue for the current screen
    Voice(VoiceCue),
    /// Short feedback sound
    Effect(SoundEffect),
    /// A bank transaction was executed
    TransactionFinished {
        /// Kind of transaction
        transaction: Transaction,
        /// Whether the bank accepted it
        success: bool,
    },
}
