//! Flow controller: the kiosk's screen state machine.
//!
//! ```text
//! FaceGuide --unlock--> Menu --select--> PinEntry --form done--> Confirm --confirm--> Result
//!     ^                  ^                  |                       |                   |
//!     |                  +----- cancel -----+-------- cancel -------+                   |
//!     +------------------------------- timeout / done ----------------------------------+
//! ```
//!
//! Any screen past the face guide can be interrupted by `AbsenceWarning` when
//! the user seems to have left. From there the user resumes (center), starts
//! over at the face guide (left) or goes back to the menu (right, cancel or
//! the countdown running out).
//!
//! The controller owns the current [`Screen`] and the [`Session`] of the user
//! in front of the kiosk. It never blocks and never fails: rejected input
//! stays on the current field with a message, rejected transactions land on
//! the result screen. Everything observable is pushed as a [`KioskEvent`].

use crate::{
    audio::SoundEffect,
    bank::{Bank, TransactionError, TransactionResult},
    config::Config,
    constants::{
        ACCOUNT_CREATED_TIMEOUT_FACTOR, ACCOUNT_NUMBER_LENGTH, AMOUNT_MAX_DIGITS,
        DEFAULT_ABSENCE_WARNING_SECONDS, HOLDER_NAME_MAX_CHARS, PIN_LENGTH,
    },
    events::{KioskEvent, UiEvent},
    gesture::{ConfirmedGesture, Direction},
    pin::{check_pin_format, check_pin_safety, InputBuffer, PinPad},
};
use log::{debug, info};
use std::{
    fmt,
    time::{Duration, Instant},
};

/// Coarse screen identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    FaceGuide,
    Menu,
    PinEntry,
    Confirm,
    Result,
    AbsenceWarning,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Menu entries, one per button zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transaction {
    Transfer,
    Withdrawal,
    CreateAccount,
}

impl Transaction {
    /// Menu layout: transfer on the left, withdrawal in the middle, new account on the right
    #[must_use]
    pub const fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::Transfer,
            Direction::Center => Self::Withdrawal,
            Direction::Right => Self::CreateAccount,
        }
    }

    /// Entry fields, in order
    #[must_use]
    pub const fn fields(self) -> &'static [Field] {
        match self {
            Self::Withdrawal => &[Field::AccountNumber, Field::Pin, Field::Amount],
            Self::Transfer => &[Field::AccountNumber, Field::Pin, Field::TargetAccount, Field::Amount],
            Self::CreateAccount => &[Field::HolderName, Field::NewPin, Field::ConfirmPin],
        }
    }

    const fn success_key(self) -> &'static str {
        match self {
            Self::Transfer => "result.transfer.success",
            Self::Withdrawal => "result.withdrawal.success",
            Self::CreateAccount => "result.create_account.success",
        }
    }
}

/// One entry field of a transaction form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AccountNumber,
    Pin,
    TargetAccount,
    Amount,
    HolderName,
    NewPin,
    ConfirmPin,
}

impl Field {
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::AccountNumber | Self::TargetAccount => ACCOUNT_NUMBER_LENGTH,
            Self::Pin | Self::NewPin | Self::ConfirmPin => PIN_LENGTH,
            Self::Amount => AMOUNT_MAX_DIGITS,
            Self::HolderName => HOLDER_NAME_MAX_CHARS,
        }
    }

    /// PIN fields take input from the shuffled keypad and are masked
    #[must_use]
    pub const fn uses_keypad(self) -> bool {
        matches!(self, Self::Pin | Self::NewPin | Self::ConfirmPin)
    }

    fn buffer(self) -> InputBuffer {
        InputBuffer::new(self.max_len(), self.uses_keypad())
    }
}

/// State of the PinEntry screen
#[derive(Debug, Clone, PartialEq)]
pub struct EntryForm {
    transaction: Transaction,
    step: usize,
    buffer: InputBuffer,
    pad: PinPad,
    message: Option<&'static str>,
    retry: bool,
    attempts_left: Option<u32>,
}

impl EntryForm {
    #[must_use]
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            step: 0,
            buffer: transaction.fields()[0].buffer(),
            pad: PinPad::new(),
            message: None,
            retry: false,
            attempts_left: None,
        }
    }

    #[must_use]
    pub fn transaction(&self) -> Transaction {
        self.transaction
    }

    /// Active field
    #[must_use]
    pub fn field(&self) -> Field {
        self.transaction.fields()[self.step]
    }

    /// Raw value of the active field
    #[must_use]
    pub fn value(&self) -> &str {
        self.buffer.value()
    }

    /// Value as shown on screen
    #[must_use]
    pub fn display(&self) -> String {
        self.buffer.display()
    }

    /// Message key from the last rejected submission
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    /// True after a PIN was refused and has to be entered again
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.retry
    }

    /// PIN attempts left after a wrong PIN
    #[must_use]
    pub fn attempts_left(&self) -> Option<u32> {
        self.attempts_left
    }

    #[must_use]
    pub fn pad(&self) -> &PinPad {
        &self.pad
    }

    /// Feed one key; returns false when it was refused
    pub fn input(&mut self, key: char) -> bool {
        let field = self.field();
        let accepted = if field.uses_keypad() {
            self.pad.digit_for(key)
        } else if field == Field::HolderName {
            Some(key).filter(|c| !c.is_control())
        } else {
            Some(key).filter(char::is_ascii_digit)
        };
        match accepted {
            Some(c) => self.buffer.push(c),
            None => false,
        }
    }

    pub fn backspace(&mut self) -> bool {
        self.buffer.backspace()
    }

    fn advance(&mut self) -> bool {
        if self.step + 1 >= self.transaction.fields().len() {
            return false;
        }
        self.step += 1;
        self.restart_field();
        self.retry = false;
        true
    }

    fn back_to(&mut self, field: Field) {
        if let Some(step) = self.transaction.fields().iter().position(|&f| f == field) {
            self.step = step;
            self.restart_field();
        }
    }

    fn restart_field(&mut self) {
        self.buffer = self.field().buffer();
        self.pad.shuffle();
        self.message = None;
        self.attempts_left = None;
    }

    fn reject(&mut self, message: &'static str) {
        self.message = Some(message);
        self.buffer.clear();
        if self.field().uses_keypad() {
            self.pad.shuffle();
        }
    }
}

/// Render data of the Confirm screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub transaction: Transaction,
    pub account: Option<String>,
    pub holder: Option<String>,
    pub target: Option<String>,
    pub target_holder: Option<String>,
    pub amount: Option<u64>,
}

/// Render data of the Result screen
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub transaction: Transaction,
    pub success: bool,
    pub message_key: &'static str,
    /// Number of a newly created account
    pub account_number: Option<String>,
    /// Balance after a withdrawal or transfer
    pub balance: Option<u64>,
    pub entered_at: Instant,
    pub timeout: Duration,
}

/// Render data of the absence warning
#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceWarning {
    /// Screen the user was on, restored when they come back
    pub resume: Box<Screen>,
    pub entered_at: Instant,
    pub timeout: Duration,
}

impl AbsenceWarning {
    /// Time left before the kiosk falls back to the menu
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.timeout
            .saturating_sub(now.saturating_duration_since(self.entered_at))
    }
}

/// Current screen with its render data
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    FaceGuide,
    Menu,
    PinEntry(EntryForm),
    Confirm(Summary),
    Result(Outcome),
    AbsenceWarning(AbsenceWarning),
}

impl Screen {
    #[must_use]
    pub fn state(&self) -> FlowState {
        match self {
            Self::FaceGuide => FlowState::FaceGuide,
            Self::Menu => FlowState::Menu,
            Self::PinEntry(_) => FlowState::PinEntry,
            Self::Confirm(_) => FlowState::Confirm,
            Self::Result(_) => FlowState::Result,
            Self::AbsenceWarning(_) => FlowState::AbsenceWarning,
        }
    }
}

/// Why a submitted field was not accepted
enum Rejection {
    /// Stay on the field and show the message
    Message(&'static str),
    /// Wrong PIN with attempts left
    WrongPin { remaining: u32 },
    /// The transaction cannot go on
    Fatal(TransactionError),
}

impl From<&'static str> for Rejection {
    fn from(message: &'static str) -> Self {
        Self::Message(message)
    }
}

/// Context of the user currently at the kiosk
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub transaction: Option<Transaction>,
    pub account: Option<String>,
    pub pin: Option<String>,
    pub target: Option<String>,
    pub amount: Option<u64>,
    pub holder: Option<String>,
    pub new_pin: Option<String>,
}

impl Session {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "****");
        f.debug_struct("Session")
            .field("transaction", &self.transaction)
            .field("account", &self.account)
            .field("pin", &mask(&self.pin))
            .field("target", &self.target)
            .field("amount", &self.amount)
            .field("holder", &self.holder)
            .field("new_pin", &mask(&self.new_pin))
            .finish()
    }
}

/// Screen state machine driven by confirmed gestures, UI events and timers
#[derive(Debug)]
pub struct FlowController {
    screen: Screen,
    session: Session,
    idle_timeout: Duration,
    absence_timeout: Duration,
    max_amount: u64,
    events: Vec<KioskEvent>,
}

impl FlowController {
    /// Start on the face-guide screen
    #[must_use]
    pub fn new(idle_timeout: Duration, max_amount: u64) -> Self {
        Self {
            screen: Screen::FaceGuide,
            session: Session::default(),
            idle_timeout,
            absence_timeout: Duration::from_secs(DEFAULT_ABSENCE_WARNING_SECONDS),
            max_amount,
            events: Vec::new(),
        }
    }

    /// Countdown of the absence warning
    #[must_use]
    pub fn with_absence_timeout(mut self, timeout: Duration) -> Self {
        self.absence_timeout = timeout;
        self
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.session.idle_timeout_seconds),
            config.security.max_amount,
        )
        .with_absence_timeout(Duration::from_secs(config.session.absence_warning_seconds))
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.screen.state()
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<KioskEvent> {
        std::mem::take(&mut self.events)
    }

    /// The face gate unlocked
    pub fn on_face_unlocked(&mut self) {
        if self.state() == FlowState::FaceGuide {
            self.transition(Screen::Menu);
        }
    }

    /// A gesture was confirmed by the validator
    pub fn on_gesture(&mut self, gesture: ConfirmedGesture, bank: &mut dyn Bank, now: Instant) {
        self.select(gesture.direction, bank, now);
    }

    /// Keyboard or mouse input
    pub fn on_ui_event(&mut self, event: UiEvent, bank: &mut dyn Bank, now: Instant) {
        match event {
            UiEvent::Click(direction) => self.select(direction, bank, now),
            UiEvent::Key(key) => {
                if let Screen::PinEntry(form) = &mut self.screen {
                    let effect = if form.input(key) {
                        SoundEffect::Button
                    } else {
                        SoundEffect::Beep
                    };
                    self.events.push(KioskEvent::Effect(effect));
                }
            }
            UiEvent::Backspace => {
                if let Screen::PinEntry(form) = &mut self.screen {
                    if form.backspace() {
                        self.events.push(KioskEvent::Effect(SoundEffect::Back));
                    }
                }
            }
            UiEvent::Submit => match self.state() {
                FlowState::PinEntry => self.submit_field(bank, now),
                FlowState::Confirm => self.execute(bank, now),
                FlowState::Result => self.finish(),
                FlowState::AbsenceWarning => self.resume(now),
                FlowState::FaceGuide | FlowState::Menu => {}
            },
            UiEvent::Cancel => self.cancel(),
        }
    }

    /// The presence monitor decided the user left; ask whether they are still there
    pub fn on_user_absent(&mut self, now: Instant) {
        if matches!(self.state(), FlowState::FaceGuide | FlowState::AbsenceWarning) {
            return;
        }
        info!("User absent, showing warning");
        self.events.push(KioskEvent::UserAbsent);
        self.events.push(KioskEvent::Effect(SoundEffect::Beep));
        let warning = AbsenceWarning {
            resume: Box::new(self.screen.clone()),
            entered_at: now,
            timeout: self.absence_timeout,
        };
        self.transition(Screen::AbsenceWarning(warning));
    }

    /// Time-based transitions
    pub fn on_tick(&mut self, now: Instant) {
        match &self.screen {
            Screen::Result(outcome)
                if now.saturating_duration_since(outcome.entered_at) >= outcome.timeout =>
            {
                debug!("Result screen timed out");
                self.finish();
            }
            Screen::AbsenceWarning(warning) if warning.remaining(now).is_zero() => {
                info!("No answer to the absence warning, back to the menu");
                self.transition(Screen::Menu);
            }
            _ => {}
        }
    }

    fn select(&mut self, direction: Direction, bank: &mut dyn Bank, now: Instant) {
        match (self.state(), direction) {
            (FlowState::FaceGuide, _) => {}
            (FlowState::Menu, direction) => {
                let transaction = Transaction::from_direction(direction);
                info!("Menu selection: {:?}", transaction);
                self.events.push(KioskEvent::Effect(SoundEffect::PushButton));
                self.transition(Screen::PinEntry(EntryForm::new(transaction)));
                self.session.transaction = Some(transaction);
            }
            (FlowState::PinEntry, Direction::Left) => self.submit_field(bank, now),
            (FlowState::PinEntry, Direction::Center) => {
                self.events.push(KioskEvent::Guidance("guidance.entry"));
            }
            (FlowState::Confirm, Direction::Left) => self.execute(bank, now),
            (FlowState::Confirm, Direction::Center) => {
                self.events.push(KioskEvent::Guidance("guidance.confirm"));
            }
            (FlowState::PinEntry | FlowState::Confirm, Direction::Right) => self.cancel(),
            (FlowState::Result, Direction::Center) => self.finish(),
            (FlowState::Result, _) => {}
            (FlowState::AbsenceWarning, Direction::Left) => {
                info!("Absence warning: starting over");
                self.events.push(KioskEvent::Effect(SoundEffect::Button));
                self.finish();
            }
            (FlowState::AbsenceWarning, Direction::Center) => self.resume(now),
            (FlowState::AbsenceWarning, Direction::Right) => {
                info!("Absence warning: back to the menu");
                self.events.push(KioskEvent::Effect(SoundEffect::Back));
                self.transition(Screen::Menu);
            }
        }
    }

    /// Return from the absence warning to the interrupted screen
    fn resume(&mut self, now: Instant) {
        let Screen::AbsenceWarning(warning) = &self.screen else {
            return;
        };
        let mut screen = warning.resume.as_ref().clone();
        if let Screen::Result(outcome) = &mut screen {
            outcome.entered_at = now;
        }
        info!("User is back, resuming {}", screen.state());
        self.events.push(KioskEvent::Effect(SoundEffect::Assert));
        self.transition(screen);
    }

    fn submit_field(&mut self, bank: &mut dyn Bank, now: Instant) {
        let mut form = match std::mem::replace(&mut self.screen, Screen::Menu) {
            Screen::PinEntry(form) => form,
            other => {
                self.screen = other;
                return;
            }
        };

        let field = form.field();
        let value = form.value().to_string();

        match self.accept_field(field, &value, bank) {
            Ok(()) => {
                debug!("Field {:?} accepted", field);
                self.events.push(KioskEvent::FieldCompleted(field));
                self.events.push(KioskEvent::Effect(SoundEffect::Assert));
                if form.advance() {
                    self.screen = Screen::PinEntry(form);
                } else {
                    self.screen = Screen::PinEntry(form);
                    let summary = self.summary(bank);
                    self.transition(Screen::Confirm(summary));
                }
            }
            Err(Rejection::Message(message)) => {
                if field == Field::ConfirmPin {
                    self.session.new_pin = None;
                    form.back_to(Field::NewPin);
                    form.retry = true;
                }
                self.refuse(form, message);
            }
            Err(Rejection::WrongPin { remaining }) => {
                info!("Wrong PIN, {} attempts left", remaining);
                form.retry = true;
                form.attempts_left = Some(remaining);
                self.refuse(form, "error.pin.incorrect");
            }
            Err(Rejection::Fatal(error)) => {
                let transaction = form.transaction();
                self.screen = Screen::PinEntry(form);
                self.conclude(transaction, Err(error), now);
            }
        }
    }

    fn refuse(&mut self, mut form: EntryForm, message: &'static str) {
        debug!("Field {:?} rejected: {}", form.field(), message);
        form.reject(message);
        self.events.push(KioskEvent::Effect(SoundEffect::Beep));
        self.events.push(KioskEvent::Guidance(message));
        self.screen = Screen::PinEntry(form);
    }

    fn accept_field(&mut self, field: Field, value: &str, bank: &mut dyn Bank) -> Result<(), Rejection> {
        match field {
            Field::AccountNumber => {
                check_account_format(value)?;
                if !bank.account_exists(value) {
                    return Err("error.account.not_found".into());
                }
                if bank.is_frozen(value) {
                    return Err("error.account.frozen".into());
                }
                self.session.account = Some(value.to_string());
            }
            Field::Pin => {
                check_pin_format(value).map_err(|e| e.message_key())?;
                let account = self.session.account.as_deref().unwrap_or_default();
                match bank.verify_pin(account, value) {
                    Ok(()) => {}
                    Err(TransactionError::IncorrectPin { remaining }) if remaining > 0 => {
                        return Err(Rejection::WrongPin { remaining });
                    }
                    Err(e) => return Err(Rejection::Fatal(e)),
                }
                self.session.pin = Some(value.to_string());
            }
            Field::TargetAccount => {
                check_account_format(value)?;
                if !bank.account_exists(value) {
                    return Err("error.account.not_found".into());
                }
                if self.session.account.as_deref() == Some(value) {
                    return Err("error.transfer.same_account".into());
                }
                self.session.target = Some(value.to_string());
            }
            Field::Amount => {
                let amount: u64 = value.parse().map_err(|_| "entry.amount.format")?;
                if amount == 0 || amount > self.max_amount {
                    return Err("error.amount.range".into());
                }
                self.session.amount = Some(amount);
            }
            Field::HolderName => {
                let name = value.trim();
                if name.is_empty() {
                    return Err("entry.name.empty".into());
                }
                self.session.holder = Some(name.to_string());
            }
            Field::NewPin => {
                check_pin_safety(value).map_err(|e| e.message_key())?;
                self.session.new_pin = Some(value.to_string());
            }
            Field::ConfirmPin => {
                if self.session.new_pin.as_deref() != Some(value) {
                    return Err("pin_mismatch".into());
                }
            }
        }
        Ok(())
    }

    fn summary(&self, bank: &dyn Bank) -> Summary {
        let session = &self.session;
        Summary {
            transaction: session.transaction.unwrap_or(Transaction::Withdrawal),
            account: session.account.clone(),
            holder: session
                .account
                .as_deref()
                .and_then(|a| bank.holder_name(a))
                .or_else(|| session.holder.clone()),
            target: session.target.clone(),
            target_holder: session.target.as_deref().and_then(|t| bank.holder_name(t)),
            amount: session.amount,
        }
    }

    fn execute(&mut self, bank: &mut dyn Bank, now: Instant) {
        let Some(transaction) = self.session.transaction else {
            return;
        };
        let session = &self.session;
        let account = session.account.as_deref().unwrap_or_default();
        let pin = session.pin.as_deref().unwrap_or_default();
        let amount = session.amount.unwrap_or(0);

        let result: TransactionResult<(Option<String>, Option<u64>)> = match transaction {
            Transaction::Withdrawal => bank.withdraw(account, pin, amount).map(|b| (None, Some(b))),
            Transaction::Transfer => {
                let target = session.target.as_deref().unwrap_or_default();
                bank.transfer(account, pin, target, amount).map(|b| (None, Some(b)))
            }
            Transaction::CreateAccount => {
                let holder = session.holder.as_deref().unwrap_or_default();
                let new_pin = session.new_pin.as_deref().unwrap_or_default();
                bank.create_account(holder, new_pin).map(|n| (Some(n), None))
            }
        };
        self.conclude(transaction, result, now);
    }

    /// Show the result of a transaction
    fn conclude(
        &mut self,
        transaction: Transaction,
        result: TransactionResult<(Option<String>, Option<u64>)>,
        now: Instant,
    ) {
        let outcome = match result {
            Ok((account_number, balance)) => {
                info!("{:?} succeeded", transaction);
                let factor = if account_number.is_some() {
                    ACCOUNT_CREATED_TIMEOUT_FACTOR
                } else {
                    1
                };
                Outcome {
                    transaction,
                    success: true,
                    message_key: transaction.success_key(),
                    account_number,
                    balance,
                    entered_at: now,
                    timeout: self.idle_timeout * factor,
                }
            }
            Err(e) => {
                info!("{:?} rejected: {}", transaction, e);
                Outcome {
                    transaction,
                    success: false,
                    message_key: e.message_key(),
                    account_number: None,
                    balance: None,
                    entered_at: now,
                    timeout: self.idle_timeout,
                }
            }
        };

        let success = outcome.success;
        let effect = if success { SoundEffect::Assert } else { SoundEffect::Beep };
        self.transition(Screen::Result(outcome));
        self.events.push(KioskEvent::Effect(effect));
        self.events.push(KioskEvent::TransactionFinished { transaction, success });
    }

    fn cancel(&mut self) {
        match self.state() {
            FlowState::FaceGuide | FlowState::Menu => {}
            FlowState::PinEntry | FlowState::Confirm | FlowState::AbsenceWarning => {
                info!("Transaction cancelled");
                self.events.push(KioskEvent::Effect(SoundEffect::Cancel));
                self.transition(Screen::Menu);
            }
            FlowState::Result => self.finish(),
        }
    }

    fn finish(&mut self) {
        self.transition(Screen::FaceGuide);
    }

    fn transition(&mut self, screen: Screen) {
        let from = self.state();
        let to = screen.state();
        if matches!(to, FlowState::Menu | FlowState::FaceGuide) {
            self.session.reset();
        }
        self.screen = screen;
        info!("Flow: {} -> {}", from, to);
        self.events.push(KioskEvent::StateChanged { from, to });
    }
}

fn check_account_format(value: &str) -> Result<(), &'static str> {
    if value.len() == ACCOUNT_NUMBER_LENGTH && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err("entry.account.format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bank::Ledger,
        constants::{DEMO_ACCOUNT_NUMBER, DEMO_ACCOUNT_PIN},
    };

    fn controller() -> FlowController {
        FlowController::new(Duration::from_secs(5), 999_999)
    }

    fn gesture(direction: Direction) -> ConfirmedGesture {
        ConfirmedGesture {
            direction,
            frame_index: 0,
        }
    }

    fn type_str(flow: &mut FlowController, bank: &mut Ledger, text: &str, now: Instant) {
        for c in text.chars() {
            flow.on_ui_event(UiEvent::Key(c), bank, now);
        }
    }

    fn type_pin(flow: &mut FlowController, bank: &mut Ledger, pin: &str, now: Instant) {
        for digit in pin.chars() {
            let Screen::PinEntry(form) = flow.screen() else {
                panic!("not on entry screen");
            };
            let key = form
                .pad()
                .layout()
                .into_iter()
                .find(|&(_, d)| d == digit)
                .map(|(k, _)| k)
                .unwrap();
            flow.on_ui_event(UiEvent::Key(key), bank, now);
        }
    }

    #[test]
    fn test_face_unlock_enters_menu() {
        let mut flow = controller();
        assert_eq!(flow.state(), FlowState::FaceGuide);
        flow.on_face_unlocked();
        assert_eq!(flow.state(), FlowState::Menu);
        assert_eq!(
            flow.drain_events(),
            vec![KioskEvent::StateChanged {
                from: FlowState::FaceGuide,
                to: FlowState::Menu
            }]
        );
    }

    #[test]
    fn test_gestures_ignored_on_face_guide() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        flow.on_gesture(gesture(Direction::Center), &mut bank, Instant::now());
        assert_eq!(flow.state(), FlowState::FaceGuide);
        assert!(flow.drain_events().is_empty());
    }

    #[test]
    fn test_menu_layout() {
        for (direction, transaction) in [
            (Direction::Left, Transaction::Transfer),
            (Direction::Center, Transaction::Withdrawal),
            (Direction::Right, Transaction::CreateAccount),
        ] {
            let mut flow = controller();
            let mut bank = Ledger::default().with_demo_account();
            flow.on_face_unlocked();
            flow.on_gesture(gesture(direction), &mut bank, Instant::now());
            assert_eq!(flow.state(), FlowState::PinEntry);
            assert_eq!(flow.session().transaction, Some(transaction));
        }
    }

    #[test]
    fn test_cancel_discards_input() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Center), &mut bank, now);
        type_str(&mut flow, &mut bank, "1234", now);

        flow.on_ui_event(UiEvent::Cancel, &mut bank, now);
        assert_eq!(flow.state(), FlowState::Menu);
        assert!(!flow.session().is_active());

        flow.on_gesture(gesture(Direction::Center), &mut bank, now);
        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.value(), "");
    }

    #[test]
    fn test_unknown_account_stays_on_field() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Center), &mut bank, now);
        flow.drain_events();

        type_str(&mut flow, &mut bank, "654321", now);
        flow.on_gesture(gesture(Direction::Left), &mut bank, now);

        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::AccountNumber);
        assert_eq!(form.message(), Some("error.account.not_found"));
        assert!(flow
            .drain_events()
            .contains(&KioskEvent::Guidance("error.account.not_found")));
    }

    #[test]
    fn test_plain_digits_rejected_on_pin_field() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Center), &mut bank, now);
        type_str(&mut flow, &mut bank, DEMO_ACCOUNT_NUMBER, now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        flow.drain_events();

        flow.on_ui_event(UiEvent::Key('1'), &mut bank, now);
        assert_eq!(flow.drain_events(), vec![KioskEvent::Effect(SoundEffect::Beep)]);
        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::Pin);
        assert_eq!(form.value(), "");
    }

    #[test]
    fn test_full_withdrawal() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Center), &mut bank, now);

        type_str(&mut flow, &mut bank, DEMO_ACCOUNT_NUMBER, now);
        flow.on_gesture(gesture(Direction::Left), &mut bank, now);
        type_pin(&mut flow, &mut bank, DEMO_ACCOUNT_PIN, now);
        flow.on_gesture(gesture(Direction::Left), &mut bank, now);
        type_str(&mut flow, &mut bank, "20000", now);
        flow.on_gesture(gesture(Direction::Left), &mut bank, now);

        let Screen::Confirm(summary) = flow.screen() else {
            panic!("expected confirm screen");
        };
        assert_eq!(summary.amount, Some(20_000));
        assert_eq!(summary.account.as_deref(), Some(DEMO_ACCOUNT_NUMBER));

        flow.on_gesture(gesture(Direction::Left), &mut bank, now);
        let Screen::Result(outcome) = flow.screen() else {
            panic!("expected result screen");
        };
        assert!(outcome.success);
        assert_eq!(outcome.balance, Some(980_000));
        assert_eq!(bank.balance(DEMO_ACCOUNT_NUMBER), Some(980_000));
        assert!(flow.drain_events().contains(&KioskEvent::TransactionFinished {
            transaction: Transaction::Withdrawal,
            success: true
        }));

        flow.on_tick(now + Duration::from_secs(4));
        assert_eq!(flow.state(), FlowState::Result);
        flow.on_tick(now + Duration::from_secs(5));
        assert_eq!(flow.state(), FlowState::FaceGuide);
        assert!(!flow.session().is_active());
    }

    /// Menu -> withdrawal -> demo account number submitted; lands on the PIN field
    fn at_pin_field(flow: &mut FlowController, bank: &mut Ledger, now: Instant) {
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Center), bank, now);
        type_str(flow, bank, DEMO_ACCOUNT_NUMBER, now);
        flow.on_ui_event(UiEvent::Submit, bank, now);
        flow.drain_events();
    }

    #[test]
    fn test_wrong_pin_is_refused_on_entry() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        at_pin_field(&mut flow, &mut bank, now);

        type_pin(&mut flow, &mut bank, "9999", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);

        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::Pin);
        assert_eq!(form.message(), Some("error.pin.incorrect"));
        assert_eq!(form.attempts_left(), Some(2));
        assert!(form.is_retry());
        assert_eq!(form.value(), "");
        assert_eq!(crate::audio::cue_for(flow.screen()), crate::audio::VoiceCue::RetryPin);
        assert!(flow.session().pin.is_none());
        assert!(flow
            .drain_events()
            .contains(&KioskEvent::Guidance("error.pin.incorrect")));
        assert_eq!(bank.account(DEMO_ACCOUNT_NUMBER).unwrap().failed_attempts, 1);

        // The right PIN still gets through and clears the counter
        type_pin(&mut flow, &mut bank, DEMO_ACCOUNT_PIN, now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::Amount);
        assert!(!form.is_retry());
        assert_eq!(bank.account(DEMO_ACCOUNT_NUMBER).unwrap().failed_attempts, 0);
    }

    #[test]
    fn test_last_wrong_pin_locks_account() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        at_pin_field(&mut flow, &mut bank, now);

        for _ in 0..2 {
            type_pin(&mut flow, &mut bank, "9999", now);
            flow.on_ui_event(UiEvent::Submit, &mut bank, now);
            assert_eq!(flow.state(), FlowState::PinEntry);
        }
        type_pin(&mut flow, &mut bank, "9999", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);

        let Screen::Result(outcome) = flow.screen() else {
            panic!("expected result screen");
        };
        assert!(!outcome.success);
        assert_eq!(outcome.message_key, "error.pin.locked");
        assert!(bank.is_frozen(DEMO_ACCOUNT_NUMBER));
        assert!(flow.drain_events().contains(&KioskEvent::TransactionFinished {
            transaction: Transaction::Withdrawal,
            success: false
        }));
    }

    #[test]
    fn test_create_account_with_pin_mismatch() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Right), &mut bank, now);

        type_str(&mut flow, &mut bank, "SATO", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        type_pin(&mut flow, &mut bank, "4826", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        type_pin(&mut flow, &mut bank, "4827", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);

        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::NewPin);
        assert!(form.is_retry());
        assert!(flow.session().new_pin.is_none());

        type_pin(&mut flow, &mut bank, "4826", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        type_pin(&mut flow, &mut bank, "4826", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        assert_eq!(flow.state(), FlowState::Confirm);

        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        let Screen::Result(outcome) = flow.screen() else {
            panic!("expected result screen");
        };
        assert!(outcome.success);
        assert_eq!(outcome.timeout, Duration::from_secs(10));
        let number = outcome.account_number.clone().unwrap();
        assert_eq!(bank.holder_name(&number).as_deref(), Some("SATO"));
    }

    #[test]
    fn test_unsafe_new_pin_rejected() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Right), &mut bank, now);
        type_str(&mut flow, &mut bank, "SATO", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        type_pin(&mut flow, &mut bank, "1234", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);

        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen");
        };
        assert_eq!(form.field(), Field::NewPin);
        assert_eq!(form.message(), Some("pin_unsafe"));
    }

    /// Transfer started, account number typed but not submitted, then the user vanishes
    fn warned(flow: &mut FlowController, bank: &mut Ledger, now: Instant) {
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Left), bank, now);
        type_str(flow, bank, "123", now);
        flow.drain_events();
        flow.on_user_absent(now);
    }

    #[test]
    fn test_user_absent_shows_warning() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        warned(&mut flow, &mut bank, now);

        assert_eq!(flow.state(), FlowState::AbsenceWarning);
        assert!(flow.session().is_active());
        let events = flow.drain_events();
        assert_eq!(events[0], KioskEvent::UserAbsent);
        assert!(events.contains(&KioskEvent::Effect(SoundEffect::Beep)));
        assert!(events.contains(&KioskEvent::StateChanged {
            from: FlowState::PinEntry,
            to: FlowState::AbsenceWarning
        }));

        // Already warning
        flow.on_user_absent(now);
        assert!(flow.drain_events().is_empty());

        // Not while waiting for a face
        let mut idle = controller();
        idle.on_user_absent(now);
        assert_eq!(idle.state(), FlowState::FaceGuide);
        assert!(idle.drain_events().is_empty());
    }

    #[test]
    fn test_absence_warning_center_resumes() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        warned(&mut flow, &mut bank, now);

        flow.on_gesture(gesture(Direction::Center), &mut bank, now);
        let Screen::PinEntry(form) = flow.screen() else {
            panic!("expected entry screen, found {}", flow.state());
        };
        assert_eq!(form.transaction(), Transaction::Transfer);
        assert_eq!(form.value(), "123");
        assert_eq!(flow.session().transaction, Some(Transaction::Transfer));

        // Return key does the same
        flow.on_user_absent(now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        assert_eq!(flow.state(), FlowState::PinEntry);
    }

    #[test]
    fn test_absence_warning_choices() {
        let now = Instant::now();
        let cases = [
            (UiEvent::Click(Direction::Left), FlowState::FaceGuide),
            (UiEvent::Click(Direction::Right), FlowState::Menu),
            (UiEvent::Cancel, FlowState::Menu),
        ];
        for (event, expected) in cases {
            let mut flow = controller();
            let mut bank = Ledger::default().with_demo_account();
            warned(&mut flow, &mut bank, now);
            flow.drain_events();

            flow.on_ui_event(event, &mut bank, now);
            assert_eq!(flow.state(), expected, "after {:?}", event);
            assert!(!flow.session().is_active());
            assert!(flow.drain_events().contains(&KioskEvent::StateChanged {
                from: FlowState::AbsenceWarning,
                to: expected
            }));
        }
    }

    #[test]
    fn test_absence_warning_times_out_to_menu() {
        let mut flow = controller().with_absence_timeout(Duration::from_secs(10));
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        warned(&mut flow, &mut bank, now);

        let Screen::AbsenceWarning(warning) = flow.screen() else {
            panic!("expected absence warning");
        };
        assert_eq!(warning.remaining(now + Duration::from_secs(4)), Duration::from_secs(6));

        flow.on_tick(now + Duration::from_secs(9));
        assert_eq!(flow.state(), FlowState::AbsenceWarning);
        flow.on_tick(now + Duration::from_secs(10));
        assert_eq!(flow.state(), FlowState::Menu);
        assert!(!flow.session().is_active());
    }

    #[test]
    fn test_resumed_result_screen_restarts_its_timeout() {
        let mut flow = controller();
        let mut bank = Ledger::default().with_demo_account();
        let now = Instant::now();
        flow.on_face_unlocked();
        flow.on_gesture(gesture(Direction::Right), &mut bank, now);
        type_str(&mut flow, &mut bank, "SATO", now);
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        for _ in 0..2 {
            type_pin(&mut flow, &mut bank, "4826", now);
            flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        }
        flow.on_ui_event(UiEvent::Submit, &mut bank, now);
        assert_eq!(flow.state(), FlowState::Result);

        let later = now + Duration::from_secs(8);
        flow.on_user_absent(later);
        flow.on_gesture(gesture(Direction::Center), &mut bank, later);
        assert_eq!(flow.state(), FlowState::Result);
        flow.on_tick(later + Duration::from_secs(9));
        assert_eq!(flow.state(), FlowState::Result);
        flow.on_tick(later + Duration::from_secs(10));
        assert_eq!(flow.state(), FlowState::FaceGuide);
    }

    #[test]
    fn test_session_debug_masks_pin() {
        let session = Session {
            pin: Some("4826".into()),
            ..Session::default()
        };
        let debug = format!("{:?}", session);
        assert!(!debug.contains("4826"));
    }
}
