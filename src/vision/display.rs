//! `highgui` kiosk window: camera image with the guide square, button zones
//! and screen text, plus keyboard input.

use crate::{
    events::UiEvent,
    flow::{Field, Screen},
    kiosk::TickReport,
    utils::BoundingBox,
    vision::{camera::CameraFrame, Frame},
    Result,
};
use opencv::{
    core::{Point, Rect, Scalar},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::time::Instant;

/// What a key press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ui(UiEvent),
    Quit,
}

/// Map a `wait_key` code; Tab quits, Esc cancels
#[must_use]
pub fn key_action(code: i32) -> Option<KeyAction> {
    match code {
        9 => Some(KeyAction::Quit),
        27 => Some(KeyAction::Ui(UiEvent::Cancel)),
        10 | 13 => Some(KeyAction::Ui(UiEvent::Submit)),
        8 | 127 => Some(KeyAction::Ui(UiEvent::Backspace)),
        32..=126 => u8::try_from(code).ok().map(|b| KeyAction::Ui(UiEvent::Key(char::from(b)))),
        _ => None,
    }
}

fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn yellow() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

/// Kiosk window
pub struct KioskDisplay {
    window: String,
}

impl KioskDisplay {
    /// Create the window
    pub fn new(window: &str) -> Result<Self> {
        highgui::named_window(window, WINDOW_NORMAL)?;
        Ok(Self {
            window: window.to_string(),
        })
    }

    /// Draw the frame with the current screen on top
    pub fn render(&mut self, frame: &CameraFrame, report: &TickReport<CameraFrame>, screen: &Screen) -> Result<()> {
        let mut canvas = frame.mat.clone();
        let (width, height) = frame.size();
        let (width, height) = (width as i32, height as i32);

        if let Some(gate) = &report.gate {
            let color = if gate.consecutive_hit_count > 0 { green() } else { white() };
            draw_box(&mut canvas, &gate.guide, color)?;
            if let Some(face) = &gate.face {
                draw_box(&mut canvas, face, yellow())?;
            }
        } else {
            for i in 1..3 {
                let x = width * i / 3;
                imgproc::line(&mut canvas, Point::new(x, 0), Point::new(x, height), white(), 1, LINE_8, 0)?;
            }
            for (i, label) in zone_labels(screen).iter().enumerate() {
                put_text(&mut canvas, label, Point::new(width * i as i32 / 3 + 10, height - 20), 0.7, white())?;
            }
        }

        if let Some(pointer) = report.observation.and_then(|o| o.pointer) {
            let center = Point::new((pointer.x * width as f32) as i32, (pointer.y * height as f32) as i32);
            imgproc::circle(&mut canvas, center, 8, yellow(), -1, LINE_8, 0)?;
        }

        let bar = (report.progress * width as f32) as i32;
        if bar > 0 {
            imgproc::rectangle(&mut canvas, Rect::new(0, 0, bar, 6), green(), -1, LINE_8, 0)?;
        }

        for (i, line) in screen_text(screen, Instant::now()).iter().enumerate() {
            put_text(&mut canvas, line, Point::new(10, 40 + 30 * i as i32), 0.8, green())?;
        }

        highgui::imshow(&self.window, &canvas)?;
        Ok(())
    }

    /// Wait up to `delay_ms` for a key
    pub fn poll_input(&mut self, delay_ms: i32) -> Result<Option<KeyAction>> {
        Ok(key_action(highgui::wait_key(delay_ms)?))
    }
}

fn draw_box(canvas: &mut Mat, bbox: &BoundingBox, color: Scalar) -> Result<()> {
    let rect = Rect::new(bbox.x as i32, bbox.y as i32, bbox.width as i32, bbox.height as i32);
    imgproc::rectangle(canvas, rect, color, 2, LINE_8, 0)?;
    Ok(())
}

fn put_text(canvas: &mut Mat, text: &str, origin: Point, scale: f64, color: Scalar) -> Result<()> {
    imgproc::put_text(canvas, text, origin, FONT_HERSHEY_SIMPLEX, scale, color, 2, LINE_8, false)?;
    Ok(())
}

fn zone_labels(screen: &Screen) -> [&'static str; 3] {
    match screen {
        Screen::FaceGuide => ["", "", ""],
        Screen::Menu => ["Transfer", "Withdraw", "New account"],
        Screen::PinEntry(_) => ["Next", "Help", "Cancel"],
        Screen::Confirm(_) => ["Confirm", "Help", "Cancel"],
        Screen::Result(_) => ["", "Done", ""],
        Screen::AbsenceWarning(_) => ["Start over", "Continue", "Menu"],
    }
}

fn field_name(field: Field) -> &'static str {
    match field {
        Field::AccountNumber => "Account number",
        Field::Pin => "PIN",
        Field::TargetAccount => "Recipient account",
        Field::Amount => "Amount",
        Field::HolderName => "Name",
        Field::NewPin => "New PIN",
        Field::ConfirmPin => "Confirm PIN",
    }
}

fn screen_text(screen: &Screen, now: Instant) -> Vec<String> {
    match screen {
        Screen::FaceGuide => vec!["Look into the square".to_string()],
        Screen::Menu => vec!["Point at a button".to_string()],
        Screen::PinEntry(form) => {
            let mut lines = vec![format!("{}: {}", field_name(form.field()), form.display())];
            if form.field().uses_keypad() {
                let pad: Vec<String> = form.pad().layout().iter().map(|(k, d)| format!("{k}={d}")).collect();
                lines.push(pad.join(" "));
            }
            if let Some(message) = form.message() {
                lines.push(message.to_string());
            }
            if let Some(left) = form.attempts_left() {
                lines.push(format!("Attempts left: {}", left));
            }
            lines
        }
        Screen::Confirm(summary) => {
            let mut lines = vec![format!("{:?}", summary.transaction)];
            if let Some(account) = &summary.account {
                lines.push(format!("Account: {}", account));
            }
            if let Some(holder) = &summary.holder {
                lines.push(format!("Name: {}", holder));
            }
            if let Some(target) = &summary.target {
                lines.push(format!("To: {}", target));
            }
            if let Some(amount) = summary.amount {
                lines.push(format!("Amount: {}", amount));
            }
            lines
        }
        Screen::Result(outcome) => {
            let mut lines = vec![outcome.message_key.to_string()];
            if let Some(number) = &outcome.account_number {
                lines.push(format!("Your account number: {}", number));
            }
            if let Some(balance) = outcome.balance {
                lines.push(format!("Balance: {}", balance));
            }
            lines
        }
        Screen::AbsenceWarning(warning) => vec![
            "Are you still there?".to_string(),
            format!("Returning to the menu in {}s", warning.remaining(now).as_secs()),
        ],
    }
}
