//! PIN rules, the shuffled PIN keypad and the entry-field buffer.

use crate::constants::PIN_LENGTH;
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

/// Why a PIN was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRejection {
    #[error("PIN must be exactly 4 digits")]
    Format,
    #[error("PIN must not repeat a single digit")]
    RepeatedDigit,
    #[error("PIN must not be an ascending sequence")]
    Sequential,
    #[error("PIN must not look like a date")]
    DateLike,
}

impl PinRejection {
    /// Message key shown on the entry screen
    #[must_use]
    pub const fn message_key(self) -> &'static str {
        match self {
            Self::Format => "pin_format",
            Self::RepeatedDigit | Self::Sequential | Self::DateLike => "pin_unsafe",
        }
    }
}

/// Exactly [`PIN_LENGTH`] ASCII digits
pub fn check_pin_format(pin: &str) -> Result<(), PinRejection> {
    if pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PinRejection::Format)
    }
}

/// Rules a newly chosen PIN has to pass.
///
/// Refuses a single repeated digit, a strict `+1` run (`0123`, `6789`; wrap
/// arounds like `7890` are fine) and anything readable as `MMDD` or `DDMM`.
pub fn check_pin_safety(pin: &str) -> Result<(), PinRejection> {
    check_pin_format(pin)?;
    let digits: Vec<u8> = pin.bytes().map(|b| b - b'0').collect();

    if digits.iter().all(|&d| d == digits[0]) {
        return Err(PinRejection::RepeatedDigit);
    }

    if digits.windows(2).all(|w| w[1] == w[0] + 1) {
        return Err(PinRejection::Sequential);
    }

    let first = digits[0] * 10 + digits[1];
    let second = digits[2] * 10 + digits[3];
    let is_month = |v: u8| (1..=12).contains(&v);
    let is_day = |v: u8| (1..=31).contains(&v);
    if (is_month(first) && is_day(second)) || (is_day(first) && is_month(second)) {
        return Err(PinRejection::DateLike);
    }

    Ok(())
}

/// Physical keys of the PIN pad, row by row (`m` sits alone on the bottom row)
pub const PIN_PAD_KEYS: [char; 10] = ['t', 'y', 'u', 'g', 'h', 'j', 'v', 'b', 'n', 'm'];

/// Keypad whose physical keys map onto a shuffled set of digits.
///
/// Onlookers see which key is pressed but not which digit it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPad {
    digits: [char; 10],
}

impl Default for PinPad {
    fn default() -> Self {
        Self::new()
    }
}

impl PinPad {
    /// Keypad with a fresh random mapping
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    /// Keypad shuffled with the given generator
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut digits = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
        digits.shuffle(rng);
        Self { digits }
    }

    /// Draw a new mapping
    pub fn shuffle(&mut self) {
        self.digits.shuffle(&mut rand::thread_rng());
    }

    /// Digit assigned to a physical key
    #[must_use]
    pub fn digit_for(&self, key: char) -> Option<char> {
        let key = key.to_ascii_lowercase();
        PIN_PAD_KEYS
            .iter()
            .position(|&k| k == key)
            .map(|i| self.digits[i])
    }

    /// `(key, digit)` pairs in on-screen order
    #[must_use]
    pub fn layout(&self) -> Vec<(char, char)> {
        PIN_PAD_KEYS.iter().copied().zip(self.digits).collect()
    }
}

/// Text buffer of one entry field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    value: String,
    max_len: usize,
    masked: bool,
}

impl InputBuffer {
    #[must_use]
    pub fn new(max_len: usize, masked: bool) -> Self {
        Self {
            value: String::new(),
            max_len,
            masked,
        }
    }

    /// Append a character; returns false when the field is full
    pub fn push(&mut self, c: char) -> bool {
        if self.value.chars().count() >= self.max_len {
            return false;
        }
        self.value.push(c);
        true
    }

    /// Remove the last character; returns false when already empty
    pub fn backspace(&mut self) -> bool {
        self.value.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.value.chars().count() >= self.max_len
    }

    /// What the screen shows: `*` per character for masked fields
    #[must_use]
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn test_pin_safety_table() {
        let cases = [
            ("1112", false),
            ("7890", true),
            ("8901", true),
            ("1232", true),
            ("3199", true),
            ("1111", false),
            ("0000", false),
            ("0123", false),
            ("1234", false),
            ("6789", false),
            ("0602", false),
            ("1225", false),
            ("0315", false),
            ("2512", false),
            ("3101", false),
            ("123", false),
            ("12345", false),
            ("abcd", false),
        ];
        for (pin, expected) in cases {
            assert_eq!(check_pin_safety(pin).is_ok(), expected, "pin {pin}");
        }
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(check_pin_safety("99"), Err(PinRejection::Format));
        assert_eq!(check_pin_safety("4444"), Err(PinRejection::RepeatedDigit));
        assert_eq!(check_pin_safety("2345"), Err(PinRejection::Sequential));
        assert_eq!(check_pin_safety("0704"), Err(PinRejection::DateLike));
        assert_eq!(PinRejection::DateLike.message_key(), "pin_unsafe");
    }

    #[test]
    fn test_pin_pad_is_permutation() {
        let pad = PinPad::with_rng(&mut StdRng::seed_from_u64(7));
        let digits: HashSet<char> = PIN_PAD_KEYS.iter().filter_map(|&k| pad.digit_for(k)).collect();
        assert_eq!(digits.len(), 10);
        assert!(digits.iter().all(char::is_ascii_digit));

        assert_eq!(pad.digit_for('T'), pad.digit_for('t'));
        assert_eq!(pad.digit_for('1'), None);
        assert_eq!(pad.digit_for('a'), None);
        assert_eq!(pad.layout().len(), 10);
    }

    #[test]
    fn test_input_buffer() {
        let mut buffer = InputBuffer::new(4, true);
        for c in "12345".chars() {
            buffer.push(c);
        }
        assert_eq!(buffer.value(), "1234");
        assert!(buffer.is_full());
        assert_eq!(buffer.display(), "****");
        assert!(buffer.backspace());
        assert_eq!(buffer.value(), "123");
        buffer.clear();
        assert!(!buffer.backspace());
        assert!(buffer.is_empty());
    }
}
