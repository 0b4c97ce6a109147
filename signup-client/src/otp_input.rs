//! Six-field OTP entry model.

use signup_common::OTP_LENGTH;

/// One digit per field, with a focused field.
///
/// Typing a digit fills the field and moves focus right. Pasting (or any
/// multi-character input) spreads the digits across the fields starting
/// at the one being edited. Backspace on an empty field moves back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn set_focus(&mut self, index: usize) {
        self.focus = index.min(OTP_LENGTH - 1);
    }

    pub fn digit(&self, index: usize) -> Option<char> {
        self.digits.get(index).copied().flatten()
    }

    /// Apply text entered into field `index`.
    pub fn input(&mut self, index: usize, text: &str) {
        if index >= OTP_LENGTH {
            return;
        }
        let digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();

        match digits.as_slice() {
            [] => {
                if text.is_empty() {
                    self.digits[index] = None;
                }
                self.focus = index;
            }
            [digit] if text.chars().count() == 1 => {
                self.digits[index] = Some(*digit);
                self.focus = (index + 1).min(OTP_LENGTH - 1);
            }
            pasted => {
                let mut last = index;
                for (slot, digit) in (index..OTP_LENGTH).zip(pasted.iter()) {
                    self.digits[slot] = Some(*digit);
                    last = slot;
                }
                self.focus = (last + 1).min(OTP_LENGTH - 1);
            }
        }
    }

    /// Backspace pressed in field `index`.
    pub fn backspace(&mut self, index: usize) {
        if index >= OTP_LENGTH {
            return;
        }
        if self.digits[index].is_some() {
            self.digits[index] = None;
            self.focus = index;
        } else if index > 0 {
            self.digits[index - 1] = None;
            self.focus = index - 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// Entered digits, in order, skipping empty fields.
    pub fn value(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    /// The full code once every field is filled.
    pub fn code(&self) -> Option<String> {
        self.is_complete().then(|| self.value())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
