use serde::{Deserialize, Serialize};
use std::fmt;

pub const BUTTON_RIGHT: u8 = 0x01;
pub const BUTTON_LEFT: u8 = 0x02;
pub const BUTTON_JUMP: u8 = 0x04;
pub const BUTTON_ACTION: u8 = 0x08;
pub const BUTTON_DOWN: u8 = 0x10;
pub const BUTTON_ENTER: u8 = 0x20;

pub const ALL_BUTTONS: [u8; 6] = [
    BUTTON_RIGHT,
    BUTTON_LEFT,
    BUTTON_JUMP,
    BUTTON_ACTION,
    BUTTON_DOWN,
    BUTTON_ENTER,
];

/// Button state held for one simulated tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub action: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub enter: bool,
}

impl InputFrame {
    pub const IDLE: Self = Self {
        right: false,
        left: false,
        jump: false,
        action: false,
        down: false,
        enter: false,
    };

    #[inline]
    pub fn to_bits(self) -> u8 {
        (if self.right { BUTTON_RIGHT } else { 0 })
            | (if self.left { BUTTON_LEFT } else { 0 })
            | (if self.jump { BUTTON_JUMP } else { 0 })
            | (if self.action { BUTTON_ACTION } else { 0 })
            | (if self.down { BUTTON_DOWN } else { 0 })
            | (if self.enter { BUTTON_ENTER } else { 0 })
    }

    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        Self {
            right: (bits & BUTTON_RIGHT) != 0,
            left: (bits & BUTTON_LEFT) != 0,
            jump: (bits & BUTTON_JUMP) != 0,
            action: (bits & BUTTON_ACTION) != 0,
            down: (bits & BUTTON_DOWN) != 0,
            enter: (bits & BUTTON_ENTER) != 0,
        }
    }

    /// Returns a copy with `button` toggled.
    #[inline]
    pub fn toggled(self, button: u8) -> Self {
        Self::from_bits(self.to_bits() ^ button)
    }

    /// Horizontal intent: +1 right, -1 left, 0 for none or both.
    pub fn direction(self) -> i32 {
        match (self.right, self.left) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }
}

impl fmt::Display for InputFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '.' };
        write!(
            f,
            "{}{}{}{}{}{}",
            flag(self.right, 'R'),
            flag(self.left, 'L'),
            flag(self.jump, 'J'),
            flag(self.action, 'A'),
            flag(self.down, 'D'),
            flag(self.enter, 'E'),
        )
    }
}
