use serde::{Deserialize, Serialize};

/// The eight pad inputs, split into the two matrix columns selected
/// through P1 (0xFF00).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    const fn mask(self) -> u8 {
        match self {
            Self::Right | Self::A => 0x01,
            Self::Left | Self::B => 0x02,
            Self::Up | Self::Select => 0x04,
            Self::Down | Self::Start => 0x08,
        }
    }

    const fn is_direction(self) -> bool {
        matches!(self, Self::Right | Self::Left | Self::Up | Self::Down)
    }
}

/// Pad state behind the P1 register. Lines are active low on the wire:
/// a pressed key reads as 0 in the selected column.
#[derive(Debug, Serialize, Deserialize)]
pub struct Joypad {
    /// Column select bits as last written (bits 4 and 5).
    select: u8,
    /// Pressed directions, 1 = pressed.
    directions: u8,
    /// Pressed buttons, 1 = pressed.
    buttons: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            select: 0x30,
            directions: 0,
            buttons: 0,
        }
    }
}

impl Joypad {
    #[must_use]
    pub const fn read(&self) -> u8 {
        match self.select {
            0x10 => 0x10 | (!self.directions & 0x0F),
            0x20 => 0x20 | (!self.buttons & 0x0F),
            _ => 0x0F,
        }
    }

    /// Only the column select bits are writable.
    pub const fn write(&mut self, value: u8) {
        self.select = value & 0x30;
    }

    /// Records a key transition. Returns true on a fresh press, the edge
    /// that requests the joypad interrupt.
    pub const fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let column = if button.is_direction() {
            &mut self.directions
        } else {
            &mut self.buttons
        };

        let was_pressed = *column & button.mask() != 0;
        if pressed {
            *column |= button.mask();
        } else {
            *column &= !button.mask();
        }

        pressed && !was_pressed
    }
}
