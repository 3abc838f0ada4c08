//! Data structures shared with whoever presents the emulator output.

use serde::{Deserialize, Serialize};

/// DMG display width in pixels.
pub const SCREEN_WIDTH: usize = 160;

/// DMG display height in pixels.
pub const SCREEN_HEIGHT: usize = 144;

/// The tile view lays out all 384 tiles in a 16x24 grid of 8x8 tiles.
pub const TILE_VIEW_WIDTH: usize = 16 * 8;
pub const TILE_VIEW_HEIGHT: usize = 24 * 8;

/// One frame as produced by the picture generator, row-major.
pub type FrameBuffer = [[Color; SCREEN_WIDTH]; SCREEN_HEIGHT];

/// Debug view of the whole tile cache through the background palette.
pub type TileViewBuffer = [[Color; TILE_VIEW_WIDTH]; TILE_VIEW_HEIGHT];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Maps a 2-bit DMG shade (0 = lightest) to its gray level.
    #[must_use]
    pub const fn from_shade(shade: u8) -> Self {
        match shade & 0b11 {
            0 => Self::from_rgb(255, 255, 255),
            1 => Self::from_rgb(192, 192, 192),
            2 => Self::from_rgb(96, 96, 96),
            _ => Self::from_rgb(0, 0, 0),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.red, self.green, self.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shades() {
        assert_eq!(Color::from_shade(0), Color::from_rgb(255, 255, 255));
        assert_eq!(Color::from_shade(3), Color::from_rgb(0, 0, 0));
        // Only the low two bits participate.
        assert_eq!(Color::from_shade(0b101), Color::from_shade(1));
    }
}
