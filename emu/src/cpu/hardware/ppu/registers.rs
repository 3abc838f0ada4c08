use crate::render::Color;
use serde::{Deserialize, Serialize};

/// The LCD register file at 0xFF40..=0xFF4B, minus the OAM transfer
/// register which belongs to the bus.
///
/// Palette bytes are resolved into color tables at write time so the
/// scanline renderer only ever indexes.
#[derive(Debug, Serialize, Deserialize)]
pub struct Registers {
    pub lcd_control: u8,
    /// Writable part of STAT: the interrupt source bits 3..=6.
    pub status_sources: u8,
    pub scroll_y: u8,
    pub scroll_x: u8,
    pub line: u8,
    pub line_compare: u8,
    pub window_y: u8,
    pub window_x: u8,

    background_palette_raw: u8,
    object_palette_raw: [u8; 2],
    pub background_palette: [Color; 4],
    pub object_palettes: [[Color; 4]; 2],
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            lcd_control: 0,
            status_sources: 0,
            scroll_y: 0,
            scroll_x: 0,
            line: 0,
            line_compare: 0,
            window_y: 0,
            window_x: 0,
            background_palette_raw: 0,
            object_palette_raw: [0; 2],
            background_palette: resolve_palette(0),
            object_palettes: [resolve_palette(0); 2],
        }
    }
}

impl Registers {
    #[must_use]
    pub const fn background_enabled(&self) -> bool {
        self.lcd_control & 0x01 != 0
    }

    #[must_use]
    pub const fn objects_enabled(&self) -> bool {
        self.lcd_control & 0x02 != 0
    }

    /// Offset of the background tile map inside video RAM.
    #[must_use]
    pub const fn background_map_offset(&self) -> usize {
        if self.lcd_control & 0x08 != 0 {
            0x1C00
        } else {
            0x1800
        }
    }

    /// True when tile indices address the 0x8000 table as unsigned
    /// bytes; otherwise they are signed offsets around tile 256.
    #[must_use]
    pub const fn unsigned_tile_addressing(&self) -> bool {
        self.lcd_control & 0x10 != 0
    }

    #[must_use]
    pub const fn window_enabled(&self) -> bool {
        self.lcd_control & 0x20 != 0
    }

    #[must_use]
    pub const fn window_map_offset(&self) -> usize {
        if self.lcd_control & 0x40 != 0 {
            0x1C00
        } else {
            0x1800
        }
    }

    #[must_use]
    pub const fn background_palette_raw(&self) -> u8 {
        self.background_palette_raw
    }

    #[must_use]
    pub const fn object_palette_raw(&self, index: usize) -> u8 {
        self.object_palette_raw[index]
    }

    pub fn set_background_palette(&mut self, value: u8) {
        self.background_palette_raw = value;
        self.background_palette = resolve_palette(value);
    }

    pub fn set_object_palette(&mut self, index: usize, value: u8) {
        self.object_palette_raw[index] = value;
        self.object_palettes[index] = resolve_palette(value);
    }
}

/// Expands a palette byte (two bits per entry, entry 0 in the low
/// bits) into four concrete colors.
fn resolve_palette(value: u8) -> [Color; 4] {
    let mut palette = [Color::default(); 4];
    for (entry, color) in palette.iter_mut().enumerate() {
        *color = Color::from_shade(value >> (entry * 2));
    }
    palette
}
