//! # Picture Generator
//!
//! Scanline renderer driven by the CPU clock. The bus forwards cycle
//! costs into [`Ppu::step`] and synchronously mirrors every video RAM
//! and OAM write into the decoded tile/sprite caches, so rendering a
//! line is pure table lookups.

pub mod object_attributes;
pub mod registers;
pub mod tile;

use crate::render::{
    Color, FrameBuffer, TileViewBuffer, SCREEN_HEIGHT, SCREEN_WIDTH, TILE_VIEW_HEIGHT,
    TILE_VIEW_WIDTH,
};
use object_attributes::ObjectAttributes;
use registers::Registers;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tile::Tile;

/// Mode durations in machine cycles.
const OAM_SCAN_CYCLES: u32 = 20;
const PIXEL_TRANSFER_CYCLES: u32 = 43;
const HBLANK_CYCLES: u32 = 51;
const VBLANK_LINE_CYCLES: u32 = 126;

/// Last line of the vertical blank period.
const LAST_LINE: u8 = 153;

/// STAT interrupt source bits.
const SOURCE_HBLANK: u8 = 0x08;
const SOURCE_VBLANK: u8 = 0x10;
const SOURCE_OAM_SCAN: u8 = 0x20;
const SOURCE_LINE_COMPARE: u8 = 0x40;

/// Display mode as exposed in the low two STAT bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    PixelTransfer = 3,
}

/// Interrupt requests produced by one [`Ppu::step`] call.
#[derive(Debug, Default, Clone, Copy)]
pub struct PpuStepOutput {
    pub request_vblank_irq: bool,
    pub request_stat_irq: bool,
    /// Set on the transition into vertical blank, once per frame.
    pub frame_complete: bool,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub struct Ppu {
    registers: Registers,
    mode: Mode,
    mode_clock: u32,

    /// Decoded pixel data for all 384 tiles in video RAM.
    #[serde_as(as = "[_; 384]")]
    tiles: [Tile; 384],

    /// Decoded OAM entries.
    #[serde_as(as = "[_; 40]")]
    objects: [ObjectAttributes; 40],

    #[serde_as(as = "Box<[[_; 160]; 144]>")]
    frame: Box<FrameBuffer>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self {
            registers: Registers::default(),
            mode: Mode::OamScan,
            mode_clock: 0,
            tiles: [Tile::default(); 384],
            objects: [ObjectAttributes::default(); 40],
            frame: Box::new([[Color::default(); SCREEN_WIDTH]; SCREEN_HEIGHT]),
        }
    }
}

impl Ppu {
    /// Advances the mode machine by `m_cycles`. `vram` is consulted for
    /// tile-map bytes when a line gets rendered.
    pub fn step(&mut self, m_cycles: u32, vram: &[u8]) -> PpuStepOutput {
        let mut output = PpuStepOutput::default();
        self.mode_clock += m_cycles;

        loop {
            match self.mode {
                Mode::OamScan => {
                    if self.mode_clock < OAM_SCAN_CYCLES {
                        break;
                    }
                    self.mode_clock -= OAM_SCAN_CYCLES;
                    self.mode = Mode::PixelTransfer;
                }
                Mode::PixelTransfer => {
                    if self.mode_clock < PIXEL_TRANSFER_CYCLES {
                        break;
                    }
                    self.mode_clock -= PIXEL_TRANSFER_CYCLES;
                    self.mode = Mode::HBlank;
                    self.render_scanline(vram);
                    output.request_stat_irq |= self.source_enabled(SOURCE_HBLANK);
                }
                Mode::HBlank => {
                    if self.mode_clock < HBLANK_CYCLES {
                        break;
                    }
                    self.mode_clock -= HBLANK_CYCLES;
                    self.registers.line += 1;
                    output.request_stat_irq |= self.check_line_compare();

                    if self.registers.line == SCREEN_HEIGHT as u8 {
                        self.mode = Mode::VBlank;
                        output.request_vblank_irq = true;
                        output.frame_complete = true;
                        output.request_stat_irq |= self.source_enabled(SOURCE_VBLANK);
                    } else {
                        self.mode = Mode::OamScan;
                        output.request_stat_irq |= self.source_enabled(SOURCE_OAM_SCAN);
                    }
                }
                Mode::VBlank => {
                    if self.mode_clock < VBLANK_LINE_CYCLES {
                        break;
                    }
                    self.mode_clock -= VBLANK_LINE_CYCLES;
                    self.registers.line += 1;

                    if self.registers.line > LAST_LINE {
                        self.registers.line = 0;
                        self.mode = Mode::OamScan;
                        output.request_stat_irq |= self.source_enabled(SOURCE_OAM_SCAN);
                    }
                    output.request_stat_irq |= self.check_line_compare();
                }
            }
        }

        output
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Renders the whole tile cache through the background palette,
    /// 16 tiles per row. Debug aid for tooling.
    #[must_use]
    pub fn tile_view(&self) -> Box<TileViewBuffer> {
        let mut view = Box::new([[Color::default(); TILE_VIEW_WIDTH]; TILE_VIEW_HEIGHT]);

        for (index, tile) in self.tiles.iter().enumerate() {
            let base_y = (index / 16) * 8;
            let base_x = (index % 16) * 8;
            for row in 0..8 {
                for column in 0..8 {
                    let color_index = tile.color_index(row, column) as usize;
                    view[base_y + row][base_x + column] =
                        self.registers.background_palette[color_index];
                }
            }
        }

        view
    }

    /// Re-decodes the tile row backing a video RAM write. `relative` is
    /// the written address minus 0x8000; writes into the tile maps are
    /// ignored here, the maps are read straight from `vram` at render
    /// time.
    pub fn update_tile(&mut self, relative: usize, vram: &[u8]) {
        let base = relative & !1;
        if base >= 0x1800 {
            return;
        }

        let tile = base >> 4;
        let row = (base >> 1) & 7;
        self.tiles[tile].update_row(row, vram[base], vram[base + 1]);
    }

    /// Mirrors an OAM byte write into the decoded entry. `relative` is
    /// the written address minus 0xFE00.
    pub const fn update_object(&mut self, relative: u16, value: u8) {
        self.objects[(relative >> 2) as usize].update(relative & 3, value);
    }

    #[must_use]
    pub const fn read_register(&self, address: u16) -> u8 {
        match address {
            0xFF40 => self.registers.lcd_control,
            0xFF41 => {
                let coincidence = (self.registers.line == self.registers.line_compare) as u8;
                self.registers.status_sources | (coincidence << 2) | self.mode as u8
            }
            0xFF42 => self.registers.scroll_y,
            0xFF43 => self.registers.scroll_x,
            0xFF44 => self.registers.line,
            0xFF45 => self.registers.line_compare,
            0xFF47 => self.registers.background_palette_raw(),
            0xFF48 => self.registers.object_palette_raw(0),
            0xFF49 => self.registers.object_palette_raw(1),
            0xFF4A => self.registers.window_y,
            0xFF4B => self.registers.window_x,
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, address: u16, value: u8) {
        match address {
            0xFF40 => self.registers.lcd_control = value,
            0xFF41 => self.registers.status_sources = value & 0x78,
            0xFF42 => self.registers.scroll_y = value,
            0xFF43 => self.registers.scroll_x = value,
            // The line counter is read-only.
            0xFF44 => {}
            0xFF45 => self.registers.line_compare = value,
            0xFF47 => self.registers.set_background_palette(value),
            0xFF48 => self.registers.set_object_palette(0, value),
            0xFF49 => self.registers.set_object_palette(1, value),
            0xFF4A => self.registers.window_y = value,
            0xFF4B => self.registers.window_x = value,
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    const fn source_enabled(&self, source: u8) -> bool {
        self.registers.status_sources & source != 0
    }

    fn check_line_compare(&self) -> bool {
        self.registers.line == self.registers.line_compare
            && self.source_enabled(SOURCE_LINE_COMPARE)
    }

    fn render_scanline(&mut self, vram: &[u8]) {
        let line = self.registers.line as usize;
        if line >= SCREEN_HEIGHT {
            return;
        }

        // Background color indices of the line, kept for the sprite
        // priority bit.
        let mut background_indices = [0_u8; SCREEN_WIDTH];
        let palette = self.registers.background_palette;

        if self.registers.background_enabled() {
            let use_window =
                self.registers.window_enabled() && (self.registers.window_y as usize) <= line;
            let window_left = i32::from(self.registers.window_x) - 7;

            for x in 0..SCREEN_WIDTH {
                let in_window = use_window && x as i32 >= window_left;
                let (map_offset, pixel_x, pixel_y) = if in_window {
                    (
                        self.registers.window_map_offset(),
                        (x as i32 - window_left) as usize,
                        line - self.registers.window_y as usize,
                    )
                } else {
                    (
                        self.registers.background_map_offset(),
                        (x + self.registers.scroll_x as usize) & 0xFF,
                        (line + self.registers.scroll_y as usize) & 0xFF,
                    )
                };

                let map_slot = map_offset + (pixel_y >> 3) * 32 + ((pixel_x >> 3) & 31);
                let tile_id = self.resolve_tile_id(vram[map_slot]);
                let color_index = self.tiles[tile_id].color_index(pixel_y & 7, pixel_x & 7);

                background_indices[x] = color_index;
                self.frame[line][x] = palette[color_index as usize];
            }
        } else {
            self.frame[line] = [palette[0]; SCREEN_WIDTH];
        }

        if self.registers.objects_enabled() {
            self.render_objects(line, &background_indices);
        }
    }

    /// Maps a tile-map byte to a tile cache slot according to the
    /// active addressing mode.
    fn resolve_tile_id(&self, map_byte: u8) -> usize {
        if self.registers.unsigned_tile_addressing() {
            map_byte as usize
        } else {
            (256 + i32::from(map_byte as i8)) as usize
        }
    }

    fn render_objects(&mut self, line: usize, background_indices: &[u8; SCREEN_WIDTH]) {
        let line = line as i16;

        // Hardware scans OAM in slot order and keeps the first ten
        // entries covering the line.
        let mut visible: Vec<(usize, ObjectAttributes)> = Vec::with_capacity(10);
        for (slot, object) in self.objects.iter().enumerate() {
            if object.y <= line && line < object.y + 8 {
                visible.push((slot, *object));
                if visible.len() == 10 {
                    break;
                }
            }
        }

        // Draw in descending X (then descending slot) so the leftmost
        // sprite, and among equals the lowest slot, lands on top.
        visible.sort_by(|a, b| b.1.x.cmp(&a.1.x).then(b.0.cmp(&a.0)));

        for (_, object) in visible {
            let row = if object.y_flip() {
                7 - (line - object.y)
            } else {
                line - object.y
            } as usize;
            let palette =
                self.registers.object_palettes[usize::from(object.uses_second_palette())];

            for column in 0_i16..8 {
                let x = object.x + column;
                if !(0..SCREEN_WIDTH as i16).contains(&x) {
                    continue;
                }
                let x = x as usize;

                let source_column = if object.x_flip() { 7 - column } else { column } as usize;
                let color_index = self.tiles[object.tile as usize].color_index(row, source_column);

                // Index 0 is transparent; the priority bit only loses
                // against non-zero background pixels.
                if color_index == 0
                    || (object.behind_background() && background_indices[x] != 0)
                {
                    continue;
                }

                self.frame[line as usize][x] = palette[color_index as usize];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, Ppu};
    use crate::render::Color;
    use pretty_assertions::assert_eq;

    const LINE_CYCLES: u32 = 20 + 43 + 51;

    #[test]
    fn test_one_full_line() {
        let mut ppu = Ppu::default();
        let vram = vec![0_u8; 0x2000];

        ppu.step(LINE_CYCLES - 1, &vram);
        assert_eq!(ppu.mode(), Mode::HBlank);
        assert_eq!(ppu.read_register(0xFF44), 0);

        ppu.step(1, &vram);
        assert_eq!(ppu.mode(), Mode::OamScan);
        assert_eq!(ppu.read_register(0xFF44), 1);
    }

    #[test]
    fn test_vblank_entry() {
        let mut ppu = Ppu::default();
        let vram = vec![0_u8; 0x2000];

        let mut saw_vblank_irq = false;
        for _ in 0..144 {
            saw_vblank_irq |= ppu.step(LINE_CYCLES, &vram).request_vblank_irq;
        }

        assert_eq!(ppu.mode(), Mode::VBlank);
        assert_eq!(ppu.read_register(0xFF44), 144);
        assert!(saw_vblank_irq);

        // Ten vblank lines later the machine is back at line 0.
        for _ in 0..10 {
            ppu.step(126, &vram);
        }
        assert_eq!(ppu.mode(), Mode::OamScan);
        assert_eq!(ppu.read_register(0xFF44), 0);
    }

    #[test]
    fn test_line_compare_interrupt() {
        let mut ppu = Ppu::default();
        let vram = vec![0_u8; 0x2000];

        ppu.write_register(0xFF41, 0x40);
        ppu.write_register(0xFF45, 2);

        let output = ppu.step(LINE_CYCLES, &vram);
        assert!(!output.request_stat_irq);

        let output = ppu.step(LINE_CYCLES, &vram);
        assert!(output.request_stat_irq);

        // Coincidence bit visible in STAT while on the compare line.
        assert_eq!(ppu.read_register(0xFF41) & 0x04, 0x04);
    }

    #[test]
    fn test_line_counter_is_read_only() {
        let mut ppu = Ppu::default();
        ppu.write_register(0xFF44, 0x99);
        assert_eq!(ppu.read_register(0xFF44), 0);
    }

    fn solid_tile(ppu: &mut Ppu, vram: &mut [u8], tile: usize, low: u8, high: u8) {
        for row in 0..8 {
            let base = tile * 16 + row * 2;
            vram[base] = low;
            vram[base + 1] = high;
            ppu.update_tile(base, vram);
        }
    }

    #[test]
    fn test_sprite_priority_smaller_x_wins() {
        let mut ppu = Ppu::default();
        let mut vram = vec![0_u8; 0x2000];

        // Tile 1 solid color 1, tile 2 solid color 3.
        solid_tile(&mut ppu, &mut vram, 1, 0xFF, 0x00);
        solid_tile(&mut ppu, &mut vram, 2, 0xFF, 0xFF);

        // Identity object palette, sprites enabled, background off.
        ppu.write_register(0xFF48, 0b1110_0100);
        ppu.write_register(0xFF40, 0x02);

        // Slot 0 at x=4 with tile 2, slot 1 at x=0 with tile 1.
        ppu.update_object(0, 16);
        ppu.update_object(1, 12);
        ppu.update_object(2, 2);
        ppu.update_object(4, 16);
        ppu.update_object(5, 8);
        ppu.update_object(6, 1);

        // Render line 0.
        ppu.step(20 + 43, &vram);

        let frame = ppu.frame();
        // Overlap at x=4..8: the sprite with the smaller X is on top.
        assert_eq!(frame[0][4], Color::from_shade(1));
        assert_eq!(frame[0][7], Color::from_shade(1));
        // Past the left sprite only the x=4 one remains.
        assert_eq!(frame[0][8], Color::from_shade(3));
        // Uncovered pixels show the lightest shade.
        assert_eq!(frame[0][12], Color::from_shade(0));
    }

    #[test]
    fn test_behind_background_sprite() {
        let mut ppu = Ppu::default();
        let mut vram = vec![0_u8; 0x2000];

        solid_tile(&mut ppu, &mut vram, 1, 0xFF, 0x00);
        // Background map stays all tile 0 (color 0) so the sprite shows
        // through even with the priority bit set.
        ppu.write_register(0xFF47, 0b1110_0100);
        ppu.write_register(0xFF48, 0b1110_0100);
        ppu.write_register(0xFF40, 0x13);

        ppu.update_object(0, 16);
        ppu.update_object(1, 8);
        ppu.update_object(2, 1);
        ppu.update_object(3, 0x80);

        ppu.step(20 + 43, &vram);
        assert_eq!(ppu.frame()[0][0], Color::from_shade(1));
    }

    #[test]
    fn test_background_scroll_sampling() {
        let mut ppu = Ppu::default();
        let mut vram = vec![0_u8; 0x2000];

        solid_tile(&mut ppu, &mut vram, 1, 0xFF, 0xFF);
        // Map cell (0, 1) uses tile 1, everything else tile 0.
        vram[0x1800 + 1] = 1;

        ppu.write_register(0xFF47, 0b1110_0100);
        ppu.write_register(0xFF40, 0x11);
        ppu.write_register(0xFF43, 8); // scroll one tile right

        ppu.step(20 + 43, &vram);

        let frame = ppu.frame();
        assert_eq!(frame[0][0], Color::from_shade(3));
        assert_eq!(frame[0][8], Color::from_shade(0));
    }

    #[test]
    fn test_tile_view_layout() {
        let mut ppu = Ppu::default();
        let mut vram = vec![0_u8; 0x2000];

        solid_tile(&mut ppu, &mut vram, 17, 0xFF, 0xFF);
        ppu.write_register(0xFF47, 0b1110_0100);

        let view = ppu.tile_view();
        // Tile 17 sits at grid cell (1, 1).
        assert_eq!(view[8][8], Color::from_shade(3));
        assert_eq!(view[0][0], Color::from_shade(0));
        assert_eq!(view.len(), 192);
        assert_eq!(view[0].len(), 128);
    }
}
