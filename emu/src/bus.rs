//! # Bus
//!
//! Total decoder over the 16-bit address space. Every peripheral the
//! CPU can talk to hangs off the bus, so one `&mut Bus` is all an
//! instruction handler needs. Unmapped addresses read back a fixed
//! sentinel and swallow writes.

use crate::cpu::hardware::interrupts::{Interrupt, Interrupts};
use crate::cpu::hardware::joypad::{Button, Joypad};
use crate::cpu::hardware::ppu::{Ppu, PpuStepOutput};
use crate::cpu::hardware::serial::Serial;
use crate::cpu::hardware::timer::Timer;
use crate::render::{FrameBuffer, TileViewBuffer};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Reads from unmapped or unusable addresses observe pulled-up data
/// lines.
const SENTINEL: u8 = 0xFF;

/// Minimal boot program overlaid below 0x100 until the first fetch of
/// 0x100: set up the stack, clear video RAM, program the background
/// palette and LCD control, then hand over to the cartridge entry
/// point. The remainder of the page is NOP filler.
const BOOT_PROGRAM: [u8; 0x100] = boot_program();

const fn boot_program() -> [u8; 0x100] {
    let prefix: [u8; 23] = [
        0x31, 0xFE, 0xFF, // LD SP, 0xFFFE
        0xAF, // XOR A
        0x21, 0xFF, 0x9F, // LD HL, 0x9FFF
        0x32, // LD (HL-), A
        0xCB, 0x7C, // BIT 7, H
        0x20, 0xFB, // JR NZ, -5
        0x3E, 0xFC, // LD A, 0xFC
        0xE0, 0x47, // LDH (0x47), A
        0x3E, 0x91, // LD A, 0x91
        0xE0, 0x40, // LDH (0x40), A
        0xC3, 0x00, 0x01, // JP 0x0100
    ];

    let mut program = [0; 0x100];
    let mut i = 0;
    while i < prefix.len() {
        program[i] = prefix[i];
        i += 1;
    }
    program
}

#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct Bus {
    rom: Vec<u8>,

    #[serde_as(as = "Box<[_; 8192]>")]
    vram: Box<[u8; 8192]>,
    #[serde_as(as = "Box<[_; 8192]>")]
    external_ram: Box<[u8; 8192]>,
    #[serde_as(as = "Box<[_; 8192]>")]
    work_ram: Box<[u8; 8192]>,
    #[serde_as(as = "[_; 160]")]
    oam: [u8; 160],
    #[serde_as(as = "[_; 127]")]
    high_ram: [u8; 127],

    /// While set, reads below 0x100 come from the boot program.
    boot_active: bool,

    pub ppu: Ppu,
    pub timer: Timer,
    pub joypad: Joypad,
    pub serial: Serial,
    pub interrupts: Interrupts,
}

impl Bus {
    #[must_use]
    pub fn new(rom: Vec<u8>) -> Self {
        Self {
            rom,
            vram: Box::new([0; 8192]),
            external_ram: Box::new([0; 8192]),
            work_ram: Box::new([0; 8192]),
            oam: [0; 160],
            high_ram: [0; 127],
            boot_active: true,
            ppu: Ppu::default(),
            timer: Timer::default(),
            joypad: Joypad::default(),
            serial: Serial::default(),
            interrupts: Interrupts::default(),
        }
    }

    /// Takes `&mut self` because the first read of 0x100 retires the
    /// boot overlay for good.
    pub fn read_byte(&mut self, address: u16) -> u8 {
        if self.boot_active {
            if address < 0x100 {
                return BOOT_PROGRAM[address as usize];
            }
            if address == 0x100 {
                self.boot_active = false;
            }
        }

        match address {
            0x0000..=0x7FFF => self.rom[address as usize],
            0x8000..=0x9FFF => self.vram[(address - 0x8000) as usize],
            0xA000..=0xBFFF => self.external_ram[(address - 0xA000) as usize],
            // Work RAM plus its echo.
            0xC000..=0xFDFF => self.work_ram[(address as usize - 0xC000) & 0x1FFF],
            0xFE00..=0xFE9F => self.oam[(address - 0xFE00) as usize],
            0xFEA0..=0xFEFF => SENTINEL,
            0xFF00 => self.joypad.read(),
            0xFF01..=0xFF02 => self.serial.read(address),
            0xFF04..=0xFF07 => self.timer.read(address),
            0xFF0F => self.interrupts.pending,
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.read_register(address),
            // The OAM transfer register is write-only; the rest of the
            // I/O window is unpopulated (sound among it).
            0xFF03 | 0xFF08..=0xFF0E | 0xFF10..=0xFF3F | 0xFF46 | 0xFF4C..=0xFF7F => SENTINEL,
            0xFF80..=0xFFFE => self.high_ram[(address - 0xFF80) as usize],
            0xFFFF => self.interrupts.enabled,
        }
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            // ROM is not banked here, writes fall on the floor.
            0x0000..=0x7FFF => {}
            0x8000..=0x9FFF => {
                let relative = (address - 0x8000) as usize;
                self.vram[relative] = value;
                self.ppu.update_tile(relative, self.vram.as_slice());
            }
            0xA000..=0xBFFF => self.external_ram[(address - 0xA000) as usize] = value,
            0xC000..=0xFDFF => self.work_ram[(address as usize - 0xC000) & 0x1FFF] = value,
            0xFE00..=0xFE9F => {
                let relative = address - 0xFE00;
                self.oam[relative as usize] = value;
                self.ppu.update_object(relative, value);
            }
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.joypad.write(value),
            0xFF01..=0xFF02 => {
                if self.serial.write(address, value) {
                    self.interrupts.request(Interrupt::Serial);
                }
            }
            0xFF04..=0xFF07 => self.timer.write(address, value),
            0xFF0F => self.interrupts.pending = value & 0x1F,
            0xFF46 => self.oam_transfer(value),
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.write_register(address, value),
            0xFF03 | 0xFF08..=0xFF0E | 0xFF10..=0xFF3F | 0xFF4C..=0xFF7F => {}
            0xFF80..=0xFFFE => self.high_ram[(address - 0xFF80) as usize] = value,
            0xFFFF => self.interrupts.enabled = value & 0x1F,
        }
    }

    /// Two 8-bit accesses in little-endian order.
    pub fn read_word(&mut self, address: u16) -> u16 {
        let low = self.read_byte(address);
        let high = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub fn write_word(&mut self, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(address, low);
        self.write_byte(address.wrapping_add(1), high);
    }

    /// Copies one 160-byte page into OAM, keeping the decoded sprite
    /// cache in sync.
    fn oam_transfer(&mut self, source_page: u8) {
        let source = u16::from(source_page) << 8;
        for offset in 0..160 {
            let value = self.read_byte(source + offset);
            self.oam[offset as usize] = value;
            self.ppu.update_object(offset, value);
        }
    }

    /// Advances timer and picture generator by an executed
    /// instruction's cycle cost, collecting their interrupt requests.
    /// Returns true when a frame was completed.
    pub fn tick(&mut self, m_cycles: u32) -> bool {
        if self.timer.tick(m_cycles) {
            self.interrupts.request(Interrupt::Timer);
        }

        let PpuStepOutput {
            request_vblank_irq,
            request_stat_irq,
            frame_complete,
        } = self.ppu.step(m_cycles, self.vram.as_slice());

        if request_vblank_irq {
            self.interrupts.request(Interrupt::VBlank);
        }
        if request_stat_irq {
            self.interrupts.request(Interrupt::LcdStat);
        }

        frame_complete
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if self.joypad.set_button(button, pressed) {
            self.interrupts.request(Interrupt::Joypad);
        }
    }

    #[must_use]
    pub fn frame(&self) -> &FrameBuffer {
        self.ppu.frame()
    }

    #[must_use]
    pub fn tile_view(&self) -> Box<TileViewBuffer> {
        self.ppu.tile_view()
    }

    #[must_use]
    pub const fn boot_active(&self) -> bool {
        self.boot_active
    }

    /// Back to power-on state with the same ROM image.
    pub fn reset(&mut self) {
        let rom = std::mem::take(&mut self.rom);
        *self = Self::new(rom);
    }
}

#[cfg(test)]
mod tests {
    use super::{Bus, BOOT_PROGRAM, SENTINEL};
    use pretty_assertions::assert_eq;

    fn bus() -> Bus {
        Bus::new(vec![0; 0x8000])
    }

    #[test]
    fn test_ram_round_trips() {
        let mut bus = bus();

        bus.write_byte(0xC123, 0xAB);
        assert_eq!(bus.read_byte(0xC123), 0xAB);
        // Echo region mirrors work RAM.
        assert_eq!(bus.read_byte(0xE123), 0xAB);

        bus.write_byte(0x8FFF, 0x55);
        assert_eq!(bus.read_byte(0x8FFF), 0x55);

        bus.write_byte(0xFF85, 0x77);
        assert_eq!(bus.read_byte(0xFF85), 0x77);

        bus.write_byte(0xA010, 0x99);
        assert_eq!(bus.read_byte(0xA010), 0x99);
    }

    #[test]
    fn test_random_work_ram_round_trip() {
        use rand::Rng;

        let mut bus = bus();
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            let address = rng.gen_range(0xC000..=0xDFFF);
            let value: u8 = rand::random();
            bus.write_byte(address, value);
            assert_eq!(bus.read_byte(address), value);
        }
    }

    #[test]
    fn test_unusable_region() {
        let mut bus = bus();
        bus.write_byte(0xFEA0, 0x12);
        assert_eq!(bus.read_byte(0xFEA0), SENTINEL);
        assert_eq!(bus.read_byte(0xFF10), SENTINEL);
    }

    #[test]
    fn test_words_are_little_endian() {
        let mut bus = bus();
        bus.write_word(0xC000, 0x1234);
        assert_eq!(bus.read_byte(0xC000), 0x34);
        assert_eq!(bus.read_byte(0xC001), 0x12);
        assert_eq!(bus.read_word(0xC000), 0x1234);
    }

    #[test]
    fn test_boot_overlay() {
        let mut rom = vec![0; 0x8000];
        rom[0x50] = 0xDE;
        rom[0x100] = 0x42;
        let mut bus = Bus::new(rom);

        assert_eq!(bus.read_byte(0x0000), BOOT_PROGRAM[0]);
        assert_eq!(bus.read_byte(0x0050), BOOT_PROGRAM[0x50]);
        assert!(bus.boot_active());

        // Crossing into the cartridge entry point retires the overlay.
        assert_eq!(bus.read_byte(0x0100), 0x42);
        assert!(!bus.boot_active());
        assert_eq!(bus.read_byte(0x0050), 0xDE);
    }

    #[test]
    fn test_oam_transfer() {
        let mut bus = bus();
        for offset in 0..160_u16 {
            bus.write_byte(0xC000 + offset, offset as u8);
        }

        bus.write_byte(0xFF46, 0xC0);

        for offset in 0..160_u16 {
            assert_eq!(bus.read_byte(0xFE00 + offset), offset as u8);
        }
    }

    #[test]
    fn test_timer_overflow_requests_interrupt() {
        let mut bus = bus();
        bus.write_byte(0xFF07, 0x05);
        bus.write_byte(0xFF05, 0xFF);
        bus.write_byte(0xFF06, 0x05);

        bus.tick(4);

        assert_eq!(bus.read_byte(0xFF05), 0x05);
        assert_eq!(bus.read_byte(0xFF0F) & 0x04, 0x04);
    }

    #[test]
    fn test_vram_write_updates_tile_cache() {
        let mut bus = bus();
        bus.write_byte(0xFF47, 0b1110_0100);
        bus.write_byte(0xFF40, 0x11);

        // Tile 0, row 0, all pixels color 3; the map already points at
        // tile 0 everywhere.
        bus.write_byte(0x8000, 0xFF);
        bus.write_byte(0x8001, 0xFF);

        // Render line 0.
        bus.tick(20 + 43);
        assert_eq!(bus.frame()[0][0], crate::render::Color::from_shade(3));
    }
}
