//! Whole-machine facade: CPU (which owns the bus and every peripheral)
//! plus the decoded cartridge header.

use crate::cartridge::Cartridge;
use crate::cpu::hardware::joypad::Button;
use crate::cpu::registers::Registers;
use crate::cpu::sm83::Sm83;
use crate::render::{FrameBuffer, TileViewBuffer};
use std::error::Error;

pub struct GameBoy {
    pub cpu: Sm83,
    cartridge: Cartridge,
}

impl GameBoy {
    /// Builds a machine around a ROM image.
    ///
    /// # Errors
    ///
    /// Rejects images with a missing or malformed header; a machine is
    /// never constructed half-initialized.
    pub fn new(rom: Vec<u8>) -> Result<Self, Box<dyn Error>> {
        let cartridge = Cartridge::new(&rom)?;

        Ok(Self {
            cpu: Sm83::new(rom),
            cartridge,
        })
    }

    /// Retires one instruction and clocks the peripherals by its cost.
    /// Returns true when this step finished a frame.
    pub fn step(&mut self) -> bool {
        let cycles = self.cpu.step();
        self.cpu.bus.tick(cycles)
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.cpu.bus.set_button(button, pressed);
    }

    #[must_use]
    pub fn frame(&self) -> &FrameBuffer {
        self.cpu.bus.frame()
    }

    #[must_use]
    pub fn tile_view(&self) -> Box<TileViewBuffer> {
        self.cpu.bus.tile_view()
    }

    #[must_use]
    pub const fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.cpu.registers
    }
}
