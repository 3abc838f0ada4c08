//! # CPU Engine
//!
//! Fetch/decode/execute driver. One [`Sm83::step`] retires exactly one
//! instruction (or one interrupt dispatch, or one idle halt cycle) and
//! reports its machine-cycle cost so the caller can clock the rest of
//! the machine.

use super::opcodes;
use super::registers::Registers;
use crate::bus::Bus;
use serde::{Deserialize, Serialize};

/// Fixed cost of pushing the program counter and jumping to a vector.
const INTERRUPT_DISPATCH_CYCLES: u32 = 5;

#[derive(Serialize, Deserialize)]
pub struct Sm83 {
    pub registers: Registers,
    pub bus: Bus,
}

impl Sm83 {
    #[must_use]
    pub fn new(rom: Vec<u8>) -> Self {
        Self {
            registers: Registers::default(),
            bus: Bus::new(rom),
        }
    }

    /// Runs one step and returns its cost in machine cycles.
    ///
    /// Interrupts are checked once here, before the fetch, never in the
    /// middle of an instruction. A halted CPU burns one cycle per step
    /// until an enabled interrupt becomes pending; the wake-up does not
    /// require the master latch.
    pub fn step(&mut self) -> u32 {
        self.registers.cycle_count += 1;

        if let Some(cycles) = self.service_interrupt() {
            return cycles;
        }

        if self.registers.halted {
            if self.bus.interrupts.any_ready() {
                self.registers.halted = false;
            } else {
                return 1;
            }
        }

        let opcode = opcodes::fetch_byte(&mut self.registers, &mut self.bus);
        opcodes::execute(opcode, &mut self.registers, &mut self.bus)
    }

    fn service_interrupt(&mut self) -> Option<u32> {
        if !self.registers.ime {
            return None;
        }
        let interrupt = self.bus.interrupts.next_ready()?;

        self.bus.interrupts.acknowledge(interrupt);
        self.registers.ime = false;
        self.registers.halted = false;

        // Snapshot the general registers for the debug overlay.
        self.registers.save_shadow();

        let pc = self.registers.pc;
        opcodes::push(&mut self.registers, &mut self.bus, pc);
        self.registers.pc = interrupt.vector();

        Some(INTERRUPT_DISPATCH_CYCLES)
    }

    pub fn reset(&mut self) {
        self.registers.reset();
        self.bus.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::super::registers::Reg8;
    use super::Sm83;
    use pretty_assertions::assert_eq;

    fn cpu_with_program(program: &[u8]) -> Sm83 {
        let mut cpu = Sm83::new(vec![0; 0x8000]);
        cpu.registers.pc = 0xC000;
        cpu.registers.sp = 0xFFFE;
        for (offset, byte) in program.iter().enumerate() {
            cpu.bus.write_byte(0xC000 + offset as u16, *byte);
        }
        cpu
    }

    #[test]
    fn test_step_costs_and_lengths() {
        let mut cpu = cpu_with_program(&[
            0x00, // NOP
            0x06, 0x12, // LD B, 0x12
            0x80, // ADD A, B
            0xC3, 0x00, 0xD0, // JP 0xD000
        ]);

        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.registers.pc, 0xC001);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.registers.pc, 0xC003);
        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.registers.get(Reg8::A), 0x12);
        assert_eq!(cpu.step(), 4);
        assert_eq!(cpu.registers.pc, 0xD000);
        assert_eq!(cpu.registers.cycle_count, 4);
    }

    #[test]
    fn test_interrupt_dispatch() {
        let mut cpu = cpu_with_program(&[0x00]);
        cpu.registers.ime = true;
        cpu.bus.interrupts.enabled = 0x04;
        cpu.bus.interrupts.pending = 0x04;

        assert_eq!(cpu.step(), 5);
        assert_eq!(cpu.registers.pc, 0x0050);
        assert!(!cpu.registers.ime);
        assert_eq!(cpu.bus.interrupts.pending, 0);
        // The interrupted program counter sits on the stack.
        assert_eq!(cpu.bus.read_word(0xFFFC), 0xC000);
    }

    #[test]
    fn test_interrupts_held_while_latch_clear() {
        let mut cpu = cpu_with_program(&[0x00]);
        cpu.bus.interrupts.enabled = 0x01;
        cpu.bus.interrupts.pending = 0x01;

        cpu.step();
        // The pending bit survives, the instruction ran normally.
        assert_eq!(cpu.registers.pc, 0xC001);
        assert_eq!(cpu.bus.interrupts.pending, 0x01);
    }

    #[test]
    fn test_halt_idles_then_wakes() {
        let mut cpu = cpu_with_program(&[0x76, 0x04]); // HALT; INC B

        assert_eq!(cpu.step(), 1);
        assert!(cpu.registers.halted);

        // No interrupt: one cycle per step, no progress.
        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.registers.pc, 0xC001);

        // Pending and enabled wakes even without the master latch.
        cpu.bus.interrupts.enabled = 0x04;
        cpu.bus.interrupts.pending = 0x04;
        cpu.step();
        assert!(!cpu.registers.halted);
        assert_eq!(cpu.registers.get(Reg8::B), 1);
    }

    #[test]
    fn test_return_from_interrupt() {
        let mut cpu = cpu_with_program(&[0x00]);
        cpu.registers.ime = true;
        cpu.bus.interrupts.enabled = 0x01;
        cpu.bus.interrupts.pending = 0x01;

        cpu.step();
        assert_eq!(cpu.registers.pc, 0x0040);

        // The vector lies in ROM, so run the handler from work RAM.
        cpu.bus.write_byte(0xC800, 0xD9); // RETI
        cpu.registers.pc = 0xC800;

        assert_eq!(cpu.step(), 4);
        assert_eq!(cpu.registers.pc, 0xC000);
        assert!(cpu.registers.ime);
    }

    #[test]
    fn test_boot_program_hands_over_to_cartridge() {
        let mut rom = vec![0; 0x8000];
        rom[0x100] = 0x00; // NOP at the entry point
        rom[0x101] = 0xC3; // JP 0x0150
        rom[0x102] = 0x50;
        rom[0x103] = 0x01;
        let mut cpu = Sm83::new(rom);

        let mut steps = 0;
        while cpu.bus.boot_active() {
            cpu.step();
            steps += 1;
            assert!(steps < 200_000, "boot program never handed over");
        }

        // The overlay retired at the entry point with the side effects
        // the boot program promises.
        assert_eq!(cpu.registers.pc, 0x0101);
        assert_eq!(cpu.registers.sp, 0xFFFE);
        assert_eq!(cpu.bus.read_byte(0xFF40), 0x91);
        assert_eq!(cpu.bus.read_byte(0xFF47), 0xFC);
        assert_eq!(cpu.bus.read_byte(0x9FFF), 0x00);

        cpu.step();
        assert_eq!(cpu.registers.pc, 0x0150);
    }
}
