//! # Register File
//!
//! The CPU-visible register state:
//!
//! - **A, B, C, D, E, H, L**: 8-bit general registers
//! - **F**: flag byte, only the top nibble is meaningful
//! - **AF, BC, DE, HL**: 16-bit views by byte concatenation (high:low)
//! - **SP, PC**: 16-bit stack pointer and program counter
//! - **IME**: the master interrupt-enable latch
//!
//! Registers are addressed through [`Reg8`]/[`Reg16`] so an invalid
//! register reference is impossible to express; there is no runtime
//! name lookup and no failure path.

use serde::{Deserialize, Serialize};

/// 8-bit register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    F,
}

/// 16-bit register-pair identifier (high:low concatenation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    SP,
}

/// Flag bits in the high nibble of F.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Zero = 0x80,
    Subtract = 0x40,
    HalfCarry = 0x20,
    Carry = 0x10,
}

/// The low nibble of F always reads as zero.
const FLAG_MASK: u8 = 0xF0;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Registers {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    f: u8,

    pub pc: u16,
    pub sp: u16,

    /// Master interrupt-enable latch (IME).
    pub ime: bool,

    /// Set by HALT, suspends fetch/decode until an interrupt is pending.
    pub halted: bool,

    /// Retired-step counter, free running.
    pub cycle_count: u64,

    /// Shadow copy of the eight general registers (EXX-style bank used
    /// around interrupt service in the reference hardware model).
    shadow: [u8; 8],
}

impl Registers {
    #[must_use]
    pub const fn get(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.a,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
            Reg8::F => self.f,
        }
    }

    pub const fn set(&mut self, reg: Reg8, value: u8) {
        match reg {
            Reg8::A => self.a = value,
            Reg8::B => self.b = value,
            Reg8::C => self.c = value,
            Reg8::D => self.d = value,
            Reg8::E => self.e = value,
            Reg8::H => self.h = value,
            Reg8::L => self.l = value,
            Reg8::F => self.f = value & FLAG_MASK,
        }
    }

    #[must_use]
    pub const fn get16(&self, pair: Reg16) -> u16 {
        match pair {
            Reg16::AF => ((self.a as u16) << 8) | self.f as u16,
            Reg16::BC => ((self.b as u16) << 8) | self.c as u16,
            Reg16::DE => ((self.d as u16) << 8) | self.e as u16,
            Reg16::HL => ((self.h as u16) << 8) | self.l as u16,
            Reg16::SP => self.sp,
        }
    }

    pub const fn set16(&mut self, pair: Reg16, value: u16) {
        let high = (value >> 8) as u8;
        let low = value as u8;
        match pair {
            Reg16::AF => {
                self.a = high;
                self.f = low & FLAG_MASK;
            }
            Reg16::BC => {
                self.b = high;
                self.c = low;
            }
            Reg16::DE => {
                self.d = high;
                self.e = low;
            }
            Reg16::HL => {
                self.h = high;
                self.l = low;
            }
            Reg16::SP => self.sp = value,
        }
    }

    #[must_use]
    pub const fn flag(&self, flag: Flag) -> bool {
        self.f & flag as u8 != 0
    }

    pub const fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.f |= flag as u8;
        } else {
            self.f &= !(flag as u8);
        }
    }

    /// Sets all four flags at once, the common case for ALU results.
    pub const fn set_flags(&mut self, zero: bool, subtract: bool, half_carry: bool, carry: bool) {
        self.f = 0;
        self.set_flag(Flag::Zero, zero);
        self.set_flag(Flag::Subtract, subtract);
        self.set_flag(Flag::HalfCarry, half_carry);
        self.set_flag(Flag::Carry, carry);
    }

    pub const fn save_shadow(&mut self) {
        self.shadow = [
            self.a, self.b, self.c, self.d, self.e, self.h, self.l, self.f,
        ];
    }

    pub const fn restore_shadow(&mut self) {
        self.a = self.shadow[0];
        self.b = self.shadow[1];
        self.c = self.shadow[2];
        self.d = self.shadow[3];
        self.e = self.shadow[4];
        self.h = self.shadow[5];
        self.l = self.shadow[6];
        self.f = self.shadow[7];
    }

    /// Back to the fixed power-on pattern. With the boot overlay active
    /// the program counter starts at the boot program's first byte.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
