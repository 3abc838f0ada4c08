//! 0xCB-prefixed instruction set. The whole page is bit-decoded: the
//! top two bits pick the family, bits 5..=3 the rotation kind or bit
//! index, bits 2..=0 the operand.

use super::opcodes::{read_operand, write_operand};
use super::registers::{Flag, Registers};
use crate::bitwise::Bits;
use crate::bus::Bus;

/// Executes the byte following a 0xCB prefix and returns its
/// machine-cycle cost.
pub(super) fn execute(opcode: u8, reg: &mut Registers, bus: &mut Bus) -> u32 {
    let operand = opcode & 7;
    let selector = (opcode >> 3) & 7;
    let memory = operand == 6;
    let value = read_operand(operand, reg, bus);

    match opcode >> 6 {
        // Rotates, shifts and SWAP
        0 => {
            let result = match selector {
                0 => rotate_left_circular(reg, value),
                1 => rotate_right_circular(reg, value),
                2 => rotate_left(reg, value),
                3 => rotate_right(reg, value),
                4 => shift_left(reg, value),
                5 => shift_right_arithmetic(reg, value),
                6 => swap(reg, value),
                _ => shift_right_logical(reg, value),
            };
            write_operand(operand, result, reg, bus);
            if memory { 4 } else { 2 }
        }

        // BIT b, r: pure flag test, carry untouched
        1 => {
            reg.set_flag(Flag::Zero, value.is_bit_off(selector));
            reg.set_flag(Flag::Subtract, false);
            reg.set_flag(Flag::HalfCarry, true);
            if memory { 3 } else { 2 }
        }

        // RES b, r / SET b, r: no flags at all
        2 => {
            let mut result = value;
            result.set_bit_off(selector);
            write_operand(operand, result, reg, bus);
            if memory { 4 } else { 2 }
        }
        _ => {
            let mut result = value;
            result.set_bit_on(selector);
            write_operand(operand, result, reg, bus);
            if memory { 4 } else { 2 }
        }
    }
}

fn set_shift_flags(reg: &mut Registers, result: u8, carry: bool) {
    reg.set_flags(result == 0, false, false, carry);
}

pub(super) fn rotate_left_circular(reg: &mut Registers, value: u8) -> u8 {
    let result = value.rotate_left(1);
    set_shift_flags(reg, result, value.is_bit_on(7));
    result
}

pub(super) fn rotate_right_circular(reg: &mut Registers, value: u8) -> u8 {
    let result = value.rotate_right(1);
    set_shift_flags(reg, result, value.is_bit_on(0));
    result
}

/// Nine-bit rotate through the carry flag.
pub(super) fn rotate_left(reg: &mut Registers, value: u8) -> u8 {
    let result = (value << 1) | u8::from(reg.flag(Flag::Carry));
    set_shift_flags(reg, result, value.is_bit_on(7));
    result
}

pub(super) fn rotate_right(reg: &mut Registers, value: u8) -> u8 {
    let result = (value >> 1) | (u8::from(reg.flag(Flag::Carry)) << 7);
    set_shift_flags(reg, result, value.is_bit_on(0));
    result
}

fn shift_left(reg: &mut Registers, value: u8) -> u8 {
    let result = value << 1;
    set_shift_flags(reg, result, value.is_bit_on(7));
    result
}

/// Arithmetic right shift keeps the sign bit.
fn shift_right_arithmetic(reg: &mut Registers, value: u8) -> u8 {
    let result = (value >> 1) | (value & 0x80);
    set_shift_flags(reg, result, value.is_bit_on(0));
    result
}

fn shift_right_logical(reg: &mut Registers, value: u8) -> u8 {
    let result = value >> 1;
    set_shift_flags(reg, result, value.is_bit_on(0));
    result
}

fn swap(reg: &mut Registers, value: u8) -> u8 {
    let result = value.rotate_left(4);
    set_shift_flags(reg, result, false);
    result
}

#[cfg(test)]
mod tests {
    use super::super::registers::{Flag, Reg16, Reg8, Registers};
    use super::execute;
    use crate::bus::Bus;
    use pretty_assertions::assert_eq;

    fn setup() -> (Registers, Bus) {
        let mut reg = Registers::default();
        reg.pc = 0xC000;
        (reg, Bus::new(vec![0; 0x8000]))
    }

    #[test]
    fn test_rotate_through_carry() {
        let (mut reg, mut bus) = setup();
        reg.set(Reg8::B, 0x80);

        // RL B: 0x80 -> 0x00, carry out
        assert_eq!(execute(0x10, &mut reg, &mut bus), 2);
        assert_eq!(reg.get(Reg8::B), 0x00);
        assert!(reg.flag(Flag::Zero));
        assert!(reg.flag(Flag::Carry));

        // RL B again: carry rotates back in
        execute(0x10, &mut reg, &mut bus);
        assert_eq!(reg.get(Reg8::B), 0x01);
        assert!(!reg.flag(Flag::Carry));
    }

    #[test]
    fn test_circular_rotate() {
        let (mut reg, mut bus) = setup();
        reg.set(Reg8::A, 0x81);

        // RRC A
        execute(0x0F, &mut reg, &mut bus);
        assert_eq!(reg.get(Reg8::A), 0xC0);
        assert!(reg.flag(Flag::Carry));
    }

    #[test]
    fn test_shift_right_variants() {
        let (mut reg, mut bus) = setup();
        reg.set(Reg8::D, 0x81);

        // SRA D keeps the sign bit
        execute(0x2A, &mut reg, &mut bus);
        assert_eq!(reg.get(Reg8::D), 0xC0);
        assert!(reg.flag(Flag::Carry));

        // SRL D drops it
        execute(0x3A, &mut reg, &mut bus);
        assert_eq!(reg.get(Reg8::D), 0x60);
        assert!(!reg.flag(Flag::Carry));
    }

    #[test]
    fn test_swap() {
        let (mut reg, mut bus) = setup();
        reg.set(Reg8::L, 0xA5);

        execute(0x35, &mut reg, &mut bus);
        assert_eq!(reg.get(Reg8::L), 0x5A);
        assert!(!reg.flag(Flag::Carry));
    }

    #[test]
    fn test_bit_test_preserves_carry() {
        let (mut reg, mut bus) = setup();
        reg.set(Reg8::H, 0x80);
        reg.set_flag(Flag::Carry, true);

        // BIT 7, H
        assert_eq!(execute(0x7C, &mut reg, &mut bus), 2);
        assert!(!reg.flag(Flag::Zero));
        assert!(reg.flag(Flag::HalfCarry));
        assert!(reg.flag(Flag::Carry));

        // BIT 6, H
        execute(0x74, &mut reg, &mut bus);
        assert!(reg.flag(Flag::Zero));
    }

    #[test]
    fn test_set_and_reset_on_memory() {
        let (mut reg, mut bus) = setup();
        reg.set16(Reg16::HL, 0xC080);

        // SET 3, (HL)
        assert_eq!(execute(0xDE, &mut reg, &mut bus), 4);
        assert_eq!(bus.read_byte(0xC080), 0x08);

        // RES 3, (HL)
        assert_eq!(execute(0x9E, &mut reg, &mut bus), 4);
        assert_eq!(bus.read_byte(0xC080), 0x00);

        // BIT on memory costs one cycle less than the writing forms.
        assert_eq!(execute(0x5E, &mut reg, &mut bus), 3);
    }
}
