//! Base instruction set, one `match` arm per opcode byte (or per
//! bit-decoded family). Every handler returns its cost in machine
//! cycles; undefined opcodes report and cost nothing.

use super::opcodes_cb;
use super::registers::{Flag, Reg16, Reg8, Registers};
use crate::bus::Bus;

/// Operand encoding used by the bit-decoded blocks: index 6 is the
/// memory cell at HL.
const OPERANDS: [Option<Reg8>; 8] = [
    Some(Reg8::B),
    Some(Reg8::C),
    Some(Reg8::D),
    Some(Reg8::E),
    Some(Reg8::H),
    Some(Reg8::L),
    None,
    Some(Reg8::A),
];

pub(super) fn fetch_byte(reg: &mut Registers, bus: &mut Bus) -> u8 {
    let value = bus.read_byte(reg.pc);
    reg.pc = reg.pc.wrapping_add(1);
    value
}

pub(super) fn fetch_word(reg: &mut Registers, bus: &mut Bus) -> u16 {
    let value = bus.read_word(reg.pc);
    reg.pc = reg.pc.wrapping_add(2);
    value
}

pub(super) fn push(reg: &mut Registers, bus: &mut Bus, value: u16) {
    reg.sp = reg.sp.wrapping_sub(2);
    bus.write_word(reg.sp, value);
}

pub(super) fn pop(reg: &mut Registers, bus: &mut Bus) -> u16 {
    let value = bus.read_word(reg.sp);
    reg.sp = reg.sp.wrapping_add(2);
    value
}

pub(super) fn read_operand(index: u8, reg: &Registers, bus: &mut Bus) -> u8 {
    match OPERANDS[index as usize] {
        Some(r) => reg.get(r),
        None => bus.read_byte(reg.get16(Reg16::HL)),
    }
}

pub(super) fn write_operand(index: u8, value: u8, reg: &mut Registers, bus: &mut Bus) {
    match OPERANDS[index as usize] {
        Some(r) => reg.set(r, value),
        None => bus.write_byte(reg.get16(Reg16::HL), value),
    }
}

/// Executes the already fetched `opcode` and returns its machine-cycle
/// cost.
#[allow(clippy::too_many_lines)]
pub(super) fn execute(opcode: u8, reg: &mut Registers, bus: &mut Bus) -> u32 {
    match opcode {
        0x00 => 1, // NOP

        // LD rr, nn
        0x01 | 0x11 | 0x21 | 0x31 => {
            let value = fetch_word(reg, bus);
            reg.set16(wide_pair(opcode), value);
            3
        }

        // LD (BC)/(DE), A
        0x02 | 0x12 => {
            let pair = if opcode == 0x02 { Reg16::BC } else { Reg16::DE };
            bus.write_byte(reg.get16(pair), reg.get(Reg8::A));
            2
        }

        // INC rr / DEC rr, no flags touched
        0x03 | 0x13 | 0x23 | 0x33 => {
            let pair = wide_pair(opcode);
            reg.set16(pair, reg.get16(pair).wrapping_add(1));
            2
        }
        0x0B | 0x1B | 0x2B | 0x3B => {
            let pair = wide_pair(opcode);
            reg.set16(pair, reg.get16(pair).wrapping_sub(1));
            2
        }

        // INC r / DEC r
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let target = (opcode >> 3) & 7;
            let value = increment(reg, read_operand(target, reg, bus));
            write_operand(target, value, reg, bus);
            if target == 6 { 3 } else { 1 }
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let target = (opcode >> 3) & 7;
            let value = decrement(reg, read_operand(target, reg, bus));
            write_operand(target, value, reg, bus);
            if target == 6 { 3 } else { 1 }
        }

        // LD r, n
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let target = (opcode >> 3) & 7;
            let value = fetch_byte(reg, bus);
            write_operand(target, value, reg, bus);
            if target == 6 { 3 } else { 2 }
        }

        // Accumulator rotates always clear the zero flag.
        0x07 => {
            let value = opcodes_cb::rotate_left_circular(reg, reg.get(Reg8::A));
            reg.set_flag(Flag::Zero, false);
            reg.set(Reg8::A, value);
            1
        }
        0x0F => {
            let value = opcodes_cb::rotate_right_circular(reg, reg.get(Reg8::A));
            reg.set_flag(Flag::Zero, false);
            reg.set(Reg8::A, value);
            1
        }
        0x17 => {
            let value = opcodes_cb::rotate_left(reg, reg.get(Reg8::A));
            reg.set_flag(Flag::Zero, false);
            reg.set(Reg8::A, value);
            1
        }
        0x1F => {
            let value = opcodes_cb::rotate_right(reg, reg.get(Reg8::A));
            reg.set_flag(Flag::Zero, false);
            reg.set(Reg8::A, value);
            1
        }

        // LD (nn), SP
        0x08 => {
            let address = fetch_word(reg, bus);
            bus.write_word(address, reg.sp);
            5
        }

        // ADD HL, rr
        0x09 | 0x19 | 0x29 | 0x39 => {
            add_to_hl(reg, reg.get16(wide_pair(opcode)));
            2
        }

        // LD A, (BC)/(DE)
        0x0A | 0x1A => {
            let pair = if opcode == 0x0A { Reg16::BC } else { Reg16::DE };
            let value = bus.read_byte(reg.get16(pair));
            reg.set(Reg8::A, value);
            2
        }

        // STOP, reduced to a one-cycle pause
        0x10 => 1,

        // JR n / JR cc, n
        0x18 => {
            let offset = fetch_byte(reg, bus);
            reg.pc = signed_offset(reg.pc, offset);
            3
        }
        0x20 | 0x28 | 0x30 | 0x38 => {
            let offset = fetch_byte(reg, bus);
            if condition(reg, (opcode >> 3) & 3) {
                reg.pc = signed_offset(reg.pc, offset);
                3
            } else {
                2
            }
        }

        // LD (HL±), A / LD A, (HL±)
        0x22 | 0x32 => {
            let hl = reg.get16(Reg16::HL);
            bus.write_byte(hl, reg.get(Reg8::A));
            let next = if opcode == 0x22 {
                hl.wrapping_add(1)
            } else {
                hl.wrapping_sub(1)
            };
            reg.set16(Reg16::HL, next);
            2
        }
        0x2A | 0x3A => {
            let hl = reg.get16(Reg16::HL);
            let value = bus.read_byte(hl);
            reg.set(Reg8::A, value);
            let next = if opcode == 0x2A {
                hl.wrapping_add(1)
            } else {
                hl.wrapping_sub(1)
            };
            reg.set16(Reg16::HL, next);
            2
        }

        0x27 => {
            decimal_adjust(reg);
            1
        }
        0x2F => {
            reg.set(Reg8::A, !reg.get(Reg8::A));
            reg.set_flag(Flag::Subtract, true);
            reg.set_flag(Flag::HalfCarry, true);
            1
        }
        0x37 => {
            reg.set_flag(Flag::Subtract, false);
            reg.set_flag(Flag::HalfCarry, false);
            reg.set_flag(Flag::Carry, true);
            1
        }
        0x3F => {
            reg.set_flag(Flag::Subtract, false);
            reg.set_flag(Flag::HalfCarry, false);
            let carry = reg.flag(Flag::Carry);
            reg.set_flag(Flag::Carry, !carry);
            1
        }

        0x76 => {
            reg.halted = true;
            1
        }

        // LD r, r'
        0x40..=0x75 | 0x77..=0x7F => {
            let source = opcode & 7;
            let target = (opcode >> 3) & 7;
            let value = read_operand(source, reg, bus);
            write_operand(target, value, reg, bus);
            if source == 6 || target == 6 { 2 } else { 1 }
        }

        // ALU A, r
        0x80..=0xBF => {
            let value = read_operand(opcode & 7, reg, bus);
            alu_operation(reg, (opcode >> 3) & 7, value);
            if opcode & 7 == 6 { 2 } else { 1 }
        }

        // RET cc
        0xC0 | 0xC8 | 0xD0 | 0xD8 => {
            if condition(reg, (opcode >> 3) & 3) {
                reg.pc = pop(reg, bus);
                5
            } else {
                2
            }
        }

        // POP rr / PUSH rr
        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            let value = pop(reg, bus);
            reg.set16(stack_pair(opcode), value);
            3
        }
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            push(reg, bus, reg.get16(stack_pair(opcode)));
            4
        }

        // JP nn / JP cc, nn
        0xC3 => {
            reg.pc = fetch_word(reg, bus);
            4
        }
        0xC2 | 0xCA | 0xD2 | 0xDA => {
            let target = fetch_word(reg, bus);
            if condition(reg, (opcode >> 3) & 3) {
                reg.pc = target;
                4
            } else {
                3
            }
        }

        // CALL nn / CALL cc, nn
        0xCD => {
            let target = fetch_word(reg, bus);
            push(reg, bus, reg.pc);
            reg.pc = target;
            6
        }
        0xC4 | 0xCC | 0xD4 | 0xDC => {
            let target = fetch_word(reg, bus);
            if condition(reg, (opcode >> 3) & 3) {
                push(reg, bus, reg.pc);
                reg.pc = target;
                6
            } else {
                3
            }
        }

        // ALU A, n
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            let value = fetch_byte(reg, bus);
            alu_operation(reg, (opcode >> 3) & 7, value);
            2
        }

        // RST
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            push(reg, bus, reg.pc);
            reg.pc = u16::from(opcode & 0x38);
            4
        }

        0xC9 => {
            reg.pc = pop(reg, bus);
            4
        }
        0xD9 => {
            reg.pc = pop(reg, bus);
            reg.ime = true;
            4
        }

        0xCB => {
            let extended = fetch_byte(reg, bus);
            opcodes_cb::execute(extended, reg, bus)
        }

        // LDH (n), A / LDH A, (n)
        0xE0 => {
            let offset = fetch_byte(reg, bus);
            bus.write_byte(0xFF00 + u16::from(offset), reg.get(Reg8::A));
            3
        }
        0xF0 => {
            let offset = fetch_byte(reg, bus);
            let value = bus.read_byte(0xFF00 + u16::from(offset));
            reg.set(Reg8::A, value);
            3
        }

        // LD (C), A / LD A, (C)
        0xE2 => {
            bus.write_byte(0xFF00 + u16::from(reg.get(Reg8::C)), reg.get(Reg8::A));
            2
        }
        0xF2 => {
            let value = bus.read_byte(0xFF00 + u16::from(reg.get(Reg8::C)));
            reg.set(Reg8::A, value);
            2
        }

        // ADD SP, n / LD HL, SP+n
        0xE8 => {
            let offset = fetch_byte(reg, bus);
            reg.sp = stack_displaced(reg, offset);
            4
        }
        0xF8 => {
            let offset = fetch_byte(reg, bus);
            let value = stack_displaced(reg, offset);
            reg.set16(Reg16::HL, value);
            3
        }

        0xE9 => {
            reg.pc = reg.get16(Reg16::HL);
            1
        }

        // LD (nn), A / LD A, (nn)
        0xEA => {
            let address = fetch_word(reg, bus);
            bus.write_byte(address, reg.get(Reg8::A));
            4
        }
        0xFA => {
            let address = fetch_word(reg, bus);
            let value = bus.read_byte(address);
            reg.set(Reg8::A, value);
            4
        }

        0xF3 => {
            reg.ime = false;
            1
        }
        0xFB => {
            reg.ime = true;
            1
        }

        0xF9 => {
            reg.sp = reg.get16(Reg16::HL);
            2
        }

        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
            undefined(opcode, reg)
        }
    }
}

/// Reported, never fatal: the emulated program keeps running and the
/// fetch consumed the byte already.
fn undefined(opcode: u8, reg: &Registers) -> u32 {
    logger::log(format!(
        "unimplemented opcode 0x{opcode:02X} at 0x{:04X}",
        reg.pc.wrapping_sub(1)
    ));
    0
}

/// BC/DE/HL/SP selector used by the 16-bit arithmetic and load rows.
const fn wide_pair(opcode: u8) -> Reg16 {
    match (opcode >> 4) & 3 {
        0 => Reg16::BC,
        1 => Reg16::DE,
        2 => Reg16::HL,
        _ => Reg16::SP,
    }
}

/// BC/DE/HL/AF selector used by PUSH and POP.
const fn stack_pair(opcode: u8) -> Reg16 {
    match (opcode >> 4) & 3 {
        0 => Reg16::BC,
        1 => Reg16::DE,
        2 => Reg16::HL,
        _ => Reg16::AF,
    }
}

const fn condition(reg: &Registers, index: u8) -> bool {
    match index {
        0 => !reg.flag(Flag::Zero),
        1 => reg.flag(Flag::Zero),
        2 => !reg.flag(Flag::Carry),
        _ => reg.flag(Flag::Carry),
    }
}

/// Sign-extends `offset` before the addition.
const fn signed_offset(base: u16, offset: u8) -> u16 {
    base.wrapping_add(offset as i8 as u16)
}

fn alu_operation(reg: &mut Registers, selector: u8, value: u8) {
    match selector {
        0 => add(reg, value, false),
        1 => add(reg, value, true),
        2 => subtract(reg, value, false, true),
        3 => subtract(reg, value, true, true),
        4 => logical_and(reg, value),
        5 => logical_xor(reg, value),
        6 => logical_or(reg, value),
        _ => subtract(reg, value, false, false),
    }
}

fn add(reg: &mut Registers, value: u8, with_carry: bool) {
    let a = reg.get(Reg8::A);
    let carry = u8::from(with_carry && reg.flag(Flag::Carry));
    let result = a.wrapping_add(value).wrapping_add(carry);

    reg.set_flags(
        result == 0,
        false,
        (a & 0xF) + (value & 0xF) + carry > 0xF,
        u16::from(a) + u16::from(value) + u16::from(carry) > 0xFF,
    );
    reg.set(Reg8::A, result);
}

fn subtract(reg: &mut Registers, value: u8, with_carry: bool, store: bool) {
    let a = reg.get(Reg8::A);
    let carry = u8::from(with_carry && reg.flag(Flag::Carry));
    let result = a.wrapping_sub(value).wrapping_sub(carry);

    reg.set_flags(
        result == 0,
        true,
        (a & 0xF) < (value & 0xF) + carry,
        u16::from(a) < u16::from(value) + u16::from(carry),
    );
    if store {
        reg.set(Reg8::A, result);
    }
}

fn logical_and(reg: &mut Registers, value: u8) {
    let result = reg.get(Reg8::A) & value;
    reg.set_flags(result == 0, false, true, false);
    reg.set(Reg8::A, result);
}

fn logical_xor(reg: &mut Registers, value: u8) {
    let result = reg.get(Reg8::A) ^ value;
    reg.set_flags(result == 0, false, false, false);
    reg.set(Reg8::A, result);
}

fn logical_or(reg: &mut Registers, value: u8) {
    let result = reg.get(Reg8::A) | value;
    reg.set_flags(result == 0, false, false, false);
    reg.set(Reg8::A, result);
}

/// INC r leaves the carry flag alone.
fn increment(reg: &mut Registers, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    reg.set_flag(Flag::Zero, result == 0);
    reg.set_flag(Flag::Subtract, false);
    reg.set_flag(Flag::HalfCarry, value & 0xF == 0xF);
    result
}

fn decrement(reg: &mut Registers, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    reg.set_flag(Flag::Zero, result == 0);
    reg.set_flag(Flag::Subtract, true);
    reg.set_flag(Flag::HalfCarry, value & 0xF == 0);
    result
}

/// ADD HL, rr: half-carry at the nibble-12 boundary, zero untouched.
fn add_to_hl(reg: &mut Registers, value: u16) {
    let hl = reg.get16(Reg16::HL);
    reg.set_flag(Flag::Subtract, false);
    reg.set_flag(Flag::HalfCarry, (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
    reg.set_flag(Flag::Carry, u32::from(hl) + u32::from(value) > 0xFFFF);
    reg.set16(Reg16::HL, hl.wrapping_add(value));
}

/// SP plus a signed byte; carries are computed on the low byte as the
/// hardware does.
fn stack_displaced(reg: &mut Registers, offset: u8) -> u16 {
    let sp = reg.sp;
    reg.set_flags(
        false,
        false,
        (sp & 0xF) + u16::from(offset & 0xF) > 0xF,
        (sp & 0xFF) + u16::from(offset) > 0xFF,
    );
    signed_offset(sp, offset)
}

fn decimal_adjust(reg: &mut Registers) {
    let mut a = reg.get(Reg8::A);
    let mut carry = reg.flag(Flag::Carry);
    let mut adjust = 0_u8;

    if reg.flag(Flag::Subtract) {
        if reg.flag(Flag::HalfCarry) {
            adjust |= 0x06;
        }
        if carry {
            adjust |= 0x60;
        }
        a = a.wrapping_sub(adjust);
    } else {
        if reg.flag(Flag::HalfCarry) || a & 0xF > 0x09 {
            adjust |= 0x06;
        }
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        a = a.wrapping_add(adjust);
    }

    reg.set_flag(Flag::Zero, a == 0);
    reg.set_flag(Flag::HalfCarry, false);
    reg.set_flag(Flag::Carry, carry);
    reg.set(Reg8::A, a);
}
