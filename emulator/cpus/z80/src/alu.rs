//! Flag computation for the arithmetic, logic, rotate and BCD instructions
//!
//! Every function here is total and returns the complete new flags byte for the bits the
//! instruction affects, including the undocumented F3 and F5 copies.

use crate::state::Flags;

pub(crate) const FLAGS_NUMERIC: u8 = Flags::Sign as u8 | Flags::Zero as u8;
pub(crate) const FLAGS_UNDOCUMENTED: u8 = Flags::F5 as u8 | Flags::F3 as u8;
pub(crate) const FLAGS_PRESERVED_BY_ADD16: u8 = FLAGS_NUMERIC | Flags::Parity as u8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RotateType {
    Bit8,
    Bit9,
}

#[inline(always)]
pub(crate) fn flag(flag: Flags, value: bool) -> u8 {
    if value {
        flag as u8
    } else {
        0
    }
}

/// Sign, zero and the two undocumented bits, all taken from `value`
#[inline]
pub(crate) fn numeric_flags(value: u8) -> u8 {
    (value & (Flags::Sign as u8 | FLAGS_UNDOCUMENTED)) | flag(Flags::Zero, value == 0)
}

/// True when `value` has an even number of set bits
#[inline]
pub(crate) fn parity(value: u8) -> bool {
    (value.count_ones() & 0x01) == 0
}

pub(crate) fn add_bytes(operand1: u8, operand2: u8, carry_in: bool) -> (u8, u8) {
    let carry_in = carry_in as u16;
    let sum = operand1 as u16 + operand2 as u16 + carry_in;
    let result = sum as u8;

    let half_carry = ((operand1 & 0x0F) as u16 + (operand2 & 0x0F) as u16 + carry_in) > 0x0F;
    let overflow = ((operand1 ^ result) & (operand2 ^ result) & 0x80) != 0;

    let flags = numeric_flags(result)
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Parity, overflow)
        | flag(Flags::Carry, sum > 0xFF);
    (result, flags)
}

pub(crate) fn sub_bytes(operand1: u8, operand2: u8, carry_in: bool) -> (u8, u8) {
    let carry_in = carry_in as i16;
    let diff = operand1 as i16 - operand2 as i16 - carry_in;
    let result = diff as u8;

    let half_carry = ((operand1 & 0x0F) as i16 - (operand2 & 0x0F) as i16 - carry_in) < 0;
    let overflow = ((operand1 ^ operand2) & (operand1 ^ result) & 0x80) != 0;

    let flags = numeric_flags(result)
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Parity, overflow)
        | Flags::AddSubtract as u8
        | flag(Flags::Carry, diff < 0);
    (result, flags)
}

/// `CP` subtracts without storing, and takes F3/F5 from the operand instead of the difference
pub(crate) fn compare_bytes(acc: u8, operand: u8) -> u8 {
    let (_, flags) = sub_bytes(acc, operand, false);
    (flags & !FLAGS_UNDOCUMENTED) | (operand & FLAGS_UNDOCUMENTED)
}

/// `INC r` leaves the carry as it was
pub(crate) fn inc_byte(value: u8, flags_in: u8) -> (u8, u8) {
    let result = value.wrapping_add(1);
    let flags = numeric_flags(result)
        | flag(Flags::HalfCarry, (value & 0x0F) == 0x0F)
        | flag(Flags::Parity, value == 0x7F)
        | (flags_in & Flags::Carry as u8);
    (result, flags)
}

/// `DEC r` leaves the carry as it was
pub(crate) fn dec_byte(value: u8, flags_in: u8) -> (u8, u8) {
    let result = value.wrapping_sub(1);
    let flags = numeric_flags(result)
        | flag(Flags::HalfCarry, (value & 0x0F) == 0x00)
        | flag(Flags::Parity, value == 0x80)
        | Flags::AddSubtract as u8
        | (flags_in & Flags::Carry as u8);
    (result, flags)
}

/// Flags for the logic ops and the CB shifts: parity in P/V, N cleared
pub(crate) fn logic_flags(result: u8, carry: bool, half_carry: bool) -> u8 {
    numeric_flags(result)
        | flag(Flags::Parity, parity(result))
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Carry, carry)
}

/// `ADD HL,rr` only touches H, N, C and the undocumented bits (from the high byte)
pub(crate) fn add_words(operand1: u16, operand2: u16, flags_in: u8) -> (u16, u8) {
    let sum = operand1 as u32 + operand2 as u32;
    let result = sum as u16;
    let half_carry = ((operand1 & 0x0FFF) + (operand2 & 0x0FFF)) > 0x0FFF;

    let flags = (flags_in & FLAGS_PRESERVED_BY_ADD16)
        | (((result >> 8) as u8) & FLAGS_UNDOCUMENTED)
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Carry, sum > 0xFFFF);
    (result, flags)
}

pub(crate) fn adc_words(operand1: u16, operand2: u16, carry_in: bool) -> (u16, u8) {
    let carry_in = carry_in as u32;
    let sum = operand1 as u32 + operand2 as u32 + carry_in;
    let result = sum as u16;

    let half_carry = ((operand1 & 0x0FFF) as u32 + (operand2 & 0x0FFF) as u32 + carry_in) > 0x0FFF;
    let overflow = ((operand1 ^ result) & (operand2 ^ result) & 0x8000) != 0;

    let flags = word_numeric_flags(result)
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Parity, overflow)
        | flag(Flags::Carry, sum > 0xFFFF);
    (result, flags)
}

pub(crate) fn sbc_words(operand1: u16, operand2: u16, carry_in: bool) -> (u16, u8) {
    let carry_in = carry_in as i32;
    let diff = operand1 as i32 - operand2 as i32 - carry_in;
    let result = diff as u16;

    let half_carry = ((operand1 & 0x0FFF) as i32 - (operand2 & 0x0FFF) as i32 - carry_in) < 0;
    let overflow = ((operand1 ^ operand2) & (operand1 ^ result) & 0x8000) != 0;

    let flags = word_numeric_flags(result)
        | flag(Flags::HalfCarry, half_carry)
        | flag(Flags::Parity, overflow)
        | Flags::AddSubtract as u8
        | flag(Flags::Carry, diff < 0);
    (result, flags)
}

fn word_numeric_flags(result: u16) -> u8 {
    let high = (result >> 8) as u8;
    (high & (Flags::Sign as u8 | FLAGS_UNDOCUMENTED)) | flag(Flags::Zero, result == 0)
}

pub(crate) fn rotate_left(value: u8, rtype: RotateType, carry_in: bool) -> (u8, bool) {
    let out_bit = (value & 0x80) != 0;
    let in_bit = match rtype {
        RotateType::Bit9 => carry_in,
        RotateType::Bit8 => out_bit,
    };
    ((value << 1) | in_bit as u8, out_bit)
}

pub(crate) fn rotate_right(value: u8, rtype: RotateType, carry_in: bool) -> (u8, bool) {
    let out_bit = (value & 0x01) != 0;
    let in_bit = match rtype {
        RotateType::Bit9 => carry_in,
        RotateType::Bit8 => out_bit,
    };
    ((value >> 1) | if in_bit { 0x80 } else { 0 }, out_bit)
}

/// Decimal adjust after an add or subtract of two packed BCD bytes
///
/// The correction comes from the nine-row table keyed on the carry, the high nibble, the
/// half carry and the low nibble. The table covers every combination of nibbles and flags, so
/// falling off the end means the inputs weren't nibbles at all.
pub(crate) fn decimal_adjust(acc: u8, flags_in: u8) -> (u8, u8) {
    let carry = (flags_in & Flags::Carry as u8) != 0;
    let half_carry = (flags_in & Flags::HalfCarry as u8) != 0;
    let subtract = (flags_in & Flags::AddSubtract as u8) != 0;
    let high = acc >> 4;
    let low = acc & 0x0F;

    #[rustfmt::skip]
    let (correction, carry_out) = match (carry, high, half_carry, low) {
        (false, 0x0..=0x9, false, 0x0..=0x9) => (0x00, false),
        (false, 0x0..=0x9, true,  0x0..=0x9) => (0x06, false),
        (false, 0x0..=0x8, _,     0xA..=0xF) => (0x06, false),
        (false, 0xA..=0xF, false, 0x0..=0x9) => (0x60, true),
        (true,  _,         false, 0x0..=0x9) => (0x60, true),
        (true,  _,         true,  0x0..=0x9) => (0x66, true),
        (true,  _,         _,     0xA..=0xF) => (0x66, true),
        (false, 0x9..=0xF, _,     0xA..=0xF) => (0x66, true),
        (false, 0xA..=0xF, true,  0x0..=0x9) => (0x66, true),
        _ => panic!("daa: no correction for a={:#04x} flags={:#04x}", acc, flags_in),
    };

    let (result, half_carry_out) = if subtract {
        (acc.wrapping_sub(correction), half_carry && low <= 0x5)
    } else {
        (acc.wrapping_add(correction), low > 0x9)
    };

    let flags = numeric_flags(result)
        | flag(Flags::Parity, parity(result))
        | flag(Flags::HalfCarry, half_carry_out)
        | (flags_in & Flags::AddSubtract as u8)
        | flag(Flags::Carry, carry_out);
    (result, flags)
}
