//! Flag arithmetic shared by the instruction handlers. Every function is pure and returns
//! the result together with the complete new flag set.

use crate::lr35902::registers::Flags;

#[inline]
fn flags(zero: bool, subtract: bool, half_carry: bool, carry: bool) -> Flags {
    let mut flags = Flags::empty();
    flags.set(Flags::ZERO, zero);
    flags.set(Flags::SUBTRACT, subtract);
    flags.set(Flags::HALF_CARRY, half_carry);
    flags.set(Flags::CARRY, carry);
    flags
}

pub fn add8(a: u8, b: u8, carry: bool) -> (u8, Flags) {
    let carry = carry as u8;
    let result = a.wrapping_add(b).wrapping_add(carry);
    let half_carry = (a & 0x0f) + (b & 0x0f) + carry > 0x0f;
    let full_carry = (a as u16) + (b as u16) + (carry as u16) > 0xff;
    (result, flags(result == 0, false, half_carry, full_carry))
}

pub fn sub8(a: u8, b: u8, carry: bool) -> (u8, Flags) {
    let carry = carry as u8;
    let result = a.wrapping_sub(b).wrapping_sub(carry);
    let half_borrow = (a & 0x0f) < (b & 0x0f) + carry;
    let full_borrow = (a as u16) < (b as u16) + (carry as u16);
    (result, flags(result == 0, true, half_borrow, full_borrow))
}

pub fn and8(a: u8, b: u8) -> (u8, Flags) {
    let result = a & b;
    (result, flags(result == 0, false, true, false))
}

pub fn or8(a: u8, b: u8) -> (u8, Flags) {
    let result = a | b;
    (result, flags(result == 0, false, false, false))
}

pub fn xor8(a: u8, b: u8) -> (u8, Flags) {
    let result = a ^ b;
    (result, flags(result == 0, false, false, false))
}

/// INC r: carry is left untouched.
pub fn inc8(value: u8, current: Flags) -> (u8, Flags) {
    let result = value.wrapping_add(1);
    let half_carry = value & 0x0f == 0x0f;
    (result, flags(result == 0, false, half_carry, current.contains(Flags::CARRY)))
}

/// DEC r: carry is left untouched.
pub fn dec8(value: u8, current: Flags) -> (u8, Flags) {
    let result = value.wrapping_sub(1);
    let half_borrow = value & 0x0f == 0x00;
    (result, flags(result == 0, true, half_borrow, current.contains(Flags::CARRY)))
}

/// ADD HL, rr: carries out of bits 11 and 15, zero is left untouched.
pub fn add16(hl: u16, value: u16, current: Flags) -> (u16, Flags) {
    let result = hl.wrapping_add(value);
    let half_carry = (hl & 0x0fff) + (value & 0x0fff) > 0x0fff;
    let full_carry = (hl as u32) + (value as u32) > 0xffff;
    (result, flags(current.contains(Flags::ZERO), false, half_carry, full_carry))
}

/// ADD SP, e and LD HL, SP+e. The carries come from the unsigned low-byte addition.
pub fn add_signed(sp: u16, offset: i8) -> (u16, Flags) {
    let unsigned = offset as u8 as u16;
    let result = sp.wrapping_add(offset as i16 as u16);
    let half_carry = (sp & 0x000f) + (unsigned & 0x000f) > 0x000f;
    let full_carry = (sp & 0x00ff) + unsigned > 0x00ff;
    (result, flags(false, false, half_carry, full_carry))
}

/// Decimal adjust after a packed-BCD addition or subtraction.
pub fn daa(a: u8, current: Flags) -> (u8, Flags) {
    let subtract = current.contains(Flags::SUBTRACT);
    let mut carry = current.contains(Flags::CARRY);
    let mut correction = 0u8;

    if current.contains(Flags::HALF_CARRY) || (!subtract && a & 0x0f > 0x09) {
        correction |= 0x06;
    }
    if carry || (!subtract && a > 0x99) {
        correction |= 0x60;
        carry = true;
    }

    let result = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };

    (result, flags(result == 0, subtract, false, carry))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Srl,
    Swap,
}

/// Rotates, shifts and SWAP as executed in the CB space (Z reflects the result).
pub fn shift(op: Shift, value: u8, carry: bool) -> (u8, Flags) {
    let (result, carry_out) = match op {
        Shift::Rlc => (value.rotate_left(1), value & 0x80 != 0),
        Shift::Rrc => (value.rotate_right(1), value & 0x01 != 0),
        Shift::Rl => ((value << 1) | carry as u8, value & 0x80 != 0),
        Shift::Rr => ((value >> 1) | ((carry as u8) << 7), value & 0x01 != 0),
        Shift::Sla => (value << 1, value & 0x80 != 0),
        Shift::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        Shift::Srl => (value >> 1, value & 0x01 != 0),
        Shift::Swap => (value.rotate_left(4), false),
    };
    (result, flags(result == 0, false, false, carry_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_flags_hold_for_every_pair() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                for carry in [false, true] {
                    let (result, flags) = add8(a, b, carry);
                    let c = carry as u16;
                    assert_eq!(result as u16, (a as u16 + b as u16 + c) & 0xff);
                    assert_eq!(flags.contains(Flags::HALF_CARRY), (a & 0xf) as u16 + (b & 0xf) as u16 + c > 0xf);
                    assert_eq!(flags.contains(Flags::CARRY), a as u16 + b as u16 + c > 0xff);
                    assert_eq!(flags.contains(Flags::ZERO), result == 0);
                    assert!(!flags.contains(Flags::SUBTRACT));
                }
            }
        }
    }

    #[test]
    fn sub_flags_hold_for_every_pair() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                for carry in [false, true] {
                    let (result, flags) = sub8(a, b, carry);
                    let c = carry as i16;
                    assert_eq!(result, (a as i16 - b as i16 - c) as u8);
                    assert_eq!(flags.contains(Flags::HALF_CARRY), (a & 0xf) as i16 - ((b & 0xf) as i16) - c < 0);
                    assert_eq!(flags.contains(Flags::CARRY), (a as i16) - (b as i16) - c < 0);
                    assert_eq!(flags.contains(Flags::ZERO), result == 0);
                    assert!(flags.contains(Flags::SUBTRACT));
                }
            }
        }
    }

    fn to_bcd(value: u8) -> u8 {
        ((value / 10) << 4) | (value % 10)
    }

    #[test]
    fn daa_corrects_every_bcd_addition() {
        for x in 0..100u8 {
            for y in 0..100u8 {
                let (sum, flags) = add8(to_bcd(x), to_bcd(y), false);
                let (adjusted, flags) = daa(sum, flags);
                let expected = (x as u16 + y as u16) % 100;
                assert_eq!(adjusted, to_bcd(expected as u8), "{} + {}", x, y);
                assert_eq!(flags.contains(Flags::CARRY), x as u16 + y as u16 >= 100, "{} + {}", x, y);
                assert_eq!(flags.contains(Flags::ZERO), adjusted == 0);
                assert!(!flags.contains(Flags::HALF_CARRY));
            }
        }
    }

    #[test]
    fn daa_corrects_every_bcd_subtraction() {
        for x in 0..100u8 {
            for y in 0..100u8 {
                let (difference, flags) = sub8(to_bcd(x), to_bcd(y), false);
                let (adjusted, flags) = daa(difference, flags);
                let expected = (x as i16 - y as i16).rem_euclid(100);
                assert_eq!(adjusted, to_bcd(expected as u8), "{} - {}", x, y);
                assert_eq!(flags.contains(Flags::CARRY), x < y, "{} - {}", x, y);
                assert!(flags.contains(Flags::SUBTRACT));
            }
        }
    }

    #[test]
    fn inc_dec_keep_carry() {
        let (result, flags) = inc8(0x0f, Flags::CARRY);
        assert_eq!(result, 0x10);
        assert_eq!(flags, Flags::HALF_CARRY | Flags::CARRY);

        let (result, flags) = dec8(0x01, Flags::empty());
        assert_eq!(result, 0x00);
        assert_eq!(flags, Flags::ZERO | Flags::SUBTRACT);

        let (result, flags) = dec8(0x00, Flags::empty());
        assert_eq!(result, 0xff);
        assert_eq!(flags, Flags::SUBTRACT | Flags::HALF_CARRY);
    }

    #[test]
    fn add16_uses_bits_11_and_15() {
        let (result, flags) = add16(0x0fff, 0x0001, Flags::ZERO);
        assert_eq!(result, 0x1000);
        assert_eq!(flags, Flags::ZERO | Flags::HALF_CARRY);

        let (result, flags) = add16(0xf000, 0x1000, Flags::empty());
        assert_eq!(result, 0x0000);
        assert_eq!(flags, Flags::CARRY);
    }

    #[test]
    fn signed_add_takes_carries_from_low_byte() {
        let (result, flags) = add_signed(0xfff8, 0x08);
        assert_eq!(result, 0x0000);
        assert_eq!(flags, Flags::HALF_CARRY | Flags::CARRY);

        let (result, flags) = add_signed(0x0001, -1);
        assert_eq!(result, 0x0000);
        assert_eq!(flags, Flags::HALF_CARRY | Flags::CARRY);

        let (result, flags) = add_signed(0x0100, -1);
        assert_eq!(result, 0x00ff);
        assert_eq!(flags, Flags::empty());
    }

    #[test]
    fn shifts() {
        assert_eq!(shift(Shift::Rlc, 0x85, false), (0x0b, Flags::CARRY));
        assert_eq!(shift(Shift::Rl, 0x80, false), (0x00, Flags::ZERO | Flags::CARRY));
        assert_eq!(shift(Shift::Rr, 0x01, true), (0x80, Flags::CARRY));
        assert_eq!(shift(Shift::Sra, 0x81, false), (0xc0, Flags::CARRY));
        assert_eq!(shift(Shift::Srl, 0x81, false), (0x40, Flags::CARRY));
        assert_eq!(shift(Shift::Sla, 0x40, true), (0x80, Flags::empty()));
        assert_eq!(shift(Shift::Swap, 0xf1, true), (0x1f, Flags::empty()));
        assert_eq!(shift(Shift::Swap, 0x00, true), (0x00, Flags::ZERO));
    }
}
