use crate::lr35902::sm83::Register;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const ZERO       = 0b1000_0000;
        const SUBTRACT   = 0b0100_0000;
        const HALF_CARRY = 0b0010_0000;
        const CARRY      = 0b0001_0000;
    }
}

#[derive(Clone)]
pub struct Registers {
    pub a: u8,
    pub f: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Default for Registers {
    fn default() -> Registers {
        Registers {
            a: 0,
            f: Flags::empty(),
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
        }
    }
}

impl Registers {
    /// State the DMG boot image hands over to the cartridge.
    pub fn post_boot() -> Registers {
        Registers {
            a: 0x01,
            f: Flags::ZERO | Flags::HALF_CARRY | Flags::CARRY,
            b: 0x00,
            c: 0x13,
            d: 0x00,
            e: 0xd8,
            h: 0x01,
            l: 0x4d,
            sp: 0xfffe,
            pc: 0x0100,
        }
    }

    /// Reads an 8-bit register. 16-bit registers yield their low byte.
    pub fn read(&self, register: &Register) -> u8 {
        match register {
            Register::A => self.a,
            Register::F => self.f.bits(),
            Register::B => self.b,
            Register::C => self.c,
            Register::D => self.d,
            Register::E => self.e,
            Register::H => self.h,
            Register::L => self.l,
            _ => self.read16(register) as u8,
        }
    }

    pub fn write(&mut self, register: &Register, data: u8) {
        match register {
            Register::A => self.a = data,
            Register::F => self.f = Flags::from_bits_truncate(data),
            Register::B => self.b = data,
            Register::C => self.c = data,
            Register::D => self.d = data,
            Register::E => self.e = data,
            Register::H => self.h = data,
            Register::L => self.l = data,
            _ => self.write16(register, data as u16),
        }
    }

    pub fn read16(&self, register: &Register) -> u16 {
        match register {
            Register::AF => u16::from_be_bytes([self.a, self.f.bits()]),
            Register::BC => u16::from_be_bytes([self.b, self.c]),
            Register::DE => u16::from_be_bytes([self.d, self.e]),
            Register::HL => u16::from_be_bytes([self.h, self.l]),
            Register::SP => self.sp,
            Register::PC => self.pc,
            _ => self.read(register) as u16,
        }
    }

    pub fn write16(&mut self, register: &Register, value: u16) {
        let [high, low] = value.to_be_bytes();
        match register {
            Register::AF => {
                self.a = high;
                self.f = Flags::from_bits_truncate(low);
            }
            Register::BC => {
                self.b = high;
                self.c = low;
            }
            Register::DE => {
                self.d = high;
                self.e = low;
            }
            Register::HL => {
                self.h = high;
                self.l = low;
            }
            Register::SP => self.sp = value,
            Register::PC => self.pc = value,
            _ => self.write(register, value as u8),
        }
    }

    #[inline]
    pub fn flag(&self, flag: Flags) -> bool {
        self.f.contains(flag)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flags, value: bool) {
        self.f.set(flag, value);
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "A: ${:02x}  F: ${:02x}  B: ${:02x}  C: ${:02x}  D: ${:02x}  E: ${:02x}  H: ${:02x}  L: ${:02x}  SP: ${:04x}  PC: ${:04x}",
            self.a,
            self.f.bits(),
            self.b,
            self.c,
            self.d,
            self.e,
            self.h,
            self.l,
            self.sp,
            self.pc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_store_high_byte_first() {
        let mut registers = Registers::default();
        registers.write16(&Register::BC, 0x1234);
        assert_eq!(registers.b, 0x12);
        assert_eq!(registers.c, 0x34);

        registers.write(&Register::H, 0xab);
        registers.write(&Register::L, 0xcd);
        assert_eq!(registers.read16(&Register::HL), 0xabcd);
    }

    #[test]
    fn flag_register_drops_low_nibble() {
        let mut registers = Registers::default();
        registers.write(&Register::F, 0xff);
        assert_eq!(registers.read(&Register::F), 0xf0);

        registers.write16(&Register::AF, 0x12ff);
        assert_eq!(registers.read16(&Register::AF), 0x12f0);
    }

    #[test]
    fn post_boot_values() {
        let registers = Registers::post_boot();
        assert_eq!(registers.read16(&Register::AF), 0x01b0);
        assert_eq!(registers.read16(&Register::BC), 0x0013);
        assert_eq!(registers.read16(&Register::DE), 0x00d8);
        assert_eq!(registers.read16(&Register::HL), 0x014d);
        assert_eq!(registers.sp, 0xfffe);
        assert_eq!(registers.pc, 0x0100);
    }
}
