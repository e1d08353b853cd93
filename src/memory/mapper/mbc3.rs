use crate::lr35902::T_CYCLES_PER_SECOND;
use crate::memory::mapper::{bank_count, restore_ram, Mapper};
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, RAM_BANK_SIZE, ROM_BANK_SIZE};
use log::{debug, warn};

const RTC_SECONDS: u8 = 0x08;
const RTC_MINUTES: u8 = 0x09;
const RTC_HOURS: u8 = 0x0a;
const RTC_DAY_LOW: u8 = 0x0b;
const RTC_DAY_HIGH: u8 = 0x0c;

const DAY_HIGH_BIT: u8 = 0b0000_0001;
const HALT_BIT: u8 = 0b0100_0000;
const DAY_CARRY_BIT: u8 = 0b1000_0000;

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct RtcRegisters {
    seconds: u8,
    minutes: u8,
    hours: u8,
    days: u16,
    halted: bool,
    carry: bool,
}

impl RtcRegisters {
    fn read(&self, register: u8) -> u8 {
        match register {
            RTC_SECONDS => self.seconds & 0x3f,
            RTC_MINUTES => self.minutes & 0x3f,
            RTC_HOURS => self.hours & 0x1f,
            RTC_DAY_LOW => self.days as u8,
            RTC_DAY_HIGH => {
                let mut value = ((self.days >> 8) as u8) & DAY_HIGH_BIT;
                if self.halted {
                    value |= HALT_BIT;
                }
                if self.carry {
                    value |= DAY_CARRY_BIT;
                }
                value
            }
            _ => 0xff,
        }
    }
}

/// The MBC3 real time clock, driven by emulated cycles rather than wall time.
#[derive(Clone, Default)]
struct Rtc {
    live: RtcRegisters,
    latched: RtcRegisters,
    subsecond_cycles: usize,
}

impl Rtc {
    fn tick(&mut self, cycles: usize) {
        if self.live.halted {
            return;
        }

        self.subsecond_cycles += cycles;
        while self.subsecond_cycles >= T_CYCLES_PER_SECOND {
            self.subsecond_cycles -= T_CYCLES_PER_SECOND;
            self.advance_second();
        }
    }

    fn advance_second(&mut self) {
        // Out of range values keep counting until their field wraps, like the real chip.
        self.live.seconds = (self.live.seconds + 1) & 0x3f;
        if self.live.seconds != 60 {
            return;
        }
        self.live.seconds = 0;

        self.live.minutes = (self.live.minutes + 1) & 0x3f;
        if self.live.minutes != 60 {
            return;
        }
        self.live.minutes = 0;

        self.live.hours = (self.live.hours + 1) & 0x1f;
        if self.live.hours != 24 {
            return;
        }
        self.live.hours = 0;

        if self.live.days >= 0x1ff {
            self.live.days = 0;
            self.live.carry = true;
        } else {
            self.live.days += 1;
        }
    }

    fn latch(&mut self) {
        self.latched = self.live;
    }

    fn write(&mut self, register: u8, data: u8) {
        match register {
            RTC_SECONDS => {
                self.live.seconds = data & 0x3f;
                self.subsecond_cycles = 0;
            }
            RTC_MINUTES => self.live.minutes = data & 0x3f,
            RTC_HOURS => self.live.hours = data & 0x1f,
            RTC_DAY_LOW => self.live.days = (self.live.days & 0x100) | data as u16,
            RTC_DAY_HIGH => {
                self.live.days = (self.live.days & 0xff) | (((data & DAY_HIGH_BIT) as u16) << 8);
                self.live.halted = data & HALT_BIT != 0;
                self.live.carry = data & DAY_CARRY_BIT != 0;
            }
            _ => {}
        }
    }
}

#[derive(Clone)]
pub struct Mbc3 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_banks: usize,
    ram_banks: usize,
    rom_bank: u8,
    bank_select: u8,
    ram_enabled: bool,
    latch_armed: bool,
    rtc: Option<Rtc>,
    battery: bool,
}

impl Mbc3 {
    pub fn new(memory: Vec<u8>, ram_banks: usize, battery: bool, has_rtc: bool) -> Mbc3 {
        Mbc3 {
            rom_banks: bank_count(memory.len(), ROM_BANK_SIZE),
            rom: memory,
            ram: vec![0; ram_banks * RAM_BANK_SIZE],
            ram_banks,
            rom_bank: 1,
            bank_select: 0,
            ram_enabled: false,
            latch_armed: false,
            rtc: if has_rtc { Some(Rtc::default()) } else { None },
            battery,
        }
    }

    fn rom_byte(&self, bank: usize, addr: u16) -> u8 {
        let offset = bank * ROM_BANK_SIZE + (addr as usize % ROM_BANK_SIZE);
        self.rom.get(offset).copied().unwrap_or(0xff)
    }

    fn high_rom_bank(&self) -> usize {
        self.rom_bank as usize % self.rom_banks
    }

    fn ram_address(&self, addr: u16) -> Option<usize> {
        if self.ram.is_empty() || self.bank_select > 0x03 {
            return None;
        }

        let bank = self.bank_select as usize % self.ram_banks;
        Some((addr - EXTERNAL_RAM_START) as usize + bank * RAM_BANK_SIZE)
    }

    fn rtc_selected(&self) -> bool {
        (RTC_SECONDS..=RTC_DAY_HIGH).contains(&self.bank_select)
    }
}

impl Mapper for Mbc3 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3fff => self.rom_byte(0, addr),
            0x4000..=0x7fff => self.rom_byte(self.high_rom_bank(), addr),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                if self.rtc_selected() {
                    return match &self.rtc {
                        Some(rtc) => rtc.latched.read(self.bank_select),
                        None => 0xff,
                    };
                }

                match self.ram_address(addr) {
                    Some(addr) => self.ram[addr],
                    None => 0xff,
                }
            }
            _ => 0xff,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => {
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC3: RAM/RTC enabled: {}", self.ram_enabled);
            }
            0x2000..=0x3fff => {
                self.rom_bank = data & 0b0111_1111;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC3: Switched to ROM bank {}", self.high_rom_bank());
            }
            0x4000..=0x5fff => {
                self.bank_select = data & 0x0f;
                debug!("MBC3: Selected RAM bank/RTC register {:02x}", self.bank_select);
            }
            0x6000..=0x7fff => {
                // Writing 0x00 followed by 0x01 latches the clock.
                if self.latch_armed && data == 0x01 {
                    if let Some(rtc) = self.rtc.as_mut() {
                        rtc.latch();
                        debug!("MBC3: Latched RTC {:?}", rtc.latched);
                    }
                }
                self.latch_armed = data == 0x00;
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                if self.rtc_selected() {
                    let register = self.bank_select;
                    if let Some(rtc) = self.rtc.as_mut() {
                        rtc.write(register, data);
                    }
                    return;
                }

                match self.ram_address(addr) {
                    Some(addr) => self.ram[addr] = data,
                    None => warn!("MBC3: Dropped write to unmapped bank {:02x}", self.bank_select),
                }
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                warn!("MBC3: Dropped write to {:04x} while RAM is disabled", addr);
            }
            _ => {}
        }
    }

    fn dump_ram(&self) -> Vec<u8> {
        self.ram.clone()
    }

    fn load_ram(&mut self, ram: Vec<u8>) {
        restore_ram(&mut self.ram, &ram);
    }

    #[inline]
    fn current_rom_bank(&self) -> u16 {
        self.high_rom_bank() as u16
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        self.bank_select
    }

    #[inline]
    fn name(&self) -> String {
        match self.rtc {
            Some(_) => String::from("MBC3+RTC"),
            None => String::from("MBC3"),
        }
    }

    fn has_battery(&self) -> bool {
        self.battery
    }

    fn tick(&mut self, cycles: usize) {
        if let Some(rtc) = self.rtc.as_mut() {
            rtc.tick(cycles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mapper::testing::banked_rom;

    fn enabled(mbc: &mut Mbc3) {
        mbc.write(0x0000, 0x0a);
    }

    fn latch(mbc: &mut Mbc3) {
        mbc.write(0x6000, 0x00);
        mbc.write(0x6000, 0x01);
    }

    #[test]
    fn seven_bit_rom_bank_with_zero_remap() {
        let mut mbc = Mbc3::new(banked_rom(128), 0, false, false);
        mbc.write(0x2000, 0xff);
        assert_eq!(mbc.read(0x4000), 0x7f);
        mbc.write(0x2000, 0x80);
        assert_eq!(mbc.read(0x4000), 0x01);
    }

    #[test]
    fn out_of_range_bank_wraps() {
        let mut mbc = Mbc3::new(banked_rom(8), 0, false, false);
        mbc.write(0x2000, 0x0b);
        assert_eq!(mbc.read(0x4000), 3);
    }

    #[test]
    fn ram_banks_are_independent() {
        let mut mbc = Mbc3::new(banked_rom(4), 4, true, false);
        enabled(&mut mbc);
        for bank in 0..4u8 {
            mbc.write(0x4000, bank);
            mbc.write(0xb000, 0xa0 | bank);
        }
        mbc.write(0x4000, 0x01);
        assert_eq!(mbc.read(0xb000), 0xa1);
        assert_eq!(mbc.dump_ram()[3 * RAM_BANK_SIZE + 0x1000], 0xa3);
    }

    #[test]
    fn rtc_latches_snapshot() {
        let mut mbc = Mbc3::new(banked_rom(4), 1, true, true);
        enabled(&mut mbc);

        mbc.tick(T_CYCLES_PER_SECOND * 61);
        latch(&mut mbc);
        mbc.tick(T_CYCLES_PER_SECOND * 5);

        mbc.write(0x4000, RTC_SECONDS);
        assert_eq!(mbc.read(0xa000), 1);
        mbc.write(0x4000, RTC_MINUTES);
        assert_eq!(mbc.read(0xa000), 1);

        latch(&mut mbc);
        mbc.write(0x4000, RTC_SECONDS);
        assert_eq!(mbc.read(0xa000), 6);
    }

    #[test]
    fn rtc_halt_stops_the_clock() {
        let mut mbc = Mbc3::new(banked_rom(4), 1, true, true);
        enabled(&mut mbc);
        mbc.write(0x4000, RTC_DAY_HIGH);
        mbc.write(0xa000, HALT_BIT);
        mbc.tick(T_CYCLES_PER_SECOND * 10);
        latch(&mut mbc);

        mbc.write(0x4000, RTC_SECONDS);
        assert_eq!(mbc.read(0xa000), 0);
        mbc.write(0x4000, RTC_DAY_HIGH);
        assert_eq!(mbc.read(0xa000), HALT_BIT);
    }

    #[test]
    fn rtc_day_overflow_sets_carry() {
        let mut mbc = Mbc3::new(banked_rom(4), 1, true, true);
        enabled(&mut mbc);
        mbc.write(0x4000, RTC_DAY_LOW);
        mbc.write(0xa000, 0xff);
        mbc.write(0x4000, RTC_DAY_HIGH);
        mbc.write(0xa000, DAY_HIGH_BIT);
        mbc.write(0x4000, RTC_HOURS);
        mbc.write(0xa000, 23);
        mbc.write(0x4000, RTC_MINUTES);
        mbc.write(0xa000, 59);
        mbc.write(0x4000, RTC_SECONDS);
        mbc.write(0xa000, 59);

        mbc.tick(T_CYCLES_PER_SECOND);
        latch(&mut mbc);

        mbc.write(0x4000, RTC_DAY_HIGH);
        assert_eq!(mbc.read(0xa000), DAY_CARRY_BIT);
        mbc.write(0x4000, RTC_DAY_LOW);
        assert_eq!(mbc.read(0xa000), 0);
    }

    #[test]
    fn rtc_access_leaves_ram_untouched() {
        let mut mbc = Mbc3::new(banked_rom(4), 1, true, false);
        enabled(&mut mbc);
        mbc.write(0xa000, 0x42);

        mbc.write(0x4000, RTC_SECONDS);
        mbc.write(0xa000, 0x17);
        latch(&mut mbc);
        assert_eq!(mbc.read(0xa000), 0xff);

        mbc.write(0x4000, 0x00);
        assert_eq!(mbc.read(0xa000), 0x42);
        assert_eq!(mbc.read(0x0000), 0x00);
    }
}
