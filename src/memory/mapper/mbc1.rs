use crate::memory::mapper::{bank_count, restore_ram, Mapper};
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, RAM_BANK_SIZE, ROM_BANK_SIZE};
use log::{debug, warn};

const RAM_ENABLE_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x1fff;
const ROM_BANK_RANGE: std::ops::RangeInclusive<u16> = 0x2000..=0x3fff;
const SECONDARY_BANK_REGISTER: std::ops::RangeInclusive<u16> = 0x4000..=0x5fff;
const BANKING_MODE_REGISTER: std::ops::RangeInclusive<u16> = 0x6000..=0x7fff;
const ROM_SLOT_0_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x3fff;
const ROM_SLOT_1_RANGE: std::ops::RangeInclusive<u16> = 0x4000..=0x7fff;

#[derive(Clone)]
pub struct Mbc1 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_banks: usize,
    ram_banks: usize,
    rom_bank: u8,
    secondary_bank: u8,
    ram_enabled: bool,
    banking_mode: bool,
    battery: bool,
}

impl Mbc1 {
    pub fn new(memory: Vec<u8>, ram_banks: usize, battery: bool) -> Mbc1 {
        Mbc1 {
            rom_banks: bank_count(memory.len(), ROM_BANK_SIZE),
            rom: memory,
            ram: vec![0; ram_banks * RAM_BANK_SIZE],
            ram_banks,
            rom_bank: 1,
            secondary_bank: 0,
            ram_enabled: false,
            banking_mode: false,
            battery,
        }
    }

    /// Bank mapped at 0x0000-0x3fff. Only mode 1 lets the secondary register reach it.
    fn low_rom_bank(&self) -> usize {
        if self.banking_mode {
            ((self.secondary_bank as usize) << 5) % self.rom_banks
        } else {
            0
        }
    }

    fn high_rom_bank(&self) -> usize {
        (((self.secondary_bank as usize) << 5) | self.rom_bank as usize) % self.rom_banks
    }

    fn ram_bank(&self) -> usize {
        if self.banking_mode && self.ram_banks > 0 {
            self.secondary_bank as usize % self.ram_banks
        } else {
            0
        }
    }

    fn ram_address(&self, addr: u16) -> Option<usize> {
        if !self.ram_enabled || self.ram.is_empty() {
            return None;
        }

        Some((addr - EXTERNAL_RAM_START) as usize + self.ram_bank() * RAM_BANK_SIZE)
    }

    fn rom_byte(&self, bank: usize, addr: u16) -> u8 {
        let offset = bank * ROM_BANK_SIZE + (addr as usize % ROM_BANK_SIZE);
        self.rom.get(offset).copied().unwrap_or(0xff)
    }
}

impl Mapper for Mbc1 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            addr if ROM_SLOT_0_RANGE.contains(&addr) => self.rom_byte(self.low_rom_bank(), addr),
            addr if ROM_SLOT_1_RANGE.contains(&addr) => self.rom_byte(self.high_rom_bank(), addr),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => match self.ram_address(addr) {
                Some(addr) => self.ram[addr],
                None => 0xff,
            },
            _ => 0xff,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            addr if RAM_ENABLE_RANGE.contains(&addr) => {
                self.ram_enabled = (data & 0x0f) == 0x0a;
                debug!("MBC1: RAM enabled: {}", self.ram_enabled);
            }
            addr if ROM_BANK_RANGE.contains(&addr) => {
                // This 5-bit register selects the ROM bank number for the 4000–7FFF region.
                // Higher bits are discarded, and bank 0 is remapped to bank 1.
                self.rom_bank = data & 0b0001_1111;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC1: Switched to ROM bank {}", self.high_rom_bank());
            }
            addr if SECONDARY_BANK_REGISTER.contains(&addr) => {
                // Either the RAM bank or bits 5-6 of the ROM bank, depending on the banking mode.
                self.secondary_bank = data & 0b11;
                debug!(
                    "MBC1: Secondary bank register set to {} (ROM bank {}, RAM bank {})",
                    self.secondary_bank,
                    self.high_rom_bank(),
                    self.ram_bank()
                );
            }
            addr if BANKING_MODE_REGISTER.contains(&addr) => {
                self.banking_mode = data & 0b0000_0001 == 1;
                debug!("MBC1: Switched to banking mode: {}", self.banking_mode);
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => match self.ram_address(addr) {
                Some(addr) => self.ram[addr] = data,
                None => warn!("MBC1: Dropped write to {:04x} while RAM is unavailable", addr),
            },
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
        self.ram_bank() as u8
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC1")
    }

    fn has_battery(&self) -> bool {
        self.battery
    }
}
