use crate::memory::mapper::{bank_count, restore_ram, Mapper};
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, ROM_BANK_SIZE};
use log::{debug, warn};

// 512 half-bytes of RAM live inside the controller itself.
const RAM_SIZE: usize = 0x200;

#[derive(Clone)]
pub struct Mbc2 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_banks: usize,
    rom_bank: u8,
    ram_enabled: bool,
    battery: bool,
}

impl Mbc2 {
    pub fn new(memory: Vec<u8>, battery: bool) -> Mbc2 {
        Mbc2 {
            rom_banks: bank_count(memory.len(), ROM_BANK_SIZE),
            rom: memory,
            ram: vec![0; RAM_SIZE],
            rom_bank: 1,
            ram_enabled: false,
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
}

impl Mapper for Mbc2 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3fff => self.rom_byte(0, addr),
            0x4000..=0x7fff => self.rom_byte(self.high_rom_bank(), addr),
            // Only the lower nibble is wired up, and the 512 bytes echo across the whole range.
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                self.ram[(addr as usize) & (RAM_SIZE - 1)] | 0xf0
            }
            _ => 0xff,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            // Bit 8 of the address decides which register is written.
            0x0000..=0x3fff if addr & 0x0100 == 0 => {
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC2: RAM enabled: {}", self.ram_enabled);
            }
            0x0000..=0x3fff => {
                self.rom_bank = data & 0x0f;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC2: Switched to ROM bank {}", self.high_rom_bank());
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram_enabled => {
                self.ram[(addr as usize) & (RAM_SIZE - 1)] = data & 0x0f;
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                warn!("MBC2: Dropped write to {:04x} while RAM is disabled", addr);
            }
            _ => {}
        }
    }

    fn dump_ram(&self) -> Vec<u8> {
        self.ram.clone()
    }

    fn load_ram(&mut self, ram: Vec<u8>) {
        restore_ram(&mut self.ram, &ram);
        self.ram.iter_mut().for_each(|nibble| *nibble &= 0x0f);
    }

    #[inline]
    fn current_rom_bank(&self) -> u16 {
        self.high_rom_bank() as u16
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        0
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC2")
    }

    fn has_battery(&self) -> bool {
        self.battery
    }
}
