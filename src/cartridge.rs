use crate::error::{CartridgeTooSmallSnafu, DmgError, IoSnafu, MissingRomSnafu, UnsupportedMapperSnafu, ZipSnafu};
use crate::memory::mapper::mbc1::Mbc1;
use crate::memory::mapper::mbc2::Mbc2;
use crate::memory::mapper::mbc3::Mbc3;
use crate::memory::mapper::rom::Rom;
use crate::memory::mapper::Mapper;
use log::{debug, info, warn};
use snafu::{ensure, ResultExt};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const MANUFACTURER_START: usize = 0x013f;
const CGB_FLAG: usize = 0x0143;
const NEW_LICENSEE_START: usize = 0x0144;
const SGB_FLAG: usize = 0x0146;
const CARTRIDGE_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;
const DESTINATION_CODE: usize = 0x014a;
const OLD_LICENSEE_CODE: usize = 0x014b;
const MASK_ROM_VERSION: usize = 0x014c;
const HEADER_CHECKSUM: usize = 0x014d;
const HEADER_END: usize = 0x0150;

// Set in the CGB flag when the title is cut short to make room for the manufacturer code.
const CGB_AWARE: u8 = 0x80;

/// The cartridge header at $0134-$014d.
#[derive(Debug, Clone, PartialEq)]
pub struct CartridgeHeader {
    pub title: String,
    pub manufacturer_code: String,
    pub cgb_flag: u8,
    pub new_licensee_code: String,
    pub sgb_flag: u8,
    pub cartridge_type: u8,
    pub rom_size: u8,
    pub ram_size: u8,
    pub destination_code: u8,
    pub old_licensee_code: u8,
    pub mask_rom_version: u8,
    pub header_checksum: u8,
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<CartridgeHeader, DmgError> {
        ensure!(rom.len() >= HEADER_END, CartridgeTooSmallSnafu { size: rom.len() });

        let cgb_flag = rom[CGB_FLAG];
        let title_end = if cgb_flag & CGB_AWARE != 0 {
            MANUFACTURER_START
        } else {
            TITLE_END + 1
        };

        Ok(CartridgeHeader {
            title: ascii(&rom[TITLE_START..title_end]),
            manufacturer_code: ascii(&rom[MANUFACTURER_START..CGB_FLAG]),
            cgb_flag,
            new_licensee_code: ascii(&rom[NEW_LICENSEE_START..SGB_FLAG]),
            sgb_flag: rom[SGB_FLAG],
            cartridge_type: rom[CARTRIDGE_TYPE],
            rom_size: rom[ROM_SIZE],
            ram_size: rom[RAM_SIZE],
            destination_code: rom[DESTINATION_CODE],
            old_licensee_code: rom[OLD_LICENSEE_CODE],
            mask_rom_version: rom[MASK_ROM_VERSION],
            header_checksum: rom[HEADER_CHECKSUM],
        })
    }

    pub fn rom_banks(&self) -> usize {
        rom_banks(self.rom_size)
    }

    pub fn ram_banks(&self) -> usize {
        ram_banks(self.ram_size)
    }

    pub fn has_battery(&self) -> bool {
        matches!(self.cartridge_type, 0x03 | 0x06 | 0x0f | 0x10 | 0x13)
    }

    pub fn has_rtc(&self) -> bool {
        matches!(self.cartridge_type, 0x0f | 0x10)
    }

    /// Checks the header checksum the boot image verifies before handing over.
    pub fn verify_checksum(&self, rom: &[u8]) -> bool {
        compute_checksum(rom) == Some(self.header_checksum)
    }
}

fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// x = x - byte - 1 over $0134-$014c.
pub fn compute_checksum(rom: &[u8]) -> Option<u8> {
    let bytes = rom.get(TITLE_START..HEADER_CHECKSUM)?;
    Some(bytes.iter().fold(0u8, |x, b| x.wrapping_sub(*b).wrapping_sub(1)))
}

/// ROM banks declared by the size code at $0148.
pub fn rom_banks(code: u8) -> usize {
    match code {
        0x00..=0x08 => 2 << code,
        0x52 => 72,
        0x53 => 80,
        0x54 => 96,
        _ => {
            warn!("Cartridge: Unknown ROM size code {:02x}, assuming 2 banks", code);
            2
        }
    }
}

/// 8 KiB RAM banks declared by the size code at $0149.
pub fn ram_banks(code: u8) -> usize {
    match code {
        0x00 => 0,
        0x01 | 0x02 => 1,
        0x03 => 4,
        0x04 => 16,
        0x05 => 8,
        _ => {
            warn!("Cartridge: Unknown RAM size code {:02x}, assuming no RAM", code);
            0
        }
    }
}

/// Builds the bank controller the header asks for.
pub fn create_mapper(header: &CartridgeHeader, rom: Vec<u8>) -> Result<Box<dyn Mapper>, DmgError> {
    let ram_banks = header.ram_banks();
    let battery = header.has_battery();

    let mapper: Box<dyn Mapper> = match header.cartridge_type {
        0x00 => Box::new(Rom::new(rom)),
        0x01..=0x03 => Box::new(Mbc1::new(rom, ram_banks, battery)),
        0x05 | 0x06 => Box::new(Mbc2::new(rom, battery)),
        0x0f..=0x13 => Box::new(Mbc3::new(rom, ram_banks, battery, header.has_rtc())),
        cartridge_type => return UnsupportedMapperSnafu { cartridge_type }.fail(),
    };

    debug!(
        "Cartridge: {} with {} ROM banks, {} RAM banks, battery: {}",
        mapper.name(),
        header.rom_banks(),
        ram_banks,
        battery
    );
    Ok(mapper)
}

/// Reads a cartridge image from disk. `.zip` archives are searched for the first `.gb`/`.gbc` entry.
pub fn load_cartridge(path: &Path) -> Result<Vec<u8>, DmgError> {
    let display = path.display().to_string();
    let is_zip = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);

    if !is_zip {
        return std::fs::read(path).context(IoSnafu { path: display });
    }

    let file = File::open(path).context(IoSnafu { path: display.clone() })?;
    let mut archive = zip::ZipArchive::new(file).context(ZipSnafu { path: display.clone() })?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context(ZipSnafu { path: display.clone() })?;
        let name = entry.name().to_lowercase();
        if !(name.ends_with(".gb") || name.ends_with(".gbc")) {
            continue;
        }

        let mut rom = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut rom).context(IoSnafu { path: display.clone() })?;
        info!("Cartridge: Extracted {} from {}", entry.name(), display);
        return Ok(rom);
    }

    MissingRomSnafu { path: display }.fail()
}
