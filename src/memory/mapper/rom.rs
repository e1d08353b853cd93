use crate::memory::mapper::Mapper;
use log::trace;

#[derive(Clone)]
pub struct Rom {
    memory: Vec<u8>,
}

impl Rom {
    pub fn new(memory: Vec<u8>) -> Rom {
        Rom { memory }
    }
}

impl Mapper for Rom {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7fff => self.memory.get(addr as usize).copied().unwrap_or(0xff),
            _ => 0xff,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        // We simply only have a ROM. Writing to it does nothing.
        trace!("ROM: Ignored write of {:02x} to {:04x}", data, addr);
    }

    fn dump_ram(&self) -> Vec<u8> {
        Vec::new()
    }

    fn load_ram(&mut self, _ram: Vec<u8>) {}

    #[inline]
    fn current_rom_bank(&self) -> u16 {
        1
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        0
    }

    #[inline]
    fn name(&self) -> String {
        String::from("ROM")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_writes_and_has_no_ram() {
        let mut rom = Rom::new(vec![0x42; 0x8000]);
        rom.write(0x2000, 0x05);
        rom.write(0xa000, 0x12);

        assert_eq!(rom.read(0x4000), 0x42);
        assert_eq!(rom.read(0xa000), 0xff);
        assert!(rom.dump_ram().is_empty());
    }

    #[test]
    fn short_image_reads_open_bus() {
        let rom = Rom::new(vec![0x11; 0x150]);
        assert_eq!(rom.read(0x014f), 0x11);
        assert_eq!(rom.read(0x7fff), 0xff);
    }
}
