use dyn_clone::DynClone;

pub mod mbc1;
pub mod mbc2;
pub mod mbc3;
pub mod rom;

pub trait Mapper: DynClone + Send {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    fn dump_ram(&self) -> Vec<u8>;
    fn load_ram(&mut self, ram: Vec<u8>);
    fn current_rom_bank(&self) -> u16;
    fn current_ram_bank(&self) -> u8;
    fn name(&self) -> String;

    fn has_battery(&self) -> bool {
        false
    }

    /// Advances cartridge-side clocks (RTC) by the given number of cycles.
    fn tick(&mut self, _cycles: usize) {}
}

dyn_clone::clone_trait_object!(Mapper);

/// Number of `bank_size` banks backing `len` bytes, never less than one.
pub(crate) fn bank_count(len: usize, bank_size: usize) -> usize {
    (len / bank_size).max(1)
}

/// Restores a RAM dump into `ram`, truncating or zero-extending mismatched sizes.
pub(crate) fn restore_ram(ram: &mut [u8], dump: &[u8]) {
    let len = ram.len().min(dump.len());
    ram[..len].copy_from_slice(&dump[..len]);
    ram[len..].fill(0);
}
