use crate::debugger::{WatchHit, Watchpoints};
use crate::error::{DmgError, ObserverAlreadyRegisteredSnafu, UnobservableAddressSnafu};
use crate::joypad::{Button, Joypad};
use crate::lr35902::irq;
use crate::lr35902::timer::{Timer, POST_BOOT_COUNTER};
use crate::memory::dma::Dma;
use crate::memory::mapper::Mapper;
use crate::memory::registers::InterruptFlags;
use crate::memory::*;
use log::{debug, info, trace};
use snafu::ensure;

// The last instruction of the boot image unmaps it. Execution continues normally,
// thus entering the cartridge entrypoint at $100
const BOOTROM_END: u16 = 0xff;
pub const BOOTROM_SIZE: usize = BOOTROM_END as usize + 1;

const BG_PALETTE_REGISTER: u16 = 0xff47;
const OBJ_PALETTE_0_REGISTER: u16 = 0xff48;
const OBJ_PALETTE_1_REGISTER: u16 = 0xff49;

/// Runs before a store into the I/O page. Returns the value to store, or `None` to drop the write.
pub type WriteObserver = fn(&mut Mmu, u16, u8) -> Option<u8>;

#[derive(Clone)]
pub struct Mmu {
    cartridge: Box<dyn Mapper>,
    memory: Vec<u8>,
    bootrom: Vec<u8>,
    bootrom_mapped: bool,
    observers: [Option<WriteObserver>; 0x100],
    dma: Dma,
    pub(crate) timer: Timer,
    joypad: Joypad,
    watchpoints: Watchpoints,
}

impl Mmu {
    pub fn new(bootrom: Vec<u8>, cartridge: Box<dyn Mapper>) -> Mmu {
        let bootrom_mapped = !bootrom.is_empty();
        let mut mmu = Mmu {
            cartridge,
            memory: vec![0; 0x10000],
            bootrom,
            bootrom_mapped,
            observers: [None; 0x100],
            dma: Dma::default(),
            timer: Timer::new(),
            joypad: Joypad::new(),
            watchpoints: Watchpoints::default(),
        };

        mmu.memory[JOYPAD_REGISTER as usize] = 0xcf;
        mmu.memory[TAC_REGISTER as usize] = 0xf8;
        mmu.memory[INTERRUPT_FLAGS_REGISTER as usize] = 0xe0;
        mmu.memory[BOOTROM_MAPPER_REGISTER as usize] = if bootrom_mapped { 0x00 } else { 0xff };

        mmu.observers[Mmu::slot(JOYPAD_REGISTER)] = Some(Mmu::on_joypad_write);
        mmu.observers[Mmu::slot(DIV_REGISTER)] = Some(Timer::on_div_write);
        mmu.observers[Mmu::slot(TIMA_REGISTER)] = Some(Timer::on_tima_write);
        mmu.observers[Mmu::slot(TMA_REGISTER)] = Some(Timer::on_tma_write);
        mmu.observers[Mmu::slot(TAC_REGISTER)] = Some(Timer::on_tac_write);
        mmu.observers[Mmu::slot(INTERRUPT_FLAGS_REGISTER)] = Some(irq::on_interrupt_flags_write);
        mmu.observers[Mmu::slot(OAM_DMA_REGISTER)] = Some(Mmu::on_dma_write);
        mmu.observers[Mmu::slot(BOOTROM_MAPPER_REGISTER)] = Some(Mmu::on_bootrom_mapper_write);

        mmu
    }

    #[inline]
    fn slot(addr: u16) -> usize {
        (addr - IO_START) as usize
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        let value = self.read_unchecked(addr);
        self.watchpoints.note_read(addr, value);
        value
    }

    /// Reads without reporting to the watch list. Used for instruction fetches and DMA.
    pub fn read_unchecked(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=BOOTROM_END if self.bootrom_mapped => {
                self.bootrom.get(addr as usize).copied().unwrap_or(0xff)
            }
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.read(addr),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read(addr),
            ECHO_RAM_START..=ECHO_RAM_END => self.memory[(addr - 0x2000) as usize],
            UNUSABLE_START..=UNUSABLE_END => 0xff,
            JOYPAD_REGISTER => self.joypad.as_u8(self.memory[addr as usize]),
            _ => self.memory[addr as usize],
        }
    }

    #[inline]
    pub fn read_as<T>(&self, addr: u16) -> T
    where
        T: From<u8>,
    {
        T::from(self.read(addr))
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.watchpoints.note_write(addr, data);

        let data = match self.observer(addr) {
            Some(observer) => match observer(self, addr, data) {
                Some(data) => data,
                None => {
                    trace!("MMU: Observer dropped write of {:02x} to {:04x}", data, addr);
                    return;
                }
            },
            None => data,
        };

        self.write_unchecked(addr, data);
    }

    /// Stores without running the write observer for `addr`.
    pub fn write_unchecked(&mut self, addr: u16, data: u8) {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.write(addr, data),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write(addr, data),
            ECHO_RAM_START..=ECHO_RAM_END => self.memory[(addr - 0x2000) as usize] = data,
            UNUSABLE_START..=UNUSABLE_END => {}
            _ => self.memory[addr as usize] = data,
        }
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, addr: u16, data: u16) {
        let lo = data as u8;
        let hi = (data >> 8) as u8;
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    #[inline]
    fn observer(&self, addr: u16) -> Option<WriteObserver> {
        if addr >= IO_START {
            self.observers[Mmu::slot(addr)]
        } else {
            None
        }
    }

    pub fn register_observer(&mut self, address: u16, observer: WriteObserver) -> Result<(), DmgError> {
        ensure!(address >= IO_START, UnobservableAddressSnafu { address });

        let slot = &mut self.observers[Mmu::slot(address)];
        ensure!(slot.is_none(), ObserverAlreadyRegisteredSnafu { address });

        *slot = Some(observer);
        debug!("MMU: Registered write observer for {:04x}", address);
        Ok(())
    }

    /// Advances DMA and the cartridge clock.
    pub fn tick(&mut self, cycles: usize) {
        for _ in 0..cycles {
            if let Some((source, destination)) = self.dma.step() {
                self.memory[destination as usize] = self.read_unchecked(source);
            }
        }

        self.cartridge.tick(cycles);
    }

    pub fn tick_timer(&mut self, cycles: usize) {
        self.timer.tick(&mut self.memory, cycles);
    }

    /// Splits the MMU into the timer and the raw memory so timer logic can update registers
    /// without going back through the observers.
    pub(crate) fn timer_parts(&mut self) -> (&mut Timer, &mut [u8]) {
        (&mut self.timer, &mut self.memory[..])
    }

    #[inline]
    pub fn request_interrupt(&mut self, interrupt: InterruptFlags) {
        self.memory[INTERRUPT_FLAGS_REGISTER as usize] |= interrupt.bits();
    }

    /// Updates the button matrix and returns whether the button was newly pressed.
    pub fn update_button(&mut self, button: Button, pressed: bool) -> bool {
        self.joypad.update_button(button, pressed)
    }

    pub fn set_watchpoints(&mut self, watchpoints: Watchpoints) {
        self.watchpoints = watchpoints;
    }

    pub fn take_watch_hit(&self) -> Option<WatchHit> {
        self.watchpoints.take_hit()
    }

    #[inline]
    pub fn is_bootrom_mapped(&self) -> bool {
        self.bootrom_mapped
    }

    #[inline]
    pub fn is_dma_active(&self) -> bool {
        self.dma.is_active()
    }

    /// Puts the I/O registers into the state the boot image leaves behind.
    pub fn skip_bootrom(&mut self) {
        self.bootrom_mapped = false;
        self.timer = Timer::with_counter(POST_BOOT_COUNTER);

        for (addr, value) in [
            (JOYPAD_REGISTER, 0xcf),
            (DIV_REGISTER, (POST_BOOT_COUNTER >> 8) as u8),
            (TAC_REGISTER, 0xf8),
            (INTERRUPT_FLAGS_REGISTER, 0xe1),
            (LCD_CONTROL_REGISTER, 0x91),
            (BG_PALETTE_REGISTER, 0xfc),
            (OBJ_PALETTE_0_REGISTER, 0xff),
            (OBJ_PALETTE_1_REGISTER, 0xff),
            (BOOTROM_MAPPER_REGISTER, 0xff),
        ] {
            self.memory[addr as usize] = value;
        }
    }

    pub fn cartridge(&self) -> &dyn Mapper {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> &mut dyn Mapper {
        self.cartridge.as_mut()
    }

    pub fn current_rom_bank(&self) -> u16 {
        self.cartridge.current_rom_bank()
    }

    fn on_joypad_write(_mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        // Only the select lines are writable.
        Some(0b1100_0000 | (data & 0b0011_0000))
    }

    fn on_dma_write(mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        mmu.dma.start(data);
        Some(data)
    }

    fn on_bootrom_mapper_write(mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
        if data != 0 && mmu.bootrom_mapped {
            mmu.bootrom_mapped = false;
            info!("MMU: Boot image unmapped");
        }
        Some(0xff)
    }
}
