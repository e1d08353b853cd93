use crate::cartridge::{self, CartridgeHeader};
use crate::debugger::{BreakEvent, DebugConfig};
use crate::error::{DmgError, InvalidBootImageSnafu};
use crate::joypad::{Button, Input};
use crate::lr35902::cpu::Cpu;
use crate::lr35902::irq;
use crate::lr35902::sm83::{Instruction, Register};
use crate::memory::mmu::{Mmu, BOOTROM_SIZE};
use crate::memory::registers::InterruptFlags;
use crate::renderer::{Peripheral, Renderer};
use crate::storage::Storage;
use log::{debug, info, warn};
use snafu::ensure;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cycles between two input polls, one frame.
pub const INPUT_POLL_CYCLES: usize = 70224;

/// Lets another thread stop a running device.
#[derive(Clone, Default)]
pub struct DeviceControl {
    exit: Arc<AtomicBool>,
}

impl DeviceControl {
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Consumes a pending exit request.
    fn take_exit(&self) -> bool {
        self.exit.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction (plus any interrupt dispatch) completed in this many cycles.
    Executed(usize),
    Break(BreakEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// `DeviceControl::request_exit` was called.
    Requested,
    Breakpoint(BreakEvent),
    /// The cycle budget given to `run_for` ran out.
    CyclesElapsed,
}

pub struct Device {
    cpu: Cpu,
    mmu: Mmu,
    header: CartridgeHeader,
    renderer: Box<dyn Renderer>,
    input: Box<dyn Input>,
    peripherals: Vec<Box<dyn Peripheral>>,
    debug: DebugConfig,
    control: DeviceControl,
    resume_at: Option<u16>,
    input_countdown: usize,
    cycles: u64,
}

impl Device {
    /// Builds a device from a 256-byte boot image (or none, to start at the cartridge
    /// entrypoint with post-boot state) and a cartridge image.
    pub fn new(
        boot: Option<Vec<u8>>,
        cartridge: Vec<u8>,
        mut renderer: Box<dyn Renderer>,
        input: Box<dyn Input>,
        debug: DebugConfig,
    ) -> Result<Device, DmgError> {
        if let Some(boot) = &boot {
            ensure!(
                boot.len() == BOOTROM_SIZE,
                InvalidBootImageSnafu {
                    expected: BOOTROM_SIZE,
                    actual: boot.len()
                }
            );
        }

        let header = CartridgeHeader::parse(&cartridge)?;
        if !header.verify_checksum(&cartridge) {
            warn!("Device: Header checksum mismatch for \"{}\"", header.title);
        }
        let mapper = cartridge::create_mapper(&header, cartridge)?;

        let (cpu, mut mmu) = match boot {
            Some(boot) => (Cpu::new(), Mmu::new(boot, mapper)),
            None => {
                let mut mmu = Mmu::new(Vec::new(), mapper);
                mmu.skip_bootrom();
                (Cpu::post_boot(), mmu)
            }
        };
        mmu.set_watchpoints(debug.watchpoints());

        renderer.clear();
        info!("Device: Loaded \"{}\" ({})", header.title, mmu.cartridge().name());

        Ok(Device {
            cpu,
            mmu,
            header,
            renderer,
            input,
            peripherals: Vec::new(),
            debug,
            control: DeviceControl::default(),
            resume_at: None,
            input_countdown: 0,
            cycles: 0,
        })
    }

    pub fn add_peripheral(&mut self, peripheral: Box<dyn Peripheral>) {
        self.peripherals.push(peripheral);
    }

    /// Executes one instruction followed by the interrupt check, then advances the timer,
    /// DMA, the cartridge clock and every peripheral by the cycles spent.
    pub fn step(&mut self) -> Result<StepOutcome, DmgError> {
        let pc = self.cpu.read_register16(&Register::PC);

        if let Some(event) = self.check_breakpoints(pc) {
            self.resume_at = Some(pc);
            info!("Device: Hit {}", event);
            return Ok(StepOutcome::Break(event));
        }
        self.resume_at = None;

        let mut cycles = self.cpu.step(&mut self.mmu)?;
        cycles += irq::service(&mut self.cpu, &mut self.mmu);

        self.mmu.tick_timer(cycles);
        self.mmu.tick(cycles);

        for peripheral in self.peripherals.iter_mut() {
            if let Some(frame) = peripheral.tick(&mut self.mmu, cycles) {
                self.renderer.draw(frame);
            }
        }

        self.input_countdown = self.input_countdown.saturating_sub(cycles);
        if self.input_countdown == 0 {
            self.poll_input();
        }

        self.cycles += cycles as u64;

        if let Some(hit) = self.mmu.take_watch_hit() {
            let event = BreakEvent::Watch { hit, pc };
            info!("Device: Hit {}", event);
            return Ok(StepOutcome::Break(event));
        }

        Ok(StepOutcome::Executed(cycles))
    }

    fn check_breakpoints(&self, pc: u16) -> Option<BreakEvent> {
        // Breakpoints fire once per arrival; resuming executes the instruction.
        if self.debug.is_empty() || self.resume_at == Some(pc) || self.cpu.is_halted() || self.cpu.is_stopped() {
            return None;
        }

        if self.debug.breaks_at(pc) {
            return Some(BreakEvent::Address(pc));
        }

        let opcode = self.mmu.read_unchecked(pc);
        if self.debug.breaks_on_opcode(opcode) {
            return Some(BreakEvent::Opcode { opcode, address: pc });
        }

        None
    }

    /// Samples the input collaborator. A new press requests the joypad interrupt and
    /// leaves STOP.
    pub fn poll_input(&mut self) {
        self.input_countdown = INPUT_POLL_CYCLES;
        if !self.input.update() {
            return;
        }

        let mut pressed = false;
        for button in Button::ALL {
            pressed |= self.mmu.update_button(button, self.input.is_pressed(button));
        }

        if pressed {
            self.mmu.request_interrupt(InterruptFlags::JOYPAD);
            if self.cpu.is_stopped() {
                debug!("Device: Leaving STOP on button press");
                self.cpu.wake();
            }
        }
    }

    /// Runs until an exit is requested, a breakpoint is hit or execution fails.
    pub fn start(&mut self) -> Result<Exit, DmgError> {
        self.run(None)
    }

    /// Like `start`, but also returns once `cycles` more cycles have been executed.
    pub fn run_for(&mut self, cycles: u64) -> Result<Exit, DmgError> {
        self.run(Some(self.cycles + cycles))
    }

    fn run(&mut self, until: Option<u64>) -> Result<Exit, DmgError> {
        info!("Device: Running from ${:04x}", self.cpu.read_register16(&Register::PC));

        loop {
            if self.control.take_exit() {
                info!("Device: Exit requested after {} cycles", self.cycles);
                return Ok(Exit::Requested);
            }

            if until.is_some_and(|until| self.cycles >= until) {
                return Ok(Exit::CyclesElapsed);
            }

            if let StepOutcome::Break(event) = self.step()? {
                return Ok(Exit::Breakpoint(event));
            }
        }
    }

    /// Writes battery-backed RAM to `storage`. Returns whether the cartridge has any.
    pub fn save_ram(&self, storage: &mut dyn Storage, name: &str) -> Result<bool, DmgError> {
        let cartridge = self.mmu.cartridge();
        if !cartridge.has_battery() {
            return Ok(false);
        }

        storage.save(name, &cartridge.dump_ram())?;
        info!("Device: Saved cartridge RAM as {}", name);
        Ok(true)
    }

    /// Restores battery-backed RAM from `storage`. Returns whether anything was loaded.
    pub fn load_ram(&mut self, storage: &dyn Storage, name: &str) -> Result<bool, DmgError> {
        if !self.mmu.cartridge().has_battery() {
            return Ok(false);
        }

        match storage.load(name)? {
            Some(ram) => {
                self.mmu.cartridge_mut().load_ram(ram);
                info!("Device: Restored cartridge RAM from {}", name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Disassembles the instruction at `addr`.
    pub fn disassemble(&self, addr: u16) -> Result<Instruction, DmgError> {
        self.cpu.decode(&self.mmu, addr)
    }

    pub fn control(&self) -> DeviceControl {
        self.control.clone()
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    /// Cycles executed since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
