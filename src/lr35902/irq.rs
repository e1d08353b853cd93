use crate::lr35902::cpu::Cpu;
use crate::lr35902::sm83::Register;
use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use crate::memory::{INTERRUPT_ENABLE_REGISTER, INTERRUPT_FLAGS_REGISTER};
use log::trace;

/// Cycles spent leaving HALT once an interrupt is pending.
pub const UNHALT_CYCLES: usize = 4;
/// Cycles spent pushing PC and jumping to the vector.
pub const DISPATCH_CYCLES: usize = 20;

#[derive(Clone, Default)]
pub struct Ime {
    pub enabled: bool,
    pub enable_pending: bool,
}

impl Ime {
    /// EI: takes effect once the following instruction has executed.
    pub fn schedule_enable(&mut self) {
        self.enable_pending = true;
    }

    /// DI: takes effect immediately and cancels a scheduled EI.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.enable_pending = false;
    }

    /// RETI: takes effect immediately.
    pub fn enable(&mut self) {
        self.enabled = true;
        self.enable_pending = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Vector {
    pub fn from_flags(flags: &InterruptFlags) -> Option<Vector> {
        let interrupt = flags.highest_priority()?;

        if interrupt == InterruptFlags::VBLANK {
            Some(Vector::VBlank)
        } else if interrupt == InterruptFlags::LCD_STAT {
            Some(Vector::Stat)
        } else if interrupt == InterruptFlags::TIMER {
            Some(Vector::Timer)
        } else if interrupt == InterruptFlags::SERIAL {
            Some(Vector::Serial)
        } else {
            Some(Vector::Joypad)
        }
    }

    pub fn to_address(&self) -> u16 {
        match self {
            Vector::VBlank => 0x0040,
            Vector::Stat => 0x0048,
            Vector::Timer => 0x0050,
            Vector::Serial => 0x0058,
            Vector::Joypad => 0x0060,
        }
    }

    pub fn to_flag(&self) -> InterruptFlags {
        match self {
            Vector::VBlank => InterruptFlags::VBLANK,
            Vector::Stat => InterruptFlags::LCD_STAT,
            Vector::Timer => InterruptFlags::TIMER,
            Vector::Serial => InterruptFlags::SERIAL,
            Vector::Joypad => InterruptFlags::JOYPAD,
        }
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Vector::VBlank => write!(f, "VBLANK"),
            Vector::Stat => write!(f, "STAT"),
            Vector::Timer => write!(f, "TIMER"),
            Vector::Serial => write!(f, "SERIAL"),
            Vector::Joypad => write!(f, "JOYPAD"),
        }
    }
}

/// Sources that are both requested and enabled.
pub fn pending(mmu: &Mmu) -> InterruptFlags {
    let enabled = mmu.read_unchecked(INTERRUPT_ENABLE_REGISTER);
    let requested = mmu.read_unchecked(INTERRUPT_FLAGS_REGISTER);
    InterruptFlags::from(enabled & requested & 0x1f)
}

/// Runs the interrupt check that follows every instruction and returns the cycles it consumed.
pub fn service(cpu: &mut Cpu, mmu: &mut Mmu) -> usize {
    // STOP is only left through the joypad, see `Device::poll_input`.
    let pending = pending(mmu);
    if pending.is_empty() || cpu.is_stopped() {
        return 0;
    }

    let mut cycles = 0;
    if cpu.is_halted() {
        cpu.wake();
        cycles += UNHALT_CYCLES;
    }

    if !cpu.ime().enabled {
        return cycles;
    }

    let vector = match Vector::from_flags(&pending) {
        Some(vector) => vector,
        None => return cycles,
    };

    let requested = mmu.read_unchecked(INTERRUPT_FLAGS_REGISTER);
    mmu.write_unchecked(INTERRUPT_FLAGS_REGISTER, requested & !vector.to_flag().bits());
    cpu.ime_mut().disable();

    let return_address = cpu.read_register16(&Register::PC);
    cpu.push_stack(mmu, return_address);
    cpu.jump(vector.to_address());
    trace!("IRQ: Dispatched {} from ${:04x}", vector, return_address);

    cycles + DISPATCH_CYCLES
}

/// IF only implements the lower five bits, the rest read back as 1.
pub(crate) fn on_interrupt_flags_write(_mmu: &mut Mmu, _addr: u16, data: u8) -> Option<u8> {
    Some(data | 0b1110_0000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mapper::rom::Rom;

    fn setup() -> (Cpu, Mmu) {
        let mut cpu = Cpu::new();
        cpu.jump(0x1234);
        cpu.write_register16(&Register::SP, 0xfffe);
        (cpu, Mmu::new(Vec::new(), Box::new(Rom::new(vec![0; 0x8000]))))
    }

    #[test]
    fn vblank_wins_over_timer() {
        let (mut cpu, mut mmu) = setup();
        cpu.ime_mut().enable();
        mmu.write(INTERRUPT_ENABLE_REGISTER, 0x1f);
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0x05);

        assert_eq!(service(&mut cpu, &mut mmu), DISPATCH_CYCLES);
        assert_eq!(cpu.read_register16(&Register::PC), 0x0040);
        assert_eq!(mmu.read(INTERRUPT_FLAGS_REGISTER), 0xe4);
        assert!(!cpu.ime().enabled);
        assert_eq!(mmu.read16(0xfffc), 0x1234);
    }

    #[test]
    fn disabled_sources_are_ignored() {
        let (mut cpu, mut mmu) = setup();
        cpu.ime_mut().enable();
        mmu.write(INTERRUPT_ENABLE_REGISTER, 0x04);
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0x01);

        assert_eq!(service(&mut cpu, &mut mmu), 0);
        assert_eq!(cpu.read_register16(&Register::PC), 0x1234);
    }

    #[test]
    fn halt_exits_without_ime() {
        let (mut cpu, mut mmu) = setup();
        cpu.halt();
        mmu.write(INTERRUPT_ENABLE_REGISTER, 0x04);
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0x04);

        assert_eq!(service(&mut cpu, &mut mmu), UNHALT_CYCLES);
        assert!(!cpu.is_halted());
        assert_eq!(cpu.read_register16(&Register::PC), 0x1234);
        assert_eq!(mmu.read(INTERRUPT_FLAGS_REGISTER), 0xe4);
    }

    #[test]
    fn halt_exit_and_dispatch_add_up() {
        let (mut cpu, mut mmu) = setup();
        cpu.halt();
        cpu.ime_mut().enable();
        mmu.write(INTERRUPT_ENABLE_REGISTER, 0x10);
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0x10);

        assert_eq!(service(&mut cpu, &mut mmu), UNHALT_CYCLES + DISPATCH_CYCLES);
        assert_eq!(cpu.read_register16(&Register::PC), 0x0060);
    }

    #[test]
    fn vectors_follow_priority() {
        for (bit, address) in [(0, 0x40), (1, 0x48), (2, 0x50), (3, 0x58), (4, 0x60)] {
            let flags = InterruptFlags::from(0x1f & !((1u8 << bit) - 1));
            assert_eq!(Vector::from_flags(&flags).map(|v| v.to_address()), Some(address));
        }
        assert_eq!(Vector::from_flags(&InterruptFlags::empty()), None);
    }
}
