use crate::error::DmgError;
use crate::lr35902::handlers::Handlers;
use crate::lr35902::irq::Ime;
use crate::lr35902::registers::{Flags, Registers};
use crate::lr35902::sm83::{Instruction, Opcode, Register, Sm83};
use crate::memory::mmu::Mmu;
use log::{debug, trace};

/// Cycles burned per step while halted or stopped.
pub const IDLE_CYCLES: usize = 4;

#[derive(Clone)]
pub struct Cpu {
    sm83: Sm83,
    registers: Registers,
    ime: Ime,
    halted: bool,
    stopped: bool,
    instruction_start: u16,
    cycles: usize,
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl Cpu {
    /// Power-on state, for starting from a boot image at 0x0000.
    pub fn new() -> Cpu {
        Cpu::with_registers(Registers::default())
    }

    /// State right after the boot image handed over to the cartridge at 0x0100.
    pub fn post_boot() -> Cpu {
        Cpu::with_registers(Registers::post_boot())
    }

    fn with_registers(registers: Registers) -> Cpu {
        Cpu {
            sm83: Sm83::new(),
            instruction_start: registers.pc,
            registers,
            ime: Ime::default(),
            halted: false,
            stopped: false,
            cycles: 0,
        }
    }

    /// Executes one instruction (or one idle period while halted/stopped) and returns its cost
    /// in T-cycles. Interrupts are handled separately by the caller.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<usize, DmgError> {
        if self.halted || self.stopped {
            self.cycles += IDLE_CYCLES;
            return Ok(IDLE_CYCLES);
        }

        let pc = self.registers.pc;
        let instruction = self.sm83.decode(mmu, pc)?;
        trace!("[{:#06x}] {}", pc, instruction);

        self.instruction_start = pc;
        self.registers.pc = pc.wrapping_add(instruction.length as u16);

        // An EI executed before this instruction becomes effective once it completes.
        let enable_interrupts = self.ime.enable_pending;

        let cycles = self.execute(mmu, &instruction)?;

        if enable_interrupts && self.ime.enable_pending {
            self.ime.enable();
        }

        self.cycles += cycles;
        Ok(cycles)
    }

    fn execute(&mut self, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        match instruction.opcode {
            Opcode::Nop => Handlers::nop(self, mmu, instruction),
            Opcode::Ld | Opcode::Ldh => Handlers::load(self, mmu, instruction),
            Opcode::Inc => Handlers::increment(self, mmu, instruction),
            Opcode::Dec => Handlers::decrement(self, mmu, instruction),
            Opcode::Add => Handlers::add(self, mmu, instruction),
            Opcode::Adc | Opcode::Sub | Opcode::Sbc | Opcode::And | Opcode::Xor | Opcode::Or | Opcode::Cp => {
                Handlers::arithmetic(self, mmu, instruction)
            }
            Opcode::Rlca | Opcode::Rla | Opcode::Rrca | Opcode::Rra => {
                Handlers::rotate_accumulator(self, mmu, instruction)
            }
            Opcode::Rlc
            | Opcode::Rrc
            | Opcode::Rl
            | Opcode::Rr
            | Opcode::Sla
            | Opcode::Sra
            | Opcode::Srl
            | Opcode::Swap => Handlers::shift(self, mmu, instruction),
            Opcode::Bit => Handlers::test_bit(self, mmu, instruction),
            Opcode::Res | Opcode::Set => Handlers::modify_bit(self, mmu, instruction),
            Opcode::Jp | Opcode::Jr | Opcode::Call => Handlers::jump(self, mmu, instruction),
            Opcode::Ret => Handlers::ret(self, mmu, instruction),
            Opcode::Reti => Handlers::reti(self, mmu, instruction),
            Opcode::Rst => Handlers::restart(self, mmu, instruction),
            Opcode::Push => Handlers::push(self, mmu, instruction),
            Opcode::Pop => Handlers::pop(self, mmu, instruction),
            Opcode::Daa => Handlers::decimal_adjust(self, mmu, instruction),
            Opcode::Cpl => Handlers::complement(self, mmu, instruction),
            Opcode::Scf | Opcode::Ccf => Handlers::carry_flag(self, mmu, instruction),
            Opcode::Di => Handlers::disable_interrupts(self, mmu, instruction),
            Opcode::Ei => Handlers::enable_interrupts(self, mmu, instruction),
            Opcode::Halt => Handlers::halt(self, mmu, instruction),
            Opcode::Stop => Handlers::stop(self, mmu, instruction),
        }
    }

    /// Disassembles the instruction at `addr` without executing it.
    pub fn decode(&self, mmu: &Mmu, addr: u16) -> Result<Instruction, DmgError> {
        self.sm83.decode(mmu, addr)
    }

    pub fn push_stack(&mut self, mmu: &mut Mmu, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(2);
        mmu.write16(self.registers.sp, value);
    }

    pub fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let value = mmu.read16(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);
        value
    }

    #[inline]
    pub fn jump(&mut self, addr: u16) {
        self.registers.pc = addr;
    }

    #[inline]
    pub fn read_register(&self, register: &Register) -> u8 {
        self.registers.read(register)
    }

    #[inline]
    pub fn read_register16(&self, register: &Register) -> u16 {
        self.registers.read16(register)
    }

    #[inline]
    pub fn write_register(&mut self, register: &Register, data: u8) {
        self.registers.write(register, data);
    }

    #[inline]
    pub fn write_register16(&mut self, register: &Register, value: u16) {
        self.registers.write16(register, value);
    }

    #[inline]
    pub fn read_flag(&self, flag: Flags) -> bool {
        self.registers.flag(flag)
    }

    #[inline]
    pub fn update_flag(&mut self, flag: Flags, value: bool) {
        self.registers.set_flag(flag, value);
    }

    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        self.registers.f = flags;
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        self.registers.f
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn ime(&self) -> &Ime {
        &self.ime
    }

    pub fn ime_mut(&mut self) -> &mut Ime {
        &mut self.ime
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        debug!("CPU: Entered STOP at ${:04x}", self.instruction_start);
    }

    /// Leaves HALT and STOP.
    pub fn wake(&mut self) {
        self.halted = false;
        self.stopped = false;
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Address of the instruction that executed last.
    #[inline]
    pub fn instruction_start(&self) -> u16 {
        self.instruction_start
    }

    #[inline]
    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}  IME: {}  HALT: {}  CYCLES: {}",
            self.registers, self.ime.enabled as u8, self.halted as u8, self.cycles
        )
    }
}
