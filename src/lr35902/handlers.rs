use crate::error::{DmgError, InvalidHandlerSnafu};
use crate::lr35902::alu::{self, Shift};
use crate::lr35902::cpu::Cpu;
use crate::lr35902::registers::Flags;
use crate::lr35902::sm83::{AddressingMode, Condition, Instruction, Opcode, Operand, Register};
use crate::memory::mmu::Mmu;

const HIGH_PAGE: u16 = 0xff00;

pub struct Handlers {}

impl Handlers {
    pub fn nop(_cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        Ok(instruction.cycles.0)
    }

    pub fn load(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (dst, src) = Handlers::operands(instruction)?;

        match (dst, src) {
            // ld (imm16), SP is the only 16-bit store
            (Operand::Imm16(addr, mode), Operand::Reg16(Register::SP, _)) if mode.contains(AddressingMode::Indirect) => {
                mmu.write16(*addr, cpu.read_register16(&Register::SP));
            }
            // ld HL, SP+e
            (Operand::Reg16(reg, _), Operand::DisplacedReg16(base, offset, _)) => {
                let (result, flags) = alu::add_signed(cpu.read_register16(base), *offset);
                cpu.write_register16(reg, result);
                cpu.set_flags(flags);
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, src, instruction)?;
                Handlers::write_operand(cpu, mmu, dst, value, instruction)?;
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn increment(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let operand = Handlers::lhs(instruction)?;

        match operand {
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Direct) => {
                let value = cpu.read_register16(reg);
                cpu.write_register16(reg, value.wrapping_add(1));
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, operand, instruction)? as u8;
                let (result, flags) = alu::inc8(value, cpu.flags());
                Handlers::write_operand(cpu, mmu, operand, result as u16, instruction)?;
                cpu.set_flags(flags);
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn decrement(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let operand = Handlers::lhs(instruction)?;

        match operand {
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Direct) => {
                let value = cpu.read_register16(reg);
                cpu.write_register16(reg, value.wrapping_sub(1));
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, operand, instruction)? as u8;
                let (result, flags) = alu::dec8(value, cpu.flags());
                Handlers::write_operand(cpu, mmu, operand, result as u16, instruction)?;
                cpu.set_flags(flags);
            }
        }

        Ok(instruction.cycles.0)
    }

    /// ADD A, x / ADD HL, rr / ADD SP, e
    pub fn add(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (dst, src) = Handlers::operands(instruction)?;

        match (dst, src) {
            (Operand::Reg16(Register::SP, _), Operand::Offset(offset)) => {
                let (result, flags) = alu::add_signed(cpu.read_register16(&Register::SP), *offset);
                cpu.write_register16(&Register::SP, result);
                cpu.set_flags(flags);
            }
            (Operand::Reg16(reg, mode), _) if mode.contains(AddressingMode::Direct) => {
                let value = Handlers::read_operand(cpu, mmu, src, instruction)?;
                let (result, flags) = alu::add16(cpu.read_register16(reg), value, cpu.flags());
                cpu.write_register16(reg, result);
                cpu.set_flags(flags);
            }
            _ => return Handlers::arithmetic(cpu, mmu, instruction),
        }

        Ok(instruction.cycles.0)
    }

    /// 8-bit ALU operations on the accumulator.
    pub fn arithmetic(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (_, src) = Handlers::operands(instruction)?;

        let a = cpu.read_register(&Register::A);
        let value = Handlers::read_operand(cpu, mmu, src, instruction)? as u8;
        let carry = cpu.read_flag(Flags::CARRY);

        let (result, flags) = match instruction.opcode {
            Opcode::Add => alu::add8(a, value, false),
            Opcode::Adc => alu::add8(a, value, carry),
            Opcode::Sub | Opcode::Cp => alu::sub8(a, value, false),
            Opcode::Sbc => alu::sub8(a, value, carry),
            Opcode::And => alu::and8(a, value),
            Opcode::Xor => alu::xor8(a, value),
            Opcode::Or => alu::or8(a, value),
            _ => return Handlers::invalid(instruction),
        };

        // cp only compares
        if instruction.opcode != Opcode::Cp {
            cpu.write_register(&Register::A, result);
        }
        cpu.set_flags(flags);

        Ok(instruction.cycles.0)
    }

    /// RLCA, RLA, RRCA and RRA always clear Z.
    pub fn rotate_accumulator(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let op = match instruction.opcode {
            Opcode::Rlca => Shift::Rlc,
            Opcode::Rla => Shift::Rl,
            Opcode::Rrca => Shift::Rrc,
            Opcode::Rra => Shift::Rr,
            _ => return Handlers::invalid(instruction),
        };

        let (result, mut flags) = alu::shift(op, cpu.read_register(&Register::A), cpu.read_flag(Flags::CARRY));
        flags.remove(Flags::ZERO);
        cpu.write_register(&Register::A, result);
        cpu.set_flags(flags);

        Ok(instruction.cycles.0)
    }

    pub fn shift(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let op = match instruction.opcode {
            Opcode::Rlc => Shift::Rlc,
            Opcode::Rrc => Shift::Rrc,
            Opcode::Rl => Shift::Rl,
            Opcode::Rr => Shift::Rr,
            Opcode::Sla => Shift::Sla,
            Opcode::Sra => Shift::Sra,
            Opcode::Srl => Shift::Srl,
            Opcode::Swap => Shift::Swap,
            _ => return Handlers::invalid(instruction),
        };

        let operand = Handlers::lhs(instruction)?;
        let value = Handlers::read_operand(cpu, mmu, operand, instruction)? as u8;
        let (result, flags) = alu::shift(op, value, cpu.read_flag(Flags::CARRY));
        Handlers::write_operand(cpu, mmu, operand, result as u16, instruction)?;
        cpu.set_flags(flags);

        Ok(instruction.cycles.0)
    }

    pub fn test_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (bit, src) = Handlers::operands(instruction)?;

        let bit = Handlers::read_operand(cpu, mmu, bit, instruction)?;
        let value = Handlers::read_operand(cpu, mmu, src, instruction)?;

        cpu.update_flag(Flags::ZERO, value & (1u16 << bit) == 0);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, true);

        Ok(instruction.cycles.0)
    }

    /// RES and SET.
    pub fn modify_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (bit, dst) = Handlers::operands(instruction)?;

        let mask = 1u16 << Handlers::read_operand(cpu, mmu, bit, instruction)?;
        let value = Handlers::read_operand(cpu, mmu, dst, instruction)?;
        let result = if instruction.opcode == Opcode::Set {
            value | mask
        } else {
            value & !mask
        };
        Handlers::write_operand(cpu, mmu, dst, result, instruction)?;

        Ok(instruction.cycles.0)
    }

    /// JP, JR and CALL, conditional or not.
    pub fn jump(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (condition, target) = Handlers::operands(instruction)?;

        if !Handlers::check_condition(cpu, condition) {
            return Handlers::not_taken(instruction);
        }

        let pc = cpu.read_register16(&Register::PC);
        let addr = match target {
            Operand::Offset(offset) => pc.wrapping_add_signed(*offset as i16),
            _ => Handlers::read_operand(cpu, mmu, target, instruction)?,
        };

        if instruction.opcode == Opcode::Call {
            cpu.push_stack(mmu, pc);
        }
        cpu.jump(addr);

        Ok(instruction.cycles.0)
    }

    pub fn ret(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let condition = Handlers::lhs(instruction)?;

        if !Handlers::check_condition(cpu, condition) {
            return Handlers::not_taken(instruction);
        }

        let addr = cpu.pop_stack(mmu);
        cpu.jump(addr);

        Ok(instruction.cycles.0)
    }

    pub fn reti(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let addr = cpu.pop_stack(mmu);
        cpu.jump(addr);
        cpu.ime_mut().enable();

        Ok(instruction.cycles.0)
    }

    pub fn restart(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let vector = match Handlers::lhs(instruction)? {
            Operand::Imm8(vector, _) => *vector as u16,
            _ => return Handlers::invalid(instruction),
        };

        let pc = cpu.read_register16(&Register::PC);
        cpu.push_stack(mmu, pc);
        cpu.jump(vector);

        Ok(instruction.cycles.0)
    }

    pub fn push(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        match Handlers::lhs(instruction)? {
            Operand::Reg16(reg, _) => {
                let value = cpu.read_register16(reg);
                cpu.push_stack(mmu, value);
            }
            _ => return Handlers::invalid(instruction),
        }

        Ok(instruction.cycles.0)
    }

    pub fn pop(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        match Handlers::lhs(instruction)? {
            Operand::Reg16(reg, _) => {
                let value = cpu.pop_stack(mmu);
                cpu.write_register16(reg, value);
            }
            _ => return Handlers::invalid(instruction),
        }

        Ok(instruction.cycles.0)
    }

    pub fn decimal_adjust(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let (result, flags) = alu::daa(cpu.read_register(&Register::A), cpu.flags());
        cpu.write_register(&Register::A, result);
        cpu.set_flags(flags);

        Ok(instruction.cycles.0)
    }

    pub fn complement(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let a = cpu.read_register(&Register::A);
        cpu.write_register(&Register::A, !a);
        cpu.update_flag(Flags::SUBTRACT, true);
        cpu.update_flag(Flags::HALF_CARRY, true);

        Ok(instruction.cycles.0)
    }

    /// SCF and CCF.
    pub fn carry_flag(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        let carry = instruction.opcode == Opcode::Scf || !cpu.read_flag(Flags::CARRY);
        cpu.update_flag(Flags::SUBTRACT, false);
        cpu.update_flag(Flags::HALF_CARRY, false);
        cpu.update_flag(Flags::CARRY, carry);

        Ok(instruction.cycles.0)
    }

    pub fn disable_interrupts(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        cpu.ime_mut().disable();
        Ok(instruction.cycles.0)
    }

    pub fn enable_interrupts(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        cpu.ime_mut().schedule_enable();
        Ok(instruction.cycles.0)
    }

    pub fn halt(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        cpu.halt();
        Ok(instruction.cycles.0)
    }

    pub fn stop(cpu: &mut Cpu, _mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, DmgError> {
        cpu.stop();
        Ok(instruction.cycles.0)
    }

    fn lhs(instruction: &Instruction) -> Result<&Operand, DmgError> {
        match instruction.lhs.as_ref() {
            Some(operand) => Ok(operand),
            None => Handlers::invalid(instruction),
        }
    }

    fn operands(instruction: &Instruction) -> Result<(&Operand, &Operand), DmgError> {
        match (instruction.lhs.as_ref(), instruction.rhs.as_ref()) {
            (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
            _ => Handlers::invalid(instruction),
        }
    }

    fn invalid<T>(instruction: &Instruction) -> Result<T, DmgError> {
        InvalidHandlerSnafu {
            instruction: instruction.clone(),
        }
        .fail()
    }

    fn not_taken(instruction: &Instruction) -> Result<usize, DmgError> {
        match instruction.cycles.1 {
            Some(cycles) => Ok(cycles),
            None => Handlers::invalid(instruction),
        }
    }

    /// Address referenced by a memory operand, or `None` for registers and immediates.
    fn resolve_address(cpu: &Cpu, operand: &Operand) -> Option<u16> {
        match operand {
            // ld (c), a / ld a, (c)
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::Indirect) => {
                Some(HIGH_PAGE + cpu.read_register(reg) as u16)
            }
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => Some(cpu.read_register16(reg)),
            // ldh (imm8), a / ldh a, (imm8)
            Operand::Imm8(imm, mode) if mode.contains(AddressingMode::Indirect) => Some(HIGH_PAGE + *imm as u16),
            Operand::Imm16(imm, mode) if mode.contains(AddressingMode::Indirect) => Some(*imm),
            _ => None,
        }
    }

    /// Applies the post-increment/decrement of `(HL+)` and `(HL-)`.
    fn step_pointer(cpu: &mut Cpu, operand: &Operand) {
        if let Operand::Reg16(reg, mode) = operand {
            let value = cpu.read_register16(reg);
            if mode.contains(AddressingMode::Increment) {
                cpu.write_register16(reg, value.wrapping_add(1));
            } else if mode.contains(AddressingMode::Decrement) {
                cpu.write_register16(reg, value.wrapping_sub(1));
            }
        }
    }

    fn read_operand(cpu: &mut Cpu, mmu: &Mmu, operand: &Operand, instruction: &Instruction) -> Result<u16, DmgError> {
        if let Some(addr) = Handlers::resolve_address(cpu, operand) {
            let value = mmu.read(addr);
            Handlers::step_pointer(cpu, operand);
            return Ok(value as u16);
        }

        match operand {
            Operand::Reg8(reg, _) => Ok(cpu.read_register(reg) as u16),
            Operand::Reg16(reg, _) => Ok(cpu.read_register16(reg)),
            Operand::Imm8(imm, _) => Ok(*imm as u16),
            Operand::Imm16(imm, _) => Ok(*imm),
            Operand::Bit(bit) => Ok(*bit as u16),
            _ => Handlers::invalid(instruction),
        }
    }

    fn write_operand(
        cpu: &mut Cpu,
        mmu: &mut Mmu,
        operand: &Operand,
        value: u16,
        instruction: &Instruction,
    ) -> Result<(), DmgError> {
        if let Some(addr) = Handlers::resolve_address(cpu, operand) {
            mmu.write(addr, value as u8);
            Handlers::step_pointer(cpu, operand);
            return Ok(());
        }

        match operand {
            Operand::Reg8(reg, _) => cpu.write_register(reg, value as u8),
            Operand::Reg16(reg, _) => cpu.write_register16(reg, value),
            _ => return Handlers::invalid(instruction),
        }

        Ok(())
    }

    fn check_condition(cpu: &Cpu, condition: &Operand) -> bool {
        let condition = match condition {
            Operand::Conditional(condition) => condition,
            _ => return true,
        };

        match condition {
            Condition::Z => cpu.read_flag(Flags::ZERO),
            Condition::NZ => !cpu.read_flag(Flags::ZERO),
            Condition::C => cpu.read_flag(Flags::CARRY),
            Condition::NC => !cpu.read_flag(Flags::CARRY),
            Condition::None => true,
        }
    }
}
