use crate::error::{DecoderFailureSnafu, DmgError};
use crate::memory::mmu::Mmu;
use bitflags::bitflags;
use std::cmp::PartialEq;

type FDecode = fn(&Mmu, u16, u8, Opcode) -> Result<Instruction, DmgError>;
type DecoderTable = [Option<(Opcode, FDecode)>; 0x100];

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Register {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    F,
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

bitflags! {
    #[derive(PartialEq, Debug, Clone, Copy)]
    pub struct AddressingMode: u8 {
        const Direct    = 0b0001;
        const Indirect  = 0b0010;
        const Increment = 0b0100;
        const Decrement = 0b1000;
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Condition {
    None,
    NZ,
    Z,
    NC,
    C,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Operand {
    Reg8(Register, AddressingMode),
    Reg16(Register, AddressingMode),
    Imm8(u8, AddressingMode),
    Imm16(u16, AddressingMode),
    Conditional(Condition),
    DisplacedReg16(Register, i8, AddressingMode),
    Offset(i8),
    Bit(u8),
}

#[derive(PartialEq, Debug, Copy, Clone)]
pub enum Opcode {
    Nop,
    Ld,
    Inc,
    Dec,
    Rlc,
    Rrc,
    Swap,
    Rr,
    Srl,
    Bit,
    Res,
    Set,
    Jp,
    Jr,
    Call,
    Ret,
    Rst,
    Push,
    Pop,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Reti,
    Halt,
    Stop,
    Di,
    Ei,
    Ldh,
    Rl,
    Sla,
    Sra,
    Ccf,
    Scf,
    Cpl,
    Daa,
    Rra,
    Rla,
    Rrca,
    Rlca,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub lhs: Option<Operand>,
    pub rhs: Option<Operand>,
    pub length: usize,
    /// T-cycles when taken, and when not taken for conditional instructions.
    pub cycles: (usize, Option<usize>),
}

/// Turns an `"00xxx110"` style pattern into a `(mask, value)` pair; `x` marks a don't-care bit.
fn compile_pattern(pattern: &str) -> (u8, u8) {
    pattern.bytes().fold((0u8, 0u8), |(mask, value), bit| match bit {
        b'0' => ((mask << 1) | 1, value << 1),
        b'1' => ((mask << 1) | 1, (value << 1) | 1),
        _ => (mask << 1, value << 1),
    })
}

macro_rules! define_decoder {
    ( $table:expr, $pattern:expr, $opcode:expr, $function:expr ) => {{
        let (mask, value) = compile_pattern($pattern);
        let decoder: FDecode = $function;
        for byte in 0..=0xffu8 {
            let slot = &mut $table[byte as usize];
            if slot.is_none() && byte & mask == value {
                *slot = Some(($opcode, decoder));
            }
        }
    }};
}

/// SM83 instruction decoder. Opcodes are looked up in two 256-entry tables (plain and
/// CB-prefixed) built once from bit patterns; earlier patterns take precedence.
#[derive(Clone)]
pub struct Sm83 {
    decoders: DecoderTable,
    decoders_prefixed: DecoderTable,
}

impl Default for Sm83 {
    fn default() -> Sm83 {
        Sm83::new()
    }
}

//noinspection DuplicatedCode
impl Sm83 {
    pub fn new() -> Sm83 {
        let mut decoders: DecoderTable = [None; 0x100];
        let mut decoders_prefixed: DecoderTable = [None; 0x100];

        Sm83::propagate_decoders(&mut decoders);
        Sm83::propagate_decoders_prefixed(&mut decoders_prefixed);

        Sm83 {
            decoders,
            decoders_prefixed,
        }
    }

    pub fn decode(&self, mmu: &Mmu, current_pc: u16) -> Result<Instruction, DmgError> {
        let opcode_byte = mmu.read_unchecked(current_pc);

        let (table, byte) = if opcode_byte == 0xcb {
            (&self.decoders_prefixed, mmu.read_unchecked(current_pc.wrapping_add(1)))
        } else {
            (&self.decoders, opcode_byte)
        };

        match table[byte as usize] {
            Some((opcode, decoder_fn)) => decoder_fn(mmu, current_pc, byte, opcode),
            None => DecoderFailureSnafu {
                opcode: opcode_byte,
                address: current_pc,
            }
            .fail(),
        }
    }

    #[inline]
    fn imm8(mmu: &Mmu, pc: u16) -> u8 {
        mmu.read_unchecked(pc.wrapping_add(1))
    }

    #[inline]
    fn imm16(mmu: &Mmu, pc: u16) -> u16 {
        u16::from_le_bytes([
            mmu.read_unchecked(pc.wrapping_add(1)),
            mmu.read_unchecked(pc.wrapping_add(2)),
        ])
    }

    fn lookup_register(data: u8) -> Register {
        match data & 0b111 {
            0b000 => Register::B,
            0b001 => Register::C,
            0b010 => Register::D,
            0b011 => Register::E,
            0b100 => Register::H,
            0b101 => Register::L,
            0b110 => Register::HL,
            _ => Register::A,
        }
    }

    fn lookup_register_16(data: u8) -> Register {
        match data & 0b11 {
            0b00 => Register::BC,
            0b01 => Register::DE,
            0b10 => Register::HL,
            _ => Register::SP,
        }
    }

    /// Same as `lookup_register_16`, except that the pattern for SP means AF (push/pop).
    fn lookup_stack_register(data: u8) -> Register {
        match Sm83::lookup_register_16(data) {
            Register::SP => Register::AF,
            register => register,
        }
    }

    fn lookup_condition(data: u8) -> Condition {
        match data & 0b11 {
            0b00 => Condition::NZ,
            0b01 => Condition::Z,
            0b10 => Condition::NC,
            _ => Condition::C,
        }
    }

    fn decode_8bit_operand(value: u8, base_cycles: usize, hl_cycles: usize) -> (Operand, usize) {
        let register = Sm83::lookup_register(value);
        if register == Register::HL {
            (Operand::Reg16(Register::HL, AddressingMode::Indirect), hl_cycles)
        } else {
            (Operand::Reg8(register, AddressingMode::Direct), base_cycles)
        }
    }

    fn implied(opcode: Opcode, cycles: usize) -> Result<Instruction, DmgError> {
        Ok(Instruction {
            opcode,
            lhs: None,
            rhs: None,
            length: 1,
            cycles: (cycles, None),
        })
    }

    /// `op A, r8` / `op A, (HL)` from the 0x80-0xbf block.
    fn alu_register(byte: u8, opcode: Opcode) -> Result<Instruction, DmgError> {
        let (rhs, cycles) = Sm83::decode_8bit_operand(byte, 4, 8);

        Ok(Instruction {
            opcode,
            lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
            rhs: Some(rhs),
            length: 1,
            cycles: (cycles, None),
        })
    }

    /// `op A, imm8`.
    fn alu_immediate(mmu: &Mmu, pc: u16, opcode: Opcode) -> Result<Instruction, DmgError> {
        Ok(Instruction {
            opcode,
            lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
            rhs: Some(Operand::Imm8(Sm83::imm8(mmu, pc), AddressingMode::Direct)),
            length: 2,
            cycles: (8, None),
        })
    }

    /// Rotates and shifts from the CB space, which take a single operand.
    fn prefixed_unary(byte: u8, opcode: Opcode) -> Result<Instruction, DmgError> {
        let (lhs, cycles) = Sm83::decode_8bit_operand(byte, 8, 16);

        Ok(Instruction {
            opcode,
            lhs: Some(lhs),
            rhs: None,
            length: 2,
            cycles: (cycles, None),
        })
    }

    /// BIT/RES/SET n, r8.
    fn prefixed_bit(byte: u8, opcode: Opcode, hl_cycles: usize) -> Result<Instruction, DmgError> {
        let bit = (byte & 0b0011_1000) >> 3;
        let (rhs, cycles) = Sm83::decode_8bit_operand(byte, 8, hl_cycles);

        Ok(Instruction {
            opcode,
            lhs: Some(Operand::Bit(bit)),
            rhs: Some(rhs),
            length: 2,
            cycles: (cycles, None),
        })
    }

    fn propagate_decoders(lut: &mut DecoderTable) {
        define_decoder!(lut, "00000000", Opcode::Nop, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00101111", Opcode::Cpl, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00111111", Opcode::Ccf, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00110111", Opcode::Scf, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00100111", Opcode::Daa, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00000111", Opcode::Rlca, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00010111", Opcode::Rla, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00001111", Opcode::Rrca, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "00011111", Opcode::Rra, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "01110110", Opcode::Halt, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "11110011", Opcode::Di, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "11111011", Opcode::Ei, |_, _, _, opcode| Sm83::implied(opcode, 4));
        define_decoder!(lut, "11011001", Opcode::Reti, |_, _, _, opcode| Sm83::implied(opcode, 16));

        // ld (imm16), SP
        define_decoder!(lut, "00001000", Opcode::Ld, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                length: 3,
                cycles: (20, None),
            })
        });

        // stop imm8
        define_decoder!(lut, "00010000", Opcode::Stop, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm8(Sm83::imm8(mmu, pc), AddressingMode::Direct)),
                rhs: None,
                length: 2,
                cycles: (4, None),
            })
        });

        // jr imm8
        define_decoder!(lut, "00011000", Opcode::Jr, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: Some(Operand::Offset(Sm83::imm8(mmu, pc) as i8)),
                length: 2,
                cycles: (12, None),
            })
        });

        // jr cond, imm8
        define_decoder!(lut, "001xx000", Opcode::Jr, |mmu, pc, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Sm83::lookup_condition(byte >> 3))),
                rhs: Some(Operand::Offset(Sm83::imm8(mmu, pc) as i8)),
                length: 2,
                cycles: (12, Some(8)),
            })
        });

        // ld r16, imm16
        define_decoder!(lut, "00xx0001", Opcode::Ld, |mmu, pc, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Direct)),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Direct)),
                length: 3,
                cycles: (12, None),
            })
        });

        // ld (HL+), A / ld (HL-), A
        define_decoder!(lut, "001x0010", Opcode::Ld, |_, _, byte, opcode| {
            let step = if byte == 0x22 {
                AddressingMode::Increment
            } else {
                AddressingMode::Decrement
            };

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::HL, AddressingMode::Indirect | step)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        });

        // ld (r16), A
        define_decoder!(lut, "00xx0010", Opcode::Ld, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        });

        // ld A, (HL+) / ld A, (HL-)
        define_decoder!(lut, "001x1010", Opcode::Ld, |_, _, byte, opcode| {
            let step = if byte == 0x2a {
                AddressingMode::Increment
            } else {
                AddressingMode::Decrement
            };

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Register::HL, AddressingMode::Indirect | step)),
                length: 1,
                cycles: (8, None),
            })
        });

        // ld A, (r16)
        define_decoder!(lut, "00xx1010", Opcode::Ld, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Indirect)),
                length: 1,
                cycles: (8, None),
            })
        });

        // add HL, r16
        define_decoder!(lut, "00xx1001", Opcode::Add, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        });

        // inc r16
        define_decoder!(lut, "00xx0011", Opcode::Inc, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (8, None),
            })
        });

        // dec r16
        define_decoder!(lut, "00xx1011", Opcode::Dec, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_register_16(byte >> 4), AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (8, None),
            })
        });

        // inc r8 / inc (HL)
        define_decoder!(lut, "00xxx100", Opcode::Inc, |_, _, byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand(byte >> 3, 4, 12);

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: None,
                length: 1,
                cycles: (cycles, None),
            })
        });

        // dec r8 / dec (HL)
        define_decoder!(lut, "00xxx101", Opcode::Dec, |_, _, byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand(byte >> 3, 4, 12);

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: None,
                length: 1,
                cycles: (cycles, None),
            })
        });

        // ld r8, imm8 / ld (HL), imm8
        define_decoder!(lut, "00xxx110", Opcode::Ld, |mmu, pc, byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand(byte >> 3, 8, 12);

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: Some(Operand::Imm8(Sm83::imm8(mmu, pc), AddressingMode::Direct)),
                length: 2,
                cycles: (cycles, None),
            })
        });

        // ld r8, r8 / ld r8, (HL) / ld (HL), r8 (0x76 is halt, matched above)
        define_decoder!(lut, "01xxxxxx", Opcode::Ld, |_, _, byte, opcode| {
            let (lhs, destination_cycles) = Sm83::decode_8bit_operand(byte >> 3, 4, 8);
            let (rhs, source_cycles) = Sm83::decode_8bit_operand(byte, 4, 8);

            Ok(Instruction {
                opcode,
                lhs: Some(lhs),
                rhs: Some(rhs),
                length: 1,
                cycles: (std::cmp::max(destination_cycles, source_cycles), None),
            })
        });

        define_decoder!(lut, "10000xxx", Opcode::Add, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10001xxx", Opcode::Adc, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10010xxx", Opcode::Sub, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10011xxx", Opcode::Sbc, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10100xxx", Opcode::And, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10101xxx", Opcode::Xor, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10110xxx", Opcode::Or, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));
        define_decoder!(lut, "10111xxx", Opcode::Cp, |_, _, byte, opcode| Sm83::alu_register(byte, opcode));

        define_decoder!(lut, "11000110", Opcode::Add, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11001110", Opcode::Adc, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11010110", Opcode::Sub, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11011110", Opcode::Sbc, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11100110", Opcode::And, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11101110", Opcode::Xor, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11110110", Opcode::Or, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));
        define_decoder!(lut, "11111110", Opcode::Cp, |mmu, pc, _, opcode| Sm83::alu_immediate(mmu, pc, opcode));

        // ret
        define_decoder!(lut, "11001001", Opcode::Ret, |_, _, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        });

        // ret cond
        define_decoder!(lut, "110xx000", Opcode::Ret, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Sm83::lookup_condition(byte >> 3))),
                rhs: None,
                length: 1,
                cycles: (20, Some(8)),
            })
        });

        // jp imm16
        define_decoder!(lut, "11000011", Opcode::Jp, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Direct)),
                length: 3,
                cycles: (16, None),
            })
        });

        // jp cond, imm16
        define_decoder!(lut, "110xx010", Opcode::Jp, |mmu, pc, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Sm83::lookup_condition(byte >> 3))),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Direct)),
                length: 3,
                cycles: (16, Some(12)),
            })
        });

        // jp hl
        define_decoder!(lut, "11101001", Opcode::Jp, |_, _, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                length: 1,
                cycles: (4, None),
            })
        });

        // call imm16
        define_decoder!(lut, "11001101", Opcode::Call, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Condition::None)),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Direct)),
                length: 3,
                cycles: (24, None),
            })
        });

        // call cond, imm16
        define_decoder!(lut, "110xx100", Opcode::Call, |mmu, pc, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Conditional(Sm83::lookup_condition(byte >> 3))),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Direct)),
                length: 3,
                cycles: (24, Some(12)),
            })
        });

        // pop r16
        define_decoder!(lut, "11xx0001", Opcode::Pop, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_stack_register(byte >> 4), AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (12, None),
            })
        });

        // push r16
        define_decoder!(lut, "11xx0101", Opcode::Push, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Sm83::lookup_stack_register(byte >> 4), AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        });

        // rst vector
        define_decoder!(lut, "11xxx111", Opcode::Rst, |_, _, byte, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm8(byte & 0b0011_1000, AddressingMode::Direct)),
                rhs: None,
                length: 1,
                cycles: (16, None),
            })
        });

        // ldh (imm8), A
        define_decoder!(lut, "11100000", Opcode::Ldh, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm8(Sm83::imm8(mmu, pc), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 2,
                cycles: (12, None),
            })
        });

        // ldh A, (imm8)
        define_decoder!(lut, "11110000", Opcode::Ldh, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Imm8(Sm83::imm8(mmu, pc), AddressingMode::Indirect)),
                length: 2,
                cycles: (12, None),
            })
        });

        // ld (C), A
        define_decoder!(lut, "11100010", Opcode::Ld, |_, _, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::C, AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        });

        // ld A, (C)
        define_decoder!(lut, "11110010", Opcode::Ld, |_, _, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Reg8(Register::C, AddressingMode::Indirect)),
                length: 1,
                cycles: (8, None),
            })
        });

        // ld (imm16), A
        define_decoder!(lut, "11101010", Opcode::Ld, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Indirect)),
                rhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                length: 3,
                cycles: (16, None),
            })
        });

        // ld A, (imm16)
        define_decoder!(lut, "11111010", Opcode::Ld, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg8(Register::A, AddressingMode::Direct)),
                rhs: Some(Operand::Imm16(Sm83::imm16(mmu, pc), AddressingMode::Indirect)),
                length: 3,
                cycles: (16, None),
            })
        });

        // add sp, imm8
        define_decoder!(lut, "11101000", Opcode::Add, |mmu, pc, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                rhs: Some(Operand::Offset(Sm83::imm8(mmu, pc) as i8)),
                length: 2,
                cycles: (16, None),
            })
        });

        // ld hl, sp+/-imm8
        define_decoder!(lut, "11111000", Opcode::Ld, |mmu, pc, _, opcode| {
            let offset = Sm83::imm8(mmu, pc) as i8;

            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                rhs: Some(Operand::DisplacedReg16(Register::SP, offset, AddressingMode::Direct)),
                length: 2,
                cycles: (12, None),
            })
        });

        // ld sp, hl
        define_decoder!(lut, "11111001", Opcode::Ld, |_, _, _, opcode| {
            Ok(Instruction {
                opcode,
                lhs: Some(Operand::Reg16(Register::SP, AddressingMode::Direct)),
                rhs: Some(Operand::Reg16(Register::HL, AddressingMode::Direct)),
                length: 1,
                cycles: (8, None),
            })
        });
    }

    fn propagate_decoders_prefixed(lut: &mut DecoderTable) {
        define_decoder!(lut, "00000xxx", Opcode::Rlc, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00001xxx", Opcode::Rrc, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00010xxx", Opcode::Rl, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00011xxx", Opcode::Rr, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00100xxx", Opcode::Sla, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00101xxx", Opcode::Sra, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00110xxx", Opcode::Swap, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));
        define_decoder!(lut, "00111xxx", Opcode::Srl, |_, _, byte, opcode| Sm83::prefixed_unary(byte, opcode));

        // bit only reads (HL), so it is faster than res/set
        define_decoder!(lut, "01xxxxxx", Opcode::Bit, |_, _, byte, opcode| Sm83::prefixed_bit(byte, opcode, 12));
        define_decoder!(lut, "10xxxxxx", Opcode::Res, |_, _, byte, opcode| Sm83::prefixed_bit(byte, opcode, 16));
        define_decoder!(lut, "11xxxxxx", Opcode::Set, |_, _, byte, opcode| Sm83::prefixed_bit(byte, opcode, 16));
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut output = format!("{:?}", self.opcode).to_lowercase();

        let mut ignore_destination = false;
        if let Some(destination) = &self.lhs {
            match destination {
                Operand::Conditional(cond) if *cond == Condition::None => ignore_destination = true,
                _ => output.push_str(&format!(" {}", destination)),
            };
        }

        if let Some(source) = &self.rhs {
            if !ignore_destination {
                output.push_str(&format!(", {}", source));
            } else {
                output.push_str(&format!(" {}", source));
            }
        }

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Register::A => "a",
            Register::B => "b",
            Register::C => "c",
            Register::D => "d",
            Register::E => "e",
            Register::H => "h",
            Register::L => "l",
            Register::F => "f",
            Register::AF => "af",
            Register::BC => "bc",
            Register::DE => "de",
            Register::HL => "hl",
            Register::SP => "sp",
            Register::PC => "pc",
        };

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::Indirect) => write!(f, "({})", reg),
            Operand::Reg8(reg, _) => write!(f, "{}", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Increment) => write!(f, "({}+)", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Decrement) => write!(f, "({}-)", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::Indirect) => write!(f, "({})", reg),
            Operand::Reg16(reg, _) => write!(f, "{}", reg),
            Operand::Imm8(value, mode) if mode.contains(AddressingMode::Indirect) => write!(f, "(${:02x})", value),
            Operand::Imm8(value, _) => write!(f, "${:02x}", value),
            Operand::Imm16(value, mode) if mode.contains(AddressingMode::Indirect) => write!(f, "(${:04x})", value),
            Operand::Imm16(value, _) => write!(f, "${:04x}", value),
            Operand::Conditional(cond) => write!(f, "{}", cond),
            Operand::Offset(value) if *value >= 0 => write!(f, "+{}", value),
            Operand::Offset(value) => write!(f, "{}", value),
            Operand::Bit(value) => write!(f, "{}", value),
            Operand::DisplacedReg16(reg, value, _) if *value >= 0 => write!(f, "{}+{}", reg, value),
            Operand::DisplacedReg16(reg, value, _) => write!(f, "{}{}", reg, value),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Condition::None => "",
            Condition::NZ => "nz",
            Condition::Z => "z",
            Condition::NC => "nc",
            Condition::C => "c",
        };

        write!(f, "{}", output)
    }
}
