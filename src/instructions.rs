//! # Instruction Tables
//!
//! Static, read-only descriptors for all 256 base opcodes and all 256
//! opcodes of the 0xCB page. The tables are pure data: they say what an
//! opcode is (mnemonic, addressing mode, register operands, condition,
//! documented cost) and never how it executes. Behavior lives in
//! `cpu::handlers`, keyed by [`Mnemonic`].
//!
//! Both tables are generated at compile time from the regular bit layout of
//! the opcode space (`xx yyy zzz`), the same decomposition the hardware
//! reference uses to present the instruction set.
//!
//! Cycle costs are in clock cycles (4 per machine cycle). For conditional
//! control flow `cycles` is the not-taken cost and `cycles_taken` the taken
//! cost; every other entry has `cycles_taken == 0`.

use crate::registers::Register;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr,
    Jp,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Di,
    Ei,
    Halt,
    Stop,
    /// 0xCB: the next byte selects an entry of the extended table.
    Prefix,
    /// Undefined opcode. Executing it is a fatal error.
    Illegal,
    // 0xCB page
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Nop => "NOP",
            Mnemonic::Ld => "LD",
            Mnemonic::Ldh => "LDH",
            Mnemonic::Inc => "INC",
            Mnemonic::Dec => "DEC",
            Mnemonic::Rlca => "RLCA",
            Mnemonic::Rrca => "RRCA",
            Mnemonic::Rla => "RLA",
            Mnemonic::Rra => "RRA",
            Mnemonic::Add => "ADD",
            Mnemonic::Adc => "ADC",
            Mnemonic::Sub => "SUB",
            Mnemonic::Sbc => "SBC",
            Mnemonic::And => "AND",
            Mnemonic::Xor => "XOR",
            Mnemonic::Or => "OR",
            Mnemonic::Cp => "CP",
            Mnemonic::Daa => "DAA",
            Mnemonic::Cpl => "CPL",
            Mnemonic::Scf => "SCF",
            Mnemonic::Ccf => "CCF",
            Mnemonic::Jr => "JR",
            Mnemonic::Jp => "JP",
            Mnemonic::Call => "CALL",
            Mnemonic::Ret => "RET",
            Mnemonic::Reti => "RETI",
            Mnemonic::Rst => "RST",
            Mnemonic::Push => "PUSH",
            Mnemonic::Pop => "POP",
            Mnemonic::Di => "DI",
            Mnemonic::Ei => "EI",
            Mnemonic::Halt => "HALT",
            Mnemonic::Stop => "STOP",
            Mnemonic::Prefix => "PREFIX CB",
            Mnemonic::Illegal => "???",
            Mnemonic::Rlc => "RLC",
            Mnemonic::Rrc => "RRC",
            Mnemonic::Rl => "RL",
            Mnemonic::Rr => "RR",
            Mnemonic::Sla => "SLA",
            Mnemonic::Sra => "SRA",
            Mnemonic::Swap => "SWAP",
            Mnemonic::Srl => "SRL",
            Mnemonic::Bit => "BIT",
            Mnemonic::Res => "RES",
            Mnemonic::Set => "SET",
        }
    }
}

/// How an instruction locates its operand and its destination.
///
/// `R` is a register, `MR` the memory cell addressed by a register pair,
/// `D8`/`D16` immediate bytes, `A8` a high-page offset and `A16` an absolute
/// address. The left side is the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum AddrMode {
    Implied,
    /// Single register operand (INC B, PUSH BC, JP HL, CB ops on registers).
    R,
    R_R,
    R_D8,
    R_D16,
    /// reg1 <- (reg2). With reg2 == C the address is 0xFF00 + C.
    R_MR,
    /// (reg1) <- reg2. With reg1 == C the address is 0xFF00 + C.
    MR_R,
    /// A <- (HL), then HL += 1
    R_HLI,
    /// A <- (HL), then HL -= 1
    R_HLD,
    /// (HL) <- A, then HL += 1
    HLI_R,
    /// (HL) <- A, then HL -= 1
    HLD_R,
    /// A <- (0xFF00 + a8)
    R_A8,
    /// (0xFF00 + a8) <- A
    A8_R,
    /// HL <- SP + e8
    HL_SPR,
    /// Signed 8-bit displacement (JR).
    D8,
    /// Absolute 16-bit target (JP, CALL).
    D16,
    /// (HL) <- d8
    MR_D8,
    /// Read-modify-write on (HL).
    MR,
    /// (a16) <- reg2
    A16_R,
    /// reg1 <- (a16)
    R_A16,
}

impl AddrMode {
    /// Operand bytes that follow the opcode in the instruction stream.
    pub fn operand_len(self) -> u8 {
        match self {
            AddrMode::R_D8
            | AddrMode::R_A8
            | AddrMode::A8_R
            | AddrMode::HL_SPR
            | AddrMode::D8
            | AddrMode::MR_D8 => 1,
            AddrMode::R_D16 | AddrMode::D16 | AddrMode::A16_R | AddrMode::R_A16 => 2,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    None,
    Z,
    NZ,
    C,
    NC,
}

impl Condition {
    pub fn name(self) -> &'static str {
        match self {
            Condition::None => "",
            Condition::Z => "Z",
            Condition::NZ => "NZ",
            Condition::C => "C",
            Condition::NC => "NC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
    pub reg1: Register,
    pub reg2: Register,
    pub cond: Condition,
    /// RST target address or CB-page bit index.
    pub param: u8,
    pub cycles: u8,
    pub cycles_taken: u8,
}

impl Instruction {
    const fn new(mnemonic: Mnemonic, mode: AddrMode, reg1: Register, reg2: Register, cycles: u8) -> Self {
        Self {
            mnemonic,
            mode,
            reg1,
            reg2,
            cond: Condition::None,
            param: 0,
            cycles,
            cycles_taken: 0,
        }
    }

    const fn implied(mnemonic: Mnemonic, cycles: u8) -> Self {
        Self::new(mnemonic, AddrMode::Implied, Register::None, Register::None, cycles)
    }

    const fn branch(mnemonic: Mnemonic, mode: AddrMode, cond: Condition, cycles: u8, cycles_taken: u8) -> Self {
        let mut inst = Self::new(mnemonic, mode, Register::None, Register::None, cycles);
        inst.cond = cond;
        if !matches!(cond, Condition::None) {
            inst.cycles_taken = cycles_taken;
        }
        inst
    }

    const fn with_param(mut self, param: u8) -> Self {
        self.param = param;
        self
    }

    /// Check that the addressing mode has the register operands it needs and
    /// no stray ones. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), &'static str> {
        use AddrMode::*;
        let r1 = self.reg1 != Register::None;
        let r2 = self.reg2 != Register::None;
        let ok = match self.mode {
            Implied | D8 | D16 => !r1 && !r2,
            R | MR | MR_D8 | R_D8 | R_D16 | R_A16 | R_A8 => r1 && !r2,
            A16_R | A8_R => !r1 && r2,
            R_R | R_MR | MR_R | R_HLI | R_HLD | HLI_R | HLD_R | HL_SPR => r1 && r2,
        };
        if !ok {
            return Err("register operands do not match addressing mode");
        }
        if matches!(self.mode, MR | MR_D8) && self.reg1 != Register::HL {
            return Err("memory operand must be addressed through HL");
        }
        if matches!(self.mode, R_HLI | R_HLD) && (self.reg1 != Register::A || self.reg2 != Register::HL) {
            return Err("HL post-update load must target A from (HL)");
        }
        if matches!(self.mode, HLI_R | HLD_R) && (self.reg1 != Register::HL || self.reg2 != Register::A) {
            return Err("HL post-update store must write A to (HL)");
        }
        let conditional = self.cond != Condition::None;
        let branches = matches!(
            self.mnemonic,
            Mnemonic::Jp | Mnemonic::Jr | Mnemonic::Call | Mnemonic::Ret
        );
        if conditional && !branches {
            return Err("condition on a non-branching instruction");
        }
        if conditional != (self.cycles_taken != 0) {
            return Err("taken cost must be present exactly for conditional entries");
        }
        if conditional && self.cycles_taken <= self.cycles {
            return Err("taken branch must cost more than the fall-through");
        }
        if self.mnemonic == Mnemonic::Illegal {
            return Ok(());
        }
        if self.cycles == 0 || self.cycles % 4 != 0 {
            return Err("cycle cost must be a non-zero multiple of 4");
        }
        Ok(())
    }
}

const ILLEGAL: Instruction = Instruction::implied(Mnemonic::Illegal, 0);

// Operand tables indexed by opcode bit fields. Index 6 of R8 is (HL).
const R8: [Register; 8] = [
    Register::B,
    Register::C,
    Register::D,
    Register::E,
    Register::H,
    Register::L,
    Register::HL,
    Register::A,
];
const RP: [Register; 4] = [Register::BC, Register::DE, Register::HL, Register::SP];
const RP2: [Register; 4] = [Register::BC, Register::DE, Register::HL, Register::AF];
const CC: [Condition; 4] = [Condition::NZ, Condition::Z, Condition::NC, Condition::C];
const ALU: [Mnemonic; 8] = [
    Mnemonic::Add,
    Mnemonic::Adc,
    Mnemonic::Sub,
    Mnemonic::Sbc,
    Mnemonic::And,
    Mnemonic::Xor,
    Mnemonic::Or,
    Mnemonic::Cp,
];
const ROT: [Mnemonic; 8] = [
    Mnemonic::Rlc,
    Mnemonic::Rrc,
    Mnemonic::Rl,
    Mnemonic::Rr,
    Mnemonic::Sla,
    Mnemonic::Sra,
    Mnemonic::Swap,
    Mnemonic::Srl,
];
const ACC_OPS: [Mnemonic; 8] = [
    Mnemonic::Rlca,
    Mnemonic::Rrca,
    Mnemonic::Rla,
    Mnemonic::Rra,
    Mnemonic::Daa,
    Mnemonic::Cpl,
    Mnemonic::Scf,
    Mnemonic::Ccf,
];

const fn decode_base(opcode: u8) -> Instruction {
    use AddrMode::*;
    use Mnemonic::*;

    let x = opcode >> 6;
    let y = ((opcode >> 3) & 7) as usize;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1;

    match x {
        0 => match z {
            0 => match y {
                0 => Instruction::implied(Nop, 4),
                1 => Instruction::new(Ld, A16_R, Register::None, Register::SP, 20),
                2 => Instruction::implied(Stop, 4),
                3 => Instruction::branch(Jr, D8, Condition::None, 12, 0),
                _ => Instruction::branch(Jr, D8, CC[y - 4], 8, 12),
            },
            1 => {
                if q == 0 {
                    Instruction::new(Ld, R_D16, RP[p], Register::None, 12)
                } else {
                    Instruction::new(Add, R_R, Register::HL, RP[p], 8)
                }
            }
            2 => match (q, p) {
                (0, 0) => Instruction::new(Ld, MR_R, Register::BC, Register::A, 8),
                (0, 1) => Instruction::new(Ld, MR_R, Register::DE, Register::A, 8),
                (0, 2) => Instruction::new(Ld, HLI_R, Register::HL, Register::A, 8),
                (0, _) => Instruction::new(Ld, HLD_R, Register::HL, Register::A, 8),
                (_, 0) => Instruction::new(Ld, R_MR, Register::A, Register::BC, 8),
                (_, 1) => Instruction::new(Ld, R_MR, Register::A, Register::DE, 8),
                (_, 2) => Instruction::new(Ld, R_HLI, Register::A, Register::HL, 8),
                (_, _) => Instruction::new(Ld, R_HLD, Register::A, Register::HL, 8),
            },
            3 => {
                let mnemonic = if q == 0 { Inc } else { Dec };
                Instruction::new(mnemonic, R, RP[p], Register::None, 8)
            }
            4 | 5 => {
                let mnemonic = if z == 4 { Inc } else { Dec };
                if y == 6 {
                    Instruction::new(mnemonic, MR, Register::HL, Register::None, 12)
                } else {
                    Instruction::new(mnemonic, R, R8[y], Register::None, 4)
                }
            }
            6 => {
                if y == 6 {
                    Instruction::new(Ld, MR_D8, Register::HL, Register::None, 12)
                } else {
                    Instruction::new(Ld, R_D8, R8[y], Register::None, 8)
                }
            }
            _ => Instruction::implied(ACC_OPS[y], 4),
        },
        1 => {
            let zi = z as usize;
            if y == 6 && zi == 6 {
                Instruction::implied(Halt, 4)
            } else if y == 6 {
                Instruction::new(Ld, MR_R, Register::HL, R8[zi], 8)
            } else if zi == 6 {
                Instruction::new(Ld, R_MR, R8[y], Register::HL, 8)
            } else {
                Instruction::new(Ld, R_R, R8[y], R8[zi], 4)
            }
        }
        2 => {
            let zi = z as usize;
            if zi == 6 {
                Instruction::new(ALU[y], R_MR, Register::A, Register::HL, 8)
            } else {
                Instruction::new(ALU[y], R_R, Register::A, R8[zi], 4)
            }
        }
        _ => match z {
            0 => match y {
                0..=3 => Instruction::branch(Ret, Implied, CC[y], 8, 20),
                4 => Instruction::new(Ldh, A8_R, Register::None, Register::A, 12),
                5 => Instruction::new(Add, R_D8, Register::SP, Register::None, 16),
                6 => Instruction::new(Ldh, R_A8, Register::A, Register::None, 12),
                _ => Instruction::new(Ld, HL_SPR, Register::HL, Register::SP, 12),
            },
            1 => match (q, p) {
                (0, _) => Instruction::new(Pop, R, RP2[p], Register::None, 12),
                (_, 0) => Instruction::implied(Ret, 16),
                (_, 1) => Instruction::implied(Reti, 16),
                (_, 2) => Instruction::new(Jp, R, Register::HL, Register::None, 4),
                (_, _) => Instruction::new(Ld, R_R, Register::SP, Register::HL, 8),
            },
            2 => match y {
                0..=3 => Instruction::branch(Jp, D16, CC[y], 12, 16),
                4 => Instruction::new(Ld, MR_R, Register::C, Register::A, 8),
                5 => Instruction::new(Ld, A16_R, Register::None, Register::A, 16),
                6 => Instruction::new(Ld, R_MR, Register::A, Register::C, 8),
                _ => Instruction::new(Ld, R_A16, Register::A, Register::None, 16),
            },
            3 => match y {
                0 => Instruction::branch(Jp, D16, Condition::None, 16, 0),
                1 => Instruction::implied(Prefix, 4),
                6 => Instruction::implied(Di, 4),
                7 => Instruction::implied(Ei, 4),
                _ => ILLEGAL,
            },
            4 => match y {
                0..=3 => Instruction::branch(Call, D16, CC[y], 12, 24),
                _ => ILLEGAL,
            },
            5 => match (q, p) {
                (0, _) => Instruction::new(Push, R, RP2[p], Register::None, 16),
                (_, 0) => Instruction::branch(Call, D16, Condition::None, 24, 0),
                _ => ILLEGAL,
            },
            6 => Instruction::new(ALU[y], R_D8, Register::A, Register::None, 8),
            _ => Instruction::implied(Rst, 16).with_param((y as u8) * 8),
        },
    }
}

const fn decode_extended(opcode: u8) -> Instruction {
    let x = opcode >> 6;
    let y = ((opcode >> 3) & 7) as usize;
    let z = (opcode & 7) as usize;

    let (mnemonic, param) = match x {
        0 => (ROT[y], 0),
        1 => (Mnemonic::Bit, y as u8),
        2 => (Mnemonic::Res, y as u8),
        _ => (Mnemonic::Set, y as u8),
    };

    if z == 6 {
        // (HL): BIT only reads, the rest read-modify-write
        let cycles = if x == 1 { 12 } else { 16 };
        Instruction::new(mnemonic, AddrMode::MR, Register::HL, Register::None, cycles).with_param(param)
    } else {
        Instruction::new(mnemonic, AddrMode::R, R8[z], Register::None, 8).with_param(param)
    }
}

const fn build_table(extended: bool) -> [Instruction; 256] {
    let mut table = [ILLEGAL; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if extended {
            decode_extended(i as u8)
        } else {
            decode_base(i as u8)
        };
        i += 1;
    }
    table
}

/// Base opcode page.
pub static INSTRUCTIONS: [Instruction; 256] = build_table(false);

/// Opcodes following the 0xCB prefix.
pub static CB_INSTRUCTIONS: [Instruction; 256] = build_table(true);

pub const PREFIX_CB: u8 = 0xCB;

#[inline]
pub fn decode(opcode: u8) -> &'static Instruction {
    &INSTRUCTIONS[opcode as usize]
}

#[inline]
pub fn decode_cb(opcode: u8) -> &'static Instruction {
    &CB_INSTRUCTIONS[opcode as usize]
}
