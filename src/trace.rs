// CPU instruction tracing: disassembly and per-step state lines

use crate::cpu::StepContext;
use crate::instructions::{AddrMode, Condition, Instruction, Mnemonic};
use crate::registers::{Register, Registers};

/// Render a decoded instruction with its immediate operand (as fetched from
/// the instruction stream, little-endian already resolved).
pub fn disassemble(inst: &Instruction, operand: u16) -> String {
    let name = inst.mnemonic.name();
    let r1 = inst.reg1.name();
    let r2 = inst.reg2.name();

    match inst.mode {
        AddrMode::Implied => match inst.mnemonic {
            Mnemonic::Rst => format!("{} 0x{:02X}", name, inst.param),
            _ if inst.cond != Condition::None => format!("{} {}", name, inst.cond.name()),
            _ => name.to_string(),
        },
        AddrMode::R => match inst.mnemonic {
            Mnemonic::Bit | Mnemonic::Res | Mnemonic::Set => format!("{} {},{}", name, inst.param, r1),
            _ => format!("{} {}", name, r1),
        },
        AddrMode::MR => match inst.mnemonic {
            Mnemonic::Bit | Mnemonic::Res | Mnemonic::Set => format!("{} {},({})", name, inst.param, r1),
            _ => format!("{} ({})", name, r1),
        },
        AddrMode::R_R => format!("{} {},{}", name, r1, r2),
        AddrMode::R_D8 if inst.reg1 == Register::SP => {
            format!("{} SP,{}", name, operand as u8 as i8)
        }
        AddrMode::R_D8 => format!("{} {},0x{:02X}", name, r1, operand),
        AddrMode::R_D16 => format!("{} {},0x{:04X}", name, r1, operand),
        AddrMode::R_MR => format!("{} {},({})", name, r1, r2),
        AddrMode::MR_R => format!("{} ({}),{}", name, r1, r2),
        AddrMode::R_HLI => format!("{} {},(HL+)", name, r1),
        AddrMode::R_HLD => format!("{} {},(HL-)", name, r1),
        AddrMode::HLI_R => format!("{} (HL+),{}", name, r2),
        AddrMode::HLD_R => format!("{} (HL-),{}", name, r2),
        AddrMode::R_A8 => format!("{} {},(0x{:04X})", name, r1, 0xFF00 | operand),
        AddrMode::A8_R => format!("{} (0x{:04X}),{}", name, 0xFF00 | operand, r2),
        AddrMode::HL_SPR => {
            let offset = operand as u8 as i8;
            if offset < 0 {
                format!("{} HL,SP{}", name, offset)
            } else {
                format!("{} HL,SP+{}", name, offset)
            }
        }
        AddrMode::D8 => with_condition(inst, format!("{}", operand as u8 as i8)),
        AddrMode::D16 => with_condition(inst, format!("0x{:04X}", operand)),
        AddrMode::MR_D8 => format!("{} ({}),0x{:02X}", name, r1, operand),
        AddrMode::A16_R => format!("{} (0x{:04X}),{}", name, operand, r2),
        AddrMode::R_A16 => format!("{} {},(0x{:04X})", name, r1, operand),
    }
}

fn with_condition(inst: &Instruction, target: String) -> String {
    match inst.cond {
        Condition::None => format!("{} {}", inst.mnemonic.name(), target),
        cond => format!("{} {},{}", inst.mnemonic.name(), cond.name(), target),
    }
}

/// Raw bytes of the instruction in stream order: opcode, CB page byte,
/// then the immediate operand.
pub fn instruction_bytes(ctx: &StepContext) -> String {
    let mut bytes = vec![ctx.opcode];
    if let Some(cb_opcode) = ctx.cb_opcode {
        bytes.push(cb_opcode);
    }
    let [lo, hi] = ctx.operand.to_le_bytes();
    match ctx.instruction.mode.operand_len() {
        1 => bytes.push(lo),
        2 => bytes.extend([lo, hi]),
        _ => {}
    }
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One trace line: where, what, and the register file before execution.
pub fn trace_line(ctx: &StepContext, text: &str, regs: &Registers, cycles: u64) -> String {
    format!(
        "{:04X} {:<8} {:<18} AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} SP:{:04X} CYC:{}",
        ctx.pc,
        instruction_bytes(ctx),
        text,
        regs.af(),
        regs.bc(),
        regs.de(),
        regs.hl(),
        regs.sp,
        cycles
    )
}
