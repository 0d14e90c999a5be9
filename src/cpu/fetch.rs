//! Operand fetch. Resolves the addressing mode of the decoded instruction
//! into `fetched_data`, and into `mem_dest` when the instruction writes to
//! memory, consuming immediate bytes from the instruction stream.

use super::{Cpu, CpuBus};
use crate::error::CpuError;
use crate::instructions::AddrMode;
use crate::registers::Register;

/// LD (C),A and LD A,(C) address the high page.
fn high_page_if_c(reg: Register, addr: u16) -> u16 {
    if reg == Register::C {
        0xFF00 | addr
    } else {
        addr
    }
}

impl Cpu {
    pub(super) fn fetch_data(&mut self, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
        let inst = self.ctx.instruction;
        self.ctx.dest_is_mem = false;

        match inst.mode {
            AddrMode::Implied => {}

            AddrMode::R => {
                self.ctx.fetched_data = self.regs.read(inst.reg1)?;
            }

            AddrMode::R_R => {
                self.ctx.fetched_data = self.regs.read(inst.reg2)?;
            }

            AddrMode::R_D8 | AddrMode::D8 | AddrMode::HL_SPR | AddrMode::R_A8 => {
                let value = self.fetch_byte(bus)? as u16;
                self.ctx.operand = value;
                self.ctx.fetched_data = value;
            }

            AddrMode::R_D16 | AddrMode::D16 => {
                let value = self.fetch_word(bus)?;
                self.ctx.operand = value;
                self.ctx.fetched_data = value;
            }

            AddrMode::R_MR => {
                let addr = high_page_if_c(inst.reg2, self.regs.read(inst.reg2)?);
                self.ctx.fetched_data = self.read8(bus, addr)? as u16;
            }

            AddrMode::MR_R => {
                self.ctx.fetched_data = self.regs.read(inst.reg2)?;
                self.ctx.mem_dest = high_page_if_c(inst.reg1, self.regs.read(inst.reg1)?);
                self.ctx.dest_is_mem = true;
            }

            AddrMode::R_HLI | AddrMode::R_HLD => {
                let hl = self.regs.hl();
                self.ctx.fetched_data = self.read8(bus, hl)? as u16;
                self.regs.set_hl(if inst.mode == AddrMode::R_HLI {
                    hl.wrapping_add(1)
                } else {
                    hl.wrapping_sub(1)
                });
            }

            AddrMode::HLI_R | AddrMode::HLD_R => {
                let hl = self.regs.hl();
                self.ctx.fetched_data = self.regs.read(inst.reg2)?;
                self.ctx.mem_dest = hl;
                self.ctx.dest_is_mem = true;
                self.regs.set_hl(if inst.mode == AddrMode::HLI_R {
                    hl.wrapping_add(1)
                } else {
                    hl.wrapping_sub(1)
                });
            }

            AddrMode::A8_R => {
                let offset = self.fetch_byte(bus)? as u16;
                self.ctx.operand = offset;
                self.ctx.mem_dest = 0xFF00 | offset;
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = self.regs.read(inst.reg2)?;
            }

            AddrMode::MR_D8 => {
                let value = self.fetch_byte(bus)? as u16;
                self.ctx.operand = value;
                self.ctx.fetched_data = value;
                self.ctx.mem_dest = self.regs.read(inst.reg1)?;
                self.ctx.dest_is_mem = true;
            }

            AddrMode::MR => {
                let addr = self.regs.read(inst.reg1)?;
                self.ctx.mem_dest = addr;
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = self.read8(bus, addr)? as u16;
            }

            AddrMode::A16_R => {
                let addr = self.fetch_word(bus)?;
                self.ctx.operand = addr;
                self.ctx.mem_dest = addr;
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = self.regs.read(inst.reg2)?;
            }

            AddrMode::R_A16 => {
                let addr = self.fetch_word(bus)?;
                self.ctx.operand = addr;
                self.ctx.fetched_data = self.read8(bus, addr)? as u16;
            }
        }

        Ok(())
    }
}
