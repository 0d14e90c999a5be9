//! Instruction handlers, one per mnemonic family.
//!
//! Every handler runs after operand fetch, so the opcode fetch and any
//! immediate or (HL) reads are already accounted. A handler ticks only the
//! bus accesses and internal delays it adds on top of that.

use super::{Cpu, CpuBus};
use crate::error::CpuError;
use crate::instructions::{AddrMode, Condition, Mnemonic};
use crate::registers::Register;

pub(super) type Handler = fn(&mut Cpu, &mut dyn CpuBus) -> Result<(), CpuError>;

pub(super) fn handler_for(mnemonic: Mnemonic) -> Handler {
    match mnemonic {
        Mnemonic::Nop => nop,
        Mnemonic::Ld => ld,
        Mnemonic::Ldh => ldh,
        Mnemonic::Inc => inc,
        Mnemonic::Dec => dec,
        Mnemonic::Rlca => rlca,
        Mnemonic::Rrca => rrca,
        Mnemonic::Rla => rla,
        Mnemonic::Rra => rra,
        Mnemonic::Add => add,
        Mnemonic::Adc => adc,
        Mnemonic::Sub => sub,
        Mnemonic::Sbc => sbc,
        Mnemonic::And => and,
        Mnemonic::Xor => xor,
        Mnemonic::Or => or,
        Mnemonic::Cp => cp,
        Mnemonic::Daa => daa,
        Mnemonic::Cpl => cpl,
        Mnemonic::Scf => scf,
        Mnemonic::Ccf => ccf,
        Mnemonic::Jr => jr,
        Mnemonic::Jp => jp,
        Mnemonic::Call => call,
        Mnemonic::Ret => ret,
        Mnemonic::Reti => reti,
        Mnemonic::Rst => rst,
        Mnemonic::Push => push,
        Mnemonic::Pop => pop,
        Mnemonic::Di => di,
        Mnemonic::Ei => ei,
        Mnemonic::Halt => halt,
        Mnemonic::Stop => stop,
        Mnemonic::Prefix => prefix,
        Mnemonic::Illegal => illegal,
        Mnemonic::Rlc => rlc,
        Mnemonic::Rrc => rrc,
        Mnemonic::Rl => rl,
        Mnemonic::Rr => rr,
        Mnemonic::Sla => sla,
        Mnemonic::Sra => sra,
        Mnemonic::Swap => swap,
        Mnemonic::Srl => srl,
        Mnemonic::Bit => bit,
        Mnemonic::Res => res,
        Mnemonic::Set => set,
    }
}

fn nop(_cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    Ok(())
}

// Loads

fn ld(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let inst = cpu.ctx.instruction;

    if cpu.ctx.dest_is_mem {
        // LD (a16),SP is the only 16-bit store
        if inst.reg2.is_16bit() {
            return cpu.write16(bus, cpu.ctx.mem_dest, cpu.ctx.fetched_data);
        }
        return cpu.write8(bus, cpu.ctx.mem_dest, cpu.ctx.fetched_data as u8);
    }

    if inst.mode == AddrMode::HL_SPR {
        let sp = cpu.regs.read(inst.reg2)?;
        let offset = cpu.ctx.fetched_data as u8;
        let result = add_sp_offset(cpu, sp, offset);
        cpu.regs.write(inst.reg1, result)?;
        cpu.emulate_cycles(1);
        return Ok(());
    }

    if inst.reg1 == Register::SP && inst.reg2 == Register::HL {
        // LD SP,HL moves 16 bits over the 8-bit data path
        cpu.emulate_cycles(1);
    }

    cpu.regs.write(inst.reg1, cpu.ctx.fetched_data)
}

fn ldh(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    if cpu.ctx.dest_is_mem {
        cpu.write8(bus, cpu.ctx.mem_dest, cpu.regs.a)
    } else {
        let addr = 0xFF00 | (cpu.ctx.fetched_data & 0xFF);
        cpu.regs.a = cpu.read8(bus, addr)?;
        Ok(())
    }
}

/// SP + signed e8 with H and C taken from the unsigned low-byte addition.
/// Shared by ADD SP,e8 and LD HL,SP+e8.
fn add_sp_offset(cpu: &mut Cpu, sp: u16, offset: u8) -> u16 {
    let half_carry = (sp & 0x0F) + (offset as u16 & 0x0F) > 0x0F;
    let carry = (sp & 0xFF) + offset as u16 > 0xFF;
    cpu.regs.set_flags(false, false, half_carry, carry);
    sp.wrapping_add(offset as i8 as i16 as u16)
}

// 8/16-bit increment and decrement

fn inc(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let inst = cpu.ctx.instruction;

    if inst.reg1.is_16bit() && !cpu.ctx.dest_is_mem {
        cpu.emulate_cycles(1);
        return cpu.regs.write(inst.reg1, cpu.ctx.fetched_data.wrapping_add(1));
    }

    let result = (cpu.ctx.fetched_data as u8).wrapping_add(1);
    cpu.regs.set_zero(result == 0);
    cpu.regs.set_subtract(false);
    cpu.regs.set_half_carry(result & 0x0F == 0);
    write_back(cpu, bus, result)
}

fn dec(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let inst = cpu.ctx.instruction;

    if inst.reg1.is_16bit() && !cpu.ctx.dest_is_mem {
        cpu.emulate_cycles(1);
        return cpu.regs.write(inst.reg1, cpu.ctx.fetched_data.wrapping_sub(1));
    }

    let result = (cpu.ctx.fetched_data as u8).wrapping_sub(1);
    cpu.regs.set_zero(result == 0);
    cpu.regs.set_subtract(true);
    cpu.regs.set_half_carry(result & 0x0F == 0x0F);
    write_back(cpu, bus, result)
}

/// Store an 8-bit result to wherever the operand came from: (HL) or reg1.
fn write_back(cpu: &mut Cpu, bus: &mut dyn CpuBus, value: u8) -> Result<(), CpuError> {
    if cpu.ctx.dest_is_mem {
        cpu.write8(bus, cpu.ctx.mem_dest, value)
    } else {
        cpu.regs.write(cpu.ctx.instruction.reg1, value as u16)
    }
}

// Accumulator rotates. Z is always cleared, unlike the CB-page versions.

fn rlca(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let a = cpu.regs.a;
    cpu.regs.a = a.rotate_left(1);
    cpu.regs.set_flags(false, false, false, a & 0x80 != 0);
    Ok(())
}

fn rrca(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let a = cpu.regs.a;
    cpu.regs.a = a.rotate_right(1);
    cpu.regs.set_flags(false, false, false, a & 0x01 != 0);
    Ok(())
}

fn rla(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let a = cpu.regs.a;
    cpu.regs.a = (a << 1) | cpu.regs.carry() as u8;
    cpu.regs.set_flags(false, false, false, a & 0x80 != 0);
    Ok(())
}

fn rra(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let a = cpu.regs.a;
    cpu.regs.a = (a >> 1) | ((cpu.regs.carry() as u8) << 7);
    cpu.regs.set_flags(false, false, false, a & 0x01 != 0);
    Ok(())
}

// Arithmetic

fn add(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let inst = cpu.ctx.instruction;
    let value = cpu.ctx.fetched_data;

    match inst.reg1 {
        Register::HL => {
            // Z is left alone; H and C come from bits 11 and 15
            let hl = cpu.regs.hl();
            let (result, carry) = hl.overflowing_add(value);
            cpu.regs.set_subtract(false);
            cpu.regs.set_half_carry((hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
            cpu.regs.set_carry(carry);
            cpu.regs.set_hl(result);
            cpu.emulate_cycles(1);
        }
        Register::SP => {
            let sp = cpu.regs.sp;
            cpu.regs.sp = add_sp_offset(cpu, sp, value as u8);
            cpu.emulate_cycles(2);
        }
        Register::A => {
            let a = cpu.regs.a;
            let value = value as u8;
            let (result, carry) = a.overflowing_add(value);
            cpu.regs.set_flags(result == 0, false, (a & 0x0F) + (value & 0x0F) > 0x0F, carry);
            cpu.regs.a = result;
        }
        register => {
            return Err(CpuError::InvalidRegister {
                register,
                context: "ADD destination",
            })
        }
    }
    Ok(())
}

fn adc(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let a = cpu.regs.a;
    let value = cpu.ctx.fetched_data as u8;
    let carry_in = cpu.regs.carry() as u8;
    let sum = a as u16 + value as u16 + carry_in as u16;
    let result = sum as u8;
    cpu.regs.set_flags(
        result == 0,
        false,
        (a & 0x0F) + (value & 0x0F) + carry_in > 0x0F,
        sum > 0xFF,
    );
    cpu.regs.a = result;
    Ok(())
}

/// A - value - carry_in, flags set as for SUB/SBC/CP.
fn subtract(cpu: &mut Cpu, value: u8, carry_in: u8) -> u8 {
    let a = cpu.regs.a;
    let result = a.wrapping_sub(value).wrapping_sub(carry_in);
    cpu.regs.set_flags(
        result == 0,
        true,
        (a & 0x0F) < (value & 0x0F) + carry_in,
        (a as u16) < value as u16 + carry_in as u16,
    );
    result
}

fn sub(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.ctx.fetched_data as u8;
    cpu.regs.a = subtract(cpu, value, 0);
    Ok(())
}

fn sbc(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.ctx.fetched_data as u8;
    let carry_in = cpu.regs.carry() as u8;
    cpu.regs.a = subtract(cpu, value, carry_in);
    Ok(())
}

fn cp(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.ctx.fetched_data as u8;
    subtract(cpu, value, 0);
    Ok(())
}

// Logic

fn and(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.regs.a &= cpu.ctx.fetched_data as u8;
    cpu.regs.set_flags(cpu.regs.a == 0, false, true, false);
    Ok(())
}

fn xor(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.regs.a ^= cpu.ctx.fetched_data as u8;
    cpu.regs.set_flags(cpu.regs.a == 0, false, false, false);
    Ok(())
}

fn or(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.regs.a |= cpu.ctx.fetched_data as u8;
    cpu.regs.set_flags(cpu.regs.a == 0, false, false, false);
    Ok(())
}

fn daa(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let mut a = cpu.regs.a;
    let mut carry = cpu.regs.carry();

    if !cpu.regs.subtract() {
        if carry || a > 0x99 {
            a = a.wrapping_add(0x60);
            carry = true;
        }
        if cpu.regs.half_carry() || (a & 0x0F) > 0x09 {
            a = a.wrapping_add(0x06);
        }
    } else {
        if carry {
            a = a.wrapping_sub(0x60);
        }
        if cpu.regs.half_carry() {
            a = a.wrapping_sub(0x06);
        }
    }

    cpu.regs.a = a;
    cpu.regs.set_zero(a == 0);
    cpu.regs.set_half_carry(false);
    cpu.regs.set_carry(carry);
    Ok(())
}

fn cpl(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.regs.a = !cpu.regs.a;
    cpu.regs.set_subtract(true);
    cpu.regs.set_half_carry(true);
    Ok(())
}

fn scf(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.regs.set_subtract(false);
    cpu.regs.set_half_carry(false);
    cpu.regs.set_carry(true);
    Ok(())
}

fn ccf(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let carry = cpu.regs.carry();
    cpu.regs.set_subtract(false);
    cpu.regs.set_half_carry(false);
    cpu.regs.set_carry(!carry);
    Ok(())
}

// Control flow

fn jr(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let rel = cpu.ctx.fetched_data as u8 as i8;
    let addr = cpu.regs.pc.wrapping_add(rel as i16 as u16);
    cpu.goto_addr(bus, addr, false)
}

fn jp(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    if cpu.ctx.instruction.mode == AddrMode::R {
        // JP HL: no extra cycle to load PC
        cpu.regs.pc = cpu.ctx.fetched_data;
        return Ok(());
    }
    cpu.goto_addr(bus, cpu.ctx.fetched_data, false)
}

fn call(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.goto_addr(bus, cpu.ctx.fetched_data, true)
}

fn rst(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let vector = cpu.ctx.instruction.param as u16;
    cpu.goto_addr(bus, vector, true)
}

fn ret(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    if cpu.ctx.instruction.cond != Condition::None {
        // Evaluating the condition costs a cycle whether or not it holds
        cpu.emulate_cycles(1);
    }

    if cpu.check_condition() {
        cpu.regs.pc = cpu.pop16(bus)?;
        cpu.emulate_cycles(1);
    }
    Ok(())
}

fn reti(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.ime = true;
    ret(cpu, bus)
}

// Stack

fn push(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.regs.read(cpu.ctx.instruction.reg1)?;
    cpu.emulate_cycles(1);
    cpu.push16(bus, value)
}

fn pop(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let reg = cpu.ctx.instruction.reg1;
    let mut value = cpu.pop16(bus)?;
    if reg == Register::AF {
        value &= 0xFFF0;
    }
    cpu.regs.write(reg, value)
}

// Interrupt gating and low-power states

fn di(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.ime = false;
    cpu.ime_pending = false;
    Ok(())
}

fn ei(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    cpu.ime_pending = true;
    Ok(())
}

fn halt(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    log::debug!("HALT at 0x{:04X}", cpu.ctx.pc);
    cpu.halted = true;
    Ok(())
}

fn stop(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    // The padding byte after STOP is skipped, not read
    cpu.regs.pc = cpu.regs.pc.wrapping_add(1);
    log::debug!("STOP at 0x{:04X}", cpu.ctx.pc);
    cpu.stopped = true;
    Ok(())
}

fn prefix(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    Err(CpuError::DecodeInconsistency {
        opcode: cpu.ctx.opcode,
        detail: "prefix reached execution without a CB-page decode",
    })
}

fn illegal(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    Err(CpuError::IllegalOpcode {
        opcode: cpu.ctx.opcode,
        pc: cpu.ctx.pc,
    })
}

// 0xCB page. The operand is in fetched_data; results go back through write_back.

fn rotate(cpu: &mut Cpu, bus: &mut dyn CpuBus, result: u8, carry: bool) -> Result<(), CpuError> {
    cpu.regs.set_flags(result == 0, false, false, carry);
    write_back(cpu, bus, result)
}

fn rlc(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, v.rotate_left(1), v & 0x80 != 0)
}

fn rrc(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, v.rotate_right(1), v & 0x01 != 0)
}

fn rl(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    let result = (v << 1) | cpu.regs.carry() as u8;
    rotate(cpu, bus, result, v & 0x80 != 0)
}

fn rr(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    let result = (v >> 1) | ((cpu.regs.carry() as u8) << 7);
    rotate(cpu, bus, result, v & 0x01 != 0)
}

fn sla(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, v << 1, v & 0x80 != 0)
}

fn sra(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, (v >> 1) | (v & 0x80), v & 0x01 != 0)
}

fn swap(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, v.rotate_left(4), false)
}

fn srl(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let v = cpu.ctx.fetched_data as u8;
    rotate(cpu, bus, v >> 1, v & 0x01 != 0)
}

fn bit(cpu: &mut Cpu, _bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let mask = 1u8 << cpu.ctx.instruction.param;
    let v = cpu.ctx.fetched_data as u8;
    cpu.regs.set_zero(v & mask == 0);
    cpu.regs.set_subtract(false);
    cpu.regs.set_half_carry(true);
    Ok(())
}

fn res(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.ctx.fetched_data as u8 & !(1u8 << cpu.ctx.instruction.param);
    write_back(cpu, bus, value)
}

fn set(cpu: &mut Cpu, bus: &mut dyn CpuBus) -> Result<(), CpuError> {
    let value = cpu.ctx.fetched_data as u8 | (1u8 << cpu.ctx.instruction.param);
    write_back(cpu, bus, value)
}
