mod fetch;
mod handlers;

use log::trace;

use crate::error::{BusError, CpuError};
use crate::instructions::{decode, decode_cb, Condition, Instruction, Mnemonic};
use crate::registers::Registers;
use crate::trace::{disassemble, trace_line};

/// Clock cycles per machine cycle. Every bus access the processor makes
/// takes one machine cycle.
pub const CLOCKS_PER_MACHINE_CYCLE: u64 = 4;

pub trait CpuBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;

    /// Little-endian word read, always done as two byte reads (low first).
    fn read16(&mut self, addr: u16) -> Result<u16, BusError> {
        let low = self.read(addr)?;
        let high = self.read(addr.wrapping_add(1))?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Little-endian word write, always done as two byte writes (low first).
    fn write16(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        let [low, high] = value.to_le_bytes();
        self.write(addr, low)?;
        self.write(addr.wrapping_add(1), high)
    }

    /// IE register (0xFFFF).
    fn interrupt_enable(&self) -> u8 {
        0
    }

    /// IF register (0xFF0F), low five bits.
    fn interrupt_flag(&self) -> u8 {
        0
    }

    fn set_interrupt_flag(&mut self, _value: u8) {
        // Default: no interrupt sources
    }
}

/// Interrupt sources in priority order. The discriminant is the bit in IE/IF.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub fn mask(self) -> u8 {
        1 << (self as u8)
    }

    pub fn vector(self) -> u16 {
        0x0040 + 8 * (self as u16)
    }

    /// Highest-priority source set in `pending`.
    pub fn highest(pending: u8) -> Option<Interrupt> {
        Self::ALL.into_iter().find(|i| pending & i.mask() != 0)
    }
}

/// Per-step scratch state. Rebuilt from scratch at the start of every step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    /// Address the opcode was fetched from.
    pub pc: u16,
    pub opcode: u8,
    /// Second opcode byte for the 0xCB page.
    pub cb_opcode: Option<u8>,
    pub instruction: &'static Instruction,
    /// Raw immediate operand bytes as they appeared in the stream.
    pub operand: u16,
    pub fetched_data: u16,
    pub dest_is_mem: bool,
    pub mem_dest: u16,
}

impl Default for StepContext {
    fn default() -> Self {
        Self {
            pc: 0,
            opcode: 0,
            cb_opcode: None,
            instruction: decode(0x00),
            operand: 0,
            fetched_data: 0,
            dest_is_mem: false,
            mem_dest: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub regs: Registers,
    /// Clock cycles since power-on.
    pub cycles: u64,
    /// Interrupt master enable.
    pub ime: bool,
    /// Set by EI; becomes `ime` at the start of the next step.
    pub ime_pending: bool,
    pub halted: bool,
    pub stopped: bool,
    pub ctx: StepContext,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            ime: false,
            ime_pending: false,
            halted: false,
            stopped: false,
            ctx: StepContext::default(),
        }
    }

    /// CPU as the boot ROM leaves it, about to run the cartridge at 0x0100.
    pub fn post_boot() -> Self {
        Self {
            regs: Registers::post_boot(),
            ..Self::new()
        }
    }

    /// Run one instruction (or service one interrupt, or idle one machine
    /// cycle while halted). Returns the clock cycles it took.
    pub fn step(&mut self, bus: &mut dyn CpuBus) -> Result<u64, CpuError> {
        let start = self.cycles;
        self.ctx = StepContext {
            pc: self.regs.pc,
            ..StepContext::default()
        };

        if self.service_interrupt(bus)? {
            return Ok(self.cycles - start);
        }

        // EI takes effect one step late
        if self.ime_pending {
            self.ime = true;
            self.ime_pending = false;
        }

        if self.halted || self.stopped {
            self.emulate_cycles(1);
            return Ok(self.cycles - start);
        }

        let opcode = self.fetch_byte(bus)?;
        let mut instruction = decode(opcode);
        if instruction.mnemonic == Mnemonic::Prefix {
            let cb_opcode = self.fetch_byte(bus)?;
            self.ctx.cb_opcode = Some(cb_opcode);
            instruction = decode_cb(cb_opcode);
        }
        self.ctx.opcode = opcode;
        self.ctx.instruction = instruction;

        if instruction.mnemonic == Mnemonic::Illegal {
            return Err(CpuError::IllegalOpcode {
                opcode,
                pc: self.ctx.pc,
            });
        }

        self.fetch_data(bus)?;

        if log::log_enabled!(log::Level::Trace) {
            let text = disassemble(instruction, self.ctx.operand);
            trace!("{}", trace_line(&self.ctx, &text, &self.regs, start));
        }

        let handler = handlers::handler_for(instruction.mnemonic);
        handler(self, bus)?;

        Ok(self.cycles - start)
    }

    /// The only clock: add `m_cycles` machine cycles to the running total.
    #[inline]
    pub fn emulate_cycles(&mut self, m_cycles: u64) {
        self.cycles += m_cycles * CLOCKS_PER_MACHINE_CYCLE;
    }

    fn service_interrupt(&mut self, bus: &mut dyn CpuBus) -> Result<bool, CpuError> {
        let pending = bus.interrupt_enable() & bus.interrupt_flag() & 0x1F;
        if pending == 0 {
            return Ok(false);
        }

        // Any pending source wakes the CPU, even with IME clear
        if self.halted || self.stopped {
            log::debug!("Wake from {} (IE&IF 0x{:02X})", if self.halted { "HALT" } else { "STOP" }, pending);
            self.halted = false;
            self.stopped = false;
        }

        if !self.ime {
            return Ok(false);
        }

        let Some(interrupt) = Interrupt::highest(pending) else {
            return Ok(false);
        };

        self.ime = false;
        self.ime_pending = false;
        bus.set_interrupt_flag(bus.interrupt_flag() & !interrupt.mask());

        // 2 wait states, 2 pushes, 1 cycle to load PC
        self.emulate_cycles(2);
        let pc = self.regs.pc;
        self.push16(bus, pc)?;
        self.regs.pc = interrupt.vector();
        self.emulate_cycles(1);

        log::debug!("Servicing {:?} interrupt, vector 0x{:04X}", interrupt, self.regs.pc);
        Ok(true)
    }

    // Bus access, one machine cycle per byte
    pub fn read8(&mut self, bus: &mut dyn CpuBus, addr: u16) -> Result<u8, CpuError> {
        self.emulate_cycles(1);
        Ok(bus.read(addr)?)
    }

    pub fn write8(&mut self, bus: &mut dyn CpuBus, addr: u16, value: u8) -> Result<(), CpuError> {
        self.emulate_cycles(1);
        Ok(bus.write(addr, value)?)
    }

    pub fn read16(&mut self, bus: &mut dyn CpuBus, addr: u16) -> Result<u16, CpuError> {
        self.emulate_cycles(2);
        Ok(bus.read16(addr)?)
    }

    pub fn write16(&mut self, bus: &mut dyn CpuBus, addr: u16, value: u16) -> Result<(), CpuError> {
        self.emulate_cycles(2);
        Ok(bus.write16(addr, value)?)
    }

    fn fetch_byte(&mut self, bus: &mut dyn CpuBus) -> Result<u8, CpuError> {
        let value = self.read8(bus, self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(value)
    }

    fn fetch_word(&mut self, bus: &mut dyn CpuBus) -> Result<u16, CpuError> {
        let low = self.fetch_byte(bus)? as u16;
        let high = self.fetch_byte(bus)? as u16;
        Ok((high << 8) | low)
    }

    // Stack operations: pre-decrement push, post-increment pop
    pub fn push8(&mut self, bus: &mut dyn CpuBus, value: u8) -> Result<(), CpuError> {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, value)
    }

    pub fn pop8(&mut self, bus: &mut dyn CpuBus) -> Result<u8, CpuError> {
        let value = self.read8(bus, self.regs.sp)?;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok(value)
    }

    /// High byte goes in first, so it ends up at the higher address.
    pub fn push16(&mut self, bus: &mut dyn CpuBus, value: u16) -> Result<(), CpuError> {
        self.push8(bus, (value >> 8) as u8)?;
        self.push8(bus, value as u8)
    }

    pub fn pop16(&mut self, bus: &mut dyn CpuBus) -> Result<u16, CpuError> {
        let low = self.pop8(bus)? as u16;
        let high = self.pop8(bus)? as u16;
        Ok((high << 8) | low)
    }

    fn check_condition(&self) -> bool {
        match self.ctx.instruction.cond {
            Condition::None => true,
            Condition::Z => self.regs.zero(),
            Condition::NZ => !self.regs.zero(),
            Condition::C => self.regs.carry(),
            Condition::NC => !self.regs.carry(),
        }
    }

    /// Shared by JP, JR, CALL and RST. Does nothing when the condition fails.
    fn goto_addr(&mut self, bus: &mut dyn CpuBus, addr: u16, push_pc: bool) -> Result<(), CpuError> {
        if !self.check_condition() {
            return Ok(());
        }
        self.emulate_cycles(1);
        if push_pc {
            let pc = self.regs.pc;
            self.push16(bus, pc)?;
        }
        self.regs.pc = addr;
        Ok(())
    }
}
