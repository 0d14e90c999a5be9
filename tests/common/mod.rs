#![allow(dead_code)]

use gbcore::cpu::{Cpu, CpuBus};
use gbcore::error::BusError;

const IF_ADDR: usize = 0xFF0F;
const IE_ADDR: usize = 0xFFFF;

/// Minimal bus for testing: flat 64KB read/write memory, no peripherals.
/// IF and IE live in the array at their usual addresses.
pub struct TestBus {
    pub memory: [u8; 0x10000],
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl CpuBus for TestBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        Ok(self.memory[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.memory[addr as usize] = value;
        Ok(())
    }

    fn interrupt_enable(&self) -> u8 {
        self.memory[IE_ADDR]
    }

    fn interrupt_flag(&self) -> u8 {
        self.memory[IF_ADDR] & 0x1F
    }

    fn set_interrupt_flag(&mut self, value: u8) {
        self.memory[IF_ADDR] = value & 0x1F;
    }
}

/// CPU at PC 0 with SP at the top of high RAM, and a bus holding `program`
/// at address 0.
pub fn setup(program: &[u8]) -> (Cpu, TestBus) {
    let mut cpu = Cpu::new();
    cpu.regs.sp = 0xFFFE;
    let mut bus = TestBus::new();
    bus.load(0, program);
    (cpu, bus)
}

pub fn run_instruction(cpu: &mut Cpu, bus: &mut TestBus) -> u64 {
    cpu.step(bus).expect("instruction should execute")
}
