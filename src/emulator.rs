use crate::cartridge::CartridgeAdapter;
use crate::cpu::{Cpu, CpuBus, Interrupt};
use crate::error::CpuError;
use crate::memory::MemoryBus;
use crate::{CPU_CLOCK_HZ, CYCLES_PER_FRAME};
use log::{debug, error};

/// Processor plus the bus it drives. The only owner of either.
pub struct Emulator {
    pub cpu: Cpu,
    pub bus: MemoryBus,
    frame_cycles: u64, // Clock cycles into the current frame
    frame_count: u64,
}

impl Emulator {
    /// Starts in the post-boot state, PC at the cartridge entry point.
    pub fn new(cartridge: Box<dyn CartridgeAdapter>) -> Self {
        Self {
            cpu: Cpu::post_boot(),
            bus: MemoryBus::new(cartridge),
            frame_cycles: 0,
            frame_count: 0,
        }
    }

    /// Execute one CPU step. Errors are fatal; the machine state is left as
    /// it was at the point of failure for inspection.
    pub fn step(&mut self) -> Result<u64, CpuError> {
        match self.cpu.step(&mut self.bus as &mut dyn CpuBus) {
            Ok(cycles) => {
                self.frame_cycles += cycles;
                Ok(cycles)
            }
            Err(e) => {
                error!(
                    "CPU halted at PC 0x{:04X} (opcode 0x{:02X}) after {} cycles: {}",
                    self.cpu.ctx.pc, self.cpu.ctx.opcode, self.cpu.cycles, e
                );
                Err(e)
            }
        }
    }

    /// Step until at least `budget` clock cycles have run. Returns the
    /// cycles actually run, which overshoots by at most one instruction.
    pub fn run_cycles(&mut self, budget: u64) -> Result<u64, CpuError> {
        let mut elapsed = 0;
        while elapsed < budget {
            elapsed += self.step()?;
        }
        Ok(elapsed)
    }

    /// Run to the end of the current frame. Overshoot carries into the next.
    pub fn step_frame(&mut self) -> Result<(), CpuError> {
        while self.frame_cycles < CYCLES_PER_FRAME {
            self.step()?;
        }
        self.frame_cycles -= CYCLES_PER_FRAME;
        self.frame_count += 1;
        debug!("Frame {} done at cycle {}", self.frame_count, self.cpu.cycles);
        Ok(())
    }

    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        let flags = self.bus.interrupt_flag() | interrupt.mask();
        self.bus.set_interrupt_flag(flags);
    }

    pub fn take_serial_output(&mut self) -> Vec<u8> {
        self.bus.take_serial_output()
    }

    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Machine time run so far at the DMG clock rate.
    pub fn emulated_seconds(&self) -> f64 {
        self.cpu.cycles as f64 / CPU_CLOCK_HZ as f64
    }
}
