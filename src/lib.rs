//! Game Boy (DMG) CPU core: the LR35902 execution engine and the memory bus
//! router it talks to.
//!
//! The [`Emulator`] owns a [`Cpu`] and a [`MemoryBus`]. The CPU knows the bus
//! only through the [`CpuBus`] trait, so it can be driven against any memory
//! model (the integration tests use a flat 64 KiB array).

pub mod cartridge;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod instructions;
pub mod memory;
pub mod registers;
pub mod trace;

#[cfg(feature = "cli")]
pub mod config;

pub use cartridge::{Cartridge, CartridgeAdapter, CartridgeError};
pub use cpu::{Cpu, CpuBus, Interrupt};
pub use emulator::Emulator;
pub use error::{Access, BusError, CpuError};
pub use memory::MemoryBus;
pub use registers::{Register, Registers};

/// DMG master clock.
pub const CPU_CLOCK_HZ: u64 = 4_194_304;

/// 154 scanlines of 456 clock cycles.
pub const CYCLES_PER_FRAME: u64 = 70_224;
