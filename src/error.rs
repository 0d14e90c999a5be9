use thiserror::Error;

use crate::registers::Register;

/// Direction of a bus access, carried in errors so a fatal report says
/// whether the offending instruction was loading or storing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The address belongs to hardware this core does not model yet.
    #[error("{region} area bus address 0x{address:04X} not implemented to {access}")]
    UnimplementedRegion {
        region: &'static str,
        address: u16,
        access: Access,
    },
    /// No region claims the address. Only reachable with a broken region table.
    #[error("unknown memory bus address 0x{0:04X}")]
    Unmapped(u16),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("illegal opcode 0x{opcode:02X} at PC 0x{pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    #[error("invalid register {register:?} for {context}")]
    InvalidRegister {
        register: Register,
        context: &'static str,
    },
    #[error("decode inconsistency for opcode 0x{opcode:02X}: {detail}")]
    DecodeInconsistency { opcode: u8, detail: &'static str },
}

impl CpuError {
    /// True for failures caused by hardware that is not modeled yet, as
    /// opposed to states the instruction set makes impossible.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, CpuError::Bus(BusError::UnimplementedRegion { .. }))
    }
}
