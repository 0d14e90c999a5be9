//! Register file for the LR35902.
//!
//! Eight 8-bit registers pair up into AF, BC, DE and HL. F only carries the
//! four condition flags in its top nibble, so it is kept as four booleans
//! and packed into a byte only when AF is read or written as a whole.

use crate::error::CpuError;

// Flag bit positions inside F
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half carry
pub const FLAG_C: u8 = 0x10; // Carry

/// Logical register identifiers used by the instruction tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// No operand in this slot.
    None,
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

impl Register {
    pub fn is_16bit(self) -> bool {
        matches!(
            self,
            Register::AF | Register::BC | Register::DE | Register::HL | Register::SP | Register::PC
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::None => "",
            Register::A => "A",
            Register::F => "F",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::E => "E",
            Register::H => "H",
            Register::L => "L",
            Register::AF => "AF",
            Register::BC => "BC",
            Register::DE => "DE",
            Register::HL => "HL",
            Register::SP => "SP",
            Register::PC => "PC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub zero: bool,
    pub subtract: bool,
    pub half_carry: bool,
    pub carry: bool,
}

impl Flags {
    pub fn to_byte(self) -> u8 {
        let mut f = 0u8;
        if self.zero {
            f |= FLAG_Z;
        }
        if self.subtract {
            f |= FLAG_N;
        }
        if self.half_carry {
            f |= FLAG_H;
        }
        if self.carry {
            f |= FLAG_C;
        }
        f
    }

    /// Bits 0-3 of the byte are dropped.
    pub fn from_byte(value: u8) -> Self {
        Self {
            zero: value & FLAG_Z != 0,
            subtract: value & FLAG_N != 0,
            half_carry: value & FLAG_H != 0,
            carry: value & FLAG_C != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub flags: Flags,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register values the DMG boot ROM leaves behind when it jumps to 0x0100.
    pub fn post_boot() -> Self {
        let mut regs = Self::default();
        regs.set_af(0x01B0);
        regs.set_bc(0x0013);
        regs.set_de(0x00D8);
        regs.set_hl(0x014D);
        regs.sp = 0xFFFE;
        regs.pc = 0x0100;
        regs
    }

    /// Read a register by name. 8-bit registers come back zero-extended.
    pub fn read(&self, reg: Register) -> Result<u16, CpuError> {
        let value = match reg {
            Register::A => self.a as u16,
            Register::F => self.flags.to_byte() as u16,
            Register::B => self.b as u16,
            Register::C => self.c as u16,
            Register::D => self.d as u16,
            Register::E => self.e as u16,
            Register::H => self.h as u16,
            Register::L => self.l as u16,
            Register::AF => self.af(),
            Register::BC => self.bc(),
            Register::DE => self.de(),
            Register::HL => self.hl(),
            Register::SP => self.sp,
            Register::PC => self.pc,
            Register::None => {
                return Err(CpuError::InvalidRegister {
                    register: reg,
                    context: "register read",
                })
            }
        };
        Ok(value)
    }

    /// Write a register by name. 8-bit registers take the low byte of `value`.
    pub fn write(&mut self, reg: Register, value: u16) -> Result<(), CpuError> {
        let low = value as u8;
        match reg {
            Register::A => self.a = low,
            Register::F => self.flags = Flags::from_byte(low),
            Register::B => self.b = low,
            Register::C => self.c = low,
            Register::D => self.d = low,
            Register::E => self.e = low,
            Register::H => self.h = low,
            Register::L => self.l = low,
            Register::AF => self.set_af(value),
            Register::BC => self.set_bc(value),
            Register::DE => self.set_de(value),
            Register::HL => self.set_hl(value),
            Register::SP => self.sp = value,
            Register::PC => self.pc = value,
            Register::None => {
                return Err(CpuError::InvalidRegister {
                    register: reg,
                    context: "register write",
                })
            }
        }
        Ok(())
    }

    #[inline]
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.flags.to_byte()])
    }

    #[inline]
    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        self.flags = Flags::from_byte(f);
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[inline]
    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    #[inline]
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[inline]
    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    #[inline]
    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    // Flag accessors
    pub fn zero(&self) -> bool {
        self.flags.zero
    }

    pub fn set_zero(&mut self, value: bool) {
        self.flags.zero = value;
    }

    pub fn subtract(&self) -> bool {
        self.flags.subtract
    }

    pub fn set_subtract(&mut self, value: bool) {
        self.flags.subtract = value;
    }

    pub fn half_carry(&self) -> bool {
        self.flags.half_carry
    }

    pub fn set_half_carry(&mut self, value: bool) {
        self.flags.half_carry = value;
    }

    pub fn carry(&self) -> bool {
        self.flags.carry
    }

    pub fn set_carry(&mut self, value: bool) {
        self.flags.carry = value;
    }

    /// Set all four flags at once, in Z N H C order.
    pub fn set_flags(&mut self, zero: bool, subtract: bool, half_carry: bool, carry: bool) {
        self.flags = Flags {
            zero,
            subtract,
            half_carry,
            carry,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_share_storage_with_halves() {
        let mut regs = Registers::new();
        regs.set_bc(0x1234);
        assert_eq!(regs.b, 0x12);
        assert_eq!(regs.c, 0x34);

        regs.write(Register::E, 0xCD).unwrap();
        regs.write(Register::D, 0xAB).unwrap();
        assert_eq!(regs.read(Register::DE).unwrap(), 0xABCD);

        regs.write(Register::HL, 0xBEEF).unwrap();
        assert_eq!(regs.read(Register::H).unwrap(), 0xBE);
        assert_eq!(regs.read(Register::L).unwrap(), 0xEF);
    }

    #[test]
    fn af_masks_low_nibble() {
        let mut regs = Registers::new();
        regs.write(Register::AF, 0x12FF).unwrap();
        assert_eq!(regs.a, 0x12);
        assert_eq!(regs.af(), 0x12F0);
        assert!(regs.zero() && regs.subtract() && regs.half_carry() && regs.carry());

        regs.write(Register::F, 0x0F).unwrap();
        assert_eq!(regs.read(Register::F).unwrap(), 0x00);
    }

    #[test]
    fn flag_accessors_map_to_top_nibble() {
        let mut regs = Registers::new();
        regs.set_zero(true);
        assert_eq!(regs.af() & 0xFF, 0x80);
        regs.set_zero(false);
        regs.set_subtract(true);
        assert_eq!(regs.af() & 0xFF, 0x40);
        regs.set_subtract(false);
        regs.set_half_carry(true);
        assert_eq!(regs.af() & 0xFF, 0x20);
        regs.set_half_carry(false);
        regs.set_carry(true);
        assert_eq!(regs.af() & 0xFF, 0x10);
    }

    #[test]
    fn none_register_is_rejected() {
        let mut regs = Registers::new();
        assert!(matches!(
            regs.read(Register::None),
            Err(CpuError::InvalidRegister { .. })
        ));
        assert!(regs.write(Register::None, 1).is_err());
    }

    #[test]
    fn post_boot_values() {
        let regs = Registers::post_boot();
        assert_eq!(regs.af(), 0x01B0);
        assert_eq!(regs.bc(), 0x0013);
        assert_eq!(regs.de(), 0x00D8);
        assert_eq!(regs.hl(), 0x014D);
        assert_eq!(regs.sp, 0xFFFE);
        assert_eq!(regs.pc, 0x0100);
    }
}
