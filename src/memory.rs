use crate::cartridge::CartridgeAdapter;
use crate::cpu::CpuBus;
use crate::error::{Access, BusError};

pub const WORK_RAM_SIZE: usize = 0x2000;
pub const HIGH_RAM_SIZE: usize = 0x7F;

// Modeled I/O registers
pub const SB_ADDR: u16 = 0xFF01; // Serial transfer data
pub const SC_ADDR: u16 = 0xFF02; // Serial transfer control
pub const IF_ADDR: u16 = 0xFF0F; // Interrupt flag
pub const IE_ADDR: u16 = 0xFFFF; // Interrupt enable

/// Address space regions, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Rom,
    VideoRam,
    CartridgeRam,
    WorkRam,
    EchoRam,
    Oam,
    NotUsable,
    IoRegisters,
    HighRam,
    InterruptEnable,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Region::Rom => "ROM",
            Region::VideoRam => "VRAM",
            Region::CartridgeRam => "Cartridge RAM",
            Region::WorkRam => "Working RAM",
            Region::EchoRam => "Echo RAM",
            Region::Oam => "OAM",
            Region::NotUsable => "Not usable",
            Region::IoRegisters => "IO Registers",
            Region::HighRam => "High RAM",
            Region::InterruptEnable => "Interrupt enable",
        }
    }
}

/// Inclusive ranges, first match wins.
pub const REGIONS: [(Region, u16, u16); 10] = [
    (Region::Rom, 0x0000, 0x7FFF),
    (Region::VideoRam, 0x8000, 0x9FFF),
    (Region::CartridgeRam, 0xA000, 0xBFFF),
    (Region::WorkRam, 0xC000, 0xDFFF),
    (Region::EchoRam, 0xE000, 0xFDFF),
    (Region::Oam, 0xFE00, 0xFE9F),
    (Region::NotUsable, 0xFEA0, 0xFEFF),
    (Region::IoRegisters, 0xFF00, 0xFF7F),
    (Region::HighRam, 0xFF80, 0xFFFE),
    (Region::InterruptEnable, 0xFFFF, 0xFFFF),
];

pub fn region_of(addr: u16) -> Result<Region, BusError> {
    REGIONS
        .iter()
        .find(|(_, start, end)| (*start..=*end).contains(&addr))
        .map(|(region, _, _)| *region)
        .ok_or(BusError::Unmapped(addr))
}

/// Working RAM (0xC000-0xDFFF) and high RAM (0xFF80-0xFFFE).
pub struct Ram {
    wram: [u8; WORK_RAM_SIZE],
    hram: [u8; HIGH_RAM_SIZE],
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    pub fn new() -> Self {
        Self {
            wram: [0; WORK_RAM_SIZE],
            hram: [0; HIGH_RAM_SIZE],
        }
    }

    pub fn read_working_ram(&self, addr: u16) -> Result<u8, BusError> {
        let index = addr.wrapping_sub(0xC000) as usize;
        self.wram.get(index).copied().ok_or(BusError::Unmapped(addr))
    }

    pub fn write_working_ram(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        let index = addr.wrapping_sub(0xC000) as usize;
        let cell = self.wram.get_mut(index).ok_or(BusError::Unmapped(addr))?;
        *cell = value;
        Ok(())
    }

    pub fn read_high_ram(&self, addr: u16) -> Result<u8, BusError> {
        let index = addr.wrapping_sub(0xFF80) as usize;
        self.hram.get(index).copied().ok_or(BusError::Unmapped(addr))
    }

    pub fn write_high_ram(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        let index = addr.wrapping_sub(0xFF80) as usize;
        let cell = self.hram.get_mut(index).ok_or(BusError::Unmapped(addr))?;
        *cell = value;
        Ok(())
    }
}

pub struct MemoryBus {
    pub cartridge: Box<dyn CartridgeAdapter>,
    pub ram: Ram,
    pub ie_register: u8,
    pub if_register: u8,
    serial_data: u8,
    serial_control: u8,
    serial_output: Vec<u8>,
}

impl MemoryBus {
    pub fn new(cartridge: Box<dyn CartridgeAdapter>) -> Self {
        Self {
            cartridge,
            ram: Ram::new(),
            ie_register: 0,
            if_register: 0,
            serial_data: 0,
            serial_control: 0,
            serial_output: Vec::new(),
        }
    }

    /// Bytes sent over the serial port since the last call.
    pub fn take_serial_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.serial_output)
    }

    fn unimplemented(region: Region, address: u16, access: Access) -> BusError {
        BusError::UnimplementedRegion {
            region: region.name(),
            address,
            access,
        }
    }

    fn read_io(&self, addr: u16) -> Result<u8, BusError> {
        match addr {
            SB_ADDR => Ok(self.serial_data),
            SC_ADDR => Ok(self.serial_control | 0x7E),
            IF_ADDR => Ok(self.if_register | 0xE0),
            _ => Err(Self::unimplemented(Region::IoRegisters, addr, Access::Read)),
        }
    }

    fn write_io(&mut self, addr: u16, value: u8) {
        match addr {
            SB_ADDR => self.serial_data = value,
            SC_ADDR => {
                // Transfer start with internal clock: there is no link partner,
                // so the byte goes straight out and the transfer completes.
                if value & 0x81 == 0x81 {
                    log::debug!("Serial out: 0x{:02X}", self.serial_data);
                    self.serial_output.push(self.serial_data);
                    self.serial_data = 0xFF;
                    self.serial_control = value & 0x7F;
                    self.if_register |= crate::cpu::Interrupt::Serial.mask();
                } else {
                    self.serial_control = value;
                }
            }
            IF_ADDR => self.if_register = value & 0x1F,
            _ => {
                log::debug!(
                    "IO Registers area bus address 0x{:04X} not implemented to write (0x{:02X} dropped)",
                    addr,
                    value
                );
            }
        }
    }
}

impl CpuBus for MemoryBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        let region = region_of(addr)?;
        match region {
            Region::Rom | Region::CartridgeRam => Ok(self.cartridge.read(addr)),
            Region::WorkRam => self.ram.read_working_ram(addr),
            Region::EchoRam | Region::NotUsable => Ok(0),
            Region::VideoRam | Region::Oam => Err(Self::unimplemented(region, addr, Access::Read)),
            Region::IoRegisters => self.read_io(addr),
            Region::HighRam => self.ram.read_high_ram(addr),
            Region::InterruptEnable => Ok(self.ie_register),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        let region = region_of(addr)?;
        match region {
            Region::Rom | Region::CartridgeRam => {
                self.cartridge.write(addr, value);
                Ok(())
            }
            Region::WorkRam => self.ram.write_working_ram(addr, value),
            Region::EchoRam | Region::NotUsable => Ok(()),
            Region::VideoRam | Region::Oam => Err(Self::unimplemented(region, addr, Access::Write)),
            Region::IoRegisters => {
                self.write_io(addr, value);
                Ok(())
            }
            Region::HighRam => self.ram.write_high_ram(addr, value),
            Region::InterruptEnable => {
                self.ie_register = value;
                Ok(())
            }
        }
    }

    fn interrupt_enable(&self) -> u8 {
        self.ie_register
    }

    fn interrupt_flag(&self) -> u8 {
        self.if_register
    }

    fn set_interrupt_flag(&mut self, value: u8) {
        self.if_register = value & 0x1F;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatCart {
        rom: Vec<u8>,
        ram: Vec<u8>,
    }

    impl CartridgeAdapter for FlatCart {
        fn read(&self, addr: u16) -> u8 {
            match addr {
                0x0000..=0x7FFF => self.rom[addr as usize],
                _ => self.ram[(addr - 0xA000) as usize],
            }
        }

        fn write(&mut self, addr: u16, value: u8) {
            if addr >= 0xA000 {
                self.ram[(addr - 0xA000) as usize] = value;
            }
        }
    }

    fn bus() -> MemoryBus {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0xC3;
        MemoryBus::new(Box::new(FlatCart {
            rom,
            ram: vec![0; 0x2000],
        }))
    }

    #[test]
    fn regions_cover_address_space_without_overlap() {
        for addr in 0..=0xFFFFu16 {
            let claims = REGIONS
                .iter()
                .filter(|(_, start, end)| (*start..=*end).contains(&addr))
                .count();
            assert_eq!(claims, 1, "address 0x{:04X} claimed {} times", addr, claims);
        }
        // Contiguous in table order
        assert_eq!(REGIONS[0].1, 0x0000);
        for pair in REGIONS.windows(2) {
            assert_eq!(pair[0].2 as u32 + 1, pair[1].1 as u32);
        }
        assert_eq!(REGIONS[REGIONS.len() - 1].2, 0xFFFF);
    }

    #[test]
    fn region_boundaries() {
        assert_eq!(region_of(0x7FFF).unwrap(), Region::Rom);
        assert_eq!(region_of(0x8000).unwrap(), Region::VideoRam);
        assert_eq!(region_of(0xBFFF).unwrap(), Region::CartridgeRam);
        assert_eq!(region_of(0xC000).unwrap(), Region::WorkRam);
        assert_eq!(region_of(0xDFFF).unwrap(), Region::WorkRam);
        assert_eq!(region_of(0xE000).unwrap(), Region::EchoRam);
        assert_eq!(region_of(0xFDFF).unwrap(), Region::EchoRam);
        assert_eq!(region_of(0xFE9F).unwrap(), Region::Oam);
        assert_eq!(region_of(0xFEA0).unwrap(), Region::NotUsable);
        assert_eq!(region_of(0xFF00).unwrap(), Region::IoRegisters);
        assert_eq!(region_of(0xFF7F).unwrap(), Region::IoRegisters);
        assert_eq!(region_of(0xFF80).unwrap(), Region::HighRam);
        assert_eq!(region_of(0xFFFE).unwrap(), Region::HighRam);
        assert_eq!(region_of(0xFFFF).unwrap(), Region::InterruptEnable);
    }

    #[test]
    fn working_ram_round_trip() {
        let mut bus = bus();
        bus.write(0xC000, 0xAB).unwrap();
        assert_eq!(bus.read(0xC000).unwrap(), 0xAB);
        bus.write(0xDFFF, 0x12).unwrap();
        assert_eq!(bus.read(0xDFFF).unwrap(), 0x12);
    }

    #[test]
    fn echo_and_not_usable_read_zero() {
        let mut bus = bus();
        bus.write(0xC000, 0x55).unwrap();
        for addr in [0xE000, 0xE123, 0xFDFF, 0xFEA0, 0xFEFF] {
            bus.write(addr, 0x99).unwrap();
            assert_eq!(bus.read(addr).unwrap(), 0, "0x{:04X}", addr);
        }
        // Echo is not an alias in this core
        assert_eq!(bus.read(0xC000).unwrap(), 0x55);
    }

    #[test]
    fn cartridge_regions_delegate() {
        let mut bus = bus();
        assert_eq!(bus.read(0x0100).unwrap(), 0xC3);
        bus.write(0xA005, 0x77).unwrap();
        assert_eq!(bus.read(0xA005).unwrap(), 0x77);
    }

    #[test]
    fn unmodeled_regions_fail_loudly() {
        let mut bus = bus();
        assert!(matches!(
            bus.read(0x8000),
            Err(BusError::UnimplementedRegion { access: Access::Read, .. })
        ));
        assert!(matches!(
            bus.write(0xFE00, 1),
            Err(BusError::UnimplementedRegion { access: Access::Write, .. })
        ));
        assert!(bus.read(0xFF44).is_err());
        // IO writes are dropped, not fatal
        assert!(bus.write(0xFF40, 0x91).is_ok());
    }

    #[test]
    fn interrupt_enable_is_one_location() {
        let mut bus = bus();
        bus.write(IE_ADDR, 0x1F).unwrap();
        assert_eq!(bus.interrupt_enable(), 0x1F);
        bus.ie_register = 0x05;
        assert_eq!(bus.read(IE_ADDR).unwrap(), 0x05);
    }

    #[test]
    fn interrupt_flag_upper_bits_read_set() {
        let mut bus = bus();
        bus.write(IF_ADDR, 0xFF).unwrap();
        assert_eq!(bus.interrupt_flag(), 0x1F);
        assert_eq!(bus.read(IF_ADDR).unwrap(), 0xFF);
        bus.set_interrupt_flag(0x01);
        assert_eq!(bus.read(IF_ADDR).unwrap(), 0xE1);
    }

    #[test]
    fn serial_transfer_captures_byte() {
        let mut bus = bus();
        bus.write(SB_ADDR, b'P').unwrap();
        bus.write(SC_ADDR, 0x81).unwrap();
        assert_eq!(bus.take_serial_output(), b"P".to_vec());
        assert_eq!(bus.read(SC_ADDR).unwrap() & 0x80, 0);
        assert_ne!(bus.interrupt_flag() & 0x08, 0);
        assert!(bus.take_serial_output().is_empty());
    }

    #[test]
    fn word_access_is_little_endian() {
        let mut bus = bus();
        bus.write16(0xFF90, 0xBEEF).unwrap();
        assert_eq!(bus.read(0xFF90).unwrap(), 0xEF);
        assert_eq!(bus.read(0xFF91).unwrap(), 0xBE);
        assert_eq!(bus.read16(0xFF90).unwrap(), 0xBEEF);
    }

    #[test]
    fn word_access_straddles_regions() {
        let mut bus = bus();
        // Low byte lands in high RAM, high byte in IE
        bus.write16(0xFFFE, 0x1234).unwrap();
        assert_eq!(bus.read(0xFFFE).unwrap(), 0x34);
        assert_eq!(bus.interrupt_enable(), 0x12);
        // Low byte in WRAM, high byte in echo: the echo half is dropped
        bus.write16(0xDFFF, 0xAA55).unwrap();
        assert_eq!(bus.read16(0xDFFF).unwrap(), 0x0055);
    }
}
