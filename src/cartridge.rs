use std::fs::File;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("ROM image too small for a cartridge header ({0} bytes)")]
    TooSmall(usize),
    #[error("Invalid cartridge header")]
    InvalidHeader,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// What the memory bus sees of a cartridge: byte reads and writes over the
/// ROM (0x0000-0x7FFF) and cartridge RAM (0xA000-0xBFFF) windows.
/// Bank switching, if any, is the implementor's business.
pub trait CartridgeAdapter {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

const HEADER_END: usize = 0x150;
const TITLE_START: usize = 0x134;
const TITLE_END: usize = 0x143;
const CART_TYPE_ADDR: usize = 0x147;
const ROM_SIZE_ADDR: usize = 0x148;
const RAM_SIZE_ADDR: usize = 0x149;
const HEADER_CHECKSUM_ADDR: usize = 0x14D;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub cart_type: u8,
    pub rom_size: usize,
    pub ram_size: usize,
    pub header_checksum: u8,
    pub checksum_ok: bool,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(data.len()));
        }

        let title: String = data[TITLE_START..=TITLE_END]
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| b as char)
            .collect();

        let rom_code = data[ROM_SIZE_ADDR];
        if rom_code > 8 {
            return Err(CartridgeError::InvalidHeader);
        }
        let rom_size = 0x8000usize << rom_code;

        let ram_size = match data[RAM_SIZE_ADDR] {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => return Err(CartridgeError::InvalidHeader),
        };

        // x = x - byte - 1 over 0x0134..=0x014C
        let computed = data[TITLE_START..HEADER_CHECKSUM_ADDR]
            .iter()
            .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1));
        let header_checksum = data[HEADER_CHECKSUM_ADDR];

        Ok(Self {
            title,
            cart_type: data[CART_TYPE_ADDR],
            rom_size,
            ram_size,
            header_checksum,
            checksum_ok: computed == header_checksum,
        })
    }

    pub fn cart_type_name(&self) -> &'static str {
        match self.cart_type {
            0x00 => "ROM ONLY",
            0x01 => "MBC1",
            0x02 => "MBC1+RAM",
            0x03 => "MBC1+RAM+BATTERY",
            0x05 => "MBC2",
            0x06 => "MBC2+BATTERY",
            0x08 => "ROM+RAM",
            0x09 => "ROM+RAM+BATTERY",
            0x0F => "MBC3+TIMER+BATTERY",
            0x10 => "MBC3+TIMER+RAM+BATTERY",
            0x11 => "MBC3",
            0x12 => "MBC3+RAM",
            0x13 => "MBC3+RAM+BATTERY",
            0x19 => "MBC5",
            0x1A => "MBC5+RAM",
            0x1B => "MBC5+RAM+BATTERY",
            _ => "UNKNOWN",
        }
    }

    /// Cartridge types that map ROM and RAM straight through with no
    /// banking controller.
    pub fn is_flat(&self) -> bool {
        matches!(self.cart_type, 0x00 | 0x08 | 0x09)
    }
}

/// A cartridge image mapped flat into the address space. ROM writes are
/// dropped (there is no controller to receive them) and only the first
/// 8 KiB of cartridge RAM is reachable.
pub struct Cartridge {
    pub header: Header,
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
}

impl Cartridge {
    pub fn load(path: &str) -> Result<Self, CartridgeError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&data)?;

        log::info!(
            "Cartridge \"{}\": type 0x{:02X} ({}), ROM {} KB, RAM {} KB",
            header.title,
            header.cart_type,
            header.cart_type_name(),
            header.rom_size / 1024,
            header.ram_size / 1024
        );
        if !header.checksum_ok {
            log::warn!("Header checksum mismatch (stored 0x{:02X})", header.header_checksum);
        }
        if !header.is_flat() {
            log::warn!(
                "{} bank switching is not modeled, mapping the image flat",
                header.cart_type_name()
            );
        }
        if data.len() < header.rom_size {
            log::warn!(
                "ROM image is {} bytes, header declares {}",
                data.len(),
                header.rom_size
            );
        }

        let ram = vec![0; header.ram_size];
        Ok(Self {
            header,
            rom: data,
            ram,
        })
    }
}

impl CartridgeAdapter for Cartridge {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            0xA000..=0xBFFF => self
                .ram
                .get((addr - 0xA000) as usize)
                .copied()
                .unwrap_or(0xFF),
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let 0xA000..=0xBFFF = addr {
            if let Some(cell) = self.ram.get_mut((addr - 0xA000) as usize) {
                *cell = value;
            }
        }
        // ROM area writes would go to a banking controller
    }
}
