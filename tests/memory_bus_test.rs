use gbcore::cartridge::CartridgeAdapter;
use gbcore::cpu::{Cpu, CpuBus};
use gbcore::memory::MemoryBus;

/// 32 KiB ROM plus 8 KiB RAM, no controller.
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

fn machine(program: &[u8]) -> (Cpu, MemoryBus) {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    let bus = MemoryBus::new(Box::new(FlatCart {
        rom,
        ram: vec![0; 0x2000],
    }));
    (Cpu::post_boot(), bus)
}

#[test]
fn test_working_ram_scenario() {
    let (_, mut bus) = machine(&[]);
    bus.write(0xC000, 0xAB).unwrap();
    assert_eq!(bus.read(0xC000).unwrap(), 0xAB);
}

#[test]
fn test_echo_and_not_usable_always_zero() {
    let (_, mut bus) = machine(&[]);
    for addr in (0xE000..=0xFDFFu16).step_by(0x111).chain(0xFEA0..=0xFEFF) {
        bus.write(addr, 0xFF).unwrap();
        assert_eq!(bus.read(addr).unwrap(), 0, "0x{:04X}", addr);
    }
}

#[test]
fn test_program_stores_through_bus() {
    // LD A,0xAB ; LD (0xC000),A ; LD HL,0xC000 ; INC (HL) ; LD B,(HL)
    let (mut cpu, mut bus) = machine(&[0x3E, 0xAB, 0xEA, 0x00, 0xC0, 0x21, 0x00, 0xC0, 0x34, 0x46]);

    let mut cycles = 0;
    for _ in 0..5 {
        cycles += cpu.step(&mut bus).unwrap();
    }
    assert_eq!(cycles, 8 + 16 + 12 + 12 + 8);
    assert_eq!(bus.read(0xC000).unwrap(), 0xAC);
    assert_eq!(cpu.regs.b, 0xAC);
}

#[test]
fn test_call_uses_high_ram_stack() {
    // CALL 0x0150 from post-boot SP 0xFFFE
    let (mut cpu, mut bus) = machine(&[0xCD, 0x50, 0x01]);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x0150);
    assert_eq!(bus.read16(0xFFFC).unwrap(), 0x0103);
}

#[test]
fn test_ie_written_by_program_gates_dispatch() {
    // LD A,0x04 ; LDH (0xFF),A ; EI ; NOP
    let (mut cpu, mut bus) = machine(&[0x3E, 0x04, 0xE0, 0xFF, 0xFB, 0x00]);
    bus.set_interrupt_flag(0x04);

    for _ in 0..4 {
        cpu.step(&mut bus).unwrap();
    }
    assert_eq!(bus.ie_register, 0x04);
    assert_eq!(cpu.step(&mut bus).unwrap(), 20);
    assert_eq!(cpu.regs.pc, 0x0050);
    assert_eq!(bus.read(0xFF0F).unwrap(), 0xE0);
}

#[test]
fn test_video_ram_access_is_fatal() {
    // LD HL,0x8000 ; LD (HL),A
    let (mut cpu, mut bus) = machine(&[0x21, 0x00, 0x80, 0x77]);

    cpu.step(&mut bus).unwrap();
    let err = cpu.step(&mut bus).unwrap_err();
    assert!(err.is_unimplemented());
    assert_eq!(
        err.to_string(),
        "VRAM area bus address 0x8000 not implemented to write"
    );
}

#[test]
fn test_io_read_is_fatal_but_write_is_dropped() {
    // LDH (0x40),A ; LDH A,(0x44)
    let (mut cpu, mut bus) = machine(&[0xE0, 0x40, 0xF0, 0x44]);

    assert_eq!(cpu.step(&mut bus).unwrap(), 12);
    let err = cpu.step(&mut bus).unwrap_err();
    assert!(err.is_unimplemented());
}

#[test]
fn test_serial_from_program() {
    // LD A,'K' ; LDH (0x01),A ; LD A,0x81 ; LDH (0x02),A
    let (mut cpu, mut bus) = machine(&[0x3E, b'K', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02]);

    for _ in 0..4 {
        cpu.step(&mut bus).unwrap();
    }
    assert_eq!(bus.take_serial_output(), b"K".to_vec());
}
