mod common;
use common::{run_instruction, setup};

// --- PUSH ---

#[test]
fn test_push_bc() {
    let (mut cpu, mut bus) = setup(&[0xC5]); // PUSH BC
    cpu.regs.set_bc(0x1234);

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 16, "PUSH should be 16 clock cycles");
    assert_eq!(cpu.regs.sp, 0xFFFC);
    assert_eq!(bus.memory[0xFFFD], 0x12); // high byte (B)
    assert_eq!(bus.memory[0xFFFC], 0x34); // low byte (C)
}

#[test]
fn test_push_af() {
    let (mut cpu, mut bus) = setup(&[0xF5]); // PUSH AF
    cpu.regs.a = 0x5A;
    cpu.regs.set_flags(true, false, true, false);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.memory[0xFFFD], 0x5A);
    assert_eq!(bus.memory[0xFFFC], 0xA0);
}

// --- POP ---

#[test]
fn test_pop_de() {
    let (mut cpu, mut bus) = setup(&[0xD1]); // POP DE
    cpu.regs.sp = 0xFFFC;
    bus.memory[0xFFFC] = 0xCD;
    bus.memory[0xFFFD] = 0xAB;

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 12, "POP should be 12 clock cycles");
    assert_eq!(cpu.regs.de(), 0xABCD);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}

#[test]
fn test_pop_af_masks_low_nibble() {
    let (mut cpu, mut bus) = setup(&[0xF1]); // POP AF
    cpu.regs.sp = 0xC000;
    bus.memory[0xC000] = 0xFF;
    bus.memory[0xC001] = 0x12;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x12);
    assert_eq!(cpu.regs.af(), 0x12F0);
    assert!(cpu.regs.zero());
    assert!(cpu.regs.subtract());
    assert!(cpu.regs.half_carry());
    assert!(cpu.regs.carry());
}

#[test]
fn test_push_pop_round_trip() {
    let (mut cpu, mut bus) = setup(&[0xC5, 0xD1]); // PUSH BC ; POP DE
    cpu.regs.set_bc(0x1234);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.de(), 0x1234);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}

#[test]
fn test_stack_pointer_wraps() {
    let (mut cpu, mut bus) = setup(&[]);
    bus.load(0x0100, &[0xE5, 0xC1]); // PUSH HL ; POP BC
    cpu.regs.pc = 0x0100;
    cpu.regs.sp = 0x0001;
    cpu.regs.set_hl(0xBEEF);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(bus.memory[0x0000], 0xBE);
    assert_eq!(bus.memory[0xFFFF], 0xEF);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.bc(), 0xBEEF);
    assert_eq!(cpu.regs.sp, 0x0001);
}
