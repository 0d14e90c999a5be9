//! Property-based tests for CPU and bus invariants.

use gbcore::cartridge::CartridgeAdapter;
use gbcore::cpu::{Cpu, CpuBus};
use gbcore::memory::MemoryBus;
use gbcore::registers::Registers;
use proptest::prelude::*;
mod common;
use common::{run_instruction, setup, TestBus};

struct NoCart;

impl CartridgeAdapter for NoCart {
    fn read(&self, _addr: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, _addr: u16, _value: u8) {}
}

fn ram_word_address() -> impl Strategy<Value = u16> {
    prop_oneof![0xC000u16..0xDFFF, 0xFF80u16..0xFFFE]
}

proptest! {
    #[test]
    fn word_round_trip_in_ram(addr in ram_word_address(), value in any::<u16>()) {
        let mut bus = MemoryBus::new(Box::new(NoCart));
        bus.write16(addr, value).unwrap();
        prop_assert_eq!(bus.read16(addr).unwrap(), value);
    }

    #[test]
    fn stack_round_trip(sp in any::<u16>(), value in any::<u16>()) {
        let mut cpu = Cpu::new();
        let mut bus = TestBus::new();
        cpu.regs.sp = sp;

        cpu.push16(&mut bus, value).unwrap();
        prop_assert_eq!(cpu.regs.sp, sp.wrapping_sub(2));
        prop_assert_eq!(cpu.pop16(&mut bus).unwrap(), value);
        prop_assert_eq!(cpu.regs.sp, sp);
        prop_assert_eq!(cpu.cycles, 16);
    }

    #[test]
    fn af_low_nibble_always_zero(value in any::<u16>()) {
        let mut regs = Registers::new();
        regs.set_af(value);
        prop_assert_eq!(regs.af() & 0x000F, 0);
        prop_assert_eq!(regs.af() & 0xFFF0, value & 0xFFF0);
    }

    #[test]
    fn pop_af_low_nibble_zero(low in any::<u8>(), high in any::<u8>()) {
        let (mut cpu, mut bus) = setup(&[0xF1]); // POP AF
        cpu.regs.sp = 0xC000;
        bus.memory[0xC000] = low;
        bus.memory[0xC001] = high;

        run_instruction(&mut cpu, &mut bus);
        prop_assert_eq!(cpu.regs.af(), ((high as u16) << 8) | (low & 0xF0) as u16);
    }

    #[test]
    fn xor_a_always_zero(a in any::<u8>(), flags in 0u8..16) {
        let (mut cpu, mut bus) = setup(&[0xAF]); // XOR A
        cpu.regs.a = a;
        cpu.regs.set_af(((a as u16) << 8) | ((flags as u16) << 4));

        run_instruction(&mut cpu, &mut bus);
        prop_assert_eq!(cpu.regs.af(), 0x0080);
    }

    #[test]
    fn nop_changes_nothing_but_pc(af in any::<u16>(), bc in any::<u16>(), de in any::<u16>(), hl in any::<u16>(), sp in any::<u16>()) {
        let (mut cpu, mut bus) = setup(&[0x00]);
        cpu.regs.set_af(af);
        cpu.regs.set_bc(bc);
        cpu.regs.set_de(de);
        cpu.regs.set_hl(hl);
        cpu.regs.sp = sp;
        let before = cpu.regs;

        prop_assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
        prop_assert_eq!(cpu.regs.pc, before.pc + 1);
        cpu.regs.pc = before.pc;
        prop_assert_eq!(cpu.regs, before);
    }

    #[test]
    fn add_matches_wrapping_arithmetic(a in any::<u8>(), b in any::<u8>()) {
        let (mut cpu, mut bus) = setup(&[0x80]); // ADD A,B
        cpu.regs.a = a;
        cpu.regs.b = b;

        run_instruction(&mut cpu, &mut bus);
        let (sum, carry) = a.overflowing_add(b);
        prop_assert_eq!(cpu.regs.a, sum);
        prop_assert_eq!(cpu.regs.carry(), carry);
        prop_assert_eq!(cpu.regs.zero(), sum == 0);
    }

    #[test]
    fn conditional_jump_not_taken_is_cheaper(target in any::<u16>()) {
        let [lo, hi] = target.to_le_bytes();
        let (mut cpu, mut bus) = setup(&[0xCA, lo, hi]); // JP Z,target
        cpu.regs.set_zero(false);
        let not_taken = run_instruction(&mut cpu, &mut bus);

        let (mut cpu, mut bus) = setup(&[0xCA, lo, hi]);
        cpu.regs.set_zero(true);
        let taken = run_instruction(&mut cpu, &mut bus);

        prop_assert!(not_taken < taken);
        prop_assert_eq!(cpu.regs.pc, target);
    }
}

#[test]
fn push_pop_program_counter_scenario() {
    let mut cpu = Cpu::new();
    let mut bus = TestBus::new();
    cpu.regs.sp = 0xFFFE;
    cpu.regs.pc = 0x1234;

    let pc = cpu.regs.pc;
    cpu.push16(&mut bus, pc).unwrap();
    cpu.regs.pc = 0;
    cpu.regs.pc = cpu.pop16(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}
