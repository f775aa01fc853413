//! Tests for software interrupts: INT n, INT 3, INTO, IRET and the host-side
//! `CPU::interrupt` entry point.

use lib8086::{FlatMemory, MemoryBus, Reg16, SegReg, CPU};

/// Helper function to create a CPU executing `program` at 0100:0000 with a
/// stack at 0900:1000 and every vector pointing at an IRET at 0200:0000
fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
    let mut cpu = CPU::new(FlatMemory::new());
    cpu.set_segment(SegReg::CS, 0x0100);
    cpu.set_ip(0x0000);
    cpu.set_segment(SegReg::SS, 0x0900);
    cpu.set_reg16(Reg16::SP, 0x1000);
    cpu.load(0x0100, 0x0000, program);

    for vector in 0..=255u32 {
        cpu.memory_mut().write_word(vector * 4, 0x0000);
        cpu.memory_mut().write_word(vector * 4 + 2, 0x0200);
    }
    cpu.load(0x0200, 0x0000, &[0xCF]);
    cpu
}

#[test]
fn test_int_pushes_state_and_vectors() {
    // INT 0x21
    let mut cpu = setup_cpu(&[0xCD, 0x21]);
    cpu.memory_mut().write_word(0x21 * 4, 0x1234);
    cpu.memory_mut().write_word(0x21 * 4 + 2, 0x5678);
    cpu.flags_mut().interrupt = true;
    cpu.flags_mut().trap = true;
    cpu.flags_mut().carry = true;
    let flags = cpu.flags().bits();

    cpu.step().unwrap();

    assert_eq!(cpu.segment(SegReg::CS), 0x5678);
    assert_eq!(cpu.ip(), 0x1234);
    assert_eq!(cpu.reg16(Reg16::SP), 0x0FFA);
    assert!(!cpu.flags().interrupt);
    assert!(!cpu.flags().trap);
    assert!(cpu.flags().carry);

    // IP, CS, FLAGS from the top of the stack down
    assert_eq!(cpu.memory().read_word(0x09FFA), 0x0002);
    assert_eq!(cpu.memory().read_word(0x09FFC), 0x0100);
    assert_eq!(cpu.memory().read_word(0x09FFE), flags);
}

#[test]
fn test_int_iret_round_trip() {
    // INT 0x10 ; (handler: IRET)
    let mut cpu = setup_cpu(&[0xCD, 0x10, 0x90]);
    cpu.flags_mut().interrupt = true;
    cpu.flags_mut().direction = true;
    cpu.flags_mut().auxiliary = true;
    let flags = cpu.flags().bits();

    cpu.run(2).unwrap();

    assert_eq!(cpu.segment(SegReg::CS), 0x0100);
    assert_eq!(cpu.ip(), 0x0002);
    assert_eq!(cpu.flags().bits(), flags);
    assert_eq!(cpu.reg16(Reg16::SP), 0x1000);
}

#[test]
fn test_int3_single_byte() {
    let mut cpu = setup_cpu(&[0xCC]);
    cpu.memory_mut().write_word(3 * 4, 0x0040);

    cpu.step().unwrap();

    assert_eq!(cpu.ip(), 0x0040);
    assert_eq!(cpu.memory().read_word(0x09FFA), 0x0001);
}

#[test]
fn test_into_only_on_overflow() {
    // INTO ; INTO
    let mut cpu = setup_cpu(&[0xCE, 0xCE]);
    cpu.memory_mut().write_word(4 * 4, 0x0080);

    cpu.step().unwrap();
    assert_eq!(cpu.ip(), 0x0001);
    assert_eq!(cpu.reg16(Reg16::SP), 0x1000);

    cpu.flags_mut().overflow = true;
    cpu.step().unwrap();
    assert_eq!(cpu.ip(), 0x0080);
    assert_eq!(cpu.segment(SegReg::CS), 0x0200);
}

#[test]
fn test_host_raised_interrupt() {
    let mut cpu = setup_cpu(&[0x90]);
    cpu.memory_mut().write_word(8 * 4, 0x0010);
    cpu.memory_mut().write_word(8 * 4 + 2, 0x0300);

    cpu.interrupt(8);

    assert_eq!(cpu.segment(SegReg::CS), 0x0300);
    assert_eq!(cpu.ip(), 0x0010);
    assert_eq!(cpu.memory().read_word(0x09FFA), 0x0000);
    assert_eq!(cpu.memory().read_word(0x09FFC), 0x0100);
}

#[test]
fn test_iret_restores_popped_flags() {
    let mut cpu = setup_cpu(&[0xCF]);
    cpu.set_reg16(Reg16::SP, 0x0FFA);
    cpu.memory_mut().write_word(0x09FFA, 0x0020);
    cpu.memory_mut().write_word(0x09FFC, 0x0400);
    cpu.memory_mut().write_word(0x09FFE, 0x0801);

    cpu.step().unwrap();

    assert_eq!(cpu.ip(), 0x0020);
    assert_eq!(cpu.segment(SegReg::CS), 0x0400);
    assert!(cpu.flags().carry);
    assert!(cpu.flags().overflow);
    assert_eq!(cpu.reg16(Reg16::SP), 0x1000);
}
