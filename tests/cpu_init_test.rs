//! Tests for CPU power-on state, stepping and the halted/error lifecycle.

use lib8086::{ExecutionError, FlatMemory, MemoryBus, Reg16, SegReg, CPU};

/// Helper function to create a CPU executing `program` at 0100:0000
fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
    let mut cpu = CPU::new(FlatMemory::new());
    cpu.set_segment(SegReg::CS, 0x0100);
    cpu.set_ip(0x0000);
    cpu.load(0x0100, 0x0000, program);
    cpu
}

#[test]
fn test_power_on_state() {
    let cpu = CPU::new(FlatMemory::new());

    for reg in Reg16::ALL {
        assert_eq!(cpu.reg16(reg), 0, "{:?}", reg);
    }
    assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);
    assert_eq!(cpu.segment(SegReg::DS), 0x0000);
    assert_eq!(cpu.segment(SegReg::ES), 0x0000);
    assert_eq!(cpu.segment(SegReg::SS), 0x0000);
    assert_eq!(cpu.ip(), 0x0000);
    assert_eq!(cpu.flags().bits(), 0x0000);
    assert!(!cpu.is_halted());
}

#[test]
fn test_first_fetch_comes_from_reset_vector() {
    let mut memory = FlatMemory::new();
    // JMP FAR 0000:0500 at FFFF:0000 = physical FFFF0
    memory.load(0xFFFF0, &[0xEA, 0x00, 0x05, 0x00, 0x00]);
    let mut cpu = CPU::new(memory);

    cpu.step().unwrap();

    assert_eq!(cpu.segment(SegReg::CS), 0x0000);
    assert_eq!(cpu.ip(), 0x0500);
}

#[test]
fn test_instruction_counter() {
    let mut cpu = setup_cpu(&[0x90, 0x90, 0x90]);

    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.instructions(), 2);
    assert_eq!(cpu.ip(), 0x0002);
}

#[test]
fn test_hlt_halts_without_error() {
    let mut cpu = setup_cpu(&[0xF4, 0x90]);

    assert_eq!(cpu.step(), Ok(()));
    assert!(cpu.is_halted());
    assert_eq!(cpu.ip(), 0x0001);

    assert_eq!(cpu.step(), Err(ExecutionError::Halted));
    assert_eq!(cpu.ip(), 0x0001);
}

#[test]
fn test_resume_after_hlt() {
    let mut cpu = setup_cpu(&[0xF4, 0x40]); // HLT ; INC AX

    cpu.step().unwrap();
    cpu.set_halted(false);
    cpu.step().unwrap();

    assert_eq!(cpu.reg16(Reg16::AX), 1);
}

#[test]
fn test_illegal_opcode_halts() {
    let mut cpu = setup_cpu(&[0x60]); // no 8086 encoding

    assert_eq!(cpu.step(), Err(ExecutionError::IllegalOpcode(0x60)));
    assert!(cpu.is_halted());
    assert_eq!(cpu.instructions(), 0);
    assert_eq!(cpu.step(), Err(ExecutionError::Halted));
}

#[test]
fn test_coprocessor_escape_is_illegal() {
    for opcode in 0xD8..=0xDF {
        let mut cpu = setup_cpu(&[opcode, 0xC0]);
        assert_eq!(cpu.step(), Err(ExecutionError::IllegalOpcode(opcode)));
    }
}

#[test]
fn test_wait_and_lock_are_no_ops() {
    let mut cpu = setup_cpu(&[0x9B, 0xF0, 0x40]); // WAIT ; LOCK INC AX

    cpu.step().unwrap();
    cpu.step().unwrap();

    assert_eq!(cpu.reg16(Reg16::AX), 1);
    assert_eq!(cpu.ip(), 0x0003);
}

#[test]
fn test_run_until_hlt() {
    // MOV CX,3 ; L: DEC CX ; JNZ L ; HLT
    let mut cpu = setup_cpu(&[0xB9, 0x03, 0x00, 0x49, 0x75, 0xFD, 0xF4]);

    let executed = cpu.run(1_000).unwrap();

    assert_eq!(executed, 1 + 3 * 2 + 1);
    assert_eq!(cpu.reg16(Reg16::CX), 0);
    assert!(cpu.is_halted());
}

#[test]
fn test_run_propagates_errors() {
    let mut cpu = setup_cpu(&[0x90, 0xC8]);

    assert_eq!(cpu.run(10), Err(ExecutionError::IllegalOpcode(0xC8)));
    assert_eq!(cpu.instructions(), 1);
}

#[test]
fn test_reset_returns_to_power_on_registers() {
    let mut cpu = setup_cpu(&[0xB8, 0x34, 0x12]);
    cpu.step().unwrap();
    cpu.flags_mut().carry = true;

    cpu.reset();

    assert_eq!(cpu.reg16(Reg16::AX), 0);
    assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);
    assert_eq!(cpu.ip(), 0);
    assert!(!cpu.flags().carry);
    // Memory survives
    assert_eq!(cpu.memory().read(0x01000), 0xB8);
}

#[test]
fn test_register_dump_reflects_state() {
    let mut cpu = setup_cpu(&[0xB8, 0x34, 0x12]);
    cpu.step().unwrap();

    let dump = cpu.register_dump().to_string();

    assert!(dump.starts_with("AX=1234; BX=0000\n"));
    assert!(dump.contains("CS=0100; DS=0000"));
    assert!(dump.contains("ES=0000; IP=0003"));
}
