//! Fuzz target for CPU step execution.
//!
//! Builds an arbitrary register file and a few memory windows, then executes a
//! handful of instructions. Decode and divide errors are fine; panics are not.

#![no_main]

use arbitrary::Arbitrary;
use lib8086::{physical_address, FlatMemory, MemoryBus, Reg16, SegReg, CPU};
use libfuzzer_sys::fuzz_target;

/// Arbitrary register state
#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    general: [u16; 8],
    segments: [u16; 4],
    ip: u16,
    flags: u16,
}

/// Memory windows seeded from the input
#[derive(Debug, Arbitrary)]
struct FuzzMemory {
    /// Bytes at CS:IP (prefixes, opcode, ModRM, displacement, immediate)
    instruction_bytes: [u8; 16],
    /// Bytes at DS:0000
    data: [u8; 256],
    /// Bytes just below SS:SP
    stack: [u8; 64],
    /// Interrupt vector table entries 0-7
    vectors: [u8; 32],
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    memory: FuzzMemory,
    steps: u8,
}

fuzz_target!(|input: FuzzInput| {
    let state = &input.cpu_state;
    let mut cpu = CPU::new(FlatMemory::new());

    for (reg, &value) in Reg16::ALL.iter().zip(state.general.iter()) {
        cpu.set_reg16(*reg, value);
    }
    for (reg, &value) in SegReg::ALL.iter().zip(state.segments.iter()) {
        cpu.set_segment(*reg, value);
    }
    cpu.set_ip(state.ip);
    cpu.flags_mut().set_bits(state.flags);

    let cs = cpu.segment(SegReg::CS);
    let ds = cpu.segment(SegReg::DS);
    let ss = cpu.segment(SegReg::SS);
    let sp = cpu.reg16(Reg16::SP);

    cpu.load(0, 0, &input.memory.vectors);
    cpu.load(ds, 0, &input.memory.data);
    cpu.load(ss, sp.wrapping_sub(64), &input.memory.stack);
    cpu.load(cs, state.ip, &input.memory.instruction_bytes);

    let _ = cpu.run(u64::from(input.steps % 8) + 1);

    // Every access stays inside the 1 MiB space
    let linear = physical_address(cpu.segment(SegReg::CS), cpu.ip());
    assert!(linear <= 0xFFFFF);
    let _ = cpu.memory().read(linear);
});
