//! # Status Flag Manipulation Instructions
//!
//! This module implements instructions that directly modify processor status flags:
//! - CLC (F8): Clear Carry Flag
//! - STC (F9): Set Carry Flag
//! - CLI (FA): Clear Interrupt Enable
//! - STI (FB): Set Interrupt Enable
//! - CLD (FC): Clear Direction Flag
//! - STD (FD): Set Direction Flag
//! - CMC (F5): Complement Carry Flag
//!
//! All are one byte long and touch nothing but the named flag.

use crate::{ExecutionError, MemoryBus, CPU};

/// Executes a single-flag instruction.
///
/// Opcodes: 0xF5, 0xF8-0xFD
/// Bytes: 1
///
/// # Examples
///
/// ```
/// use lib8086::{CPU, FlatMemory, SegReg};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x00000, &[0xF9, 0xF5, 0xFD]); // STC ; CMC ; STD
///
/// let mut cpu = CPU::new(memory);
/// cpu.set_segment(SegReg::CS, 0);
///
/// cpu.step().unwrap();
/// assert!(cpu.flags().carry);
/// cpu.step().unwrap();
/// assert!(!cpu.flags().carry);
/// cpu.step().unwrap();
/// assert!(cpu.flags().direction);
/// assert_eq!(cpu.ip(), 3);
/// ```
pub(crate) fn execute_flag_op<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let flags = &mut cpu.flags;
    match opcode {
        0xF5 => flags.carry = !flags.carry,
        0xF8 => flags.carry = false,
        0xF9 => flags.carry = true,
        0xFA => flags.interrupt = false,
        0xFB => flags.interrupt = true,
        0xFC => flags.direction = false,
        0xFD => flags.direction = true,
        _ => return Err(ExecutionError::IllegalOpcode(opcode)),
    }
    Ok(())
}
