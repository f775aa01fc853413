//! # Increment and Decrement Instructions
//!
//! - INC r16 / DEC r16 (40-4F)
//! - Group 4 (FE): INC Eb / DEC Eb
//!
//! Group 5 INC Ev / DEC Ev lives with the rest of Group 5 in `control` and
//! shares [`inc_dec`]. All forms set OF, SF, ZF, AF and PF and leave CF alone.

use crate::bits::Width;
use crate::flags::Flags;
use crate::instructions::alu::{add, sub};
use crate::{ExecutionError, MemoryBus, CPU};

/// Adds or subtracts one, preserving CF.
pub(crate) fn inc_dec(flags: &mut Flags, value: u16, width: Width, decrement: bool) -> u16 {
    let carry = flags.carry;
    let result = if decrement {
        sub(flags, value, 1, false, width)
    } else {
        add(flags, value, 1, false, width)
    };
    flags.carry = carry;
    result
}

/// Executes INC r16 (40-47).
pub(crate) fn execute_inc_reg16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    step_reg16(cpu, opcode, false)
}

/// Executes DEC r16 (48-4F).
pub(crate) fn execute_dec_reg16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    step_reg16(cpu, opcode, true)
}

fn step_reg16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    decrement: bool,
) -> Result<(), ExecutionError> {
    let reg = opcode & 0x07;
    let value = cpu.read_register(reg, Width::Word)?;
    let result = inc_dec(&mut cpu.flags, value, Width::Word, decrement);
    cpu.write_register(reg, Width::Word, result)
}

/// Executes Group 4 (FE): INC Eb (`reg` 0) and DEC Eb (`reg` 1).
pub(crate) fn execute_group4<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;
    let decrement = match modrm.reg {
        0 => false,
        1 => true,
        sub => return Err(ExecutionError::IllegalSubOpcode { opcode, sub }),
    };

    let value = cpu.read_operand(operand, Width::Byte)?;
    let result = inc_dec(&mut cpu.flags, value, Width::Byte, decrement);
    cpu.write_operand(operand, Width::Byte, result)
}
