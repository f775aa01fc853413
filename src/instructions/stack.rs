//! # Stack Operations
//!
//! This module implements stack manipulation instructions:
//! - PUSH r16 / POP r16 (50-5F)
//! - PUSH / POP segment register (06 07 0E 0F 16 17 1E 1F)
//! - POP Ev (8F)
//! - PUSHF / POPF (9C / 9D)
//!
//! The stack lives at SS:SP and grows downward in word steps. A push
//! decrements SP by two and then stores; a pop loads and then increments.
//! PUSH Ev is part of Group 5 in `control`.

use crate::bits::{get_bits, Width};
use crate::registers::{Reg16, SegReg};
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes PUSH r16 (50-57).
///
/// PUSH SP stores the already decremented value, as the 8086 does.
pub(crate) fn execute_push_reg16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let reg = Reg16::try_from(opcode & 0x07)?;
    let value = match reg {
        Reg16::SP => cpu.regs.get(Reg16::SP).wrapping_sub(2),
        reg => cpu.regs.get(reg),
    };
    cpu.push(value);
    Ok(())
}

/// Executes POP r16 (58-5F).
pub(crate) fn execute_pop_reg16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let reg = Reg16::try_from(opcode & 0x07)?;
    let value = cpu.pop();
    cpu.regs.set(reg, value);
    Ok(())
}

/// Executes PUSH ES/CS/SS/DS (06 0E 16 1E). Bits 3-4 select the register.
pub(crate) fn execute_push_segment<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let reg = SegReg::try_from(get_bits(opcode, 3, 2))?;
    cpu.push(cpu.regs.segment(reg));
    Ok(())
}

/// Executes POP ES/CS/SS/DS (07 0F 17 1F).
///
/// POP CS (0F) only exists on the original 8086; it is executed as encoded.
pub(crate) fn execute_pop_segment<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let reg = SegReg::try_from(get_bits(opcode, 3, 2))?;
    let value = cpu.pop();
    cpu.regs.set_segment(reg, value);
    Ok(())
}

/// Executes POP Ev (8F /0).
pub(crate) fn execute_pop_operand<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;
    if modrm.reg != 0 {
        return Err(ExecutionError::IllegalSubOpcode {
            opcode,
            sub: modrm.reg,
        });
    }

    let value = cpu.pop();
    cpu.write_operand(operand, Width::Word, value)
}

/// Executes PUSHF (9C).
pub(crate) fn execute_pushf<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    cpu.push(cpu.flags.bits());
    Ok(())
}

/// Executes POPF (9D).
pub(crate) fn execute_popf<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let value = cpu.pop();
    cpu.flags.set_bits(value);
    Ok(())
}
