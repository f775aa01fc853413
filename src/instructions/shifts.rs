//! # Shift and Rotate Instructions
//!
//! Group 2 (D0-D3): the ModRM `reg` field selects the operation, the opcode the
//! width and whether the count is 1 (D0/D1) or CL (D2/D3).
//!
//! | reg | operation |
//! |-----|-----------|
//! | 0 | ROL |
//! | 1 | ROR |
//! | 2 | RCL |
//! | 3 | RCR |
//! | 4 | SHL / SAL |
//! | 5 | SHR |
//! | 6 | SAL (undocumented alias of 4) |
//! | 7 | SAR |
//!
//! The 8086 does not mask the count. Every operation leaves its operand and the
//! flags untouched when the count is zero. CF receives the last bit shifted
//! out; OF is only written for a count of one. The shifts (4-7) also set SF,
//! ZF and PF from the result; the rotates do not touch them.

use crate::bits::Width;
use crate::flags::Flags;
use crate::registers::Reg8;
use crate::{ExecutionError, MemoryBus, CPU};

/// Applies Group 2 operation `sub` to `value`, `count` times.
///
/// `opcode` is only used to report an invalid `sub`.
pub(crate) fn shift(
    flags: &mut Flags,
    opcode: u8,
    sub: u8,
    value: u16,
    count: u8,
    width: Width,
) -> Result<u16, ExecutionError> {
    let msb = width.sign_bit();
    let mask = width.mask();
    let mut v = value & mask;

    if count == 0 {
        return Ok(v);
    }

    let top = |v: u16| v & msb != 0;

    match sub {
        // ROL
        0 => {
            for _ in 0..count {
                let out = top(v);
                v = ((v << 1) | out as u16) & mask;
                flags.carry = out;
            }
            if count == 1 {
                flags.overflow = top(v) ^ flags.carry;
            }
        }

        // ROR
        1 => {
            for _ in 0..count {
                let out = v & 1 != 0;
                v = (v >> 1) | if out { msb } else { 0 };
                flags.carry = out;
            }
            if count == 1 {
                flags.overflow = top(v) ^ top(v << 1);
            }
        }

        // RCL
        2 => {
            for _ in 0..count {
                let out = top(v);
                v = ((v << 1) | flags.carry as u16) & mask;
                flags.carry = out;
            }
            if count == 1 {
                flags.overflow = top(v) ^ flags.carry;
            }
        }

        // RCR
        3 => {
            if count == 1 {
                flags.overflow = top(v) ^ flags.carry;
            }
            for _ in 0..count {
                let out = v & 1 != 0;
                v = (v >> 1) | if flags.carry { msb } else { 0 };
                flags.carry = out;
            }
        }

        // SHL / SAL
        4 | 6 => {
            for _ in 0..count {
                flags.carry = top(v);
                v = (v << 1) & mask;
            }
            if count == 1 {
                flags.overflow = top(v) ^ flags.carry;
            }
            flags.set_szp(v, width);
        }

        // SHR
        5 => {
            if count == 1 {
                flags.overflow = top(v);
            }
            for _ in 0..count {
                flags.carry = v & 1 != 0;
                v >>= 1;
            }
            flags.set_szp(v, width);
        }

        // SAR
        7 => {
            for _ in 0..count {
                flags.carry = v & 1 != 0;
                v = (v >> 1) | (v & msb);
            }
            if count == 1 {
                flags.overflow = false;
            }
            flags.set_szp(v, width);
        }

        sub => return Err(ExecutionError::IllegalSubOpcode { opcode, sub }),
    }

    Ok(v)
}

/// Executes Group 2 (D0-D3).
pub(crate) fn execute_group2<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;

    let count = if opcode & 0x02 != 0 {
        cpu.regs.get8(Reg8::CL)
    } else {
        1
    };

    let value = cpu.read_operand(operand, width)?;
    let result = shift(&mut cpu.flags, opcode, modrm.reg, value, count, width)?;

    if count != 0 {
        cpu.write_operand(operand, width, result)?;
    }

    Ok(())
}
