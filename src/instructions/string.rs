//! # String Instructions
//!
//! | opcode | instruction | effect |
//! |--------|-------------|--------|
//! | A4/A5 | MOVSB/MOVSW | [ES:DI] = [DS:SI] |
//! | A6/A7 | CMPSB/CMPSW | flags of [DS:SI] - [ES:DI] |
//! | AA/AB | STOSB/STOSW | [ES:DI] = AL/AX |
//! | AC/AD | LODSB/LODSW | AL/AX = [DS:SI] |
//! | AE/AF | SCASB/SCASW | flags of AL/AX - [ES:DI] |
//!
//! The source segment DS can be overridden; the destination ES cannot. SI and
//! DI move by the element size, forward when DF is clear and backward when set.
//!
//! ## Repeat Prefixes
//!
//! With REP/REPE (F3) or REPNE (F2), each iteration performs the operation,
//! decrements CX, and stops once CX reaches zero. CMPS and SCAS also stop
//! when ZF disagrees with the prefix: REPE stops on a mismatch, REPNE on a
//! match. The count is tested only after an element has been processed, so
//! CX = 0 on entry wraps to 0xFFFF and the operation runs 65536 times.

use crate::bits::Width;
use crate::cpu::RepeatPrefix;
use crate::instructions::alu::{alu, AluOp};
use crate::registers::{Reg16, SegReg};
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes a string instruction, repeated if a prefix is present.
pub(crate) fn execute_string<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);

    let prefix = match cpu.repeat {
        None => return string_step(cpu, opcode, width),
        Some(prefix) => prefix,
    };

    let compares = matches!(opcode, 0xA6 | 0xA7 | 0xAE | 0xAF);

    loop {
        string_step(cpu, opcode, width)?;

        let cx = cpu.regs.get(Reg16::CX).wrapping_sub(1);
        cpu.regs.set(Reg16::CX, cx);

        let mismatch = compares
            && match prefix {
                RepeatPrefix::WhileEqual => !cpu.flags.zero,
                RepeatPrefix::WhileNotEqual => cpu.flags.zero,
            };
        if cx == 0 || mismatch {
            break;
        }
    }

    Ok(())
}

/// Performs one element of a string operation and advances SI/DI.
fn string_step<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    width: Width,
) -> Result<(), ExecutionError> {
    let step = if cpu.flags.direction {
        width.bytes().wrapping_neg()
    } else {
        width.bytes()
    };

    let source = cpu.regs.segment(cpu.data_segment(SegReg::DS));
    let extra = cpu.regs.segment(SegReg::ES);
    let si = cpu.regs.get(Reg16::SI);
    let di = cpu.regs.get(Reg16::DI);

    let (advance_si, advance_di) = match opcode {
        // MOVS
        0xA4 | 0xA5 => {
            let value = cpu.read_width(width, source, si);
            cpu.write_width(width, extra, di, value);
            (true, true)
        }

        // CMPS
        0xA6 | 0xA7 => {
            let a = cpu.read_width(width, source, si);
            let b = cpu.read_width(width, extra, di);
            alu(&mut cpu.flags, AluOp::Cmp, a, b, width);
            (true, true)
        }

        // STOS
        0xAA | 0xAB => {
            let value = cpu.read_register(Reg16::AX as u8, width)?;
            cpu.write_width(width, extra, di, value);
            (false, true)
        }

        // LODS
        0xAC | 0xAD => {
            let value = cpu.read_width(width, source, si);
            cpu.write_register(Reg16::AX as u8, width, value)?;
            (true, false)
        }

        // SCAS
        0xAE | 0xAF => {
            let a = cpu.read_register(Reg16::AX as u8, width)?;
            let b = cpu.read_width(width, extra, di);
            alu(&mut cpu.flags, AluOp::Cmp, a, b, width);
            (false, true)
        }

        _ => return Err(ExecutionError::IllegalOpcode(opcode)),
    };

    if advance_si {
        cpu.regs.set(Reg16::SI, si.wrapping_add(step));
    }
    if advance_di {
        cpu.regs.set(Reg16::DI, di.wrapping_add(step));
    }

    Ok(())
}
