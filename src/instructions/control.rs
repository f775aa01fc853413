//! # Control Flow Instructions
//!
//! This module implements control flow operations:
//! - Jcc: conditional short jumps (70-7F)
//! - JMP: short (EB), near (E9), far (EA)
//! - CALL: near (E8), far (9A)
//! - RET / RETF, with optional stack adjustment (C2, C3, CA, CB)
//! - LOOP, LOOPE, LOOPNE, JCXZ (E0-E3)
//! - Group 5 (FF): INC, DEC, indirect CALL/JMP near and far, PUSH
//! - HLT (F4)
//!
//! Relative displacements are added to the IP of the following instruction
//! and wrap within the code segment.

use crate::bits::{sign_extend, Width};
use crate::flags::Flags;
use crate::instructions::inc_dec::inc_dec;
use crate::registers::{Reg16, SegReg};
use crate::{ExecutionError, MemoryBus, CPU};

/// Evaluates condition code `cc` (low nibble of 70-7F).
///
/// | cc | mnemonic | condition |
/// |----|----------|-----------|
/// | 0 / 1 | JO / JNO | OF |
/// | 2 / 3 | JB / JAE | CF |
/// | 4 / 5 | JE / JNE | ZF |
/// | 6 / 7 | JBE / JA | CF or ZF |
/// | 8 / 9 | JS / JNS | SF |
/// | A / B | JP / JNP | PF |
/// | C / D | JL / JGE | SF != OF |
/// | E / F | JLE / JG | ZF or SF != OF |
///
/// Odd codes negate the even code before them.
pub(crate) fn condition(flags: &Flags, cc: u8) -> bool {
    let taken = match (cc & 0x0F) >> 1 {
        0 => flags.overflow,
        1 => flags.carry,
        2 => flags.zero,
        3 => flags.carry || flags.zero,
        4 => flags.sign,
        5 => flags.parity,
        6 => flags.sign != flags.overflow,
        _ => flags.zero || flags.sign != flags.overflow,
    };
    taken ^ (cc & 1 != 0)
}

fn jump_relative<M: MemoryBus>(cpu: &mut CPU<M>, displacement: u16) {
    let target = cpu.regs.ip().wrapping_add(displacement);
    cpu.regs.set_ip(target);
}

/// Executes Jcc rel8 (70-7F).
pub(crate) fn execute_jcc<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    // The displacement is always consumed, taken or not
    let displacement = sign_extend(cpu.fetch8());
    if condition(&cpu.flags, opcode) {
        jump_relative(cpu, displacement);
    }
    Ok(())
}

/// Executes JMP rel8 (EB) and JMP rel16 (E9).
pub(crate) fn execute_jmp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let displacement = match opcode {
        0xEB => sign_extend(cpu.fetch8()),
        _ => cpu.fetch16(),
    };
    jump_relative(cpu, displacement);
    Ok(())
}

/// Executes JMP ptr16:16 (EA).
pub(crate) fn execute_jmp_far<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let ip = cpu.fetch16();
    let cs = cpu.fetch16();
    cpu.regs.set_segment(SegReg::CS, cs);
    cpu.regs.set_ip(ip);
    Ok(())
}

/// Executes CALL rel16 (E8): pushes the return IP.
pub(crate) fn execute_call<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let displacement = cpu.fetch16();
    let return_ip = cpu.regs.ip();
    cpu.push(return_ip);
    jump_relative(cpu, displacement);
    Ok(())
}

/// Executes CALL ptr16:16 (9A): pushes CS, then the return IP.
pub(crate) fn execute_call_far<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let ip = cpu.fetch16();
    let cs = cpu.fetch16();
    call_far(cpu, cs, ip);
    Ok(())
}

fn call_far<M: MemoryBus>(cpu: &mut CPU<M>, cs: u16, ip: u16) {
    cpu.push(cpu.regs.segment(SegReg::CS));
    cpu.push(cpu.regs.ip());
    cpu.regs.set_segment(SegReg::CS, cs);
    cpu.regs.set_ip(ip);
}

/// Executes RET (C3) and RET imm16 (C2).
///
/// The immediate is the number of parameter bytes to discard after popping IP.
pub(crate) fn execute_ret<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let release = if opcode == 0xC2 { cpu.fetch16() } else { 0 };
    let ip = cpu.pop();
    cpu.regs.set_ip(ip);
    release_stack(cpu, release);
    Ok(())
}

/// Executes RETF (CB) and RETF imm16 (CA): pops IP, then CS.
pub(crate) fn execute_retf<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let release = if opcode == 0xCA { cpu.fetch16() } else { 0 };
    let ip = cpu.pop();
    let cs = cpu.pop();
    cpu.regs.set_ip(ip);
    cpu.regs.set_segment(SegReg::CS, cs);
    release_stack(cpu, release);
    Ok(())
}

fn release_stack<M: MemoryBus>(cpu: &mut CPU<M>, bytes: u16) {
    let sp = cpu.regs.get(Reg16::SP).wrapping_add(bytes);
    cpu.regs.set(Reg16::SP, sp);
}

/// Executes LOOPNE (E0), LOOPE (E1) and LOOP (E2).
///
/// CX is decremented first; the jump is taken while it is non-zero and, for
/// LOOPE/LOOPNE, ZF matches.
pub(crate) fn execute_loop<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let displacement = sign_extend(cpu.fetch8());
    let cx = cpu.regs.get(Reg16::CX).wrapping_sub(1);
    cpu.regs.set(Reg16::CX, cx);

    let taken = cx != 0
        && match opcode {
            0xE0 => !cpu.flags.zero,
            0xE1 => cpu.flags.zero,
            _ => true,
        };

    if taken {
        jump_relative(cpu, displacement);
    }
    Ok(())
}

/// Executes JCXZ (E3).
pub(crate) fn execute_jcxz<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let displacement = sign_extend(cpu.fetch8());
    if cpu.regs.get(Reg16::CX) == 0 {
        jump_relative(cpu, displacement);
    }
    Ok(())
}

/// Executes HLT (F4).
pub(crate) fn execute_hlt<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    log::debug!(
        "HLT at {:04X}:{:04X}",
        cpu.regs.segment(SegReg::CS),
        cpu.regs.ip().wrapping_sub(1)
    );
    cpu.halted = true;
    Ok(())
}

/// Executes Group 5 (FF).
///
/// | reg | operation |
/// |-----|-----------|
/// | 0 | INC Ev |
/// | 1 | DEC Ev |
/// | 2 | CALL Ev (near indirect) |
/// | 3 | CALL Mp (far indirect) |
/// | 4 | JMP Ev (near indirect) |
/// | 5 | JMP Mp (far indirect) |
/// | 6 | PUSH Ev |
pub(crate) fn execute_group5<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;

    match modrm.reg {
        0 | 1 => {
            let value = cpu.read_operand(operand, Width::Word)?;
            let result = inc_dec(&mut cpu.flags, value, Width::Word, modrm.reg == 1);
            cpu.write_operand(operand, Width::Word, result)?;
        }

        2 => {
            let target = cpu.read_operand(operand, Width::Word)?;
            cpu.push(cpu.regs.ip());
            cpu.regs.set_ip(target);
        }

        3 | 5 => {
            let (segment, offset) = cpu.memory_operand(operand, opcode)?;
            let base = cpu.regs.segment(segment);
            let ip = cpu.read16(base, offset);
            let cs = cpu.read16(base, offset.wrapping_add(2));
            if modrm.reg == 3 {
                call_far(cpu, cs, ip);
            } else {
                cpu.regs.set_segment(SegReg::CS, cs);
                cpu.regs.set_ip(ip);
            }
        }

        4 => {
            let target = cpu.read_operand(operand, Width::Word)?;
            cpu.regs.set_ip(target);
        }

        6 => {
            let value = cpu.read_operand(operand, Width::Word)?;
            cpu.push(value);
        }

        sub => return Err(ExecutionError::IllegalSubOpcode { opcode, sub }),
    }

    Ok(())
}
