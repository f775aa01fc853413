//! # Data Transfer Instructions
//!
//! This module implements register and memory transfer operations:
//! - MOV in all its forms (88-8C, 8E, A0-A3, B0-BF, C6, C7)
//! - XCHG (86, 87, 90-97)
//! - LEA, LES, LDS (8D, C4, C5)
//! - XLAT (D7)
//! - LAHF, SAHF (9F, 9E)
//! - CBW, CWD (98, 99)
//!
//! None of these affect the flags, except SAHF which writes the low byte of
//! FLAGS from AH.

use crate::bits::{set_bits, sign_extend, Width};
use crate::registers::{Reg16, Reg8, SegReg};
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes MOV between a ModRM operand and a register (88-8B).
///
/// Bit 1 is the direction: clear stores the register into the operand, set
/// loads the operand into the register.
pub(crate) fn execute_mov<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;

    if opcode & 0x02 == 0 {
        let value = cpu.read_register(modrm.reg, width)?;
        cpu.write_operand(operand, width, value)
    } else {
        let value = cpu.read_operand(operand, width)?;
        cpu.write_register(modrm.reg, width, value)
    }
}

/// Executes MOV Ew, Sw (8C) and MOV Sw, Ew (8E).
///
/// ModRM `reg` selects the segment register; values 4-7 are rejected.
pub(crate) fn execute_mov_segment<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;
    let segment = SegReg::try_from(modrm.reg)?;

    if opcode == 0x8C {
        let value = cpu.regs.segment(segment);
        cpu.write_operand(operand, Width::Word, value)
    } else {
        let value = cpu.read_operand(operand, Width::Word)?;
        cpu.regs.set_segment(segment, value);
        Ok(())
    }
}

/// Executes MOV between the accumulator and a direct address (A0-A3).
///
/// - A0: MOV AL, [addr]
/// - A1: MOV AX, [addr]
/// - A2: MOV [addr], AL
/// - A3: MOV [addr], AX
pub(crate) fn execute_mov_offset<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let offset = cpu.fetch16();
    let segment = cpu.regs.segment(cpu.data_segment(SegReg::DS));

    if opcode & 0x02 == 0 {
        let value = cpu.read_width(width, segment, offset);
        cpu.write_register(Reg16::AX as u8, width, value)
    } else {
        let value = cpu.read_register(Reg16::AX as u8, width)?;
        cpu.write_width(width, segment, offset, value);
        Ok(())
    }
}

/// Executes MOV r8, imm8 (B0-B7).
pub(crate) fn execute_mov_reg8_imm<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let value = cpu.fetch8();
    cpu.regs.set8(Reg8::try_from(opcode & 0x07)?, value);
    Ok(())
}

/// Executes MOV r16, imm16 (B8-BF).
///
/// # Examples
///
/// ```
/// use lib8086::{CPU, FlatMemory, Reg16, SegReg};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x00000, &[0xBB, 0xCD, 0xAB]); // MOV BX, 0xABCD
///
/// let mut cpu = CPU::new(memory);
/// cpu.set_segment(SegReg::CS, 0);
/// cpu.step().unwrap();
///
/// assert_eq!(cpu.reg16(Reg16::BX), 0xABCD);
/// assert_eq!(cpu.ip(), 3);
/// ```
pub(crate) fn execute_mov_reg16_imm<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let value = cpu.fetch16();
    cpu.regs.set(Reg16::try_from(opcode & 0x07)?, value);
    Ok(())
}

/// Executes MOV Eb, Ib (C6 /0) and MOV Ev, Iv (C7 /0).
///
/// The immediate follows the displacement.
pub(crate) fn execute_mov_immediate<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;
    if modrm.reg != 0 {
        return Err(ExecutionError::IllegalSubOpcode {
            opcode,
            sub: modrm.reg,
        });
    }

    let value = match width {
        Width::Byte => cpu.fetch8() as u16,
        Width::Word => cpu.fetch16(),
    };
    cpu.write_operand(operand, width, value)
}

/// Executes XCHG E, G (86, 87).
pub(crate) fn execute_xchg<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;

    let from_operand = cpu.read_operand(operand, width)?;
    let from_register = cpu.read_register(modrm.reg, width)?;
    cpu.write_operand(operand, width, from_register)?;
    cpu.write_register(modrm.reg, width, from_operand)
}

/// Executes XCHG AX, r16 (90-97). 90 is NOP.
pub(crate) fn execute_xchg_ax<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let reg = Reg16::try_from(opcode & 0x07)?;
    let ax = cpu.regs.get(Reg16::AX);
    cpu.regs.set(Reg16::AX, cpu.regs.get(reg));
    cpu.regs.set(reg, ax);
    Ok(())
}

/// Executes LEA Gv, M (8D): loads the effective address, not the memory at it.
pub(crate) fn execute_lea<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;
    let (_, offset) = cpu.memory_operand(operand, opcode)?;
    cpu.write_register(modrm.reg, Width::Word, offset)
}

/// Executes LES (C4) and LDS (C5): loads a far pointer from memory.
///
/// The register receives the word at the effective address and ES/DS the word
/// after it.
pub(crate) fn execute_load_far_pointer<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let (modrm, operand) = cpu.fetch_operand()?;
    let (segment, offset) = cpu.memory_operand(operand, opcode)?;
    let base = cpu.regs.segment(segment);

    let pointer_offset = cpu.read16(base, offset);
    let pointer_segment = cpu.read16(base, offset.wrapping_add(2));

    cpu.write_register(modrm.reg, Width::Word, pointer_offset)?;
    let target = if opcode == 0xC4 { SegReg::ES } else { SegReg::DS };
    cpu.regs.set_segment(target, pointer_segment);
    Ok(())
}

/// Executes XLAT (D7): AL = [DS:BX + AL].
pub(crate) fn execute_xlat<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let segment = cpu.regs.segment(cpu.data_segment(SegReg::DS));
    let offset = cpu
        .regs
        .get(Reg16::BX)
        .wrapping_add(cpu.regs.get8(Reg8::AL) as u16);
    let value = cpu.read8(segment, offset);
    cpu.regs.set8(Reg8::AL, value);
    Ok(())
}

/// Executes LAHF (9F): AH = low byte of FLAGS.
pub(crate) fn execute_lahf<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    cpu.regs.set8(Reg8::AH, cpu.flags.bits() as u8);
    Ok(())
}

/// Executes SAHF (9E): low byte of FLAGS = AH.
pub(crate) fn execute_sahf<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let ah = cpu.regs.get8(Reg8::AH) as u16;
    let value = set_bits(cpu.flags.bits(), 0, ah, 8);
    cpu.flags.set_bits(value);
    Ok(())
}

/// Executes CBW (98): sign-extends AL into AX.
pub(crate) fn execute_cbw<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let al = cpu.regs.get8(Reg8::AL);
    cpu.regs.set(Reg16::AX, sign_extend(al));
    Ok(())
}

/// Executes CWD (99): sign-extends AX into DX:AX.
pub(crate) fn execute_cwd<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let dx = if cpu.regs.get(Reg16::AX) & 0x8000 != 0 {
        0xFFFF
    } else {
        0x0000
    };
    cpu.regs.set(Reg16::DX, dx);
    Ok(())
}
