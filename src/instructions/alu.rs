//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements the eight Group 1 operations and TEST:
//! - ADD, ADC: addition, with carry in for ADC
//! - SUB, SBB, CMP: subtraction, with borrow in for SBB; CMP discards the result
//! - AND, OR, XOR, TEST: logical operations; TEST discards the result
//!
//! Group 1 appears in three encodings: the predefined shapes 00-3D
//! (`Eb,Gb` `Ev,Gv` `Gb,Eb` `Gv,Ev` `AL,Ib` `AX,Iv`), the immediate forms
//! 80-83 where ModRM `reg` selects the operation, and the string compares,
//! which reuse [`alu`] with [`AluOp::Cmp`].

use crate::bits::{sign_extend, Width};
use crate::flags::Flags;
use crate::registers::{Reg16, Reg8};
use crate::{ExecutionError, MemoryBus, CPU};

/// Group 1 operation, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AluOp {
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Xor,
    Cmp,
}

impl AluOp {
    /// Decodes a 3-bit operation index (opcode bits 3-5 or ModRM `reg`).
    pub(crate) fn from_index(index: u8) -> Self {
        match index & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Or,
            2 => AluOp::Adc,
            3 => AluOp::Sbb,
            4 => AluOp::And,
            5 => AluOp::Sub,
            6 => AluOp::Xor,
            _ => AluOp::Cmp,
        }
    }

    /// CMP only sets flags.
    fn stores_result(self) -> bool {
        self != AluOp::Cmp
    }
}

/// Performs `dest op src` at `width`, updating the flags.
///
/// Returns the result truncated to `width` (for CMP, the difference).
pub(crate) fn alu(flags: &mut Flags, op: AluOp, dest: u16, src: u16, width: Width) -> u16 {
    match op {
        AluOp::Add => add(flags, dest, src, false, width),
        AluOp::Adc => {
            let carry = flags.carry;
            add(flags, dest, src, carry, width)
        }
        AluOp::Sub | AluOp::Cmp => sub(flags, dest, src, false, width),
        AluOp::Sbb => {
            let borrow = flags.carry;
            sub(flags, dest, src, borrow, width)
        }
        AluOp::And => logic(flags, dest & src, width),
        AluOp::Or => logic(flags, dest | src, width),
        AluOp::Xor => logic(flags, dest ^ src, width),
    }
}

/// Addition with optional carry in. Sets CF, PF, AF, ZF, SF, OF.
pub(crate) fn add(flags: &mut Flags, dest: u16, src: u16, carry_in: bool, width: Width) -> u16 {
    let mask = width.mask() as u32;
    let d = dest as u32 & mask;
    let s = src as u32 & mask;

    // Computed wide so the carry out of the top bit survives
    let wide = d + s + carry_in as u32;
    let result = (wide & mask) as u16;

    flags.carry = wide > mask;
    flags.auxiliary = (d ^ s ^ wide) & 0x10 != 0;

    // Both operands share a sign that the result does not
    flags.overflow = (!(d ^ s) & (d ^ wide)) as u16 & width.sign_bit() != 0;

    flags.set_szp(result, width);
    result
}

/// Subtraction with optional borrow in. Sets CF, PF, AF, ZF, SF, OF.
///
/// CF is the borrow: set when `src + borrow` exceeds `dest` unsigned.
pub(crate) fn sub(flags: &mut Flags, dest: u16, src: u16, borrow_in: bool, width: Width) -> u16 {
    let mask = width.mask() as u32;
    let d = dest as u32 & mask;
    let s = src as u32 & mask;
    let b = borrow_in as u32;

    let wide = d.wrapping_sub(s).wrapping_sub(b);
    let result = (wide & mask) as u16;

    flags.carry = s + b > d;
    flags.auxiliary = (d ^ s ^ wide) & 0x10 != 0;

    // Operands differ in sign and the result took the subtrahend's sign
    flags.overflow = ((d ^ s) & (d ^ wide)) as u16 & width.sign_bit() != 0;

    flags.set_szp(result, width);
    result
}

/// Logical result: clears CF, OF and AF, sets SF, ZF, PF.
pub(crate) fn logic(flags: &mut Flags, result: u16, width: Width) -> u16 {
    let result = result & width.mask();
    flags.carry = false;
    flags.overflow = false;
    flags.auxiliary = false;
    flags.set_szp(result, width);
    result
}

/// Executes the Group 1 forms with predefined operand shapes (00-3D).
///
/// Bits 3-5 of the opcode select the operation, bits 0-2 the shape:
///
/// | low bits | shape |
/// |----------|-------|
/// | 0 | Eb, Gb |
/// | 1 | Ev, Gv |
/// | 2 | Gb, Eb |
/// | 3 | Gv, Ev |
/// | 4 | AL, Ib |
/// | 5 | AX, Iv |
pub(crate) fn execute_alu<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let op = AluOp::from_index(opcode >> 3);
    let width = Width::from_opcode(opcode);

    match opcode & 0x07 {
        // E, G: result goes to the ModRM operand
        0 | 1 => {
            let (modrm, operand) = cpu.fetch_operand()?;
            let dest = cpu.read_operand(operand, width)?;
            let src = cpu.read_register(modrm.reg, width)?;
            let result = alu(&mut cpu.flags, op, dest, src, width);
            if op.stores_result() {
                cpu.write_operand(operand, width, result)?;
            }
        }

        // G, E: result goes to the register
        2 | 3 => {
            let (modrm, operand) = cpu.fetch_operand()?;
            let src = cpu.read_operand(operand, width)?;
            let dest = cpu.read_register(modrm.reg, width)?;
            let result = alu(&mut cpu.flags, op, dest, src, width);
            if op.stores_result() {
                cpu.write_register(modrm.reg, width, result)?;
            }
        }

        // Accumulator, immediate
        _ => {
            let src = match width {
                Width::Byte => cpu.fetch8() as u16,
                Width::Word => cpu.fetch16(),
            };
            let dest = cpu.read_register(Reg16::AX as u8, width)?;
            let result = alu(&mut cpu.flags, op, dest, src, width);
            if op.stores_result() {
                cpu.write_register(Reg16::AX as u8, width, result)?;
            }
        }
    }

    Ok(())
}

/// Executes Group 1 with an immediate source (80-83).
///
/// - 80, 82: `Eb, Ib`
/// - 81: `Ev, Iv`
/// - 83: `Ev, Ib` with the immediate sign-extended
///
/// The immediate follows any displacement bytes.
pub(crate) fn execute_alu_immediate<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;
    let op = AluOp::from_index(modrm.reg);

    let src = match opcode {
        0x81 => cpu.fetch16(),
        0x83 => sign_extend(cpu.fetch8()),
        _ => cpu.fetch8() as u16,
    };

    let dest = cpu.read_operand(operand, width)?;
    let result = alu(&mut cpu.flags, op, dest, src, width);
    if op.stores_result() {
        cpu.write_operand(operand, width, result)?;
    }

    Ok(())
}

/// Executes TEST: AND without storing the result.
///
/// - 84/85: `Eb, Gb` / `Ev, Gv`
/// - A8/A9: `AL, Ib` / `AX, Iv`
pub(crate) fn execute_test<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);

    let (a, b) = match opcode {
        0x84 | 0x85 => {
            let (modrm, operand) = cpu.fetch_operand()?;
            (
                cpu.read_operand(operand, width)?,
                cpu.read_register(modrm.reg, width)?,
            )
        }
        _ => {
            let imm = match width {
                Width::Byte => cpu.fetch8() as u16,
                Width::Word => cpu.fetch16(),
            };
            let acc = match width {
                Width::Byte => cpu.regs.get8(Reg8::AL) as u16,
                Width::Word => cpu.regs.get(Reg16::AX),
            };
            (acc, imm)
        }
    };

    logic(&mut cpu.flags, a & b, width);
    Ok(())
}
