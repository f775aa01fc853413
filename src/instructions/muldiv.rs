//! # Group 3: Unary, Multiply and Divide
//!
//! F6 (byte) and F7 (word), ModRM `reg` selects:
//!
//! | reg | operation |
//! |-----|-----------|
//! | 0 | TEST E, I |
//! | 1 | TEST E, I (undocumented alias) |
//! | 2 | NOT |
//! | 3 | NEG |
//! | 4 | MUL |
//! | 5 | IMUL |
//! | 6 | DIV |
//! | 7 | IDIV |
//!
//! Multiplies widen into AX (byte) or DX:AX (word). Divides narrow from the same
//! registers, quotient in AL/AX and remainder in AH/DX. A zero divisor or a
//! quotient that does not fit its destination raises
//! [`ExecutionError::DivideError`].

use crate::bits::Width;
use crate::instructions::alu::{logic, sub};
use crate::registers::{Reg16, Reg8};
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes Group 3 (F6/F7).
pub(crate) fn execute_group3<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let width = Width::from_opcode(opcode);
    let (modrm, operand) = cpu.fetch_operand()?;

    match modrm.reg {
        // TEST E, I: the immediate follows the displacement
        0 | 1 => {
            let imm = match width {
                Width::Byte => cpu.fetch8() as u16,
                Width::Word => cpu.fetch16(),
            };
            let value = cpu.read_operand(operand, width)?;
            logic(&mut cpu.flags, value & imm, width);
        }

        // NOT: no flags
        2 => {
            let value = cpu.read_operand(operand, width)?;
            cpu.write_operand(operand, width, !value & width.mask())?;
        }

        // NEG: 0 - value, CF set unless the operand was zero
        3 => {
            let value = cpu.read_operand(operand, width)?;
            let result = sub(&mut cpu.flags, 0, value, false, width);
            cpu.write_operand(operand, width, result)?;
        }

        4 => {
            let value = cpu.read_operand(operand, width)?;
            mul(cpu, value, width);
        }

        5 => {
            let value = cpu.read_operand(operand, width)?;
            imul(cpu, value, width);
        }

        6 => {
            let value = cpu.read_operand(operand, width)?;
            div(cpu, value, width)?;
        }

        _ => {
            let value = cpu.read_operand(operand, width)?;
            idiv(cpu, value, width)?;
        }
    }

    Ok(())
}

/// Unsigned multiply. CF = OF = upper half non-zero.
fn mul<M: MemoryBus>(cpu: &mut CPU<M>, value: u16, width: Width) {
    let upper = match width {
        Width::Byte => {
            let product = cpu.regs.get8(Reg8::AL) as u16 * (value & 0xFF);
            cpu.regs.set(Reg16::AX, product);
            cpu.flags.set_szp(product, Width::Byte);
            product >> 8
        }
        Width::Word => {
            let product = cpu.regs.get(Reg16::AX) as u32 * value as u32;
            cpu.regs.set(Reg16::AX, product as u16);
            cpu.regs.set(Reg16::DX, (product >> 16) as u16);
            cpu.flags.set_szp(product as u16, Width::Word);
            (product >> 16) as u16
        }
    };

    cpu.flags.carry = upper != 0;
    cpu.flags.overflow = upper != 0;
}

/// Signed multiply. CF = OF = upper half is not the sign extension of the lower.
fn imul<M: MemoryBus>(cpu: &mut CPU<M>, value: u16, width: Width) {
    let significant = match width {
        Width::Byte => {
            let product = cpu.regs.get8(Reg8::AL) as i8 as i16 * value as u8 as i8 as i16;
            cpu.regs.set(Reg16::AX, product as u16);
            cpu.flags.set_szp(product as u16, Width::Byte);
            product != product as i8 as i16
        }
        Width::Word => {
            let product = cpu.regs.get(Reg16::AX) as i16 as i32 * value as i16 as i32;
            cpu.regs.set(Reg16::AX, product as u16);
            cpu.regs.set(Reg16::DX, (product >> 16) as u16);
            cpu.flags.set_szp(product as u16, Width::Word);
            product != product as i16 as i32
        }
    };

    cpu.flags.carry = significant;
    cpu.flags.overflow = significant;
}

/// Unsigned divide of AX by a byte or DX:AX by a word.
fn div<M: MemoryBus>(cpu: &mut CPU<M>, value: u16, width: Width) -> Result<(), ExecutionError> {
    match width {
        Width::Byte => {
            let divisor = value & 0xFF;
            if divisor == 0 {
                return Err(ExecutionError::DivideError);
            }
            let dividend = cpu.regs.get(Reg16::AX);
            let quotient = dividend / divisor;
            if quotient > 0xFF {
                return Err(ExecutionError::DivideError);
            }
            cpu.regs.set8(Reg8::AL, quotient as u8);
            cpu.regs.set8(Reg8::AH, (dividend % divisor) as u8);
        }
        Width::Word => {
            if value == 0 {
                return Err(ExecutionError::DivideError);
            }
            let dividend =
                ((cpu.regs.get(Reg16::DX) as u32) << 16) | cpu.regs.get(Reg16::AX) as u32;
            let quotient = dividend / value as u32;
            if quotient > 0xFFFF {
                return Err(ExecutionError::DivideError);
            }
            cpu.regs.set(Reg16::AX, quotient as u16);
            cpu.regs.set(Reg16::DX, (dividend % value as u32) as u16);
        }
    }

    Ok(())
}

/// Signed divide. The quotient truncates toward zero and the remainder takes
/// the sign of the dividend. The 8086 rejects the most negative quotient
/// (-128 / -32768).
fn idiv<M: MemoryBus>(cpu: &mut CPU<M>, value: u16, width: Width) -> Result<(), ExecutionError> {
    match width {
        Width::Byte => {
            let divisor = value as u8 as i8 as i32;
            if divisor == 0 {
                return Err(ExecutionError::DivideError);
            }
            let dividend = cpu.regs.get(Reg16::AX) as i16 as i32;
            let quotient = dividend / divisor;
            if !(-0x7F..=0x7F).contains(&quotient) {
                return Err(ExecutionError::DivideError);
            }
            cpu.regs.set8(Reg8::AL, quotient as u8);
            cpu.regs.set8(Reg8::AH, (dividend % divisor) as u8);
        }
        Width::Word => {
            let divisor = value as i16 as i64;
            if divisor == 0 {
                return Err(ExecutionError::DivideError);
            }
            let dividend = ((((cpu.regs.get(Reg16::DX) as u32) << 16)
                | cpu.regs.get(Reg16::AX) as u32) as i32) as i64;
            let quotient = dividend / divisor;
            if !(-0x7FFF..=0x7FFF).contains(&quotient) {
                return Err(ExecutionError::DivideError);
            }
            cpu.regs.set(Reg16::AX, quotient as u16);
            cpu.regs.set(Reg16::DX, (dividend % divisor) as u16);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatMemory, SegReg};

    fn setup_cpu() -> CPU<FlatMemory> {
        let mut cpu = CPU::new(FlatMemory::new());
        cpu.set_segment(SegReg::CS, 0);
        cpu
    }

    #[test]
    fn test_mul_byte_sets_carry_when_high_half_used() {
        let mut cpu = setup_cpu();
        cpu.set_reg8(Reg8::AL, 0x80);
        mul(&mut cpu, 0x02, Width::Byte);
        assert_eq!(cpu.reg16(Reg16::AX), 0x0100);
        assert!(cpu.flags().carry);
        assert!(cpu.flags().overflow);
    }

    #[test]
    fn test_imul_word_sign_extension_clears_carry() {
        let mut cpu = setup_cpu();
        cpu.set_reg16(Reg16::AX, 0xFFFF); // -1
        imul(&mut cpu, 0x0002, Width::Word);
        assert_eq!(cpu.reg16(Reg16::AX), 0xFFFE);
        assert_eq!(cpu.reg16(Reg16::DX), 0xFFFF);
        assert!(!cpu.flags().carry);
    }

    #[test]
    fn test_div_overflow() {
        let mut cpu = setup_cpu();
        cpu.set_reg16(Reg16::AX, 0x1000);
        assert_eq!(div(&mut cpu, 0x02, Width::Byte), Err(ExecutionError::DivideError));
        assert_eq!(div(&mut cpu, 0x00, Width::Word), Err(ExecutionError::DivideError));
    }

    #[test]
    fn test_idiv_remainder_sign() {
        let mut cpu = setup_cpu();
        cpu.set_reg16(Reg16::AX, (-7i16) as u16);
        idiv(&mut cpu, 2, Width::Byte).unwrap();
        assert_eq!(cpu.reg8(Reg8::AL) as i8, -3);
        assert_eq!(cpu.reg8(Reg8::AH) as i8, -1);
    }

    #[test]
    fn test_idiv_rejects_most_negative_quotient() {
        let mut cpu = setup_cpu();
        cpu.set_reg16(Reg16::AX, (-128i16) as u16);
        assert_eq!(
            idiv(&mut cpu, 1, Width::Byte),
            Err(ExecutionError::DivideError)
        );
    }
}
