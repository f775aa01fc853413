//! # Decimal Adjust Instructions
//!
//! Packed BCD (DAA, DAS) keeps two decimal digits per byte in AL. Unpacked BCD
//! (AAA, AAS, AAM, AAD) keeps one digit per byte in AL and AH.

use crate::bits::Width;
use crate::registers::Reg8;
use crate::{ExecutionError, MemoryBus, CPU};

/// DAA (27): adjust AL after adding two packed BCD values.
pub(crate) fn execute_daa<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let old_al = cpu.regs.get8(Reg8::AL);
    let old_carry = cpu.flags.carry;
    let mut al = old_al;
    cpu.flags.carry = false;

    if al & 0x0F > 9 || cpu.flags.auxiliary {
        let (adjusted, carry) = al.overflowing_add(0x06);
        al = adjusted;
        cpu.flags.carry = old_carry || carry;
        cpu.flags.auxiliary = true;
    } else {
        cpu.flags.auxiliary = false;
    }

    if old_al > 0x99 || old_carry {
        al = al.wrapping_add(0x60);
        cpu.flags.carry = true;
    } else {
        cpu.flags.carry = false;
    }

    cpu.regs.set8(Reg8::AL, al);
    cpu.flags.set_szp(al as u16, Width::Byte);
    Ok(())
}

/// DAS (2F): adjust AL after subtracting two packed BCD values.
pub(crate) fn execute_das<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let old_al = cpu.regs.get8(Reg8::AL);
    let old_carry = cpu.flags.carry;
    let mut al = old_al;
    cpu.flags.carry = false;

    if al & 0x0F > 9 || cpu.flags.auxiliary {
        let (adjusted, borrow) = al.overflowing_sub(0x06);
        al = adjusted;
        cpu.flags.carry = old_carry || borrow;
        cpu.flags.auxiliary = true;
    } else {
        cpu.flags.auxiliary = false;
    }

    if old_al > 0x99 || old_carry {
        al = al.wrapping_sub(0x60);
        cpu.flags.carry = true;
    }

    cpu.regs.set8(Reg8::AL, al);
    cpu.flags.set_szp(al as u16, Width::Byte);
    Ok(())
}

/// AAA (37): adjust AL after an unpacked BCD addition, carrying into AH.
pub(crate) fn execute_aaa<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let al = cpu.regs.get8(Reg8::AL);

    if al & 0x0F > 9 || cpu.flags.auxiliary {
        cpu.regs.set8(Reg8::AL, al.wrapping_add(6));
        cpu.regs.set8(Reg8::AH, cpu.regs.get8(Reg8::AH).wrapping_add(1));
        cpu.flags.auxiliary = true;
        cpu.flags.carry = true;
    } else {
        cpu.flags.auxiliary = false;
        cpu.flags.carry = false;
    }

    cpu.regs.set8(Reg8::AL, cpu.regs.get8(Reg8::AL) & 0x0F);
    Ok(())
}

/// AAS (3F): adjust AL after an unpacked BCD subtraction, borrowing from AH.
pub(crate) fn execute_aas<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let al = cpu.regs.get8(Reg8::AL);

    if al & 0x0F > 9 || cpu.flags.auxiliary {
        cpu.regs.set8(Reg8::AL, al.wrapping_sub(6));
        cpu.regs.set8(Reg8::AH, cpu.regs.get8(Reg8::AH).wrapping_sub(1));
        cpu.flags.auxiliary = true;
        cpu.flags.carry = true;
    } else {
        cpu.flags.auxiliary = false;
        cpu.flags.carry = false;
    }

    cpu.regs.set8(Reg8::AL, cpu.regs.get8(Reg8::AL) & 0x0F);
    Ok(())
}

/// AAM ib (D4): AH = AL / base, AL = AL % base. Base 10 in the usual encoding.
pub(crate) fn execute_aam<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let base = cpu.fetch8();
    if base == 0 {
        return Err(ExecutionError::DivideError);
    }

    let al = cpu.regs.get8(Reg8::AL);
    cpu.regs.set8(Reg8::AH, al / base);
    cpu.regs.set8(Reg8::AL, al % base);
    cpu.flags.set_szp((al % base) as u16, Width::Byte);
    Ok(())
}

/// AAD ib (D5): AL = AL + AH * base, AH = 0.
pub(crate) fn execute_aad<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let base = cpu.fetch8();
    let al = cpu.regs.get8(Reg8::AL);
    let ah = cpu.regs.get8(Reg8::AH);

    let result = al.wrapping_add(ah.wrapping_mul(base));
    cpu.regs.set8(Reg8::AL, result);
    cpu.regs.set8(Reg8::AH, 0);
    cpu.flags.set_szp(result as u16, Width::Byte);
    Ok(())
}
