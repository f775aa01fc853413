//! # Port I/O Instructions
//!
//! | opcode | instruction |
//! |--------|-------------|
//! | E4 | IN AL, imm8 |
//! | E5 | IN AX, imm8 |
//! | E6 | OUT imm8, AL |
//! | E7 | OUT imm8, AX |
//! | EC | IN AL, DX |
//! | ED | IN AX, DX |
//! | EE | OUT DX, AL |
//! | EF | OUT DX, AX |
//!
//! Bit 0 selects the width, bit 1 the direction and bit 3 whether the port
//! comes from DX. An access to a port without a device fails with
//! [`crate::PortError`].

use crate::bits::bit;
use crate::registers::{Reg16, Reg8};
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes IN/OUT (E4-E7, EC-EF).
pub(crate) fn execute_io<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let word = bit(opcode as u16, 0);
    let output = bit(opcode as u16, 1);

    let port = if bit(opcode as u16, 3) {
        cpu.regs.get(Reg16::DX)
    } else {
        cpu.fetch8() as u16
    };

    match (output, word) {
        (false, false) => {
            let value = cpu.ports.read8(port)?;
            cpu.regs.set8(Reg8::AL, value);
        }
        (false, true) => {
            let value = cpu.ports.read16(port)?;
            cpu.regs.set(Reg16::AX, value);
        }
        (true, false) => {
            cpu.ports.write8(port, cpu.regs.get8(Reg8::AL))?;
        }
        (true, true) => {
            cpu.ports.write16(port, cpu.regs.get(Reg16::AX))?;
        }
    }

    Ok(())
}
