//! # Software Interrupts
//!
//! - INT 3 (CC), INT imm8 (CD), INTO (CE)
//! - IRET (CF)
//!
//! ## Interrupt Sequence
//!
//! 1. Push FLAGS, then CS, then IP of the next instruction
//! 2. Clear IF, TF and AF
//! 3. Load IP from 0000:N*4 and CS from 0000:N*4+2
//!
//! IRET pops IP, CS and FLAGS in the reverse order.

use crate::registers::SegReg;
use crate::{ExecutionError, MemoryBus, CPU};

/// Vector raised by INTO when OF is set.
pub const OVERFLOW_VECTOR: u8 = 4;

/// Transfers control through interrupt vector `vector`.
pub(crate) fn raise<M: MemoryBus>(cpu: &mut CPU<M>, vector: u8) {
    let flags = cpu.flags.bits();
    cpu.push(flags);
    cpu.push(cpu.regs.segment(SegReg::CS));
    cpu.push(cpu.regs.ip());

    cpu.flags.interrupt = false;
    cpu.flags.trap = false;
    cpu.flags.auxiliary = false;

    let entry = vector as u16 * 4;
    let ip = cpu.read16(0x0000, entry);
    let cs = cpu.read16(0x0000, entry + 2);

    log::debug!(
        "INT 0x{:02X} from {:04X}:{:04X} to {:04X}:{:04X}",
        vector,
        cpu.regs.segment(SegReg::CS),
        cpu.regs.ip(),
        cs,
        ip
    );

    cpu.regs.set_segment(SegReg::CS, cs);
    cpu.regs.set_ip(ip);
}

/// Executes INT 3 (CC), INT imm8 (CD) and INTO (CE).
pub(crate) fn execute_int<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    match opcode {
        0xCC => raise(cpu, 3),
        0xCD => {
            let vector = cpu.fetch8();
            raise(cpu, vector);
        }
        _ => {
            if cpu.flags.overflow {
                raise(cpu, OVERFLOW_VECTOR);
            }
        }
    }
    Ok(())
}

/// Executes IRET (CF).
pub(crate) fn execute_iret<M: MemoryBus>(
    cpu: &mut CPU<M>,
    _opcode: u8,
) -> Result<(), ExecutionError> {
    let ip = cpu.pop();
    let cs = cpu.pop();
    let flags = cpu.pop();

    cpu.regs.set_ip(ip);
    cpu.regs.set_segment(SegReg::CS, cs);
    cpu.flags.set_bits(flags);

    log::debug!("IRET to {:04X}:{:04X}", cs, ip);
    Ok(())
}
